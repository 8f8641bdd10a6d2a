use crate::analysis::{
    OdeReport, OdeScenarioReport, ScenarioReport, save_json, save_trajectories,
};
use crate::config::{Config, check_num};
use crate::deterministic;
use crate::ensemble::run_ensemble;
use crate::model::Scenario;
use anyhow::{Context, Result};
use rand::{TryRngCore, rngs::OsRng};
use std::path::{Path, PathBuf};

/// Owns the validated configuration and drives the two simulation modes.
pub struct Manager {
    cfg: Config,
}

impl Manager {
    pub fn new<P: AsRef<Path>>(params_file: P) -> Result<Self> {
        let cfg = Config::from_file(params_file).context("failed to construct cfg")?;
        log::info!("{cfg:#?}");

        Ok(Self { cfg })
    }

    /// Deterministic mode: mean-field time series plus invasion analysis
    /// for every scenario, and the sweep/grid arrays for external plots.
    pub fn run_ode(&self, out: Option<PathBuf>) -> Result<()> {
        let sim = &self.cfg.simulation;

        let mut scenarios = Vec::new();
        for scenario in Scenario::standard_set() {
            let par = self.cfg.model.with_scenario(&scenario);

            let series =
                deterministic::run_time_series(&par, sim.horizon, sim.grid_points, &self.cfg.solver)
                    .with_context(|| format!("scenario {:?} failed", scenario.label))?;

            let report = OdeScenarioReport {
                scenario,
                a_star: deterministic::plasmid_free_equilibrium(&par),
                invasion_eigenvalue: deterministic::invasion_eigenvalue(&par),
                critical_e_h: deterministic::critical_e_h(&par),
                critical_a_ext: deterministic::critical_a_ext(&par),
                series,
            };
            report.log();
            scenarios.push(report);
        }

        let report = OdeReport {
            scenarios,
            efflux_sweep: deterministic::run_efflux_sweep(&self.cfg.model),
            invasion_grid: deterministic::run_invasion_grid(&self.cfg.model),
        };

        if let Some(out) = out {
            save_json(&report, &out).context("failed to save report")?;
            log::info!("wrote {out:?}");
        }

        Ok(())
    }

    /// Stochastic mode: one ensemble per scenario, reduced to extinction
    /// and resistance statistics.
    pub fn run_ssa(
        &self,
        runs: Option<usize>,
        seed: Option<u64>,
        out: Option<PathBuf>,
        trajectories: Option<PathBuf>,
    ) -> Result<()> {
        let mut sim = self.cfg.simulation;
        if let Some(runs) = runs {
            // The override must clear the same bar as the config file.
            check_num(runs, 1..).context("invalid number of runs")?;
            sim.runs = runs;
        }

        let seed = match seed {
            Some(seed) => seed,
            None => OsRng.try_next_u64().context("failed to seed from the OS")?,
        };
        log::info!("base seed: {seed}");

        let mut reports = Vec::new();
        let mut ensembles = Vec::new();
        for (idx, scenario) in Scenario::standard_set().into_iter().enumerate() {
            // Disjoint stream range per scenario keeps every run on its own
            // random stream.
            let stream_base = (idx * sim.runs) as u64;
            let ensemble = run_ensemble(
                &self.cfg.model,
                &scenario,
                &sim,
                &self.cfg.solver,
                seed,
                stream_base,
            )
            .with_context(|| format!("scenario {:?} failed", scenario.label))?;

            let report = ScenarioReport::from_ensemble(&ensemble, &sim);
            report.log();
            reports.push(report);
            ensembles.push(ensemble);
        }

        if let Some(out) = out {
            save_json(&reports, &out).context("failed to save report")?;
            log::info!("wrote {out:?}");
        }
        if let Some(trajectories) = trajectories {
            save_trajectories(&ensembles, &trajectories)
                .context("failed to save trajectories")?;
            log::info!("wrote {trajectories:?}");
        }

        Ok(())
    }
}
