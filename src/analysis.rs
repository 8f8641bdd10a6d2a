//! Reduction of simulation output to per-scenario reports and their
//! serialization for external plotting and printing.

use crate::config::Simulation;
use crate::deterministic::{EffluxSweep, InvasionGrid, OdeSeries};
use crate::ensemble::{Ensemble, GridSummary, summarize_on_grid};
use crate::model::Scenario;
use crate::stats::{
    TimeToResistance, extinction_probability, mean_time_to_resistance, rescue_probability,
};
use anyhow::{Context, Result};
use serde::Serialize;
use std::{
    fs::File,
    io::{BufWriter, Write},
    path::Path,
};

/// Everything the stochastic mode reports for one scenario.
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioReport {
    pub scenario: Scenario,
    pub runs: usize,
    pub extinction_probability: f64,
    pub rescue_probability: f64,
    pub time_to_resistance: TimeToResistance,
    pub grid: GridSummary,
}

impl ScenarioReport {
    pub fn from_ensemble(ensemble: &Ensemble, sim: &Simulation) -> Self {
        Self {
            scenario: ensemble.scenario.clone(),
            runs: ensemble.trajectories.len(),
            extinction_probability: extinction_probability(ensemble),
            rescue_probability: rescue_probability(ensemble),
            time_to_resistance: mean_time_to_resistance(ensemble, sim.resistance_threshold),
            grid: summarize_on_grid(ensemble, sim),
        }
    }

    /// One-line summary for the log, mirroring the printed analysis of the
    /// deterministic mode.
    pub fn log(&self) {
        log::info!(
            "scenario {:?} (A_ext = {}, E_h = {}): P_ext = {:.3}, P_rescue = {:.3}",
            self.scenario.label,
            self.scenario.a_ext,
            self.scenario.e_h,
            self.extinction_probability,
            self.rescue_probability,
        );
        match self.time_to_resistance.mean {
            Some(mean) => log::info!(
                "  mean time to resistance: {mean:.3} ({} of {} runs crossed)",
                self.time_to_resistance.crossings,
                self.runs,
            ),
            None => log::info!("  no run crossed the resistance threshold"),
        }
    }
}

/// Everything the deterministic mode reports for one scenario.
#[derive(Debug, Clone, Serialize)]
pub struct OdeScenarioReport {
    pub scenario: Scenario,
    pub a_star: f64,
    pub invasion_eigenvalue: f64,
    pub critical_e_h: f64,
    pub critical_a_ext: f64,
    pub series: OdeSeries,
}

impl OdeScenarioReport {
    pub fn log(&self) {
        log::info!(
            "scenario {:?} (A_ext = {}, E_h = {}): A* = {:.1}, lambda_P = {:.4}, \
             E_h crit = {:.4}, A_ext crit = {:.4}",
            self.scenario.label,
            self.scenario.a_ext,
            self.scenario.e_h,
            self.a_star,
            self.invasion_eigenvalue,
            self.critical_e_h,
            self.critical_a_ext,
        );
    }
}

/// Top-level deterministic report: per-scenario analysis plus the sweep and
/// grid arrays for external bifurcation plots.
#[derive(Debug, Clone, Serialize)]
pub struct OdeReport {
    pub scenarios: Vec<OdeScenarioReport>,
    pub efflux_sweep: Vec<EffluxSweep>,
    pub invasion_grid: InvasionGrid,
}

/// Write a report as pretty JSON.
pub fn save_json<T: Serialize, P: AsRef<Path>>(report: &T, file: P) -> Result<()> {
    let file = file.as_ref();
    let file = File::create(file).with_context(|| format!("failed to create {file:?}"))?;
    let mut writer = BufWriter::new(file);

    serde_json::to_writer_pretty(&mut writer, report).context("failed to serialize report")?;
    writer.flush().context("failed to flush writer stream")?;
    Ok(())
}

/// Dump the raw ensembles, irregular grids and all, as MessagePack.
pub fn save_trajectories<P: AsRef<Path>>(ensembles: &[Ensemble], file: P) -> Result<()> {
    let file = file.as_ref();
    let file = File::create(file).with_context(|| format!("failed to create {file:?}"))?;
    let mut writer = BufWriter::new(file);

    rmp_serde::encode::write(&mut writer, ensembles)
        .context("failed to serialize trajectories")?;
    writer.flush().context("failed to flush writer stream")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Solver;
    use crate::ensemble::run_ensemble;
    use crate::model::test_params;

    fn small_ensemble() -> (Ensemble, Simulation) {
        let sim = Simulation {
            horizon: 5.0,
            grid_points: 20,
            runs: 6,
            resistance_threshold: 1.0,
        };
        let par = test_params();
        let scenario = &Scenario::standard_set()[2];
        let ens = run_ensemble(&par, scenario, &sim, &Solver::default(), 4, 0).unwrap();
        (ens, sim)
    }

    #[test]
    fn scenario_report_is_consistent() {
        let (ens, sim) = small_ensemble();
        let report = ScenarioReport::from_ensemble(&ens, &sim);
        assert_eq!(report.runs, 6);
        assert_eq!(
            report.extinction_probability + report.rescue_probability,
            1.0
        );
        assert_eq!(report.grid.t.len(), sim.grid_points);
    }

    #[test]
    fn reports_serialize_to_json() {
        let (ens, sim) = small_ensemble();
        let report = ScenarioReport::from_ensemble(&ens, &sim);
        let json = serde_json::to_value(&report).unwrap();
        assert!(json["extinction_probability"].is_number());
        assert!(json["grid"]["mean_p"].is_array());
    }

    #[test]
    fn trajectory_dump_round_trips_through_msgpack() {
        let (ens, _) = small_ensemble();
        let bytes = rmp_serde::to_vec(&vec![ens.clone()]).unwrap();
        let back: Vec<Ensemble> = rmp_serde::from_slice(&bytes).unwrap();
        assert_eq!(back.len(), 1);
        assert_eq!(back[0].trajectories.len(), ens.trajectories.len());
        assert_eq!(back[0].trajectories[0].t, ens.trajectories[0].t);
    }
}
