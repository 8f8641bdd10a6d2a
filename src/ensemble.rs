//! Ensemble orchestration and resampling onto a shared time grid.

use crate::config::{Simulation, Solver};
use crate::engine::{Engine, Trajectory};
use crate::model::{Params, Scenario};
use anyhow::{Context, Result};
use rand::SeedableRng;
use rand_chacha::ChaCha12Rng;
use serde::{Deserialize, Serialize};

/// All realizations of one scenario, each on its own irregular time grid.
///
/// Never mutated after population.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ensemble {
    pub scenario: Scenario,
    pub trajectories: Vec<Trajectory>,
}

/// Run `sim.runs` independent realizations of one scenario.
///
/// Every trajectory draws from its own ChaCha stream of the shared base
/// seed, so runs are mutually independent and the whole ensemble is
/// reproducible (and safely parallelizable) from a single seed. The stream
/// ids start at `stream_base`, which callers advance between scenarios.
pub fn run_ensemble(
    base: &Params,
    scenario: &Scenario,
    sim: &Simulation,
    solver: &Solver,
    seed: u64,
    stream_base: u64,
) -> Result<Ensemble> {
    let par = base.with_scenario(scenario);

    let mut trajectories = Vec::with_capacity(sim.runs);
    for run_idx in 0..sim.runs {
        let mut rng = ChaCha12Rng::seed_from_u64(seed);
        rng.set_stream(stream_base + run_idx as u64);

        let traj = Engine::new(par, sim.horizon, *solver, rng)
            .run()
            .with_context(|| {
                format!("run {run_idx} of scenario {:?} failed", scenario.label)
            })?;
        trajectories.push(traj);
    }

    Ok(Ensemble {
        scenario: scenario.clone(),
        trajectories,
    })
}

/// Ensemble means of all four state variables on an even time grid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridSummary {
    pub t: Vec<f64>,
    pub mean_a: Vec<f64>,
    pub mean_p: Vec<f64>,
    pub mean_m: Vec<f64>,
    pub mean_q: Vec<f64>,
}

/// Evenly spaced grid of `points` samples over `[0, horizon]`.
pub fn time_grid(horizon: f64, points: usize) -> Vec<f64> {
    let step = horizon / (points - 1) as f64;
    (0..points).map(|i| i as f64 * step).collect()
}

/// Piecewise-linear resampling of one sample series onto `grid`.
///
/// Flat-hold extrapolation on both sides: extinct trajectories end early and
/// keep their last value past their own final time, so they stay defined on
/// the full grid for mean-trajectory aggregation.
pub fn resample(grid: &[f64], t: &[f64], vals: &[f64]) -> Vec<f64> {
    debug_assert_eq!(t.len(), vals.len());
    debug_assert!(!t.is_empty());

    let mut out = Vec::with_capacity(grid.len());
    let mut seg = 0;
    for &x in grid {
        if x <= t[0] {
            out.push(vals[0]);
            continue;
        }
        if x >= t[t.len() - 1] {
            out.push(vals[vals.len() - 1]);
            continue;
        }
        while t[seg + 1] < x {
            seg += 1;
        }
        let span = t[seg + 1] - t[seg];
        let frac = if span > 0.0 { (x - t[seg]) / span } else { 0.0 };
        out.push(vals[seg] + frac * (vals[seg + 1] - vals[seg]));
    }
    out
}

/// Resample every trajectory and average the ensemble per grid point.
pub fn summarize_on_grid(ensemble: &Ensemble, sim: &Simulation) -> GridSummary {
    let grid = time_grid(sim.horizon, sim.grid_points);
    let n = ensemble.trajectories.len() as f64;

    let mut mean_a = vec![0.0; grid.len()];
    let mut mean_p = vec![0.0; grid.len()];
    let mut mean_m = vec![0.0; grid.len()];
    let mut mean_q = vec![0.0; grid.len()];

    for traj in &ensemble.trajectories {
        for (acc, vals) in [
            (&mut mean_a, &traj.a),
            (&mut mean_p, &traj.p),
            (&mut mean_m, &traj.m),
            (&mut mean_q, &traj.q),
        ] {
            for (sum, val) in acc.iter_mut().zip(resample(&grid, &traj.t, vals)) {
                *sum += val / n;
            }
        }
    }

    GridSummary {
        t: grid,
        mean_a,
        mean_p,
        mean_m,
        mean_q,
    }
}
