//! Summary statistics over trajectory ensembles.

use crate::engine::Trajectory;
use crate::ensemble::Ensemble;
use serde::{Deserialize, Serialize};

/// Fraction of trajectories whose final copy number is zero.
pub fn extinction_probability(ensemble: &Ensemble) -> f64 {
    let n = ensemble.trajectories.len();
    if n == 0 {
        return f64::NAN;
    }
    let extinct = ensemble
        .trajectories
        .iter()
        .filter(|traj| traj.final_p() == 0.0)
        .count();
    extinct as f64 / n as f64
}

/// Complement of extinction: survival of the lineage to the horizon.
pub fn rescue_probability(ensemble: &Ensemble) -> f64 {
    1.0 - extinction_probability(ensemble)
}

/// First recorded time at which the efflux protein level reaches
/// `threshold`; infinite when it never does within the trajectory's span.
pub fn time_to_resistance(traj: &Trajectory, threshold: f64) -> f64 {
    traj.q
        .iter()
        .zip(&traj.t)
        .find(|&(&q, _)| q >= threshold)
        .map_or(f64::INFINITY, |(_, &t)| t)
}

/// Mean and spread of the finite crossing times.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TimeToResistance {
    /// Number of trajectories that crossed the threshold.
    pub crossings: usize,
    /// Mean crossing time over the crossing trajectories only; `None` when
    /// no trajectory crossed (never, not zero).
    pub mean: Option<f64>,
    pub std_dev: Option<f64>,
}

/// Reduce an ensemble to its time-to-resistance distribution summary.
pub fn mean_time_to_resistance(ensemble: &Ensemble, threshold: f64) -> TimeToResistance {
    let mut acc = Accumulator::new();
    for traj in &ensemble.trajectories {
        let t_cross = time_to_resistance(traj, threshold);
        if t_cross.is_finite() {
            acc.add(t_cross);
        }
    }

    let report = acc.report();
    TimeToResistance {
        crossings: acc.n_vals,
        mean: (acc.n_vals > 0).then_some(report.mean),
        std_dev: (acc.n_vals > 1).then_some(report.std_dev),
    }
}

/// Online mean and standard deviation (Welford update).
pub struct Accumulator {
    n_vals: usize,
    mean: f64,
    diff_2_sum: f64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AccumulatorReport {
    pub mean: f64,
    pub std_dev: f64,
}

impl Accumulator {
    pub fn new() -> Self {
        Self {
            n_vals: 0,
            mean: 0.0,
            diff_2_sum: 0.0,
        }
    }

    pub fn add(&mut self, val: f64) {
        self.n_vals += 1;

        let diff_a = val - self.mean;
        self.mean += diff_a / self.n_vals as f64;

        let diff_b = val - self.mean;
        self.diff_2_sum += diff_a * diff_b;
    }

    pub fn report(&self) -> AccumulatorReport {
        AccumulatorReport {
            mean: if self.n_vals > 0 { self.mean } else { f64::NAN },
            std_dev: if self.n_vals > 1 {
                (self.diff_2_sum / (self.n_vals as f64 - 1.0)).sqrt()
            } else {
                f64::NAN
            },
        }
    }
}

impl Default for Accumulator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Simulation, Solver};
    use crate::ensemble::run_ensemble;
    use crate::model::{Scenario, test_params};

    fn sim(runs: usize) -> Simulation {
        Simulation {
            horizon: 20.0,
            grid_points: 100,
            runs,
            resistance_threshold: 2.0,
        }
    }

    fn scenario_ensemble(idx: usize, runs: usize, seed: u64) -> Ensemble {
        let par = test_params();
        let scenario = &Scenario::standard_set()[idx];
        run_ensemble(&par, scenario, &sim(runs), &Solver::default(), seed, 0)
            .expect("ensemble must not fail")
    }

    #[test]
    fn extinction_and_rescue_sum_to_one() {
        for idx in 0..3 {
            let ens = scenario_ensemble(idx, 20, 17);
            let total = extinction_probability(&ens) + rescue_probability(&ens);
            assert_eq!(total, 1.0);
        }
    }

    #[test]
    fn extinction_is_rare_without_drug() {
        // r_P * G_max comfortably exceeds c_P, so the lineage establishes
        // in most runs.
        let ens = scenario_ensemble(0, 100, 42);
        let p_ext = extinction_probability(&ens);
        assert!(p_ext < 0.15, "extinction probability {p_ext} too high");
    }

    #[test]
    fn extinction_dominates_under_drug_without_efflux() {
        // Drug influx drives A far past IC50 before the lineage can grow,
        // so growth collapses and loss wins.
        let ens = scenario_ensemble(1, 100, 42);
        let p_ext = extinction_probability(&ens);
        assert!(p_ext > 0.8, "extinction probability {p_ext} too low");
    }

    #[test]
    fn time_to_resistance_finds_the_first_crossing() {
        let mut traj = Trajectory {
            t: vec![0.0, 1.0, 2.0, 3.0],
            a: vec![0.0; 4],
            p: vec![1.0, 2.0, 3.0, 4.0],
            m: vec![0.0; 4],
            q: vec![0.0, 0.5, 1.5, 2.5],
            outcome: crate::engine::Outcome::HorizonReached,
        };
        assert_eq!(time_to_resistance(&traj, 1.5), 2.0);
        assert_eq!(time_to_resistance(&traj, 0.0), 0.0);

        traj.q = vec![0.0, 0.1, 0.2, 0.3];
        assert_eq!(time_to_resistance(&traj, 1.5), f64::INFINITY);
    }

    #[test]
    fn mean_time_to_resistance_is_never_when_nothing_crosses() {
        let ens = scenario_ensemble(0, 10, 3);
        let ttr = mean_time_to_resistance(&ens, f64::MAX);
        assert_eq!(ttr.crossings, 0);
        assert!(ttr.mean.is_none());
        assert!(ttr.std_dev.is_none());
    }

    #[test]
    fn mean_time_to_resistance_ignores_censored_runs() {
        let ens = scenario_ensemble(0, 40, 8);
        let threshold = 0.5;
        let ttr = mean_time_to_resistance(&ens, threshold);
        if let Some(mean) = ttr.mean {
            assert!(mean.is_finite());
            assert!(mean >= 0.0);
            assert!(ttr.crossings > 0);
        } else {
            assert_eq!(ttr.crossings, 0);
        }
    }

    #[test]
    fn accumulator_matches_direct_mean_and_std_dev() {
        let vals = [1.0, 2.0, 4.0, 8.0];
        let mut acc = Accumulator::new();
        for val in vals {
            acc.add(val);
        }
        let report = acc.report();
        assert!((report.mean - 3.75).abs() < 1e-12);

        let var: f64 = vals.iter().map(|v| (v - 3.75f64).powi(2)).sum::<f64>() / 3.0;
        assert!((report.std_dev - var.sqrt()).abs() < 1e-12);
    }
}
