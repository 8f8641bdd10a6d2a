use crate::model::Params;
use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::{fmt::Debug, fs, ops::RangeBounds, path::Path};

/// Simulation configuration.
///
/// Loaded from a TOML parameter file and validated before use.
/// See [`Config::from_file`] for loading.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Model rate coefficients.
    pub model: Params,

    /// Simulation horizon, grid and run settings.
    pub simulation: Simulation,

    /// Adaptive solver tolerances.
    #[serde(default)]
    pub solver: Solver,
}

#[derive(Debug, PartialEq, Clone, Copy, Serialize, Deserialize)]
pub struct Simulation {
    /// Time horizon of every trajectory.
    pub horizon: f64,
    /// Number of evenly spaced points of the shared output grid.
    pub grid_points: usize,
    /// Number of stochastic runs per scenario.
    pub runs: usize,
    /// Efflux protein level that counts as established resistance.
    pub resistance_threshold: f64,
}

#[derive(Debug, PartialEq, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct Solver {
    /// Relative integration tolerance.
    pub rtol: f64,
    /// Absolute integration tolerance.
    pub atol: f64,
    /// Step budget per continuous solve.
    pub max_steps: usize,
}

impl Default for Solver {
    fn default() -> Self {
        Self {
            rtol: 1e-6,
            atol: 1e-9,
            max_steps: 100_000,
        }
    }
}

impl Config {
    /// Load a [`Config`] from a TOML parameter file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, deserialized, or if the
    /// configuration values are invalid.
    pub fn from_file<P: AsRef<Path>>(file: P) -> Result<Self> {
        let file = file.as_ref();
        let contents =
            fs::read_to_string(file).with_context(|| format!("failed to read {file:?}"))?;

        let config: Config = toml::from_str(&contents).context("failed to deserialize config")?;

        config.validate().context("failed to validate config")?;

        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        let par = &self.model;

        check_rate(par.k_in, "k_in")?;
        check_rate(par.k_out, "k_out")?;
        check_rate(par.a_ext, "a_ext")?;
        check_rate(par.e_h, "e_h")?;
        check_rate(par.beta, "beta")?;
        check_rate(par.g_max, "g_max")?;
        check_rate(par.r_p, "r_p")?;
        check_rate(par.c_p, "c_p")?;
        check_rate(par.gamma, "gamma")?;
        check_rate(par.k_m, "k_m")?;
        check_rate(par.delta_m, "delta_m")?;
        check_rate(par.k_q, "k_q")?;
        check_rate(par.delta_q, "delta_q")?;

        // IC50 and h appear as divisor and exponent base.
        check_positive(par.ic50, "ic50")?;
        check_positive(par.h, "h")?;

        let sim = &self.simulation;
        check_positive(sim.horizon, "horizon")?;
        check_num(sim.grid_points, 2..).context("invalid number of grid points")?;
        check_num(sim.runs, 1..).context("invalid number of runs")?;
        check_rate(sim.resistance_threshold, "resistance_threshold")?;

        let solver = &self.solver;
        check_positive(solver.rtol, "rtol")?;
        check_positive(solver.atol, "atol")?;
        check_num(solver.max_steps, 1..).context("invalid step budget")?;

        Ok(())
    }
}

pub fn check_num<T, R>(num: T, range: R) -> Result<()>
where
    T: PartialOrd + Debug,
    R: RangeBounds<T> + Debug,
{
    if !range.contains(&num) {
        bail!("number must be in the range {range:?}, but is {num:?}");
    }
    Ok(())
}

fn check_rate(num: f64, name: &str) -> Result<()> {
    if !num.is_finite() || num < 0.0 {
        bail!("{name} must be finite and non-negative, but is {num}");
    }
    Ok(())
}

fn check_positive(num: f64, name: &str) -> Result<()> {
    if !num.is_finite() || num <= 0.0 {
        bail!("{name} must be finite and strictly positive, but is {num}");
    }
    Ok(())
}
