//! Mean-field ODE trajectories and closed-form invasion analysis.

use crate::config::Solver;
use crate::ensemble::time_grid;
use crate::model::{Params, State, growth_rate, vector_field};
use crate::solver;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Deterministic trajectory sampled on an even grid over `[0, horizon]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OdeSeries {
    pub t: Vec<f64>,
    pub a: Vec<f64>,
    pub p: Vec<f64>,
    pub m: Vec<f64>,
    pub q: Vec<f64>,
}

/// Integrate the mean-field system from the shared initial condition.
pub fn run_time_series(
    par: &Params,
    horizon: f64,
    points: usize,
    opts: &Solver,
) -> Result<OdeSeries> {
    let grid = time_grid(horizon, points);

    let mut series = OdeSeries {
        t: grid.clone(),
        a: Vec::with_capacity(points),
        p: Vec::with_capacity(points),
        m: Vec::with_capacity(points),
        q: Vec::with_capacity(points),
    };

    let mut y = State::INITIAL.to_array();
    let mut t = 0.0;
    for &t_next in &grid {
        let par = *par;
        y = solver::integrate(move |_, y| vector_field(&par, y), t, t_next, y, opts)
            .with_context(|| format!("mean-field solve failed on [{t}, {t_next}]"))?;
        t = t_next;

        series.a.push(y[0]);
        series.p.push(y[1]);
        series.m.push(y[2]);
        series.q.push(y[3]);
    }

    Ok(series)
}

/// Drug concentration at the plasmid-free equilibrium,
/// `A* = k_in*A_ext / (k_out*E_h)` (zero when the denominator vanishes).
pub fn plasmid_free_equilibrium(par: &Params) -> f64 {
    let influx = par.k_in * par.a_ext;
    let clearance = par.k_out * par.e_h;
    if clearance != 0.0 { influx / clearance } else { 0.0 }
}

/// Growth eigenvalue of a rare plasmid invading the plasmid-free state,
/// `lambda_P = r_P*G(A*) - c_P`. Positive means the plasmid can establish.
pub fn invasion_eigenvalue(par: &Params) -> f64 {
    let a_star = plasmid_free_equilibrium(par);
    par.r_p * growth_rate(par, a_star) - par.c_p
}

/// Intrinsic efflux level at which the invasion eigenvalue changes sign for
/// the current drug level.
pub fn critical_e_h(par: &Params) -> f64 {
    let scale = (par.k_in * par.a_ext) / (par.k_out * par.ic50);
    scale * (par.c_p / (par.r_p * par.g_max - par.c_p)).powf(1.0 / par.h)
}

/// Drug level at which the invasion eigenvalue changes sign for the current
/// intrinsic efflux.
pub fn critical_a_ext(par: &Params) -> f64 {
    let scale = (par.k_out * par.ic50 * par.e_h) / par.k_in;
    scale * ((par.r_p * par.g_max - par.c_p) / par.c_p).powf(1.0 / par.h)
}

/// Plasmid-free growth rate `G(A*)` as a function of intrinsic efflux, for
/// a fixed set of drug levels. Feeds external bifurcation plots.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EffluxSweep {
    pub a_ext: f64,
    pub e_h: Vec<f64>,
    pub g_star: Vec<f64>,
}

pub fn run_efflux_sweep(base: &Params) -> Vec<EffluxSweep> {
    let e_h_vals = linspace(0.01, 5.0, 100);

    [5.0, 15.0, 25.0]
        .into_iter()
        .map(|a_ext| {
            let g_star = e_h_vals
                .iter()
                .map(|&e_h| {
                    let par = Params { a_ext, e_h, ..*base };
                    growth_rate(&par, plasmid_free_equilibrium(&par))
                })
                .collect();
            EffluxSweep {
                a_ext,
                e_h: e_h_vals.clone(),
                g_star,
            }
        })
        .collect()
}

/// Invasion eigenvalue over an (E_h, A_ext) grid, row-major in E_h. Feeds
/// external contour plots of the invasion boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvasionGrid {
    pub e_h: Vec<f64>,
    pub a_ext: Vec<f64>,
    pub lambda: Vec<Vec<f64>>,
}

pub fn run_invasion_grid(base: &Params) -> InvasionGrid {
    let e_h_vals = linspace(0.01, 5.0, 100);
    let a_ext_vals = linspace(0.1, 30.0, 80);

    let lambda = e_h_vals
        .iter()
        .map(|&e_h| {
            a_ext_vals
                .iter()
                .map(|&a_ext| invasion_eigenvalue(&Params { a_ext, e_h, ..*base }))
                .collect()
        })
        .collect();

    InvasionGrid {
        e_h: e_h_vals,
        a_ext: a_ext_vals,
        lambda,
    }
}

fn linspace(start: f64, end: f64, points: usize) -> Vec<f64> {
    let step = (end - start) / (points - 1) as f64;
    (0..points).map(|i| start + i as f64 * step).collect()
}
