//! Adaptive Dormand-Prince 4(5) integration of the continuous dynamics.
//!
//! The stochastic engine solves many short intervals (one per jump), so the
//! solver is a stateless pure call: right-hand side, interval, initial state
//! and tolerances in, final state out. Failure to converge is an error, never
//! a silent truncation.

use crate::config::Solver;
use anyhow::{Result, bail};

// Dormand-Prince Butcher tableau (nodes, stage weights, 5th- and 4th-order
// solution weights). FSAL: the 7th stage equals the next step's first stage.
const C: [f64; 7] = [0.0, 1.0 / 5.0, 3.0 / 10.0, 4.0 / 5.0, 8.0 / 9.0, 1.0, 1.0];

const A: [[f64; 6]; 7] = [
    [0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
    [1.0 / 5.0, 0.0, 0.0, 0.0, 0.0, 0.0],
    [3.0 / 40.0, 9.0 / 40.0, 0.0, 0.0, 0.0, 0.0],
    [44.0 / 45.0, -56.0 / 15.0, 32.0 / 9.0, 0.0, 0.0, 0.0],
    [
        19372.0 / 6561.0,
        -25360.0 / 2187.0,
        64448.0 / 6561.0,
        -212.0 / 729.0,
        0.0,
        0.0,
    ],
    [
        9017.0 / 3168.0,
        -355.0 / 33.0,
        46732.0 / 5247.0,
        49.0 / 176.0,
        -5103.0 / 18656.0,
        0.0,
    ],
    [
        35.0 / 384.0,
        0.0,
        500.0 / 1113.0,
        125.0 / 192.0,
        -2187.0 / 6784.0,
        11.0 / 84.0,
    ],
];

const B5: [f64; 7] = [
    35.0 / 384.0,
    0.0,
    500.0 / 1113.0,
    125.0 / 192.0,
    -2187.0 / 6784.0,
    11.0 / 84.0,
    0.0,
];

const B4: [f64; 7] = [
    5179.0 / 57600.0,
    0.0,
    7571.0 / 16695.0,
    393.0 / 640.0,
    -92097.0 / 339200.0,
    187.0 / 2100.0,
    1.0 / 40.0,
];

/// Integrate `dy/dt = rhs(t, y)` from `t0` to `t1` and return `y(t1)`.
///
/// # Errors
/// Fails when the step size underflows or the step budget is exhausted
/// before reaching `t1`.
pub fn integrate<F>(rhs: F, t0: f64, t1: f64, y0: [f64; 4], opts: &Solver) -> Result<[f64; 4]>
where
    F: Fn(f64, &[f64; 4]) -> [f64; 4],
{
    let span = t1 - t0;
    if span <= 0.0 {
        return Ok(y0);
    }

    let mut t = t0;
    let mut y = y0;
    let mut k0 = rhs(t, &y);
    let mut h = initial_step(span, &y, &k0);

    for _ in 0..opts.max_steps {
        if t >= t1 {
            return Ok(y);
        }
        let h_left = t1 - t;
        let last = h >= h_left;
        if last {
            h = h_left;
        }
        if h < step_floor(t) {
            bail!("step size underflow at t = {t}");
        }

        // Stage evaluations.
        let mut k = [[0.0; 4]; 7];
        k[0] = k0;
        for s in 1..7 {
            let mut ys = y;
            for (j, kj) in k.iter().enumerate().take(s) {
                for i in 0..4 {
                    ys[i] += h * A[s][j] * kj[i];
                }
            }
            k[s] = rhs(t + C[s] * h, &ys);
        }

        // 5th-order solution and embedded 4th-order error estimate.
        let mut y5 = y;
        let mut err = [0.0; 4];
        for (s, ks) in k.iter().enumerate() {
            for i in 0..4 {
                y5[i] += h * B5[s] * ks[i];
                err[i] += h * (B5[s] - B4[s]) * ks[i];
            }
        }

        let norm = error_norm(&y, &y5, &err, opts);
        if norm <= 1.0 {
            // Land exactly on the endpoint when this was the clamped step.
            t = if last { t1 } else { t + h };
            y = y5;
            // FSAL: stage 7 was evaluated at the accepted point.
            k0 = k[6];
        }

        // PI-free step control with the usual safety factor and clamps.
        let factor = if norm > 0.0 {
            (0.9 * norm.powf(-0.2)).clamp(0.2, 5.0)
        } else {
            5.0
        };
        h *= factor;
    }

    if t >= t1 {
        return Ok(y);
    }
    bail!(
        "exhausted step budget ({} steps) at t = {t} before reaching {t1}",
        opts.max_steps
    );
}

/// Scaled RMS of the local error estimate; a value <= 1 accepts the step.
fn error_norm(y: &[f64; 4], y_new: &[f64; 4], err: &[f64; 4], opts: &Solver) -> f64 {
    let mut sum = 0.0;
    for i in 0..4 {
        let scale = opts.atol + opts.rtol * y[i].abs().max(y_new[i].abs());
        let ratio = err[i] / scale;
        sum += ratio * ratio;
    }
    (sum / 4.0).sqrt()
}

/// First step guess: the whole interval when it is short (the stochastic
/// engine solves one short interval per jump), limited by the initial slope
/// relative to the state scale. The error control corrects from there.
fn initial_step(span: f64, y: &[f64; 4], dy: &[f64; 4]) -> f64 {
    let y_norm = y.iter().fold(0.0f64, |acc, v| acc.max(v.abs()));
    let dy_norm = dy.iter().fold(0.0f64, |acc, v| acc.max(v.abs()));
    if dy_norm > 0.0 {
        span.min(0.01 * (1.0 + y_norm) / dy_norm)
    } else {
        span
    }
}

fn step_floor(t: f64) -> f64 {
    16.0 * f64::EPSILON * t.abs().max(1.0)
}
