//! Model parameters, state vector and the shared vector field.

use serde::{Deserialize, Serialize};

/// Rate coefficients of the plasmid resistance model.
///
/// Loaded from the `[model]` section of the parameter file and validated by
/// [`crate::config::Config`] before any simulation starts. Scenarios override
/// `a_ext` and `e_h` on a shared base set.
#[derive(Debug, PartialEq, Clone, Copy, Serialize, Deserialize)]
pub struct Params {
    /// Drug influx rate constant.
    pub k_in: f64,
    /// Drug efflux rate constant (per unit of effective efflux).
    pub k_out: f64,
    /// Extracellular drug level.
    pub a_ext: f64,
    /// Intrinsic (plasmid-independent) efflux level.
    pub e_h: f64,
    /// Efflux contribution per unit of efflux protein.
    pub beta: f64,

    /// Maximal growth rate.
    pub g_max: f64,
    /// Half-maximal inhibitory drug concentration.
    pub ic50: f64,
    /// Hill coefficient of growth suppression.
    pub h: f64,

    /// Plasmid replication rate constant.
    pub r_p: f64,
    /// Plasmid carriage cost rate.
    pub c_p: f64,
    /// Density-dependent plasmid loss rate.
    pub gamma: f64,

    /// mRNA transcription rate per plasmid copy.
    pub k_m: f64,
    /// mRNA degradation rate.
    pub delta_m: f64,
    /// Efflux protein translation rate per mRNA.
    pub k_q: f64,
    /// Efflux protein degradation rate.
    pub delta_q: f64,
}

impl Params {
    /// Copy of the base parameters with a scenario's drug and efflux levels.
    pub fn with_scenario(&self, scenario: &Scenario) -> Self {
        Self {
            a_ext: scenario.a_ext,
            e_h: scenario.e_h,
            ..*self
        }
    }
}

/// State of the cell at a point in time: drug (A), plasmid copies (P),
/// plasmid mRNA (M) and efflux protein (Q).
///
/// `p` changes only at discrete jump instants, by exactly one copy; the
/// other three components evolve continuously between jumps. It is kept as
/// a float: rounding it would change jump timing statistics.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct State {
    pub a: f64,
    pub p: f64,
    pub m: f64,
    pub q: f64,
}

impl State {
    /// Initial condition shared by both engines: no drug, one plasmid copy.
    pub const INITIAL: State = State {
        a: 0.0,
        p: 1.0,
        m: 0.0,
        q: 0.0,
    };

    pub fn to_array(self) -> [f64; 4] {
        [self.a, self.p, self.m, self.q]
    }
}

/// Hill-type growth rate `G(A) = G_max / (1 + (A/IC50)^h)`.
///
/// Decreasing in the drug concentration; well defined for `a >= 0` given
/// `ic50 > 0` and `h > 0` (enforced at config validation).
pub fn growth_rate(par: &Params, a: f64) -> f64 {
    par.g_max / (1.0 + (a / par.ic50).powf(par.h))
}

/// Right-hand side of the continuous dynamics, `dy/dt = f(y)`.
///
/// The system is autonomous. This single function is used by the mean-field
/// ODE mode and by the continuous phase of the stochastic engine, so the two
/// can never drift apart.
pub fn vector_field(par: &Params, y: &[f64; 4]) -> [f64; 4] {
    let [a, p, m, q] = *y;

    let efflux = par.e_h + par.beta * q;
    let growth = growth_rate(par, a);

    [
        par.k_in * par.a_ext - par.k_out * efflux * a,
        par.r_p * growth * p - par.c_p * p - par.gamma * p * p,
        par.k_m * p - par.delta_m * m,
        par.k_q * m - par.delta_q * q,
    ]
}

/// One parameter regime under study: a label plus the two overridden levels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub label: String,
    pub a_ext: f64,
    pub e_h: f64,
}

impl Scenario {
    fn new(label: &str, a_ext: f64, e_h: f64) -> Self {
        Self {
            label: label.to_string(),
            a_ext,
            e_h,
        }
    }

    /// The fixed scenario set studied by both modes.
    pub fn standard_set() -> Vec<Scenario> {
        vec![
            Scenario::new("no_drug", 0.0, 0.0),
            Scenario::new("drug_no_efflux", 15.0, 0.0),
            Scenario::new("drug_intrinsic_efflux", 15.0, 2.0),
        ]
    }
}

#[cfg(test)]
pub fn test_params() -> Params {
    Params {
        k_in: 0.8,
        k_out: 0.5,
        a_ext: 15.0,
        e_h: 2.0,
        beta: 0.3,
        g_max: 1.0,
        ic50: 5.0,
        h: 2.0,
        r_p: 2.0,
        c_p: 0.1,
        gamma: 0.05,
        k_m: 0.5,
        delta_m: 0.4,
        k_q: 0.6,
        delta_q: 0.3,
    }
}
