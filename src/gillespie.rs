//! Propensities and exact jump sampling for the plasmid copy-number process.

use crate::model::{Params, State, growth_rate};
use anyhow::Result;
use rand::Rng;
use rand_distr::{Distribution, Exp};

/// Discrete event applied to the plasmid copy number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Jump {
    /// One plasmid copy replicates (`P += 1`).
    Replication,
    /// One plasmid copy is lost (`P -= 1`).
    Loss,
}

/// Instantaneous rates of the two jump types at a given state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Propensities {
    pub replication: f64,
    pub loss: f64,
}

impl Propensities {
    /// Evaluate both propensities. Zero when `P <= 0`: the plasmid-free
    /// state is absorbing.
    pub fn at(par: &Params, state: &State) -> Self {
        if state.p <= 0.0 {
            return Self {
                replication: 0.0,
                loss: 0.0,
            };
        }
        Self {
            replication: par.r_p * growth_rate(par, state.a) * state.p,
            loss: par.c_p * state.p + par.gamma * state.p * state.p,
        }
    }

    pub fn total(&self) -> f64 {
        self.replication + self.loss
    }
}

/// Draw the waiting time to the next jump and its type.
///
/// Exact stochastic simulation semantics: the waiting time is
/// `Exponential(a0)` and the jump type is a categorical draw weighted by
/// relative propensity, from two independent draws. Returns `None` when the
/// total propensity is not positive, i.e. no further event is possible.
pub fn sample_jump<R: Rng>(props: &Propensities, rng: &mut R) -> Result<Option<(f64, Jump)>> {
    let total = props.total();
    if total <= 0.0 {
        return Ok(None);
    }

    let tau = Exp::new(total)?.sample(rng);

    let jump = if rng.random::<f64>() < props.replication / total {
        Jump::Replication
    } else {
        Jump::Loss
    };

    Ok(Some((tau, jump)))
}
