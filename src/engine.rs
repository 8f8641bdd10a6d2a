use crate::config::Solver;
use crate::gillespie::{Jump, Propensities, sample_jump};
use crate::model::{Params, State, vector_field};
use crate::solver;
use anyhow::{Context, Result, bail};
use rand_chacha::ChaCha12Rng;
use serde::{Deserialize, Serialize};

/// How a trajectory ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    /// The plasmid copy number reached zero before the horizon.
    Extinct,
    /// The lineage survived to the simulation horizon.
    HorizonReached,
}

/// One stochastic realization: samples on its own irregular time grid, one
/// per jump plus the initial point and the final horizon-clipped point.
///
/// Immutable once returned by [`Engine::run`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trajectory {
    pub t: Vec<f64>,
    pub a: Vec<f64>,
    pub p: Vec<f64>,
    pub m: Vec<f64>,
    pub q: Vec<f64>,
    pub outcome: Outcome,
}

impl Trajectory {
    fn new(state: State) -> Self {
        let mut traj = Self {
            t: Vec::new(),
            a: Vec::new(),
            p: Vec::new(),
            m: Vec::new(),
            q: Vec::new(),
            outcome: Outcome::HorizonReached,
        };
        traj.push(0.0, state);
        traj
    }

    fn push(&mut self, t: f64, state: State) {
        self.t.push(t);
        self.a.push(state.a);
        self.p.push(state.p);
        self.m.push(state.m);
        self.q.push(state.q);
    }

    pub fn len(&self) -> usize {
        self.t.len()
    }

    pub fn is_empty(&self) -> bool {
        self.t.is_empty()
    }

    /// Final plasmid copy number; zero exactly for extinct trajectories.
    pub fn final_p(&self) -> f64 {
        *self.p.last().unwrap_or(&0.0)
    }
}

/// Piecewise-deterministic simulation engine for one trajectory.
///
/// Alternates exact jump sampling with continuous integration of the
/// auxiliary state: within each inter-jump interval only A, M and Q evolve
/// while the copy number stays at its pre-interval value, and the sampled
/// event moves P by exactly one copy at the interval's end.
pub struct Engine {
    par: Params,
    horizon: f64,
    solver: Solver,
    rng: ChaCha12Rng,
}

impl Engine {
    pub fn new(par: Params, horizon: f64, solver: Solver, rng: ChaCha12Rng) -> Self {
        Self {
            par,
            horizon,
            solver,
            rng,
        }
    }

    /// Run one realization from t = 0 until extinction or the horizon.
    ///
    /// # Errors
    /// Propagates continuous-solver failures; these are distinct from a
    /// clean extinction outcome and abort the run.
    pub fn run(mut self) -> Result<Trajectory> {
        let mut t = 0.0;
        let mut state = State::INITIAL;
        let mut traj = Trajectory::new(state);

        while t < self.horizon && state.p > 0.0 {
            let props = Propensities::at(&self.par, &state);
            let Some((tau, jump)) = sample_jump(&props, &mut self.rng)? else {
                // Zero total propensity is only reachable from the absorbing
                // plasmid-free state; anywhere else the rates are broken.
                if state.p > 0.0 {
                    bail!("zero total propensity at t = {t} with P = {}", state.p);
                }
                break;
            };

            // Horizon takes precedence over an event landing exactly on it.
            let clipped = t + tau >= self.horizon;
            let t_next = if clipped { self.horizon } else { t + tau };

            let par = self.par;
            let y = solver::integrate(
                move |_, y| vector_field(&par, y),
                t,
                t_next,
                state.to_array(),
                &self.solver,
            )
            .with_context(|| format!("continuous solve failed on [{t}, {t_next}]"))?;

            // The copy number is frozen across the continuous phase; only
            // the auxiliary state advances to the solved values.
            state.a = y[0];
            state.m = y[2];
            state.q = y[3];

            if !clipped {
                match jump {
                    Jump::Replication => state.p += 1.0,
                    Jump::Loss => state.p -= 1.0,
                }
            }

            t = t_next;
            traj.push(t, state);
        }

        traj.outcome = if state.p <= 0.0 {
            Outcome::Extinct
        } else {
            Outcome::HorizonReached
        };

        Ok(traj)
    }
}
