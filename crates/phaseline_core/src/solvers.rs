use crate::traits::{ScalarMap, Solver, Steppable};
use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

/// Fixed parameters bound to an integration rule.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SolverConfig {
    /// Simulated time advanced by one step.
    pub deltat: f64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self { deltat: 1.0 }
    }
}

/// Forward Euler: `x + dt * f(x)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Euler;

impl Solver for Euler {
    fn solve(&self, config: &SolverConfig, deriv: &impl ScalarMap, _t: f64, state: f64) -> f64 {
        state + config.deltat * deriv.apply(state)
    }
}

/// Classic Runge-Kutta 4th Order Solver
#[derive(Debug, Clone, Copy, Default)]
pub struct Rk4;

impl Solver for Rk4 {
    fn solve(&self, config: &SolverConfig, deriv: &impl ScalarMap, _t: f64, state: f64) -> f64 {
        let dt = config.deltat;

        // Derivatives are autonomous; stage times are not needed.
        let k1 = deriv.apply(state);
        let k2 = deriv.apply(state + dt * k1 * 0.5);
        let k3 = deriv.apply(state + dt * k2 * 0.5);
        let k4 = deriv.apply(state + dt * k3);

        state + dt / 6.0 * (k1 + 2.0 * k2 + 2.0 * k3 + k4)
    }
}

/// Runtime choice of integration rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SolverKind {
    Euler,
    Rk4,
}

impl SolverKind {
    pub fn from_name(name: &str) -> Result<Self> {
        match name {
            "euler" => Ok(SolverKind::Euler),
            "rk4" => Ok(SolverKind::Rk4),
            other => bail!("Unknown solver '{}'. Expected 'euler' or 'rk4'.", other),
        }
    }
}

impl Solver for SolverKind {
    fn solve(&self, config: &SolverConfig, deriv: &impl ScalarMap, t: f64, state: f64) -> f64 {
        match self {
            SolverKind::Euler => Euler.solve(config, deriv, t, state),
            SolverKind::Rk4 => Rk4.solve(config, deriv, t, state),
        }
    }
}

/// Steps a map by applying it once; `t` counts applications.
#[derive(Debug, Clone)]
pub struct DiscreteMap<M> {
    map: M,
}

impl<M: ScalarMap> DiscreteMap<M> {
    pub fn new(map: M) -> Self {
        Self { map }
    }

    pub fn map(&self) -> &M {
        &self.map
    }

    pub fn map_mut(&mut self) -> &mut M {
        &mut self.map
    }
}

impl<M: ScalarMap> Steppable for DiscreteMap<M> {
    fn step(&self, t: &mut f64, state: f64) -> f64 {
        *t += 1.0;
        self.map.apply(state)
    }
}

/// A derivative bound to an integration rule and its step size.
///
/// Each `step` advances simulated time by `config.deltat`. Zeros of the
/// derivative are fixed points of this step map, so the fixed-point search
/// and the stability classifier work on a `Flow` without knowing it is
/// continuous.
#[derive(Debug, Clone)]
pub struct Flow<D, S> {
    deriv: D,
    solver: S,
    config: SolverConfig,
}

impl<D: ScalarMap, S: Solver> Flow<D, S> {
    pub fn new(deriv: D, solver: S, config: SolverConfig) -> Self {
        Self {
            deriv,
            solver,
            config,
        }
    }

    /// Like `new`, but rejects step sizes that cannot advance time.
    pub fn try_new(deriv: D, solver: S, config: SolverConfig) -> Result<Self> {
        if !config.deltat.is_finite() || config.deltat <= 0.0 {
            bail!("Step size deltat must be positive and finite (got {}).", config.deltat);
        }
        Ok(Self::new(deriv, solver, config))
    }

    pub fn config(&self) -> SolverConfig {
        self.config
    }

    pub fn deriv(&self) -> &D {
        &self.deriv
    }

    pub fn deriv_mut(&mut self) -> &mut D {
        &mut self.deriv
    }
}

impl<D: ScalarMap, S: Solver> Steppable for Flow<D, S> {
    fn step(&self, t: &mut f64, state: f64) -> f64 {
        let next = self.solver.solve(&self.config, &self.deriv, *t, state);
        *t += self.config.deltat;
        next
    }
}
