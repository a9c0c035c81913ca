use crate::solvers::SolverConfig;

/// A real-valued function of one real variable.
///
/// This is the capability every map and derivative is handed around as:
/// a discrete map returns `x_{n+1}`, a continuous derivative returns `dx/dt`.
/// Any `Fn(f64) -> f64` closure implements it, so extra arguments are
/// captured by the closure rather than threaded through each call.
pub trait ScalarMap {
    fn apply(&self, x: f64) -> f64;
}

impl<F: Fn(f64) -> f64> ScalarMap for F {
    fn apply(&self, x: f64) -> f64 {
        self(x)
    }
}

/// Something that can advance a one-dimensional state by one step.
pub trait Steppable {
    /// Performs one step from `state` and returns the next state.
    /// t: current time (updated after step)
    fn step(&self, t: &mut f64, state: f64) -> f64;
}

/// An integration rule for continuous-time systems.
///
/// Implement this to plug a new scheme into `Flow` without touching the
/// iterator, the fixed-point search or the stability classifier.
pub trait Solver {
    /// Computes the state one `config.deltat` after `state` at time `t`.
    fn solve(&self, config: &SolverConfig, deriv: &impl ScalarMap, t: f64, state: f64) -> f64;
}
