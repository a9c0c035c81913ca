pub mod equation_engine;
pub mod fixed_point;
pub mod orbit;
pub mod phase;
pub mod solvers;
pub mod stability;
#[cfg(test)]
mod test_support;
/// The `phaseline_core` crate is a small library for exploring one-dimensional
/// dynamical systems: discrete maps `x -> f(x)` and autonomous flows `dx/dt = g(x)`.
///
/// Key components:
/// - **Traits**: `ScalarMap` (the function being studied), `Steppable` (one step of a
///   map or an integrated flow) and `Solver` (pluggable integration rules).
/// - **Solvers**: forward Euler and RK4, bound to a step size through `Flow`.
/// - **Orbit**: trajectories and a simple cycle detector.
/// - **Fixed points**: Steffensen search that degrades to a best estimate.
/// - **Stability**: a finite-horizon heuristic for each side of a fixed point.
/// - **Phase**: an ASCII phase line with stability arrows.
/// - **Equation Engine**: string expressions with named parameters.
pub mod traits;

pub use fixed_point::{
    dedup_within, find_fixed_points, fixed_point, FixedPointResult, FixedPointSettings,
};
pub use orbit::{is_oscillator, iterate, Oscillation, OscillationSettings, Trajectory};
pub use phase::{
    fixed_point_diagram, phase_diagram, PhaseDiagram, PhaseDiagramConfig, PhaseDiagramError,
};
pub use solvers::{DiscreteMap, Euler, Flow, Rk4, SolverConfig, SolverKind};
pub use stability::{is_stable, Stability, StabilitySettings};
pub use traits::{ScalarMap, Solver, Steppable};
