//! Finite-horizon stability classification.
//!
//! `is_stable` perturbs a fixed point to each side, runs the system for a
//! bounded number of steps and checks whether the state ended up closer to
//! the fixed point than it started. This is a coarse heuristic rather than
//! a Lyapunov or linearisation test: it assumes monotone approach, never
//! inspects intermediate steps, and a perturbation landing right on the
//! `xtol` boundary can classify differently depending on floating-point
//! rounding along the path. Treat results at that resolution.

use crate::traits::Steppable;
use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct StabilitySettings {
    /// A trajectory this close to the fixed point stops early.
    pub xtol: f64,
    /// Upper bound on steps per side.
    pub max_iter: usize,
}

impl Default for StabilitySettings {
    fn default() -> Self {
        Self {
            xtol: 1e-4,
            max_iter: 500,
        }
    }
}

/// Whether perturbations below (`left_stable`) and above (`right_stable`)
/// a fixed point move back towards it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stability {
    pub left_stable: bool,
    pub right_stable: bool,
}

impl Stability {
    pub fn is_stable(&self) -> bool {
        self.left_stable && self.right_stable
    }

    pub fn is_unstable(&self) -> bool {
        !self.left_stable && !self.right_stable
    }

    /// Stable on one side only, as for a saddle-node.
    pub fn is_semistable(&self) -> bool {
        self.left_stable != self.right_stable
    }
}

impl From<Stability> for (bool, bool) {
    fn from(value: Stability) -> Self {
        (value.left_stable, value.right_stable)
    }
}

/// Classifies `xfix` by running `system` from `xfix - neighborhood` and
/// `xfix + neighborhood`. Pass a `Flow` for continuous systems.
pub fn is_stable(
    system: &impl Steppable,
    xfix: f64,
    neighborhood: f64,
    settings: StabilitySettings,
) -> Result<Stability> {
    if !neighborhood.is_finite() || neighborhood <= 0.0 {
        bail!("neighborhood must be positive and finite (got {}).", neighborhood);
    }
    if !xfix.is_finite() {
        bail!("Fixed point must be finite (got {}).", xfix);
    }
    if settings.max_iter == 0 {
        bail!("max_iter must be greater than zero.");
    }
    if settings.xtol < 0.0 {
        bail!("xtol must be non-negative.");
    }

    let left = approaches(system, xfix, xfix - neighborhood, settings);
    let right = approaches(system, xfix, xfix + neighborhood, settings);
    tracing::debug!(xfix, neighborhood, left, right, "classified fixed point");

    Ok(Stability {
        left_stable: left,
        right_stable: right,
    })
}

fn approaches(system: &impl Steppable, xfix: f64, seed: f64, settings: StabilitySettings) -> bool {
    let initial = (seed - xfix).abs();
    let mut t = 0.0;
    let mut x = seed;
    for _ in 0..settings.max_iter {
        x = system.step(&mut t, x);
        if !x.is_finite() {
            return false;
        }
        if (x - xfix).abs() < settings.xtol {
            break;
        }
    }
    // NaN compares false, so a lost trajectory counts as unstable.
    (x - xfix).abs() < initial
}
