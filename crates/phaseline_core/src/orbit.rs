//! Orbits of one-dimensional systems.
//!
//! `iterate` is the single entry point for both maps and flows: wrap a map
//! in `DiscreteMap`, or bind a derivative to a solver with `Flow`, and the
//! same loop produces the trajectory.

use crate::traits::Steppable;
use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::ops::Deref;

/// Successive states produced by iteration, excluding the seed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trajectory {
    states: Vec<f64>,
}

impl Trajectory {
    pub fn into_vec(self) -> Vec<f64> {
        self.states
    }
}

impl Deref for Trajectory {
    type Target = [f64];

    fn deref(&self) -> &[f64] {
        &self.states
    }
}

/// Applies `system` `steps` times starting from `x0`.
///
/// The first element is the image of `x0`. Divergent orbits are returned as
/// they are; overflow shows up as infinite or NaN states, not as an error.
pub fn iterate(system: &impl Steppable, x0: f64, steps: usize) -> Trajectory {
    let mut states = Vec::with_capacity(steps);
    let mut t = 0.0;
    let mut x = x0;
    for _ in 0..steps {
        x = system.step(&mut t, x);
        states.push(x);
    }
    Trajectory { states }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct OscillationSettings {
    /// Two states closer than this count as a repeat.
    pub xtol: f64,
    /// Length of the orbit computed before the tail is inspected.
    pub max_iter: usize,
}

impl Default for OscillationSettings {
    fn default() -> Self {
        Self {
            xtol: 1e-4,
            max_iter: 500,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Oscillation {
    pub periodic: bool,
    /// Smallest detected period, 0 when no repeat was found.
    pub period: usize,
}

/// Checks whether the orbit of `x0` settles onto a cycle of length at most
/// `max_period`.
///
/// Only the last `2 * max_period - 1` states are examined and the first
/// state of that tail is compared against the following `max_period`
/// states. Transients longer than `settings.max_iter` or cycles that drift
/// slower than `settings.xtol` are not detected. A period of 1 means the
/// orbit converged to a fixed point.
pub fn is_oscillator(
    system: &impl Steppable,
    x0: f64,
    max_period: usize,
    settings: OscillationSettings,
) -> Result<Oscillation> {
    if max_period == 0 {
        bail!("max_period must be at least 1.");
    }
    if settings.xtol <= 0.0 {
        bail!("xtol must be positive.");
    }
    let tail_len = 2 * max_period - 1;
    if settings.max_iter < tail_len.max(max_period + 1) {
        bail!(
            "max_iter ({}) is too short to look for periods up to {}.",
            settings.max_iter,
            max_period
        );
    }

    let orbit = iterate(system, x0, settings.max_iter);
    let tail = &orbit[orbit.len() - tail_len.max(max_period + 1)..];

    for lag in 1..=max_period {
        if (tail[0] - tail[lag]).abs() < settings.xtol {
            tracing::debug!(x0, period = lag, "orbit settled onto a cycle");
            return Ok(Oscillation {
                periodic: true,
                period: lag,
            });
        }
    }

    Ok(Oscillation {
        periodic: false,
        period: 0,
    })
}
