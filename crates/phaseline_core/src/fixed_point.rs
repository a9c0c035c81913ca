use crate::traits::Steppable;
use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FixedPointSettings {
    /// Relative change between successive estimates that counts as converged.
    pub xtol: f64,
    pub max_iter: usize,
}

impl Default for FixedPointSettings {
    fn default() -> Self {
        Self {
            xtol: 1e-8,
            max_iter: 500,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FixedPointResult {
    pub value: f64,
    pub iterations: usize,
    /// False when the search ran out of iterations and `value` is only the
    /// best estimate seen.
    pub converged: bool,
}

/// Finds `x` with `step(x) == x`, starting from `x0`.
///
/// Uses Steffensen's method with Aitken's delta-squared acceleration. For a
/// `Flow` the fixed points of the step are the zeros of the derivative.
///
/// Running out of iterations is not an error: the last finite estimate is
/// returned with `converged = false`. Only invalid settings are rejected.
pub fn fixed_point(
    system: &impl Steppable,
    x0: f64,
    settings: FixedPointSettings,
) -> Result<FixedPointResult> {
    if settings.max_iter == 0 {
        bail!("max_iter must be greater than zero.");
    }
    if settings.xtol <= 0.0 {
        bail!("xtol must be positive.");
    }
    if !x0.is_finite() {
        bail!("Seed must be finite (got {}).", x0);
    }

    let mut t = 0.0;
    let mut p0 = x0;
    for iteration in 0..settings.max_iter {
        let p1 = system.step(&mut t, p0);
        let p2 = system.step(&mut t, p1);
        let d = p2 - 2.0 * p1 + p0;
        if d == 0.0 {
            // Aitken's step is undefined; p2 is only a fixed point if plain
            // iteration has stalled.
            let converged = relative_change(p0, p1).abs() < settings.xtol;
            if !converged {
                tracing::warn!(x0, estimate = p2, iteration, "fixed-point search stalled");
            }
            return Ok(FixedPointResult {
                value: p2,
                iterations: iteration + 1,
                converged,
            });
        }

        let p = p0 - (p1 - p0) * (p1 - p0) / d;
        if !p.is_finite() {
            tracing::warn!(x0, estimate = p0, iteration, "fixed-point update left the reals");
            return Ok(FixedPointResult {
                value: p0,
                iterations: iteration + 1,
                converged: false,
            });
        }

        if relative_change(p0, p).abs() < settings.xtol {
            return Ok(FixedPointResult {
                value: p,
                iterations: iteration + 1,
                converged: true,
            });
        }
        p0 = p;
    }

    tracing::warn!(
        x0,
        estimate = p0,
        max_iter = settings.max_iter,
        "fixed-point search did not converge"
    );
    Ok(FixedPointResult {
        value: p0,
        iterations: settings.max_iter,
        converged: false,
    })
}

/// Change from `from` to `to` relative to `from`, or absolute when `from` is zero.
fn relative_change(from: f64, to: f64) -> f64 {
    if from == 0.0 {
        to
    } else {
        (to - from) / from
    }
}

/// Runs `fixed_point` from every seed. Results are not deduplicated.
pub fn find_fixed_points(
    system: &impl Steppable,
    seeds: &[f64],
    settings: FixedPointSettings,
) -> Result<Vec<FixedPointResult>> {
    seeds
        .iter()
        .map(|&seed| fixed_point(system, seed, settings))
        .collect()
}

/// Sorts `values` and merges entries closer than `tol` to the previous kept
/// value. Non-finite values are dropped.
pub fn dedup_within(values: &[f64], tol: f64) -> Vec<f64> {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    sorted.sort_by(f64::total_cmp);

    let mut unique: Vec<f64> = Vec::with_capacity(sorted.len());
    for value in sorted {
        match unique.last() {
            Some(&last) if (value - last).abs() <= tol => {}
            _ => unique.push(value),
        }
    }
    unique
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solvers::{DiscreteMap, Euler, Flow, Rk4, SolverConfig};
    use crate::test_support::assert_err_contains;

    #[test]
    fn logistic_seeds_converge_to_known_points() {
        let map = DiscreteMap::new(|x: f64| 2.5 * x * (1.0 - x));
        let seeds = [-1.0, -0.1, 0.01, 0.5, 1.0];
        let results = find_fixed_points(&map, &seeds, FixedPointSettings::default()).unwrap();

        for result in &results {
            assert!(result.converged);
            assert!(result.value.abs() < 1e-6 || (result.value - 0.6).abs() < 1e-6);
        }

        let values: Vec<f64> = results.iter().map(|r| r.value).collect();
        let unique = dedup_within(&values, 1e-6);
        assert_eq!(unique.len(), 2);
        assert!(unique[0].abs() < 1e-6);
        assert!((unique[1] - 0.6).abs() < 1e-6);
    }

    #[test]
    fn captured_arguments_reach_the_map() {
        let (c1, c2) = (10.0, 2.0);
        let map = DiscreteMap::new(move |x: f64| (c1 / (x + c2)).sqrt());
        let result = fixed_point(&map, 1.2, FixedPointSettings::default()).unwrap();
        assert!(result.converged);
        assert!((result.value - 1.6542491578567586).abs() < 1e-9);
    }

    #[test]
    fn non_convergence_returns_best_estimate() {
        let map = DiscreteMap::new(|x: f64| 2.5 * x * (1.0 - x));
        let settings = FixedPointSettings {
            xtol: 1e-8,
            max_iter: 3,
        };
        let result = fixed_point(&map, 0.01, settings).unwrap();
        assert!(!result.converged);
        assert_eq!(result.iterations, 3);
        assert!(result.value.abs() < 1e-6);
    }

    #[test]
    fn cubic_without_attracting_point_exhausts_iterations() {
        let map = DiscreteMap::new(|x: f64| x.powi(3) + 1.0);
        let result = fixed_point(&map, 0.5, FixedPointSettings::default()).unwrap();
        assert!(!result.converged);
        assert_eq!(result.iterations, 500);
        assert!(result.value.is_finite());
    }

    #[test]
    fn map_without_fixed_point_is_not_reported_converged() {
        let map = DiscreteMap::new(|x: f64| x + 1.0);
        let result = fixed_point(&map, 0.0, FixedPointSettings::default()).unwrap();
        assert!(!result.converged);
        assert_eq!(result.value, 2.0);
    }

    #[test]
    fn flow_fixed_point_is_zero_of_derivative() {
        let deriv = |x: f64| 0.2 * (20.0 - x);
        for flow_result in [
            fixed_point(
                &Flow::new(deriv, Euler, SolverConfig { deltat: 2.0 }),
                3.0,
                FixedPointSettings::default(),
            ),
            fixed_point(
                &Flow::new(deriv, Rk4, SolverConfig { deltat: 0.5 }),
                3.0,
                FixedPointSettings::default(),
            ),
        ] {
            let result = flow_result.unwrap();
            assert!(result.converged);
            assert!((result.value - 20.0).abs() < 1e-8);
        }
    }

    #[test]
    fn rejects_invalid_settings() {
        let map = DiscreteMap::new(|x: f64| x);
        assert_err_contains(
            fixed_point(
                &map,
                0.5,
                FixedPointSettings {
                    xtol: 1e-8,
                    max_iter: 0,
                },
            ),
            "max_iter",
        );
        assert_err_contains(
            fixed_point(
                &map,
                0.5,
                FixedPointSettings {
                    xtol: -1.0,
                    max_iter: 10,
                },
            ),
            "xtol must be positive",
        );
        assert_err_contains(
            fixed_point(&map, f64::INFINITY, FixedPointSettings::default()),
            "Seed must be finite",
        );
    }

    #[test]
    fn dedup_within_merges_close_values() {
        let unique = dedup_within(&[0.6, 0.0, 0.6000000001, f64::NAN, -0.0, 0.3], 1e-6);
        assert_eq!(unique.len(), 3);
        assert_eq!(unique[1], 0.3);
    }
}
