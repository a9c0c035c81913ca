//! Text rendering of the phase line.
//!
//! A diagram is two lines: the phase line itself, with `*` at each fixed
//! point and arrows showing the direction of flow, and a label line with
//! each coordinate starting beneath its marker.
//!
//! ```text
//! ------<-----*---------->------------>----------*-----<------
//!             0                                  0.6
//! ```

use crate::stability::Stability;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

pub const MIN_SIZE: usize = 20;

const LINE: char = '-';
const MARKER: char = '*';
const RIGHT: char = '>';
const LEFT: char = '<';

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PhaseDiagramConfig {
    /// Width of the phase line in characters.
    pub size: usize,
    /// Margin kept free of markers at each end. Must lie between 10% and
    /// 25% of `size`.
    pub offset: usize,
}

impl Default for PhaseDiagramConfig {
    fn default() -> Self {
        Self {
            size: 60,
            offset: 12,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PhaseDiagramError {
    #[error("xfix and xstable must have the same length (got {fixed} and {stability})")]
    LengthMismatch { fixed: usize, stability: usize },
    #[error("size must be at least 20 (got {0})")]
    SizeTooSmall(usize),
    #[error("offset must be at least 1")]
    OffsetTooSmall,
    #[error("offset must be between 10% and 25% of size (got {offset} for size {size})")]
    OffsetOutOfRange { offset: usize, size: usize },
    #[error("fixed point {0} is not finite")]
    NonFinite(f64),
    #[error("{count} fixed points do not fit on a line with {capacity} free columns")]
    TooManyPoints { count: usize, capacity: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PhaseDiagram {
    pub line: String,
    pub labels: String,
}

impl fmt::Display for PhaseDiagram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\n{}", self.line, self.labels)
    }
}

/// Renders fixed points with stability arrows.
///
/// Left of a point the arrow is `>` when `left_stable` (flow towards the
/// point) and `<` otherwise; right of a point it is `<` when `right_stable`
/// and `>` otherwise. With no fixed points the result is a bare line.
pub fn phase_diagram(
    xfix: &[f64],
    xstable: &[Stability],
    config: PhaseDiagramConfig,
) -> Result<PhaseDiagram, PhaseDiagramError> {
    if xfix.len() != xstable.len() {
        return Err(PhaseDiagramError::LengthMismatch {
            fixed: xfix.len(),
            stability: xstable.len(),
        });
    }
    let points: Vec<(f64, Option<Stability>)> = xfix
        .iter()
        .copied()
        .zip(xstable.iter().copied().map(Some))
        .collect();
    render(points, config)
}

/// Renders fixed points and their labels without stability arrows.
pub fn fixed_point_diagram(
    xfix: &[f64],
    config: PhaseDiagramConfig,
) -> Result<PhaseDiagram, PhaseDiagramError> {
    render(xfix.iter().map(|&x| (x, None)).collect(), config)
}

fn validate(config: PhaseDiagramConfig) -> Result<(), PhaseDiagramError> {
    if config.size < MIN_SIZE {
        return Err(PhaseDiagramError::SizeTooSmall(config.size));
    }
    if config.offset < 1 {
        return Err(PhaseDiagramError::OffsetTooSmall);
    }
    let ratio = config.offset as f64 / config.size as f64;
    if !(0.1..=0.25).contains(&ratio) {
        return Err(PhaseDiagramError::OffsetOutOfRange {
            offset: config.offset,
            size: config.size,
        });
    }
    Ok(())
}

fn render(
    mut points: Vec<(f64, Option<Stability>)>,
    config: PhaseDiagramConfig,
) -> Result<PhaseDiagram, PhaseDiagramError> {
    validate(config)?;
    if let Some(&(x, _)) = points.iter().find(|(x, _)| !x.is_finite()) {
        return Err(PhaseDiagramError::NonFinite(x));
    }

    let mut line = vec![LINE; config.size];
    if points.is_empty() {
        return Ok(PhaseDiagram {
            line: line.into_iter().collect(),
            labels: String::new(),
        });
    }

    let lo = config.offset;
    let hi = config.size - 1 - config.offset;
    if points.len() > hi - lo + 1 {
        return Err(PhaseDiagramError::TooManyPoints {
            count: points.len(),
            capacity: hi - lo + 1,
        });
    }

    points.sort_by(|a, b| a.0.total_cmp(&b.0));
    let columns = place(&points, lo, hi);

    for &col in &columns {
        line[col] = MARKER;
    }

    let half = config.offset / 2;
    for (i, (&col, &(_, stability))) in columns.iter().zip(&points).enumerate() {
        let Some(stability) = stability else {
            continue;
        };
        let left_arrow = if stability.left_stable { RIGHT } else { LEFT };
        let right_arrow = if stability.right_stable { LEFT } else { RIGHT };

        let left_col = match i.checked_sub(1).map(|prev| columns[prev]) {
            None => Some(col - half),
            Some(prev) => inner_arrow_offset(col - prev).map(|step| col - step),
        };
        let right_col = match columns.get(i + 1) {
            None => Some(col + half),
            Some(&next) => inner_arrow_offset(next - col).map(|step| col + step),
        };

        if let Some(c) = left_col {
            line[c] = left_arrow;
        }
        if let Some(c) = right_col {
            line[c] = right_arrow;
        }
    }

    Ok(PhaseDiagram {
        line: line.into_iter().collect(),
        labels: label_line(&points, &columns),
    })
}

/// Maps sorted coordinates linearly onto `lo..=hi`, then nudges collisions
/// so every marker keeps its own column.
fn place(points: &[(f64, Option<Stability>)], lo: usize, hi: usize) -> Vec<usize> {
    let min = points[0].0;
    let max = points[points.len() - 1].0;
    let span = (hi - lo) as f64;

    let mut columns: Vec<usize> = points
        .iter()
        .map(|&(x, _)| {
            if max > min {
                lo + ((x - min) / (max - min) * span).round() as usize
            } else {
                (lo + hi) / 2
            }
        })
        .collect();

    for i in 1..columns.len() {
        if columns[i] <= columns[i - 1] {
            columns[i] = columns[i - 1] + 1;
        }
    }
    let last = columns.len() - 1;
    columns[last] = columns[last].min(hi);
    for i in (0..last).rev() {
        if columns[i] >= columns[i + 1] {
            columns[i] = columns[i + 1] - 1;
        }
    }
    columns
}

/// Distance from a marker to its arrow between two markers `gap` apart, or
/// `None` when the arrows would touch the markers or each other.
fn inner_arrow_offset(gap: usize) -> Option<usize> {
    (gap >= 3).then_some(gap / 3)
}

fn label_line(points: &[(f64, Option<Stability>)], columns: &[usize]) -> String {
    let mut labels: Vec<char> = Vec::new();
    let mut cursor = 0;
    for (&(x, _), &col) in points.iter().zip(columns) {
        let start = col.max(cursor);
        if labels.len() < start {
            labels.resize(start, ' ');
        }
        labels.extend(format_coordinate(x).chars());
        cursor = labels.len() + 1;
    }
    labels.into_iter().collect()
}

fn format_coordinate(x: f64) -> String {
    let text = format!("{x:.4}");
    let text = text.trim_end_matches('0').trim_end_matches('.');
    if text == "-0" {
        "0".to_string()
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stable() -> Stability {
        Stability {
            left_stable: true,
            right_stable: true,
        }
    }

    fn unstable() -> Stability {
        Stability {
            left_stable: false,
            right_stable: false,
        }
    }

    #[test]
    fn renders_logistic_phase_line() {
        let diagram =
            phase_diagram(&[0.0, 0.6], &[unstable(), stable()], PhaseDiagramConfig::default())
                .unwrap();
        assert_eq!(
            diagram.line,
            "------<-----*---------->------------>----------*-----<------"
        );
        assert_eq!(
            diagram.labels,
            "            0                                  0.6"
        );
        assert_eq!(diagram.line.len(), 60);
        assert_eq!(diagram.to_string(), format!("{}\n{}", diagram.line, diagram.labels));
    }

    #[test]
    fn sorts_points_before_drawing() {
        let forward =
            phase_diagram(&[0.0, 0.6], &[unstable(), stable()], PhaseDiagramConfig::default())
                .unwrap();
        let reversed =
            phase_diagram(&[0.6, 0.0], &[stable(), unstable()], PhaseDiagramConfig::default())
                .unwrap();
        assert_eq!(forward, reversed);
    }

    #[test]
    fn single_point_sits_in_the_middle() {
        let diagram = phase_diagram(&[20.0], &[stable()], PhaseDiagramConfig::default()).unwrap();
        assert_eq!(diagram.line.find('*'), Some(29));
        assert_eq!(diagram.line.find('>'), Some(23));
        assert_eq!(diagram.line.find('<'), Some(35));
        assert_eq!(diagram.labels.trim_start(), "20");
        assert_eq!(diagram.labels.find('2'), Some(29));
    }

    #[test]
    fn empty_input_gives_bare_line() {
        let diagram = phase_diagram(&[], &[], PhaseDiagramConfig::default()).unwrap();
        assert_eq!(diagram.line, "-".repeat(60));
        assert!(diagram.labels.is_empty());
    }

    #[test]
    fn close_points_get_distinct_columns() {
        let diagram = fixed_point_diagram(
            &[0.0, 0.0, 1.0, 1.0 - 1e-9],
            PhaseDiagramConfig::default(),
        )
        .unwrap();
        assert_eq!(diagram.line.matches('*').count(), 4);
        assert!(!diagram.line.contains('<'));
        assert!(!diagram.line.contains('>'));
        let last = diagram.line.rfind('*').unwrap();
        assert!(last <= 47);
    }

    #[test]
    fn overlapping_labels_are_shifted() {
        let diagram = fixed_point_diagram(
            &[1.25, 1.5, 100.0],
            PhaseDiagramConfig::default(),
        )
        .unwrap();
        assert!(diagram.labels.starts_with("            1.25 1.5"));
        assert!(diagram.labels.ends_with("100"));
    }

    #[test]
    fn rejects_mismatched_lengths() {
        let err = phase_diagram(&[0.0, 0.6], &[stable()], PhaseDiagramConfig::default())
            .expect_err("expected mismatch");
        assert_eq!(
            err,
            PhaseDiagramError::LengthMismatch {
                fixed: 2,
                stability: 1
            }
        );
        assert!(err.to_string().contains("same length"));
    }

    #[test]
    fn rejects_bad_geometry() {
        let cases = [
            (PhaseDiagramConfig { size: 10, offset: 2 }, PhaseDiagramError::SizeTooSmall(10)),
            (PhaseDiagramConfig { size: 60, offset: 0 }, PhaseDiagramError::OffsetTooSmall),
            (
                PhaseDiagramConfig { size: 60, offset: 3 },
                PhaseDiagramError::OffsetOutOfRange { offset: 3, size: 60 },
            ),
            (
                PhaseDiagramConfig { size: 60, offset: 20 },
                PhaseDiagramError::OffsetOutOfRange { offset: 20, size: 60 },
            ),
        ];
        for (config, expected) in cases {
            assert_eq!(phase_diagram(&[0.0], &[stable()], config), Err(expected));
        }
    }

    #[test]
    fn rejects_non_finite_points() {
        assert_eq!(
            fixed_point_diagram(&[f64::INFINITY], PhaseDiagramConfig::default()),
            Err(PhaseDiagramError::NonFinite(f64::INFINITY))
        );
    }

    #[test]
    fn formats_coordinates_compactly() {
        assert_eq!(format_coordinate(0.6000000000000001), "0.6");
        assert_eq!(format_coordinate(-1e-12), "0");
        assert_eq!(format_coordinate(20.0), "20");
        assert_eq!(format_coordinate(-1.32471795), "-1.3247");
    }
}
