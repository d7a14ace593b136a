//! Closed-form on-axis field of a circular loop, for validating evaluators

use serde::Serialize;

use crate::evaluator::{FieldEvaluator, PhysicalConstants};
use crate::geometry::Circle;

/// B along the symmetry axis at signed distance `z` from the center:
/// μ₀ I R² / (2 (R² + z²)^(3/2)), directed along the loop normal.
pub fn on_axis_field(radius: f64, current: f64, z: f64, constants: &PhysicalConstants) -> f64 {
    let r2 = radius * radius;
    constants.mu0 * current * r2 / (2.0 * (r2 + z * z).powf(1.5))
}

/// μ₀ I / 2R
pub fn center_field(radius: f64, current: f64, constants: &PhysicalConstants) -> f64 {
    constants.mu0 * current / (2.0 * radius)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AxisSample {
    pub distance: f64,
    /// Evaluated field projected on the loop normal
    pub numeric: f64,
    pub analytic: f64,
    pub relative_error: f64,
}

/// Evaluator output against the closed form along the axis of `circle`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AxisComparison {
    pub samples: Vec<AxisSample>,
}

impl AxisComparison {
    pub fn max_relative_error(&self) -> f64 {
        self.samples.iter().map(|s| s.relative_error).fold(0.0, f64::max)
    }
}

pub fn compare_on_axis(
    evaluator: &dyn FieldEvaluator,
    circle: &Circle,
    current: f64,
    constants: &PhysicalConstants,
    distances: &[f64],
) -> AxisComparison {
    let points: Vec<_> = distances.iter().map(|&d| circle.axis_point(d)).collect();
    let evaluated = evaluator.evaluate(&points);
    let normal = circle.normal();

    let samples = distances
        .iter()
        .zip(evaluated.vectors())
        .map(|(&distance, b)| {
            let numeric = b.dot(&normal);
            let analytic = on_axis_field(circle.radius(), current, distance, constants);
            AxisSample {
                distance,
                numeric,
                analytic,
                relative_error: ((numeric - analytic) / analytic).abs(),
            }
        })
        .collect();

    AxisComparison { samples }
}
