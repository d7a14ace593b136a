//! biot-savart: magnetic field of a current loop via the Biot-Savart law
//!
//! This crate provides:
//! - Closed polygonal and continuous parametric current paths
//! - Two interchangeable field evaluators (segment superposition and
//!   adaptive quadrature of the continuous integrand)
//! - Regular sampling grids, planar slices and on-axis comparison with the
//!   closed-form field of a circular loop
//! - A standalone HTML figure (plotly cone plot plus loop trace)
//!
//! Lengths are converted to meters before evaluation; fields are in tesla
//! unless μ₀ is set to the normalized value 4π.

pub mod analytic;
pub mod config;
pub mod curve;
pub mod error;
pub mod evaluator;
pub mod field;
pub mod geometry;
pub mod grid;
pub mod quadrature;
pub mod render;

pub use analytic::{compare_on_axis, on_axis_field, AxisComparison};
pub use config::{CurveConfig, LengthUnit, RunConfig};
pub use curve::{Curve, Helix, ParametricCurve, Rose};
pub use error::{FieldError, Result};
pub use evaluator::{
    DiscretizedEvaluator, FieldEvaluator, IntegratedEvaluator, Method, PhysicalConstants,
    QuadratureMode, MU0,
};
pub use field::{FieldSamples, FieldValue, NumericSingularity, SampleColumns, SliceField};
pub use geometry::{Circle, LoopCurve, Segment};
pub use grid::{AxisLine, AxisRange, PlaneSlice, PlaneType, SampleGrid};
pub use quadrature::{QuadratureConfig, QuadratureOutcome};
pub use render::{render_html, RenderConfig, VectorMode};

use nalgebra::Point3;
use std::path::Path;

/// Output of one pipeline run, ready for the renderer.
#[derive(Debug, Clone)]
pub struct FieldRun {
    pub method: Method,
    /// Unit the configuration was written in; used for display
    pub unit: LengthUnit,
    /// Meters per configured unit
    pub length_scale: f64,
    /// The current path as drawn, in meters
    pub polyline: Vec<Point3<f64>>,
    pub samples: FieldSamples,
}

impl FieldRun {
    /// Raw field arrays, coordinates back in the configured unit.
    pub fn columns(&self) -> SampleColumns {
        self.samples.columns_with(self.samples.vectors(), 1.0 / self.length_scale)
    }

    /// Write the raw sample arrays as JSON.
    pub fn write_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.columns())?;
        std::fs::write(path, json).map_err(|e| FieldError::io(path, e))
    }
}

/// Build the evaluator a configuration asks for, together with the polyline to draw.
pub fn build_evaluator(config: &RunConfig) -> Result<(Box<dyn FieldEvaluator>, Vec<Point3<f64>>)> {
    config.validate()?;
    let curve = config.curve.build(config.length_scale())?;
    let constants = config.constants();

    match config.method {
        Method::Discretized => {
            let polygon = curve.discretize(config.segments)?;
            let polyline = polygon.closed_polyline();
            let evaluator: Box<dyn FieldEvaluator> =
                Box::new(DiscretizedEvaluator::new(&polygon, config.current, constants)?);
            Ok((evaluator, polyline))
        }
        Method::Integrated => {
            let polyline = curve.sample(config.segments);
            let evaluator: Box<dyn FieldEvaluator> = Box::new(
                IntegratedEvaluator::new(curve, config.current, constants)?
                    .with_quadrature(config.quadrature)?
                    .with_mode(config.quadrature_mode),
            );
            Ok((evaluator, polyline))
        }
    }
}

/// Main entry point: validate the configuration, build the loop and evaluate the grid.
pub fn run(config: &RunConfig) -> Result<FieldRun> {
    let (evaluator, polyline) = build_evaluator(config)?;
    let grid = config.grid.scaled(config.length_scale());
    let points = grid.points();

    tracing::info!(
        "Evaluating the {:?} method at {} sample points",
        config.method,
        points.len()
    );
    let samples = evaluator.evaluate(&points);
    tracing::info!("Peak |B| on the grid: {:.4e}", samples.max_magnitude());

    Ok(FieldRun {
        method: config.method,
        unit: config.unit,
        length_scale: config.length_scale(),
        polyline,
        samples,
    })
}

/// Evaluate a planar slice with the configuration's evaluator, slice given in the configured unit.
pub fn run_slice(config: &RunConfig, slice: &PlaneSlice) -> Result<SliceField> {
    slice.validate()?;
    let (evaluator, _) = build_evaluator(config)?;
    let scale = config.length_scale();
    let scaled = PlaneSlice {
        offset: slice.offset * scale,
        axis1: slice.axis1.scaled(scale),
        axis2: slice.axis2.scaled(scale),
        ..*slice
    };
    let samples = evaluator.evaluate(&scaled.points());
    Ok(SliceField::from_samples(slice, &samples))
}
