//! Biot-Savart field evaluators
//!
//! Two interchangeable ways of computing B for a current path:
//!
//! - [`DiscretizedEvaluator`] sums `dl × r / |r|³` over the straight segments
//!   of a [`LoopCurve`], with `r` measured from each segment midpoint.
//! - [`IntegratedEvaluator`] integrates `dl/dt × (p - l(t)) / |p - l(t)|³`
//!   over the parameter of a continuous [`ParametricCurve`] with adaptive
//!   Gauss-Kronrod quadrature.
//!
//! Both scale by `μ₀ I / 4π` with μ₀ and I passed in explicitly.

use nalgebra::{DVector, Point3, Vector3};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

use crate::curve::ParametricCurve;
use crate::error::{ensure_finite, ensure_positive, Result};
use crate::field::{FieldSamples, FieldValue, NumericSingularity, EPSILON};
use crate::geometry::{LoopCurve, Segment};
use crate::quadrature::{integrate, QuadratureConfig, QuadratureOutcome};

/// Permeability of free space (H/m)
pub const MU0: f64 = 4.0 * PI * 1e-7;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhysicalConstants {
    /// Vacuum permeability μ₀
    pub mu0: f64,
}

impl Default for PhysicalConstants {
    fn default() -> Self {
        Self { mu0: MU0 }
    }
}

impl PhysicalConstants {
    /// μ₀ = 4π, which makes μ₀ I / 4π equal to I: the bare Biot-Savart integral.
    pub fn normalized() -> Self {
        Self { mu0: 4.0 * PI }
    }

    pub fn validate(&self) -> Result<()> {
        ensure_positive("mu0", self.mu0)
    }

    /// μ₀ I / 4π
    pub fn prefactor(&self, current: f64) -> f64 {
        self.mu0 * current / (4.0 * PI)
    }
}

/// Which evaluator produced a set of samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Method {
    Discretized,
    Integrated,
}

/// Computes the magnetic field of one current path at arbitrary points.
pub trait FieldEvaluator: Send + Sync {
    fn method(&self) -> Method;

    fn field_at(&self, point: &Point3<f64>) -> FieldValue;

    /// Field at every point, in input order. Points are independent and evaluated in parallel.
    fn evaluate(&self, points: &[Point3<f64>]) -> FieldSamples {
        let values: Vec<FieldValue> = points.par_iter().map(|p| self.field_at(p)).collect();
        let samples = FieldSamples::from_values(points.to_vec(), values);
        if !samples.singular().is_empty() {
            tracing::warn!(
                "{} of {} samples hit the Biot-Savart singularity; their values are approximate",
                samples.singular().len(),
                samples.len()
            );
        }
        samples
    }
}

/// Superposition of straight-segment contributions.
#[derive(Debug, Clone)]
pub struct DiscretizedEvaluator {
    segments: Vec<Segment>,
    current: f64,
    constants: PhysicalConstants,
}

impl DiscretizedEvaluator {
    pub fn new(curve: &LoopCurve, current: f64, constants: PhysicalConstants) -> Result<Self> {
        ensure_finite("current", current)?;
        constants.validate()?;
        Ok(Self {
            segments: curve.segments().collect(),
            current,
            constants,
        })
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn current(&self) -> f64 {
        self.current
    }
}

impl FieldEvaluator for DiscretizedEvaluator {
    fn method(&self) -> Method {
        Method::Discretized
    }

    fn field_at(&self, point: &Point3<f64>) -> FieldValue {
        let prefactor = self.constants.prefactor(self.current);
        let mut b = Vector3::zeros();
        let mut singularity = None;

        for segment in &self.segments {
            let r = point - segment.midpoint;
            let mut r_mag = r.norm();
            // Below EPSILON, r³ can underflow to zero
            if r_mag < EPSILON {
                r_mag = EPSILON;
                singularity = Some(NumericSingularity::EpsilonSubstituted);
            }
            b += segment.displacement.cross(&r) * (prefactor / (r_mag * r_mag * r_mag));
        }

        FieldValue { b, singularity }
    }
}

/// How the integrated evaluator spreads work over sample points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuadratureMode {
    /// One adaptive integral per sample point, points in parallel
    #[default]
    PerSample,
    /// A single adaptive integral over the stacked components of every sample
    Batch,
}

/// Adaptive quadrature of the continuous Biot-Savart integrand.
#[derive(Debug, Clone)]
pub struct IntegratedEvaluator<C> {
    curve: C,
    current: f64,
    constants: PhysicalConstants,
    quadrature: QuadratureConfig,
    mode: QuadratureMode,
}

impl<C: ParametricCurve> IntegratedEvaluator<C> {
    pub fn new(curve: C, current: f64, constants: PhysicalConstants) -> Result<Self> {
        ensure_finite("current", current)?;
        constants.validate()?;
        Ok(Self {
            curve,
            current,
            constants,
            quadrature: QuadratureConfig::default(),
            mode: QuadratureMode::default(),
        })
    }

    pub fn with_quadrature(mut self, quadrature: QuadratureConfig) -> Result<Self> {
        quadrature.validate()?;
        self.quadrature = quadrature;
        Ok(self)
    }

    pub fn with_mode(mut self, mode: QuadratureMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn curve(&self) -> &C {
        &self.curve
    }

    /// dB/dt at parameter `t` for the field point `point`.
    fn integrand(&self, t: f64, point: &Point3<f64>, prefactor: f64) -> Vector3<f64> {
        let separation = point - self.curve.position(t);
        let mut distance = separation.norm();
        if distance < EPSILON {
            distance = EPSILON;
        }
        self.curve.tangent(t).cross(&separation) * (prefactor / (distance * distance * distance))
    }

    /// Full quadrature outcome at one point, including error estimate and effort.
    pub fn integrate_at(&self, point: &Point3<f64>) -> Result<QuadratureOutcome<Vector3<f64>>> {
        let prefactor = self.constants.prefactor(self.current);
        let (start, end) = self.curve.parameter_range();
        integrate(|t| self.integrand(t, point, prefactor), start, end, &self.quadrature)
    }

    fn evaluate_batch(&self, points: &[Point3<f64>]) -> Result<Vec<FieldValue>> {
        let prefactor = self.constants.prefactor(self.current);
        let (start, end) = self.curve.parameter_range();
        let stacked = |t: f64| {
            let position = self.curve.position(t);
            let tangent = self.curve.tangent(t);
            let mut values = DVector::zeros(3 * points.len());
            for (i, point) in points.iter().enumerate() {
                let separation = point - position;
                let mut distance = separation.norm();
                if distance < EPSILON {
                    distance = EPSILON;
                }
                let db =
                    tangent.cross(&separation) * (prefactor / (distance * distance * distance));
                values.fixed_rows_mut::<3>(3 * i).copy_from(&db);
            }
            values
        };

        let outcome = integrate(stacked, start, end, &self.quadrature)?;
        tracing::debug!(
            "Batch quadrature over {} samples: {} subintervals, error {:.3e}",
            points.len(),
            outcome.subintervals,
            outcome.error
        );
        let singularity = (!outcome.converged).then_some(NumericSingularity::Unconverged);
        Ok((0..points.len())
            .map(|i| FieldValue {
                b: outcome.value.fixed_rows::<3>(3 * i).into_owned(),
                singularity,
            })
            .collect())
    }
}

impl<C: ParametricCurve> FieldEvaluator for IntegratedEvaluator<C> {
    fn method(&self) -> Method {
        Method::Integrated
    }

    fn field_at(&self, point: &Point3<f64>) -> FieldValue {
        // Interval and tolerances are validated at construction, so the only
        // outcome left is a (possibly unconverged) estimate.
        match self.integrate_at(point) {
            Ok(outcome) if outcome.converged && is_finite(&outcome.value) => {
                FieldValue::regular(outcome.value)
            }
            Ok(outcome) => {
                tracing::debug!(
                    "Quadrature did not converge at {:?} after {} subintervals (error {:.3e})",
                    point.coords.as_slice(),
                    outcome.subintervals,
                    outcome.error
                );
                FieldValue {
                    b: outcome.value,
                    singularity: Some(NumericSingularity::Unconverged),
                }
            }
            Err(err) => {
                tracing::error!("Quadrature rejected its input: {}", err);
                FieldValue {
                    b: Vector3::repeat(f64::NAN),
                    singularity: Some(NumericSingularity::Unconverged),
                }
            }
        }
    }

    fn evaluate(&self, points: &[Point3<f64>]) -> FieldSamples {
        match self.mode {
            QuadratureMode::PerSample => {
                let values: Vec<FieldValue> = points.par_iter().map(|p| self.field_at(p)).collect();
                let samples = FieldSamples::from_values(points.to_vec(), values);
                if !samples.singular().is_empty() {
                    tracing::warn!(
                        "Quadrature did not converge at {} of {} samples; \
                         they lie on or very near the curve",
                        samples.singular().len(),
                        samples.len()
                    );
                }
                samples
            }
            QuadratureMode::Batch if points.is_empty() => {
                FieldSamples::from_values(Vec::new(), Vec::new())
            }
            QuadratureMode::Batch => match self.evaluate_batch(points) {
                Ok(values) => {
                    if values.iter().any(|v| v.singularity.is_some()) {
                        tracing::warn!(
                            "Batch quadrature over {} samples did not converge",
                            points.len()
                        );
                    }
                    FieldSamples::from_values(points.to_vec(), values)
                }
                Err(err) => {
                    tracing::error!("Batch quadrature rejected its input: {}", err);
                    let values = points
                        .iter()
                        .map(|_| FieldValue {
                            b: Vector3::repeat(f64::NAN),
                            singularity: Some(NumericSingularity::Unconverged),
                        })
                        .collect();
                    FieldSamples::from_values(points.to_vec(), values)
                }
            },
        }
    }
}

fn is_finite(v: &Vector3<f64>) -> bool {
    v.iter().all(|c| c.is_finite())
}
