//! Continuous parametric current paths with closed-form derivatives
//!
//! The integrated evaluator needs both l(t) and dl/dt. Each curve supplies
//! its derivative analytically, so the Biot-Savart integrand is exact up to
//! floating point and only the quadrature introduces error.

use nalgebra::{Point3, Vector3};
use std::f64::consts::{PI, TAU};

use crate::error::{ensure_finite, ensure_positive, FieldError, Result};
use crate::geometry::{Circle, LoopCurve};

/// A current path l(t) over a finite parameter interval.
pub trait ParametricCurve: Send + Sync {
    /// l(t)
    fn position(&self, t: f64) -> Point3<f64>;

    /// dl/dt
    fn tangent(&self, t: f64) -> Vector3<f64>;

    fn parameter_range(&self) -> (f64, f64) {
        (0.0, TAU)
    }

    /// Whether l(start) == l(end), i.e. the path can carry a steady current on its own.
    fn is_closed(&self) -> bool {
        true
    }

    /// `count` points over the closed parameter interval, end points included.
    fn sample(&self, count: usize) -> Vec<Point3<f64>> {
        let (start, end) = self.parameter_range();
        match count {
            0 => Vec::new(),
            1 => vec![self.position(start)],
            _ => {
                let step = (end - start) / (count - 1) as f64;
                (0..count).map(|k| self.position(start + k as f64 * step)).collect()
            }
        }
    }

    /// Polygon with `segments` vertices at evenly spaced parameters, end point excluded.
    fn discretize(&self, segments: usize) -> Result<LoopCurve> {
        if !self.is_closed() {
            return Err(FieldError::invalid(
                "only closed curves can be discretized into a current loop",
            ));
        }
        if segments < 2 {
            return Err(FieldError::invalid(format!(
                "segment count must be at least 2, got {}",
                segments
            )));
        }
        let (start, end) = self.parameter_range();
        let step = (end - start) / segments as f64;
        let points = (0..segments).map(|k| self.position(start + k as f64 * step)).collect();
        LoopCurve::from_points(points)
    }
}

impl ParametricCurve for Circle {
    fn position(&self, t: f64) -> Point3<f64> {
        self.point_at(t)
    }

    fn tangent(&self, t: f64) -> Vector3<f64> {
        self.tangent_at(t)
    }

    fn discretize(&self, segments: usize) -> Result<LoopCurve> {
        Circle::discretize(self, segments)
    }
}

/// Circle with a sinusoidally modulated radius in the xy-plane:
/// l(t) = R (1 + a sin(k t)) (cos t, sin t, 0).
#[derive(Debug, Clone, PartialEq)]
pub struct Rose {
    radius: f64,
    amplitude: f64,
    lobes: u32,
}

impl Rose {
    pub fn new(radius: f64, amplitude: f64, lobes: u32) -> Result<Self> {
        ensure_positive("radius", radius)?;
        ensure_finite("amplitude", amplitude)?;
        Ok(Self {
            radius,
            amplitude,
            lobes,
        })
    }

    fn modulation(&self, t: f64) -> (f64, f64) {
        let k = self.lobes as f64;
        let rho = self.radius * (1.0 + self.amplitude * (k * t).sin());
        let drho = self.radius * self.amplitude * k * (k * t).cos();
        (rho, drho)
    }
}

impl Default for Rose {
    fn default() -> Self {
        Self {
            radius: 1.0,
            amplitude: 0.75,
            lobes: 3,
        }
    }
}

impl ParametricCurve for Rose {
    fn position(&self, t: f64) -> Point3<f64> {
        let (rho, _) = self.modulation(t);
        Point3::new(rho * t.cos(), rho * t.sin(), 0.0)
    }

    fn tangent(&self, t: f64) -> Vector3<f64> {
        let (rho, drho) = self.modulation(t);
        let (s, c) = t.sin_cos();
        Vector3::new(drho * c - rho * s, drho * s + rho * c, 0.0)
    }
}

/// One turn of a helix rising through the xy-plane:
/// l(t) = (R cos t, R sin t, h (t - π)/π).
///
/// Open: only the integrated evaluator accepts it.
#[derive(Debug, Clone, PartialEq)]
pub struct Helix {
    radius: f64,
    pitch: f64,
}

impl Helix {
    pub fn new(radius: f64, pitch: f64) -> Result<Self> {
        ensure_positive("radius", radius)?;
        ensure_finite("pitch", pitch)?;
        Ok(Self { radius, pitch })
    }
}

impl ParametricCurve for Helix {
    fn position(&self, t: f64) -> Point3<f64> {
        Point3::new(
            self.radius * t.cos(),
            self.radius * t.sin(),
            self.pitch * (t - PI) / PI,
        )
    }

    fn tangent(&self, t: f64) -> Vector3<f64> {
        Vector3::new(-self.radius * t.sin(), self.radius * t.cos(), self.pitch / PI)
    }

    fn is_closed(&self) -> bool {
        self.pitch == 0.0
    }
}

/// Every curve the configuration layer can build.
#[derive(Debug, Clone, PartialEq)]
pub enum Curve {
    Circle(Circle),
    Rose(Rose),
    Helix(Helix),
}

impl Curve {
    pub fn name(&self) -> &'static str {
        match self {
            Curve::Circle(_) => "circle",
            Curve::Rose(_) => "rose",
            Curve::Helix(_) => "helix",
        }
    }

    fn inner(&self) -> &dyn ParametricCurve {
        match self {
            Curve::Circle(c) => c,
            Curve::Rose(r) => r,
            Curve::Helix(h) => h,
        }
    }
}

impl ParametricCurve for Curve {
    fn position(&self, t: f64) -> Point3<f64> {
        self.inner().position(t)
    }

    fn tangent(&self, t: f64) -> Vector3<f64> {
        self.inner().tangent(t)
    }

    fn parameter_range(&self) -> (f64, f64) {
        self.inner().parameter_range()
    }

    fn is_closed(&self) -> bool {
        self.inner().is_closed()
    }

    fn discretize(&self, segments: usize) -> Result<LoopCurve> {
        self.inner().discretize(segments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Central difference of l(t), to check the closed-form derivatives.
    fn numeric_tangent(curve: &dyn ParametricCurve, t: f64) -> Vector3<f64> {
        let h = 1e-6;
        (curve.position(t + h) - curve.position(t - h)) / (2.0 * h)
    }

    fn assert_tangent_matches(curve: &dyn ParametricCurve) {
        for k in 0..17 {
            let t = k as f64 * TAU / 17.0 + 0.1;
            let exact = curve.tangent(t);
            let approx = numeric_tangent(curve, t);
            assert!(
                (exact - approx).norm() < 1e-6 * (1.0 + exact.norm()),
                "tangent mismatch at t={}: {} vs {}",
                t,
                exact,
                approx
            );
        }
    }

    #[test]
    fn test_tangents_match_finite_differences() {
        assert_tangent_matches(&Rose::default());
        assert_tangent_matches(&Rose::new(2.0, -0.3, 5).unwrap());
        assert_tangent_matches(&Helix::new(1.0, 1.0).unwrap());
        let tilted = Circle::new(0.5).unwrap().with_normal(Vector3::new(0.0, 1.0, 1.0)).unwrap();
        assert_tangent_matches(&tilted);
    }

    #[test]
    fn test_rose_is_closed() {
        let rose = Rose::default();
        let start = rose.position(0.0);
        let end = rose.position(TAU);
        assert!((start - end).norm() < 1e-12);
        assert!(rose.is_closed());
    }

    #[test]
    fn test_rose_without_modulation_is_a_circle() {
        let rose = Rose::new(0.3, 0.0, 3).unwrap();
        let circle = Circle::new(0.3).unwrap();
        for k in 0..10 {
            let t = k as f64 * 0.6;
            assert!((rose.position(t) - circle.position(t)).norm() < 1e-15);
        }
    }

    #[test]
    fn test_sample_includes_both_ends() {
        let helix = Helix::new(1.0, 1.0).unwrap();
        let points = helix.sample(100);
        assert_eq!(points.len(), 100);
        assert!((points[0].z + 1.0).abs() < 1e-12);
        assert!((points[99].z - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_open_curve_cannot_be_discretized() {
        let helix = Curve::Helix(Helix::new(1.0, 1.0).unwrap());
        assert!(!helix.is_closed());
        assert!(helix.discretize(50).unwrap_err().is_invalid_input());
    }

    #[test]
    fn test_discretized_rose_has_requested_vertices() {
        let rose = Curve::Rose(Rose::default());
        let polygon = rose.discretize(64).unwrap();
        assert_eq!(polygon.len(), 64);
        assert_eq!(polygon.points()[0], rose.position(0.0));
        assert!(rose.discretize(1).is_err());
    }
}
