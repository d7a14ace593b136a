//! Closed polygonal current loops and the circular loop discretizer

use nalgebra::{Point3, Rotation3, Unit, Vector3};
use std::f64::consts::{PI, TAU};

use crate::error::{ensure_finite, ensure_positive, FieldError, Result};

/// One straight piece of a discretized loop.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    /// Average of the two end points
    pub midpoint: Point3<f64>,
    /// End point minus start point (current flows along this vector)
    pub displacement: Vector3<f64>,
}

/// Ordered points of a closed polygon; the last point connects back to the first.
#[derive(Debug, Clone, PartialEq)]
pub struct LoopCurve {
    points: Vec<Point3<f64>>,
}

impl LoopCurve {
    /// Build a loop from its vertices. At least two finite points are required.
    pub fn from_points(points: Vec<Point3<f64>>) -> Result<Self> {
        if points.len() < 2 {
            return Err(FieldError::invalid(format!(
                "a closed loop needs at least 2 points, got {}",
                points.len()
            )));
        }
        if let Some(i) = points.iter().position(|p| !p.coords.iter().all(|c| c.is_finite())) {
            return Err(FieldError::invalid(format!("loop point {} is not finite", i)));
        }
        Ok(Self { points })
    }

    /// Circle of `radius` in the xy-plane centered at the origin with `segments` vertices.
    pub fn circle(radius: f64, segments: usize) -> Result<Self> {
        Circle::new(radius)?.discretize(segments)
    }

    pub fn points(&self) -> &[Point3<f64>] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Segments between cyclically consecutive points, one per point.
    pub fn segments(&self) -> impl Iterator<Item = Segment> + '_ {
        let n = self.points.len();
        (0..n).map(move |i| {
            let start = self.points[i];
            let end = self.points[(i + 1) % n];
            Segment {
                midpoint: nalgebra::center(&start, &end),
                displacement: end - start,
            }
        })
    }

    /// Vertices with the first point repeated at the end, for drawing.
    pub fn closed_polyline(&self) -> Vec<Point3<f64>> {
        let mut polyline = self.points.clone();
        polyline.push(self.points[0]);
        polyline
    }

    /// Total length of the polygon.
    pub fn perimeter(&self) -> f64 {
        self.segments().map(|s| s.displacement.norm()).sum()
    }
}

/// Circular loop placed by its center and the normal of its plane.
///
/// Current circulates counter-clockwise when viewed from the tip of the
/// normal, so the field at the center points along the normal.
#[derive(Debug, Clone, PartialEq)]
pub struct Circle {
    radius: f64,
    center: Point3<f64>,
    normal: Unit<Vector3<f64>>,
    /// In-plane basis: points are center + R (cos θ u + sin θ v)
    u: Vector3<f64>,
    v: Vector3<f64>,
}

impl Circle {
    /// Circle in the xy-plane, centered at the origin, normal along +z.
    pub fn new(radius: f64) -> Result<Self> {
        ensure_positive("radius", radius)?;
        Ok(Self {
            radius,
            center: Point3::origin(),
            normal: Vector3::z_axis(),
            u: Vector3::x(),
            v: Vector3::y(),
        })
    }

    pub fn with_center(mut self, center: Point3<f64>) -> Result<Self> {
        for c in center.iter() {
            ensure_finite("center coordinate", *c)?;
        }
        self.center = center;
        Ok(self)
    }

    /// Reorient the loop so its plane is perpendicular to `normal`.
    pub fn with_normal(mut self, normal: Vector3<f64>) -> Result<Self> {
        let normal = Unit::try_new(normal, 1e-12)
            .filter(|n| n.iter().all(|c| c.is_finite()))
            .ok_or_else(|| FieldError::invalid("loop normal must be a finite, non-zero vector"))?;

        // Rotation taking +z onto the normal; antiparallel has no unique
        // minimal rotation, so flip about x.
        let rotation = Rotation3::rotation_between(&Vector3::z(), normal.as_ref())
            .unwrap_or_else(|| Rotation3::from_axis_angle(&Vector3::x_axis(), PI));

        self.u = rotation * Vector3::x();
        self.v = rotation * Vector3::y();
        self.normal = normal;
        Ok(self)
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }

    pub fn center(&self) -> Point3<f64> {
        self.center
    }

    pub fn normal(&self) -> Vector3<f64> {
        self.normal.into_inner()
    }

    /// Point on the circle at angle `theta`.
    pub fn point_at(&self, theta: f64) -> Point3<f64> {
        self.center + (self.u * theta.cos() + self.v * theta.sin()) * self.radius
    }

    /// d/dθ of [`Circle::point_at`].
    pub fn tangent_at(&self, theta: f64) -> Vector3<f64> {
        (self.v * theta.cos() - self.u * theta.sin()) * self.radius
    }

    /// Point on the symmetry axis at signed distance `distance` from the center.
    pub fn axis_point(&self, distance: f64) -> Point3<f64> {
        self.center + self.normal.into_inner() * distance
    }

    /// Evenly spaced vertices at θ_k = 2πk/N, k = 0..N.
    pub fn discretize(&self, segments: usize) -> Result<LoopCurve> {
        if segments < 2 {
            return Err(FieldError::invalid(format!(
                "segment count must be at least 2, got {}",
                segments
            )));
        }
        let step = TAU / segments as f64;
        let points = (0..segments).map(|k| self.point_at(k as f64 * step)).collect();
        tracing::debug!("Discretized circle of radius {} into {} segments", self.radius, segments);
        LoopCurve::from_points(points)
    }
}
