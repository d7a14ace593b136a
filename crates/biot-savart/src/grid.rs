//! Sample point layouts: regular 3D grids, planar slices and lines

use nalgebra::{Point3, Unit, Vector3};
use serde::{Deserialize, Serialize};

use crate::error::{FieldError, Result};

/// Most sample points one grid or slice may hold.
pub const MAX_SAMPLES: usize = 1 << 27;

/// `count` evenly spaced values from `min` to `max`, both included.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AxisRange {
    pub min: f64,
    pub max: f64,
    pub count: usize,
}

impl AxisRange {
    pub fn new(min: f64, max: f64, count: usize) -> Self {
        Self { min, max, count }
    }

    pub fn validate(&self, axis: &str) -> Result<()> {
        if !(self.min.is_finite() && self.max.is_finite()) {
            return Err(FieldError::invalid(format!("{} bounds must be finite", axis)));
        }
        if self.min > self.max {
            return Err(FieldError::invalid(format!(
                "{} bounds are inverted: min {} > max {}",
                axis, self.min, self.max
            )));
        }
        if self.count == 0 {
            return Err(FieldError::invalid(format!("{} needs at least one sample", axis)));
        }
        Ok(())
    }

    pub fn values(&self) -> Vec<f64> {
        if self.count == 1 {
            return vec![self.min];
        }
        let step = (self.max - self.min) / (self.count - 1) as f64;
        (0..self.count)
            .map(|i| if i + 1 == self.count { self.max } else { self.min + i as f64 * step })
            .collect()
    }

    pub fn scaled(&self, factor: f64) -> Self {
        Self::new(self.min * factor, self.max * factor, self.count)
    }
}

/// Regular 3D lattice of sample points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SampleGrid {
    pub x: AxisRange,
    pub y: AxisRange,
    pub z: AxisRange,
}

impl Default for SampleGrid {
    fn default() -> Self {
        Self {
            x: AxisRange::new(-0.5, 0.5, 10),
            y: AxisRange::new(-0.5, 0.5, 10),
            z: AxisRange::new(-0.3, 0.3, 6),
        }
    }
}

impl SampleGrid {
    /// Cube `[-half_extent, half_extent]^3` with `count` samples per axis.
    pub fn cube(half_extent: f64, count: usize) -> Self {
        let axis = AxisRange::new(-half_extent, half_extent, count);
        Self {
            x: axis,
            y: axis,
            z: axis,
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.x.validate("grid x")?;
        self.y.validate("grid y")?;
        self.z.validate("grid z")?;
        match self.checked_len() {
            Some(n) if n <= MAX_SAMPLES => Ok(()),
            _ => Err(FieldError::invalid(format!(
                "grid of {} x {} x {} samples exceeds the limit of {}",
                self.x.count, self.y.count, self.z.count, MAX_SAMPLES
            ))),
        }
    }

    /// Sample count, `None` if it does not fit in `usize`.
    pub fn checked_len(&self) -> Option<usize> {
        self.x.count.checked_mul(self.y.count)?.checked_mul(self.z.count)
    }

    /// Sample count, saturating at `usize::MAX`.
    pub fn len(&self) -> usize {
        self.checked_len().unwrap_or(usize::MAX)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All grid points, x varying fastest, then y, then z.
    pub fn points(&self) -> Vec<Point3<f64>> {
        let xs = self.x.values();
        let ys = self.y.values();
        let zs = self.z.values();
        let mut points = Vec::with_capacity(self.checked_len().unwrap_or(0).min(MAX_SAMPLES));
        for &z in &zs {
            for &y in &ys {
                for &x in &xs {
                    points.push(Point3::new(x, y, z));
                }
            }
        }
        points
    }

    pub fn scaled(&self, factor: f64) -> Self {
        Self {
            x: self.x.scaled(factor),
            y: self.y.scaled(factor),
            z: self.z.scaled(factor),
        }
    }
}

/// Orientation of a planar slice.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaneType {
    /// Plane at y = offset
    XZ,
    /// Plane at z = offset
    XY,
    /// Plane at x = offset
    YZ,
}

/// Rectangular sampling of one coordinate plane.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlaneSlice {
    pub plane: PlaneType,
    /// Position along the plane normal
    pub offset: f64,
    pub axis1: AxisRange,
    pub axis2: AxisRange,
}

impl PlaneSlice {
    pub fn validate(&self) -> Result<()> {
        if !self.offset.is_finite() {
            return Err(FieldError::invalid("slice offset must be finite"));
        }
        self.axis1.validate("slice axis 1")?;
        self.axis2.validate("slice axis 2")?;
        match self.axis1.count.checked_mul(self.axis2.count) {
            Some(n) if n <= MAX_SAMPLES => Ok(()),
            _ => Err(FieldError::invalid(format!(
                "slice of {} x {} samples exceeds the limit of {}",
                self.axis1.count, self.axis2.count, MAX_SAMPLES
            ))),
        }
    }

    /// Map in-plane coordinates to a 3D point.
    pub fn to_point(&self, a1: f64, a2: f64) -> Point3<f64> {
        match self.plane {
            PlaneType::XZ => Point3::new(a1, self.offset, a2),
            PlaneType::XY => Point3::new(a1, a2, self.offset),
            PlaneType::YZ => Point3::new(self.offset, a1, a2),
        }
    }

    /// Components of `b` lying in the plane, in axis order.
    pub fn in_plane(&self, b: &Vector3<f64>) -> (f64, f64) {
        match self.plane {
            PlaneType::XZ => (b.x, b.z),
            PlaneType::XY => (b.x, b.y),
            PlaneType::YZ => (b.y, b.z),
        }
    }

    /// Points row by row: axis 1 varies fastest.
    pub fn points(&self) -> Vec<Point3<f64>> {
        let a1 = self.axis1.values();
        let a2 = self.axis2.values();
        a2.iter()
            .flat_map(|&v| a1.iter().map(move |&u| (u, v)))
            .map(|(u, v)| self.to_point(u, v))
            .collect()
    }
}

/// Samples along a straight line `origin + s * direction` for s in `range`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisLine {
    pub origin: Point3<f64>,
    pub direction: Vector3<f64>,
    pub range: AxisRange,
}

impl AxisLine {
    /// Points along the line; `direction` is normalized and must be finite and non-zero.
    pub fn points(&self) -> Result<Vec<Point3<f64>>> {
        self.range.validate("line")?;
        let direction = Unit::try_new(self.direction, 1e-12)
            .filter(|d| d.iter().all(|c| c.is_finite()))
            .ok_or_else(|| {
                FieldError::invalid("line direction must be a finite, non-zero vector")
            })?;
        Ok(self
            .range
            .values()
            .into_iter()
            .map(|s| self.origin + direction.as_ref() * s)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_axis_values_include_end_points() {
        let axis = AxisRange::new(-0.5, 0.5, 10);
        let values = axis.values();
        assert_eq!(values.len(), 10);
        assert_eq!(values[0], -0.5);
        assert_eq!(values[9], 0.5);
        assert_eq!(AxisRange::new(2.0, 3.0, 1).values(), vec![2.0]);
    }

    #[test]
    fn test_grid_point_order() {
        let grid = SampleGrid {
            x: AxisRange::new(0.0, 1.0, 2),
            y: AxisRange::new(0.0, 1.0, 2),
            z: AxisRange::new(0.0, 1.0, 2),
        };
        let points = grid.points();
        assert_eq!(points.len(), 8);
        assert_eq!(points[0], Point3::new(0.0, 0.0, 0.0));
        assert_eq!(points[1], Point3::new(1.0, 0.0, 0.0));
        assert_eq!(points[2], Point3::new(0.0, 1.0, 0.0));
        assert_eq!(points[4], Point3::new(0.0, 0.0, 1.0));
    }

    #[test]
    fn test_default_grid_matches_script_layout() {
        let grid = SampleGrid::default();
        assert!(grid.validate().is_ok());
        assert_eq!(grid.len(), 600);
        assert_eq!(grid.points().len(), 600);
    }

    #[test]
    fn test_malformed_bounds_are_rejected() {
        let mut grid = SampleGrid::default();
        grid.y = AxisRange::new(1.0, -1.0, 4);
        let err = grid.validate().unwrap_err();
        assert!(err.is_invalid_input());
        assert!(err.to_string().contains("grid y"));

        grid.y = AxisRange::new(-1.0, 1.0, 0);
        assert!(grid.validate().is_err());

        grid.y = AxisRange::new(f64::NAN, 1.0, 3);
        assert!(grid.validate().is_err());
    }

    #[test]
    fn test_slice_maps_axes_per_plane() {
        let slice = PlaneSlice {
            plane: PlaneType::YZ,
            offset: 0.25,
            axis1: AxisRange::new(-1.0, 1.0, 3),
            axis2: AxisRange::new(0.0, 2.0, 2),
        };
        let points = slice.points();
        assert_eq!(points.len(), 6);
        assert_eq!(points[0], Point3::new(0.25, -1.0, 0.0));
        assert_eq!(points[5], Point3::new(0.25, 1.0, 2.0));
        assert_eq!(slice.in_plane(&Vector3::new(1.0, 2.0, 3.0)), (2.0, 3.0));
    }

    #[test]
    fn test_axis_line_uses_unit_direction() {
        let line = AxisLine {
            origin: Point3::new(0.0, 0.0, 1.0),
            direction: Vector3::new(0.0, 0.0, 2.0),
            range: AxisRange::new(0.0, 1.0, 3),
        };
        let points = line.points().unwrap();
        assert_eq!(points[2], Point3::new(0.0, 0.0, 2.0));
    }

    #[test]
    fn test_axis_line_rejects_zero_direction() {
        let line = AxisLine {
            origin: Point3::origin(),
            direction: Vector3::zeros(),
            range: AxisRange::new(0.0, 1.0, 3),
        };
        assert!(line.points().unwrap_err().is_invalid_input());
    }

    #[test]
    fn test_oversized_grid_is_rejected() {
        let axis = AxisRange::new(-1.0, 1.0, 1 << 22);
        let grid = SampleGrid { x: axis, y: axis, z: axis };
        assert_eq!(grid.checked_len(), None);
        assert_eq!(grid.len(), usize::MAX);
        assert!(grid.validate().unwrap_err().is_invalid_input());

        // Fits in usize but is still far too many points
        let axis = AxisRange::new(-1.0, 1.0, 1 << 10);
        let grid = SampleGrid { x: axis, y: axis, z: axis };
        assert_eq!(grid.checked_len(), Some(1 << 30));
        assert!(grid.validate().is_err());

        let slice = PlaneSlice {
            plane: PlaneType::XY,
            offset: 0.0,
            axis1: AxisRange::new(-1.0, 1.0, usize::MAX),
            axis2: AxisRange::new(-1.0, 1.0, 2),
        };
        assert!(slice.validate().unwrap_err().is_invalid_input());
    }
}
