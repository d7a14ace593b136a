//! Field samples: sample points paired with their B vectors

use nalgebra::{Point3, Vector3};
use serde::Serialize;

use crate::grid::{PlaneSlice, PlaneType};

/// Guard substituted for a distance below it, or added to a magnitude.
///
/// Keeps the arithmetic finite; the value produced at such a point is not
/// physically meaningful.
pub const EPSILON: f64 = 1e-20;

/// How a sample ran into the 1/r³ singularity of the Biot-Savart kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NumericSingularity {
    /// The sample coincided with a segment midpoint and |r| was replaced by [`EPSILON`]
    EpsilonSubstituted,
    /// Adaptive quadrature did not reach its tolerance
    Unconverged,
}

/// Field at one sample point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldValue {
    pub b: Vector3<f64>,
    pub singularity: Option<NumericSingularity>,
}

impl FieldValue {
    pub fn regular(b: Vector3<f64>) -> Self {
        Self { b, singularity: None }
    }
}

/// `b / (|b| + EPSILON)`: unit direction, zero for a zero field.
pub fn unit_vector(b: &Vector3<f64>) -> Vector3<f64> {
    b / (b.norm() + EPSILON)
}

/// Equal-length point and field arrays produced by one evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSamples {
    points: Vec<Point3<f64>>,
    vectors: Vec<Vector3<f64>>,
    singular: Vec<(usize, NumericSingularity)>,
}

impl FieldSamples {
    pub fn from_values(points: Vec<Point3<f64>>, values: Vec<FieldValue>) -> Self {
        assert_eq!(points.len(), values.len(), "one field value per sample point");
        let singular = values
            .iter()
            .enumerate()
            .filter_map(|(i, v)| v.singularity.map(|s| (i, s)))
            .collect();
        let vectors = values.into_iter().map(|v| v.b).collect();
        Self {
            points,
            vectors,
            singular,
        }
    }

    pub fn points(&self) -> &[Point3<f64>] {
        &self.points
    }

    /// Raw field vectors in tesla.
    pub fn vectors(&self) -> &[Vector3<f64>] {
        &self.vectors
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Indices of samples whose value is a numeric approximation near the curve.
    pub fn singular(&self) -> &[(usize, NumericSingularity)] {
        &self.singular
    }

    pub fn magnitudes(&self) -> Vec<f64> {
        self.vectors.iter().map(|b| b.norm()).collect()
    }

    /// Direction-only vectors, see [`unit_vector`].
    pub fn unit_vectors(&self) -> Vec<Vector3<f64>> {
        self.vectors.iter().map(unit_vector).collect()
    }

    pub fn max_magnitude(&self) -> f64 {
        self.vectors.iter().map(|b| b.norm()).fold(0.0, f64::max)
    }

    /// Column layout with `vectors` standing in for the field and coordinates
    /// multiplied by `length_scale`.
    pub fn columns_with(&self, vectors: &[Vector3<f64>], length_scale: f64) -> SampleColumns {
        assert_eq!(vectors.len(), self.points.len(), "one vector per sample point");
        let mut columns = SampleColumns::with_capacity(self.len());
        for ((p, v), b) in self.points.iter().zip(vectors).zip(&self.vectors) {
            columns.x.push(p.x * length_scale);
            columns.y.push(p.y * length_scale);
            columns.z.push(p.z * length_scale);
            columns.u.push(v.x);
            columns.v.push(v.y);
            columns.w.push(v.z);
            columns.magnitude.push(b.norm());
        }
        columns
    }

    /// Raw field in column layout.
    pub fn columns(&self) -> SampleColumns {
        self.columns_with(&self.vectors, 1.0)
    }
}

/// Flat per-component arrays, the shape plotting libraries consume.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SampleColumns {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub z: Vec<f64>,
    pub u: Vec<f64>,
    pub v: Vec<f64>,
    pub w: Vec<f64>,
    /// |B| of the raw field, regardless of what u/v/w hold
    pub magnitude: Vec<f64>,
}

impl SampleColumns {
    fn with_capacity(n: usize) -> Self {
        Self {
            x: Vec::with_capacity(n),
            y: Vec::with_capacity(n),
            z: Vec::with_capacity(n),
            u: Vec::with_capacity(n),
            v: Vec::with_capacity(n),
            w: Vec::with_capacity(n),
            magnitude: Vec::with_capacity(n),
        }
    }

    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }
}

/// In-plane field components on a rectangular slice, row by row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SliceField {
    pub plane: PlaneType,
    pub offset: f64,
    /// Samples along axis 1
    pub width: usize,
    /// Samples along axis 2
    pub height: usize,
    /// `[axis1_min, axis1_max, axis2_min, axis2_max]`
    pub bounds: [f64; 4],
    /// B component along axis 1
    pub b1: Vec<f64>,
    /// B component along axis 2
    pub b2: Vec<f64>,
    /// |B|, including the out-of-plane component
    pub magnitude: Vec<f64>,
}

impl SliceField {
    /// Collect evaluated `samples` taken at `slice.points()`.
    pub fn from_samples(slice: &PlaneSlice, samples: &FieldSamples) -> Self {
        let (b1, b2): (Vec<f64>, Vec<f64>) =
            samples.vectors().iter().map(|b| slice.in_plane(b)).unzip();
        Self {
            plane: slice.plane,
            offset: slice.offset,
            width: slice.axis1.count,
            height: slice.axis2.count,
            bounds: [slice.axis1.min, slice.axis1.max, slice.axis2.min, slice.axis2.max],
            b1,
            b2,
            magnitude: samples.magnitudes(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn samples() -> FieldSamples {
        FieldSamples::from_values(
            vec![Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 2.0, 3.0)],
            vec![
                FieldValue::regular(Vector3::new(3.0, 0.0, 4.0)),
                FieldValue {
                    b: Vector3::zeros(),
                    singularity: Some(NumericSingularity::EpsilonSubstituted),
                },
            ],
        )
    }

    #[test]
    fn test_unit_vectors_guard_zero_field() {
        let s = samples();
        let units = s.unit_vectors();
        assert!((units[0].norm() - 1.0).abs() < 1e-12);
        assert_eq!(units[1], Vector3::zeros());
        assert_eq!(s.magnitudes(), vec![5.0, 0.0]);
        assert_eq!(s.max_magnitude(), 5.0);
    }

    #[test]
    fn test_singular_indices_are_recorded() {
        let s = samples();
        assert_eq!(s.singular(), &[(1, NumericSingularity::EpsilonSubstituted)]);
    }

    #[test]
    fn test_columns_have_equal_length() {
        let columns = samples().columns_with(&samples().unit_vectors(), 1000.0);
        assert_eq!(columns.len(), 2);
        let rest = [&columns.y, &columns.z, &columns.u, &columns.v, &columns.w, &columns.magnitude];
        for col in rest {
            assert_eq!(col.len(), 2);
        }
        assert_eq!(columns.z[1], 3000.0);
        assert_eq!(columns.magnitude[0], 5.0);
        assert!((columns.w[0] - 0.8).abs() < 1e-12);
    }
}
