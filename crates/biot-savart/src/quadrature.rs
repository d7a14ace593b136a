//! Globally adaptive Gauss-Kronrod quadrature for vector-valued integrands
//!
//! The interval with the largest error estimate is bisected until the summed
//! error estimate drops below `max(epsabs, epsrel * |I|)` or the subinterval
//! budget is spent. `|.|` is the Euclidean norm of the integrand's value, so a
//! single adaptive run can integrate many field components at once.

use nalgebra::{DVector, Vector3};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::error::{FieldError, Result};

/// Positive nodes of the 15-point Kronrod rule; odd indices are the 7-point Gauss nodes.
const KRONROD_NODES: [f64; 8] = [
    0.991_455_371_120_812_6,
    0.949_107_912_342_758_5,
    0.864_864_423_359_769_1,
    0.741_531_185_599_394_4,
    0.586_087_235_467_691_1,
    0.405_845_151_377_397_2,
    0.207_784_955_007_898_5,
    0.0,
];

const KRONROD_WEIGHTS: [f64; 8] = [
    0.022_935_322_010_529_22,
    0.063_092_092_629_978_55,
    0.104_790_010_322_250_18,
    0.140_653_259_715_525_92,
    0.169_004_726_639_267_9,
    0.190_350_578_064_785_4,
    0.204_432_940_075_298_9,
    0.209_482_141_084_727_83,
];

/// Weights of the 7-point Gauss rule at `KRONROD_NODES[1, 3, 5, 7]`.
const GAUSS_WEIGHTS: [f64; 4] = [
    0.129_484_966_168_869_7,
    0.279_705_391_489_276_7,
    0.381_830_050_505_118_9,
    0.417_959_183_673_469_4,
];

/// Values the quadrature can accumulate.
pub trait QuadratureValue: Clone {
    /// Zero of the same shape as `self`
    fn zero_like(&self) -> Self;
    /// self += factor * other
    fn add_scaled(&mut self, factor: f64, other: &Self);
    fn magnitude(&self) -> f64;
}

impl QuadratureValue for f64 {
    fn zero_like(&self) -> Self {
        0.0
    }

    fn add_scaled(&mut self, factor: f64, other: &Self) {
        *self += factor * other;
    }

    fn magnitude(&self) -> f64 {
        self.abs()
    }
}

impl QuadratureValue for Vector3<f64> {
    fn zero_like(&self) -> Self {
        Vector3::zeros()
    }

    fn add_scaled(&mut self, factor: f64, other: &Self) {
        *self += other * factor;
    }

    fn magnitude(&self) -> f64 {
        self.norm()
    }
}

impl QuadratureValue for DVector<f64> {
    fn zero_like(&self) -> Self {
        DVector::zeros(self.len())
    }

    fn add_scaled(&mut self, factor: f64, other: &Self) {
        self.axpy(factor, other, 1.0);
    }

    fn magnitude(&self) -> f64 {
        self.norm()
    }
}

/// Tolerances and effort limit of the adaptive integration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct QuadratureConfig {
    /// Absolute error target
    pub epsabs: f64,
    /// Relative error target
    pub epsrel: f64,
    /// Maximum number of subintervals
    pub limit: usize,
}

impl Default for QuadratureConfig {
    fn default() -> Self {
        Self {
            epsabs: 1e-200,
            epsrel: 1e-8,
            limit: 10_000,
        }
    }
}

impl QuadratureConfig {
    pub fn validate(&self) -> Result<()> {
        let finite = self.epsabs.is_finite() && self.epsrel.is_finite();
        if !(finite && self.epsabs >= 0.0 && self.epsrel >= 0.0) {
            return Err(FieldError::invalid(format!(
                "quadrature tolerances must be finite and non-negative (epsabs={}, epsrel={})",
                self.epsabs, self.epsrel
            )));
        }
        if self.epsabs == 0.0 && self.epsrel == 0.0 {
            return Err(FieldError::invalid("at least one quadrature tolerance must be positive"));
        }
        if self.limit == 0 {
            return Err(FieldError::invalid("quadrature subinterval limit must be at least 1"));
        }
        Ok(())
    }
}

/// Result of an adaptive integration.
#[derive(Debug, Clone, PartialEq)]
pub struct QuadratureOutcome<T> {
    pub value: T,
    /// Summed Gauss/Kronrod difference over all subintervals
    pub error: f64,
    pub subintervals: usize,
    pub evaluations: usize,
    /// Whether the error target was met
    pub converged: bool,
}

struct Subinterval<T> {
    start: f64,
    end: f64,
    value: T,
    error: f64,
}

impl<T> PartialEq for Subinterval<T> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<T> Eq for Subinterval<T> {}

impl<T> PartialOrd for Subinterval<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Subinterval<T> {
    // Max-heap on error; earlier intervals first among equal errors
    fn cmp(&self, other: &Self) -> Ordering {
        self.error
            .total_cmp(&other.error)
            .then_with(|| other.start.total_cmp(&self.start))
    }
}

/// Apply the 7/15-point Gauss-Kronrod pair on `[start, end]`.
fn gauss_kronrod<T, F>(integrand: &F, start: f64, end: f64) -> Subinterval<T>
where
    T: QuadratureValue,
    F: Fn(f64) -> T,
{
    let half_width = 0.5 * (end - start);
    let center = 0.5 * (end + start);

    let center_value = integrand(center);
    let mut kronrod = center_value.zero_like();
    let mut gauss = center_value.zero_like();
    kronrod.add_scaled(KRONROD_WEIGHTS[7], &center_value);
    gauss.add_scaled(GAUSS_WEIGHTS[3], &center_value);

    for (i, (&node, &weight)) in KRONROD_NODES[..7].iter().zip(&KRONROD_WEIGHTS[..7]).enumerate() {
        let offset = half_width * node;
        let left = integrand(center - offset);
        let right = integrand(center + offset);
        kronrod.add_scaled(weight, &left);
        kronrod.add_scaled(weight, &right);
        if i % 2 == 1 {
            let gauss_weight = GAUSS_WEIGHTS[i / 2];
            gauss.add_scaled(gauss_weight, &left);
            gauss.add_scaled(gauss_weight, &right);
        }
    }

    let mut value = kronrod.zero_like();
    value.add_scaled(half_width, &kronrod);
    let mut difference = kronrod;
    difference.add_scaled(-1.0, &gauss);
    let error = half_width.abs() * difference.magnitude();

    Subinterval {
        start,
        end,
        value,
        // A non-finite estimate must never look converged
        error: if error.is_nan() { f64::INFINITY } else { error },
    }
}

fn sum_intervals<'a, T>(intervals: impl Iterator<Item = &'a Subinterval<T>>, shape: &T) -> (T, f64)
where
    T: QuadratureValue + 'a,
{
    let mut value = shape.zero_like();
    let mut error = 0.0;
    for interval in intervals {
        value.add_scaled(1.0, &interval.value);
        error += interval.error;
    }
    (value, error)
}

/// Integrate `integrand` over `[start, end]` to the tolerances in `config`.
///
/// Non-convergence is not an error: the best estimate is returned with
/// `converged == false`.
pub fn integrate<T, F>(
    integrand: F,
    start: f64,
    end: f64,
    config: &QuadratureConfig,
) -> Result<QuadratureOutcome<T>>
where
    T: QuadratureValue,
    F: Fn(f64) -> T,
{
    config.validate()?;
    if !(start.is_finite() && end.is_finite() && start < end) {
        return Err(FieldError::invalid(format!(
            "integration interval [{}, {}] must be finite with start < end",
            start, end
        )));
    }

    let first = gauss_kronrod(&integrand, start, end);
    let mut total = first.value.clone();
    let mut total_error = first.error;
    let mut evaluations = 15;
    let mut heap = BinaryHeap::new();
    heap.push(first);

    let mut converged = false;
    loop {
        let magnitude = total.magnitude();
        let tolerance = config.epsabs.max(config.epsrel * magnitude);
        if magnitude.is_finite() && total_error <= tolerance {
            converged = true;
            break;
        }
        if heap.len() >= config.limit {
            break;
        }

        let Some(worst) = heap.pop() else { break };
        let midpoint = 0.5 * (worst.start + worst.end);
        // No representable point left to split at
        if midpoint <= worst.start || midpoint >= worst.end {
            heap.push(worst);
            break;
        }

        let left = gauss_kronrod(&integrand, worst.start, midpoint);
        let right = gauss_kronrod(&integrand, midpoint, worst.end);
        evaluations += 30;

        total.add_scaled(-1.0, &worst.value);
        total.add_scaled(1.0, &left.value);
        total.add_scaled(1.0, &right.value);
        total_error += left.error + right.error - worst.error;

        heap.push(left);
        heap.push(right);

        // inf - inf poisons the running sums once a blown-up interval is split
        if !(total.magnitude().is_finite() && total_error.is_finite()) {
            (total, total_error) = sum_intervals(heap.iter(), &total);
        }
    }

    // Re-sum in interval order to shed the drift of the running update
    let mut intervals = heap.into_vec();
    intervals.sort_by(|a, b| a.start.total_cmp(&b.start));
    let (value, error) = sum_intervals(intervals.iter(), &total);

    Ok(QuadratureOutcome {
        value,
        error,
        subintervals: intervals.len(),
        evaluations,
        converged,
    })
}
