//! Row-wise unit-norm scaling.
//!
//! Each entity row is rescaled to Euclidean length 1 so that companies
//! are compared by the *shape* of their daily movements, not by absolute
//! price scale (a $2000 stock moves more dollars per day than a $20 one).
//! Magnitude is deliberately discarded; direction is preserved.

use ndarray::Array2;

/// Threshold below which a row norm is treated as zero.
const ZERO_NORM_EPS: f64 = 1e-12;

/// Stateless row normalizer. Fitting is a no-op; only `transform`
/// does work, so the same instance can be reused across runs.
#[derive(Debug, Clone, Copy, Default)]
pub struct Normalizer;

impl Normalizer {
    pub fn new() -> Self {
        Self
    }

    /// Scales each row of `matrix` to unit L2 norm.
    ///
    /// All-zero rows (and rows with norm below epsilon) are returned
    /// unchanged rather than divided by zero.
    pub fn transform(&self, matrix: &Array2<f64>) -> Array2<f64> {
        let mut out = matrix.clone();
        for mut row in out.rows_mut() {
            let norm = row.iter().map(|v| v * v).sum::<f64>().sqrt();
            if norm > ZERO_NORM_EPS {
                row.mapv_inplace(|v| v / norm);
            }
        }
        out
    }
}
