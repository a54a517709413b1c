//! Principal component analysis via power iteration with deflation.
//!
//! The covariance matrix of `n` entities over `d` trading days is `d x d`
//! and never materialized: the power step applies `X^T (X v)` directly on
//! the centered matrix, which costs `O(n * d)` per iteration. Components
//! are extracted one at a time and kept orthonormal by re-orthogonalizing
//! the candidate against the components already found.
//!
//! The fitted mean and basis are frozen at fit time and reused for every
//! later `transform` call, including grid points during boundary
//! rendering. The basis is never recomputed on new data.

use crate::domain::errors::{ClusterError, Result};
use ndarray::{Array1, Array2};
use tracing::warn;

const MAX_POWER_ITERATIONS: usize = 500;
const CONVERGENCE_TOL: f64 = 1e-12;
/// Below this norm the covariance operator has annihilated the candidate:
/// no informative direction remains.
const RANK_EPS: f64 = 1e-12;

/// PCA configuration: the number of components to retain.
#[derive(Debug, Clone, Copy)]
pub struct Pca {
    n_components: usize,
}

/// A fitted PCA basis: per-column mean plus `n_components` orthonormal
/// directions (one per row of `components`).
#[derive(Debug, Clone)]
pub struct FittedPca {
    mean: Array1<f64>,
    /// `n_components x n_features`, rows orthonormal. A rank-deficient
    /// input leaves trailing rows all-zero (zero-variance padding).
    components: Array2<f64>,
    explained_variance: Vec<f64>,
}

impl Pca {
    pub fn new(n_components: usize) -> Self {
        Self { n_components }
    }

    /// Computes the mean and the top-`n_components` variance directions.
    ///
    /// Fails with [`ClusterError::InvalidComponentCount`] when there are
    /// fewer entities than requested components. If the data runs out of
    /// variance before `n_components` directions are found (rank-deficient
    /// input), the remaining directions are padded with zero vectors and a
    /// warning is logged, so downstream coordinates are 0.0 rather than NaN.
    pub fn fit(&self, matrix: &Array2<f64>) -> Result<FittedPca> {
        let (n_rows, n_cols) = matrix.dim();
        if self.n_components == 0 {
            return Err(ClusterError::InvalidParameter {
                name: "n_components",
                message: "must be at least 1",
            });
        }
        if n_rows < self.n_components {
            return Err(ClusterError::InvalidComponentCount {
                requested: self.n_components,
                n_rows,
            });
        }

        let mean = matrix
            .mean_axis(ndarray::Axis(0))
            .unwrap_or_else(|| Array1::zeros(n_cols));
        let centered = matrix - &mean.view().insert_axis(ndarray::Axis(0));

        // Column variances, used to pick deterministic starting vectors.
        let mut start_order: Vec<usize> = (0..n_cols).collect();
        let col_var: Vec<f64> = (0..n_cols)
            .map(|c| centered.column(c).iter().map(|v| v * v).sum::<f64>())
            .collect();
        start_order.sort_by(|&a, &b| {
            col_var[b]
                .partial_cmp(&col_var[a])
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let mut components = Array2::<f64>::zeros((self.n_components, n_cols));
        let mut explained_variance = vec![0.0; self.n_components];
        let mut found = 0usize;

        for j in 0..self.n_components {
            let Some(start) = starting_vector(&start_order, &components, found, n_cols) else {
                break;
            };
            match power_iterate(&centered, &components, found, start) {
                Some((direction, variance_scale)) => {
                    let divisor = if n_rows > 1 { (n_rows - 1) as f64 } else { 1.0 };
                    explained_variance[j] = variance_scale / divisor;
                    components.row_mut(j).assign(&direction);
                    found += 1;
                }
                None => break,
            }
        }

        if found < self.n_components {
            warn!(
                requested = self.n_components,
                found, "rank-deficient input: padding remaining PCA directions with zeros"
            );
        }

        Ok(FittedPca {
            mean,
            components,
            explained_variance,
        })
    }
}

/// Deterministic starting vector: the coordinate axis of highest residual
/// column variance that is not already spanned by the found components.
fn starting_vector(
    order: &[usize],
    components: &Array2<f64>,
    found: usize,
    n_cols: usize,
) -> Option<Array1<f64>> {
    for &col in order {
        let mut v = Array1::<f64>::zeros(n_cols);
        v[col] = 1.0;
        orthogonalize(&mut v, components, found);
        let norm = v.dot(&v).sqrt();
        if norm > RANK_EPS {
            v.mapv_inplace(|x| x / norm);
            return Some(v);
        }
    }
    None
}

/// Removes the projections of `v` onto the first `found` component rows.
fn orthogonalize(v: &mut Array1<f64>, components: &Array2<f64>, found: usize) {
    for i in 0..found {
        let basis = components.row(i);
        let proj = v.dot(&basis);
        v.zip_mut_with(&basis, |x, b| *x -= proj * b);
    }
}

/// Runs power iteration on the implicit covariance operator of `centered`,
/// deflated against the components already found.
///
/// Returns the unit direction and `||X v||^2` (variance up to the `n - 1`
/// divisor), or `None` when the residual variance is numerically zero.
fn power_iterate(
    centered: &Array2<f64>,
    components: &Array2<f64>,
    found: usize,
    mut v: Array1<f64>,
) -> Option<(Array1<f64>, f64)> {
    for _ in 0..MAX_POWER_ITERATIONS {
        // w = X^T (X v), without forming X^T X.
        let projected = centered.dot(&v);
        let mut w = centered.t().dot(&projected);
        orthogonalize(&mut w, components, found);

        let norm = w.dot(&w).sqrt();
        if norm < RANK_EPS {
            return None;
        }
        w.mapv_inplace(|x| x / norm);

        let alignment = v.dot(&w).abs();
        v = w;
        if 1.0 - alignment < CONVERGENCE_TOL {
            break;
        }
    }

    // Fix the sign so the largest-magnitude coordinate is positive; power
    // iteration only determines the direction up to sign.
    let (mut max_abs, mut max_idx) = (0.0, 0);
    for (i, &x) in v.iter().enumerate() {
        if x.abs() > max_abs {
            max_abs = x.abs();
            max_idx = i;
        }
    }
    if v[max_idx] < 0.0 {
        v.mapv_inplace(|x| -x);
    }

    let projected = centered.dot(&v);
    let variance_scale = projected.dot(&projected);
    Some((v, variance_scale))
}

impl FittedPca {
    /// Projects rows of `matrix` onto the fitted basis after centering
    /// with the fitted mean.
    pub fn transform(&self, matrix: &Array2<f64>) -> Result<Array2<f64>> {
        if matrix.ncols() != self.mean.len() {
            return Err(ClusterError::DimensionMismatch {
                expected: self.mean.len(),
                found: matrix.ncols(),
            });
        }
        let centered = matrix - &self.mean.view().insert_axis(ndarray::Axis(0));
        Ok(centered.dot(&self.components.t()))
    }

    /// Maps reduced coordinates back into the original space
    /// (reconstruction within the retained variance).
    pub fn inverse_transform(&self, reduced: &Array2<f64>) -> Result<Array2<f64>> {
        if reduced.ncols() != self.components.nrows() {
            return Err(ClusterError::DimensionMismatch {
                expected: self.components.nrows(),
                found: reduced.ncols(),
            });
        }
        Ok(reduced.dot(&self.components) + &self.mean.view().insert_axis(ndarray::Axis(0)))
    }

    pub fn n_components(&self) -> usize {
        self.components.nrows()
    }

    /// Orthonormal directions, one per row; zero rows mark padded
    /// zero-variance directions.
    pub fn components(&self) -> &Array2<f64> {
        &self.components
    }

    pub fn mean(&self) -> &Array1<f64> {
        &self.mean
    }

    /// Variance captured by each retained direction, in fit order.
    pub fn explained_variance(&self) -> &[f64] {
        &self.explained_variance
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn components_are_orthonormal() {
        let m = array![
            [2.0, 0.5, -1.0],
            [-1.0, 0.3, 2.0],
            [0.5, -0.8, 0.2],
            [1.5, 1.0, -0.5],
        ];
        let fitted = Pca::new(2).fit(&m).unwrap();

        let c0 = fitted.components().row(0);
        let c1 = fitted.components().row(1);
        assert!((c0.dot(&c0) - 1.0).abs() < 1e-9, "first component not unit");
        assert!((c1.dot(&c1) - 1.0).abs() < 1e-9, "second component not unit");
        assert!(c0.dot(&c1).abs() < 1e-9, "components not orthogonal");
    }

    #[test]
    fn variance_is_ordered_descending() {
        let m = array![
            [10.0, 0.1],
            [-10.0, -0.1],
            [9.0, 0.2],
            [-9.0, -0.2],
        ];
        let fitted = Pca::new(2).fit(&m).unwrap();
        let var = fitted.explained_variance();
        assert!(
            var[0] >= var[1],
            "first component should capture at least as much variance: {:?}",
            var
        );
        assert!(var[0] > 50.0, "dominant axis variance too small: {}", var[0]);
    }

    #[test]
    fn rank_two_data_reconstructs_exactly_from_two_components() {
        // Every row lies in span{[1,2,3,4], [1,0,1,0]}, so the centered
        // matrix has rank 2 and two components capture all variance.
        let m = array![
            [1.0, 2.0, 3.0, 4.0],
            [2.0, 4.0, 6.0, 8.0],
            [1.0, 0.0, 1.0, 0.0],
            [3.0, 4.0, 7.0, 8.0],
        ];
        let fitted = Pca::new(2).fit(&m).unwrap();
        let reduced = fitted.transform(&m).unwrap();
        let restored = fitted.inverse_transform(&reduced).unwrap();

        let residual: f64 = (&m - &restored).iter().map(|v| v * v).sum();
        assert!(
            residual < 1e-9,
            "rank-2 reconstruction should be lossless, residual {}",
            residual
        );
    }

    #[test]
    fn transform_reuses_fitted_basis_on_new_data() {
        let train = array![[1.0, 0.0], [-1.0, 0.0], [2.0, 0.0], [-2.0, 0.0]];
        let fitted = Pca::new(1).fit(&train).unwrap();

        // A point far outside the training extent still projects with the
        // stored mean and basis.
        let probe = array![[10.0, 0.0]];
        let out = fitted.transform(&probe).unwrap();
        assert!((out[[0, 0]].abs() - 10.0).abs() < 1e-9);
    }

    #[test]
    fn fewer_rows_than_components_is_an_error() {
        let m = array![[1.0, 2.0, 3.0]];
        let err = Pca::new(2).fit(&m).unwrap_err();
        assert!(matches!(
            err,
            ClusterError::InvalidComponentCount {
                requested: 2,
                n_rows: 1
            }
        ));
    }

    #[test]
    fn rank_deficient_input_pads_with_zero_direction() {
        // All rows identical: centered matrix is all zeros, zero informative
        // directions exist.
        let m = array![[1.0, 1.0], [1.0, 1.0], [1.0, 1.0]];
        let fitted = Pca::new(2).fit(&m).unwrap();

        let reduced = fitted.transform(&m).unwrap();
        for v in reduced.iter() {
            assert_eq!(*v, 0.0, "degenerate directions must project to 0.0");
        }
        assert_eq!(fitted.explained_variance(), &[0.0, 0.0]);
    }

    #[test]
    fn dimension_mismatch_is_rejected() {
        let m = array![[1.0, 2.0], [3.0, 4.0], [0.0, 1.0]];
        let fitted = Pca::new(1).fit(&m).unwrap();
        let bad = array![[1.0, 2.0, 3.0]];
        assert!(matches!(
            fitted.transform(&bad),
            Err(ClusterError::DimensionMismatch {
                expected: 2,
                found: 3
            })
        ));
    }
}
