//! Seeded K-Means (k-means++ initialization, Lloyd iterations).
//!
//! Seeding scheme: centroids are initialized with k-means++ driven by a
//! `StdRng` seeded from the configured `u64`, so the same data, seed and
//! configuration always produce the same centroids and labels. The seed
//! affects *which* symmetric solution is found, never its validity.

use crate::domain::errors::{ClusterError, Result};
use ndarray::{Array2, ArrayView1, ArrayView2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, warn};

/// Centroid movement below this is considered converged.
const SHIFT_EPS: f64 = 1e-10;

/// K-Means configuration.
#[derive(Debug, Clone, Copy)]
pub struct KMeans {
    n_clusters: usize,
    max_iterations: usize,
    seed: u64,
}

/// A fitted K-Means model: final centroids plus the training assignment.
#[derive(Debug, Clone)]
pub struct KMeansFit {
    /// `n_clusters x n_features`.
    centroids: Array2<f64>,
    labels: Vec<usize>,
    iterations: usize,
    converged: bool,
}

impl KMeans {
    pub fn new(n_clusters: usize, max_iterations: usize, seed: u64) -> Self {
        Self {
            n_clusters,
            max_iterations,
            seed,
        }
    }

    /// Partitions the rows of `data` into `n_clusters` groups.
    ///
    /// Assignment uses squared Euclidean distance with exact ties broken
    /// by the lowest centroid index. A centroid left with zero assigned
    /// rows is reinitialized to the point farthest from its nearest
    /// surviving centroid. Hitting `max_iterations` without convergence
    /// is reported via a warning and the `converged` flag, not an error.
    pub fn fit(&self, data: &Array2<f64>) -> Result<KMeansFit> {
        let n_rows = data.nrows();
        if self.n_clusters == 0 {
            return Err(ClusterError::InvalidParameter {
                name: "n_clusters",
                message: "must be at least 1",
            });
        }
        if self.max_iterations == 0 {
            return Err(ClusterError::InvalidParameter {
                name: "max_iterations",
                message: "must be at least 1",
            });
        }
        if n_rows < self.n_clusters {
            return Err(ClusterError::InvalidClusterCount {
                requested: self.n_clusters,
                n_rows,
            });
        }

        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut centroids = plus_plus_init(data.view(), self.n_clusters, &mut rng);
        let mut labels = vec![usize::MAX; n_rows];
        let mut iterations = 0;
        let mut converged = false;

        while iterations < self.max_iterations {
            let new_labels = assign_all(data.view(), centroids.view());
            let unchanged = new_labels == labels;
            labels = new_labels;
            iterations += 1;

            if unchanged {
                converged = true;
                break;
            }

            let shift = update_centroids(data.view(), &labels, &mut centroids);
            if shift < SHIFT_EPS {
                converged = true;
                break;
            }
        }

        if !converged {
            warn!(
                iterations,
                "k-means did not converge; reporting last assignment"
            );
        } else {
            debug!(iterations, "k-means converged");
        }

        // Final assignment against the final centroids, so the minimal
        // distance invariant holds exactly for the reported labels.
        labels = assign_all(data.view(), centroids.view());

        Ok(KMeansFit {
            centroids,
            labels,
            iterations,
            converged,
        })
    }
}

/// k-means++ seeding: first centroid uniform over rows, each subsequent
/// one sampled with probability proportional to its squared distance to
/// the nearest centroid chosen so far.
fn plus_plus_init(data: ArrayView2<'_, f64>, k: usize, rng: &mut StdRng) -> Array2<f64> {
    let n_rows = data.nrows();
    let mut centroids = Array2::<f64>::zeros((k, data.ncols()));

    let first = rng.random_range(0..n_rows);
    centroids.row_mut(0).assign(&data.row(first));

    let mut dist_sq: Vec<f64> = (0..n_rows)
        .map(|i| squared_euclidean(data.row(i), centroids.row(0)))
        .collect();

    for c in 1..k {
        let total: f64 = dist_sq.iter().sum();
        let chosen = if total > 0.0 {
            let mut threshold = rng.random::<f64>() * total;
            let mut pick = n_rows - 1;
            for (i, &d) in dist_sq.iter().enumerate() {
                threshold -= d;
                if threshold <= 0.0 {
                    pick = i;
                    break;
                }
            }
            pick
        } else {
            // Remaining points all coincide with a centroid already.
            rng.random_range(0..n_rows)
        };

        centroids.row_mut(c).assign(&data.row(chosen));
        for i in 0..n_rows {
            let d = squared_euclidean(data.row(i), centroids.row(c));
            if d < dist_sq[i] {
                dist_sq[i] = d;
            }
        }
    }

    centroids
}

/// Nearest-centroid label for every row.
fn assign_all(data: ArrayView2<'_, f64>, centroids: ArrayView2<'_, f64>) -> Vec<usize> {
    (0..data.nrows())
        .map(|i| nearest_centroid_idx(data.row(i), centroids))
        .collect()
}

/// Index of the closest centroid by squared Euclidean distance; exact
/// ties go to the lowest index (strict `<` comparison).
fn nearest_centroid_idx(point: ArrayView1<'_, f64>, centroids: ArrayView2<'_, f64>) -> usize {
    let mut best = 0usize;
    let mut best_dist = squared_euclidean(point, centroids.row(0));
    for c in 1..centroids.nrows() {
        let d = squared_euclidean(point, centroids.row(c));
        if d < best_dist {
            best_dist = d;
            best = c;
        }
    }
    best
}

/// Squared distance from `point` to its closest centroid.
fn min_centroid_distance(point: ArrayView1<'_, f64>, centroids: ArrayView2<'_, f64>) -> f64 {
    (0..centroids.nrows())
        .map(|c| squared_euclidean(point, centroids.row(c)))
        .fold(f64::INFINITY, f64::min)
}

fn squared_euclidean(a: ArrayView1<'_, f64>, b: ArrayView1<'_, f64>) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}

/// Recomputes each centroid as the mean of its assigned rows; empty
/// centroids are reinitialized to the row farthest from its nearest
/// centroid. Returns the largest squared shift of any centroid.
fn update_centroids(
    data: ArrayView2<'_, f64>,
    labels: &[usize],
    centroids: &mut Array2<f64>,
) -> f64 {
    let k = centroids.nrows();
    let n_cols = centroids.ncols();
    let mut sums = Array2::<f64>::zeros((k, n_cols));
    let mut counts = vec![0usize; k];

    for (i, &label) in labels.iter().enumerate() {
        let row = data.row(i);
        let mut sum = sums.row_mut(label);
        sum += &row;
        counts[label] += 1;
    }

    let mut max_shift = 0.0f64;
    for c in 0..k {
        if counts[c] > 0 {
            let mean = sums.row(c).mapv(|v| v / counts[c] as f64);
            let shift = squared_euclidean(centroids.row(c), mean.view());
            if shift > max_shift {
                max_shift = shift;
            }
            centroids.row_mut(c).assign(&mean);
        } else {
            // Empty cluster: grab the point worst served by the current
            // centroids so it cannot stay empty next round.
            let farthest = (0..data.nrows())
                .max_by(|&a, &b| {
                    let da = min_centroid_distance(data.row(a), centroids.view());
                    let db = min_centroid_distance(data.row(b), centroids.view());
                    da.partial_cmp(&db).unwrap_or(std::cmp::Ordering::Equal)
                })
                .unwrap_or(0);
            warn!(cluster = c, "empty cluster reinitialized to farthest point");
            centroids.row_mut(c).assign(&data.row(farthest));
            max_shift = f64::INFINITY;
        }
    }
    max_shift
}

impl KMeansFit {
    /// Nearest-centroid labels for arbitrary points in the fitted space,
    /// e.g. boundary grid points never seen at fit time.
    pub fn predict(&self, data: &Array2<f64>) -> Result<Vec<usize>> {
        if data.ncols() != self.centroids.ncols() {
            return Err(ClusterError::DimensionMismatch {
                expected: self.centroids.ncols(),
                found: data.ncols(),
            });
        }
        Ok(assign_all(data.view(), self.centroids.view()))
    }

    /// Label for a single point. Read-only on fitted state, safe to call
    /// from parallel workers.
    pub fn predict_point(&self, point: &[f64]) -> Result<usize> {
        if point.len() != self.centroids.ncols() {
            return Err(ClusterError::DimensionMismatch {
                expected: self.centroids.ncols(),
                found: point.len(),
            });
        }
        Ok(nearest_centroid_idx(
            ArrayView1::from(point),
            self.centroids.view(),
        ))
    }

    /// Training labels, one per input row, in `[0, n_clusters)`.
    pub fn labels(&self) -> &[usize] {
        &self.labels
    }

    /// Final centroid matrix, `n_clusters x n_features`.
    pub fn centroids(&self) -> &Array2<f64> {
        &self.centroids
    }

    pub fn iterations(&self) -> usize {
        self.iterations
    }

    pub fn converged(&self) -> bool {
        self.converged
    }
}
