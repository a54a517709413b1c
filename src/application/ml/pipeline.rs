//! The fit/predict pipeline: Normalizer -> PCA -> K-Means.
//!
//! The three stages are held as direct typed fields in a fixed order; the
//! same order is applied for both `fit` and `predict`, and every later
//! `predict` runs through transforms frozen at fit time.

use super::kmeans::{KMeans, KMeansFit};
use super::normalizer::Normalizer;
use super::pca::{FittedPca, Pca};
use crate::domain::errors::{ClusterError, Result};
use ndarray::Array2;
use tracing::info;

/// Pipeline configuration. Constructing one validates the parameters
/// that can be checked without data; data-dependent checks (cluster
/// count vs. row count) happen at fit.
#[derive(Debug, Clone, Copy)]
pub struct MovementPipeline {
    normalizer: Normalizer,
    pca: Pca,
    kmeans: KMeans,
}

/// Fitted pipeline state. The sub-models are exposed read-only so the
/// boundary renderer can reuse the fitted basis and centroids.
#[derive(Debug, Clone)]
pub struct FittedPipeline {
    normalizer: Normalizer,
    pca: FittedPca,
    kmeans: KMeansFit,
}

impl MovementPipeline {
    pub fn new(
        n_components: usize,
        n_clusters: usize,
        max_iterations: usize,
        seed: u64,
    ) -> Result<Self> {
        if n_components == 0 {
            return Err(ClusterError::InvalidParameter {
                name: "n_components",
                message: "must be at least 1",
            });
        }
        if n_clusters == 0 {
            return Err(ClusterError::InvalidParameter {
                name: "n_clusters",
                message: "must be at least 1",
            });
        }
        if max_iterations == 0 {
            return Err(ClusterError::InvalidParameter {
                name: "max_iterations",
                message: "must be at least 1",
            });
        }
        Ok(Self {
            normalizer: Normalizer::new(),
            pca: Pca::new(n_components),
            kmeans: KMeans::new(n_clusters, max_iterations, seed),
        })
    }

    /// Fits all three stages in order on the movement matrix.
    pub fn fit(&self, movements: &Array2<f64>) -> Result<FittedPipeline> {
        let normalized = self.normalizer.transform(movements);
        let pca = self.pca.fit(&normalized)?;
        let reduced = pca.transform(&normalized)?;
        let kmeans = self.kmeans.fit(&reduced)?;
        info!(
            entities = movements.nrows(),
            days = movements.ncols(),
            iterations = kmeans.iterations(),
            converged = kmeans.converged(),
            "pipeline fitted"
        );
        Ok(FittedPipeline {
            normalizer: self.normalizer,
            pca,
            kmeans,
        })
    }
}

impl FittedPipeline {
    /// Cluster labels for rows of a movement matrix, running the same
    /// normalize -> reduce -> assign chain used at fit time.
    pub fn predict(&self, movements: &Array2<f64>) -> Result<Vec<usize>> {
        let reduced = self.reduce(movements)?;
        self.kmeans.predict(&reduced)
    }

    /// Reduced (post-PCA) coordinates for rows of a movement matrix.
    pub fn reduce(&self, movements: &Array2<f64>) -> Result<Array2<f64>> {
        let normalized = self.normalizer.transform(movements);
        self.pca.transform(&normalized)
    }

    pub fn pca(&self) -> &FittedPca {
        &self.pca
    }

    pub fn kmeans(&self) -> &KMeansFit {
        &self.kmeans
    }
}
