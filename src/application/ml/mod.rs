//! The numeric core: normalization, PCA and K-Means, composed into a
//! single fit/predict pipeline over movement matrices.

pub mod kmeans;
pub mod normalizer;
pub mod pca;
pub mod pipeline;

pub use kmeans::{KMeans, KMeansFit};
pub use normalizer::Normalizer;
pub use pca::{FittedPca, Pca};
pub use pipeline::{FittedPipeline, MovementPipeline};
