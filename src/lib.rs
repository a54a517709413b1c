//! Clusters equities by similarity of daily price-movement behavior.
//!
//! Per-ticker OHLC history is turned into a `close - open` movement
//! matrix, each row scaled to unit norm, projected to 2D with PCA, and
//! partitioned with seeded K-Means. The output is a cluster assignment
//! per company plus a visualization payload (reduced coordinates,
//! centroids and a dense decision-region label grid).

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
