use chrono::NaiveDate;
use thiserror::Error;

/// Errors surfaced by the clustering pipeline and its configuration.
///
/// Per-ticker retrieval failures never appear here: they are recovered
/// locally (warn + exclude). These variants are the structural failures
/// that must reach the caller instead of being masked as an empty result.
#[derive(Debug, Error)]
pub enum ClusterError {
    /// Every requested ticker failed or came back empty.
    #[error("no usable price data: every requested ticker failed or returned no bars")]
    NoUsableData,

    /// The included tickers share no common trading dates, so no
    /// rectangular matrix can be built.
    #[error("included tickers share no common trading dates")]
    NoCommonDates,

    #[error("invalid cluster count: requested {requested}, but only {n_rows} entities available")]
    InvalidClusterCount { requested: usize, n_rows: usize },

    #[error(
        "invalid component count: requested {requested}, but only {n_rows} entities available"
    )]
    InvalidComponentCount { requested: usize, n_rows: usize },

    /// Invalid configuration parameter.
    #[error("invalid parameter {name}: {message}")]
    InvalidParameter {
        name: &'static str,
        message: &'static str,
    },

    #[error("invalid date range: start {start} is not before end {end}")]
    InvalidDateRange { start: NaiveDate, end: NaiveDate },

    /// Input columns do not match what the model was fitted with.
    #[error("dimension mismatch: model fitted with {expected} columns, input has {found}")]
    DimensionMismatch { expected: usize, found: usize },
}

pub type Result<T> = std::result::Result<T, ClusterError>;
