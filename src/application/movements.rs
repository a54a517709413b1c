//! Movement extraction: per-ticker OHLC series -> dense movement matrix.
//!
//! Alignment policy: rows are built on the *intersection* of trading
//! dates present in every included series, sorted ascending. Venues
//! disagree on holidays (Tokyo trades when New York is closed), so
//! trusting positional order silently corrupts rows; aligning by date
//! keeps every column on one real trading day for all entities.
//!
//! Imputation policy: a bar whose open or close is non-finite yields a
//! 0.0 movement cell. This keeps the matrix rectangular instead of
//! dropping whole columns, and is logged as a data-quality signal.

use crate::domain::errors::{ClusterError, Result};
use crate::domain::types::DailyBar;
use chrono::NaiveDate;
use ndarray::Array2;
use std::collections::HashSet;
use tracing::warn;

/// A rectangular `entities x days` matrix of daily movements plus the
/// row/column identities it was built from. Rebuilt from scratch each
/// run; nothing here survives across runs.
#[derive(Debug, Clone)]
pub struct MovementMatrix {
    /// Symbols in row order (config order restricted to included tickers).
    pub symbols: Vec<String>,
    /// Trading dates in column order, ascending.
    pub dates: Vec<NaiveDate>,
    pub values: Array2<f64>,
}

/// Builds the movement matrix from retrieved series, in input order.
///
/// Tickers with zero bars are dropped with a warning. Fails with
/// [`ClusterError::NoUsableData`] when nothing is left, and with
/// [`ClusterError::NoCommonDates`] when the included series share no
/// trading dates at all.
pub fn build_movement_matrix(series: &[(String, Vec<DailyBar>)]) -> Result<MovementMatrix> {
    let mut included: Vec<(&str, &[DailyBar])> = Vec::with_capacity(series.len());
    for (symbol, bars) in series {
        if bars.is_empty() {
            warn!(symbol, "no bars retrieved; excluding ticker from analysis");
        } else {
            included.push((symbol, bars));
        }
    }

    if included.is_empty() {
        return Err(ClusterError::NoUsableData);
    }

    // Intersection of trading dates across all included tickers.
    let mut common: HashSet<NaiveDate> = included[0].1.iter().map(|b| b.date).collect();
    for (_, bars) in included.iter().skip(1) {
        let dates: HashSet<NaiveDate> = bars.iter().map(|b| b.date).collect();
        common.retain(|d| dates.contains(d));
    }
    if common.is_empty() {
        return Err(ClusterError::NoCommonDates);
    }

    let mut dates: Vec<NaiveDate> = common.into_iter().collect();
    dates.sort_unstable();

    let dropped: usize = included
        .iter()
        .map(|(_, bars)| bars.len().saturating_sub(dates.len()))
        .sum();
    if dropped > 0 {
        warn!(
            dropped_bars = dropped,
            aligned_days = dates.len(),
            "trading-day indexes differ across tickers; keeping common dates only"
        );
    }

    let mut values = Array2::<f64>::zeros((included.len(), dates.len()));
    let mut imputed = 0usize;

    for (row, (_, bars)) in included.iter().enumerate() {
        let by_date: std::collections::HashMap<NaiveDate, f64> =
            bars.iter().map(|b| (b.date, b.movement())).collect();
        for (col, date) in dates.iter().enumerate() {
            // Lookup is by date, never by position. Every date is in the
            // intersection, so a miss can only mean a non-finite-price bar
            // was shadowed by a duplicate; either way the cell is imputed.
            let movement = by_date.get(date).copied().unwrap_or(f64::NAN);
            values[[row, col]] = if movement.is_finite() {
                movement
            } else {
                imputed += 1;
                0.0
            };
        }
    }

    if imputed > 0 {
        warn!(
            cells = imputed,
            "non-finite movement cells imputed to zero; check upstream data quality"
        );
    }

    Ok(MovementMatrix {
        symbols: included.iter().map(|(s, _)| s.to_string()).collect(),
        dates,
        values,
    })
}
