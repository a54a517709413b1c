//! End-to-end clustering run: retrieve, extract, fit, assemble results.
//!
//! Retrieval is the only concurrent part (independent per ticker, bounded
//! fan-out); the numeric pipeline itself is strictly sequential because
//! each stage consumes the previous stage's full output.

use crate::application::boundary::{render_boundary, BoundaryGrid};
use crate::application::ml::MovementPipeline;
use crate::application::movements::{build_movement_matrix, MovementMatrix};
use crate::config::AnalysisConfig;
use crate::domain::ports::HistoricalDataSource;
use crate::domain::types::{ClusterAssignment, Company, DailyBar};
use anyhow::{Context, Result};
use futures_util::stream::{self, StreamExt};
use ndarray::Array2;
use std::collections::HashMap;
use tracing::{info, warn};

/// How many tickers are fetched concurrently.
const FETCH_CONCURRENCY: usize = 4;

/// Everything one clustering run produces: the assignment per company
/// plus the visualization payload (reduced coordinates, centroids and
/// the decision-region grid). Immutable once built.
#[derive(Debug, Clone)]
pub struct ClusteringOutcome {
    /// One entry per included company, in universe order.
    pub assignments: Vec<ClusterAssignment>,
    /// Reduced 2D coordinates, one row per included company.
    pub reduced: Array2<f64>,
    /// Final centroids in reduced space, `n_clusters x 2`.
    pub centroids: Array2<f64>,
    pub boundary: BoundaryGrid,
    /// Number of aligned trading days in the movement matrix.
    pub n_days: usize,
    pub converged: bool,
}

/// Orchestrates one clustering run against a data source.
pub struct ClusterAnalysis<'a> {
    source: &'a dyn HistoricalDataSource,
    config: AnalysisConfig,
}

impl<'a> ClusterAnalysis<'a> {
    /// Validates the configuration up front; a bad configuration never
    /// reaches retrieval.
    pub fn new(source: &'a dyn HistoricalDataSource, config: AnalysisConfig) -> Result<Self> {
        config.validate().context("invalid analysis configuration")?;
        Ok(Self { source, config })
    }

    pub async fn run(&self) -> Result<ClusteringOutcome> {
        let series = self.fetch_all().await;
        let matrix = build_movement_matrix(&series).context("building movement matrix")?;
        info!(
            entities = matrix.values.nrows(),
            days = matrix.values.ncols(),
            "movement matrix assembled"
        );

        let pipeline = MovementPipeline::new(
            self.config.n_components,
            self.config.n_clusters,
            self.config.max_iterations,
            self.config.seed,
        )?;
        let fitted = pipeline.fit(&matrix.values)?;
        let labels = fitted.predict(&matrix.values)?;
        let reduced = fitted.reduce(&matrix.values)?;
        let boundary = render_boundary(&reduced, fitted.kmeans())?;

        Ok(ClusteringOutcome {
            assignments: self.assignments(&matrix, &labels),
            centroids: fitted.kmeans().centroids().clone(),
            converged: fitted.kmeans().converged(),
            n_days: matrix.dates.len(),
            reduced,
            boundary,
        })
    }

    /// Fetches bars for every ticker with bounded concurrency. Per-ticker
    /// failures become empty series (warn + exclude downstream); results
    /// come back in universe order regardless of completion order.
    async fn fetch_all(&self) -> Vec<(String, Vec<DailyBar>)> {
        let (start, end) = (self.config.start, self.config.end);

        let fetched: HashMap<String, Vec<DailyBar>> =
            stream::iter(self.config.companies.iter())
                .map(|company| async move {
                    let result = self.source.daily_bars(&company.symbol, start, end).await;
                    (company.symbol.clone(), result)
                })
                .buffer_unordered(FETCH_CONCURRENCY)
                .map(|(symbol, result)| match result {
                    Ok(bars) => {
                        info!(symbol = %symbol, bars = bars.len(), "retrieved daily bars");
                        (symbol, bars)
                    }
                    Err(e) => {
                        warn!(symbol = %symbol, error = %e, "retrieval failed; excluding ticker");
                        (symbol, Vec::new())
                    }
                })
                .collect()
                .await;

        self.config
            .companies
            .iter()
            .map(|c| {
                let bars = fetched.get(&c.symbol).cloned().unwrap_or_default();
                (c.symbol.clone(), bars)
            })
            .collect()
    }

    /// Maps row symbols back to display names, preserving universe order.
    fn assignments(&self, matrix: &MovementMatrix, labels: &[usize]) -> Vec<ClusterAssignment> {
        let names: HashMap<&str, &str> = self
            .config
            .companies
            .iter()
            .map(|c| (c.symbol.as_str(), c.name.as_str()))
            .collect();

        matrix
            .symbols
            .iter()
            .zip(labels.iter())
            .map(|(symbol, &label)| ClusterAssignment {
                name: names
                    .get(symbol.as_str())
                    .copied()
                    .unwrap_or(symbol.as_str())
                    .to_string(),
                symbol: symbol.clone(),
                label,
            })
            .collect()
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Companies in the configured universe, in order.
    pub fn universe(&self) -> &[Company] {
        &self.config.companies
    }
}
