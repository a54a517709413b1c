//! Analysis configuration: the company universe, the date range and the
//! numeric pipeline parameters, with fail-fast validation.

use crate::domain::errors::{ClusterError, Result};
use crate::domain::types::Company;
use anyhow::Context;
use chrono::NaiveDate;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;

/// Full configuration for one clustering run.
///
/// `companies` keeps insertion order; that order drives matrix rows and
/// the reported results. `start` is inclusive, `end` exclusive.
#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    pub companies: Vec<Company>,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub n_clusters: usize,
    pub n_components: usize,
    pub max_iterations: usize,
    pub seed: u64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            companies: default_universe(),
            // The published analysis window.
            start: NaiveDate::from_ymd_opt(2015, 1, 1).expect("static date"),
            end: NaiveDate::from_ymd_opt(2017, 12, 31).expect("static date"),
            n_clusters: 10,
            n_components: 2,
            max_iterations: 1000,
            seed: 42,
        }
    }
}

impl AnalysisConfig {
    /// Checks everything that can be checked without data. Cluster count
    /// vs. surviving entity count is re-checked at fit time, since
    /// tickers may drop out during retrieval.
    pub fn validate(&self) -> Result<()> {
        if self.companies.is_empty() {
            return Err(ClusterError::InvalidParameter {
                name: "companies",
                message: "universe must contain at least one company",
            });
        }
        let mut seen = HashSet::new();
        for company in &self.companies {
            if !seen.insert(company.symbol.as_str()) {
                return Err(ClusterError::InvalidParameter {
                    name: "companies",
                    message: "duplicate ticker symbol in universe",
                });
            }
        }
        if self.start >= self.end {
            return Err(ClusterError::InvalidDateRange {
                start: self.start,
                end: self.end,
            });
        }
        if self.n_clusters == 0 {
            return Err(ClusterError::InvalidParameter {
                name: "n_clusters",
                message: "must be at least 1",
            });
        }
        if self.n_clusters > self.companies.len() {
            return Err(ClusterError::InvalidClusterCount {
                requested: self.n_clusters,
                n_rows: self.companies.len(),
            });
        }
        if self.n_components == 0 {
            return Err(ClusterError::InvalidParameter {
                name: "n_components",
                message: "must be at least 1",
            });
        }
        if self.max_iterations == 0 {
            return Err(ClusterError::InvalidParameter {
                name: "max_iterations",
                message: "must be at least 1",
            });
        }
        Ok(())
    }
}

/// TOML universe file shape:
///
/// ```toml
/// [[companies]]
/// name = "Apple"
/// symbol = "AAPL"
/// ```
#[derive(Debug, Deserialize)]
struct UniverseFile {
    companies: Vec<Company>,
}

/// Loads a company universe from a TOML file, preserving file order.
pub fn load_universe(path: &Path) -> anyhow::Result<Vec<Company>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read universe file: {}", path.display()))?;
    let parsed: UniverseFile = toml::from_str(&content)
        .with_context(|| format!("Failed to parse universe TOML: {}", path.display()))?;
    Ok(parsed.companies)
}

/// The built-in company universe used when no file is given.
pub fn default_universe() -> Vec<Company> {
    [
        ("Amazon", "AMZN"),
        ("Apple", "AAPL"),
        ("Walgreen", "WBA"),
        ("Northrop Grumman", "NOC"),
        ("Boeing", "BA"),
        ("Lockheed Martin", "LMT"),
        ("McDonalds", "MCD"),
        ("Intel", "INTC"),
        ("IBM", "IBM"),
        ("Texas Instruments", "TXN"),
        ("MasterCard", "MA"),
        ("Microsoft", "MSFT"),
        ("General Electrics", "GE"),
        ("American Express", "AXP"),
        ("Pepsi", "PEP"),
        ("Coca Cola", "KO"),
        ("Johnson & Johnson", "JNJ"),
        ("Toyota", "TM"),
        ("Honda", "HMC"),
        ("Mitsubishi", "MSBHY"),
        ("Sony Group", "SONY"),
        ("Exxon", "XOM"),
        ("Chevron", "CVX"),
        ("Valero Energy", "VLO"),
        ("Ford", "F"),
        ("Bank of America", "BAC"),
    ]
    .iter()
    .map(|(name, symbol)| Company::new(name, symbol))
    .collect()
}
