use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One trading day of OHLCV data for a single symbol.
///
/// Prices may be NaN when the venue reported a gap for that day; the
/// movement extractor imputes those explicitly (see
/// `application::movements`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DailyBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl DailyBar {
    /// Daily movement: close minus open.
    pub fn movement(&self) -> f64 {
        self.close - self.open
    }
}

/// A company in the analysis universe: display name plus ticker symbol.
///
/// Symbols are unique within one universe; insertion order is preserved
/// and used to order rows and reported results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Company {
    pub name: String,
    pub symbol: String,
}

impl Company {
    pub fn new(name: &str, symbol: &str) -> Self {
        Self {
            name: name.to_string(),
            symbol: symbol.to_string(),
        }
    }
}

/// Final cluster assignment for one company.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClusterAssignment {
    pub name: String,
    pub symbol: String,
    pub label: usize,
}
