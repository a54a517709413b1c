//! In-memory data source for tests and offline runs.

use crate::domain::ports::HistoricalDataSource;
use crate::domain::types::DailyBar;
use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::{HashMap, HashSet};

/// Serves canned bars per symbol; unknown symbols return empty, symbols
/// registered as failing return an error. Range filtering matches the
/// port contract: `[start, end)`.
#[derive(Debug, Default, Clone)]
pub struct MockDataSource {
    bars: HashMap<String, Vec<DailyBar>>,
    failing: HashSet<String>,
}

impl MockDataSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bars(mut self, symbol: &str, bars: Vec<DailyBar>) -> Self {
        self.bars.insert(symbol.to_string(), bars);
        self
    }

    /// Registers a symbol whose fetch always errors.
    pub fn with_failure(mut self, symbol: &str) -> Self {
        self.failing.insert(symbol.to_string());
        self
    }
}

#[async_trait]
impl HistoricalDataSource for MockDataSource {
    async fn daily_bars(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DailyBar>> {
        if self.failing.contains(symbol) {
            anyhow::bail!("simulated retrieval failure for {}", symbol);
        }
        Ok(self
            .bars
            .get(symbol)
            .map(|bars| {
                bars.iter()
                    .filter(|b| b.date >= start && b.date < end)
                    .copied()
                    .collect()
            })
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bar(date: &str) -> DailyBar {
        DailyBar {
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            open: 1.0,
            high: 1.0,
            low: 1.0,
            close: 1.0,
            volume: 1.0,
        }
    }

    #[tokio::test]
    async fn end_date_is_exclusive() {
        let source = MockDataSource::new().with_bars(
            "AAA",
            vec![bar("2015-01-02"), bar("2015-01-05"), bar("2015-01-06")],
        );

        let bars = source
            .daily_bars(
                "AAA",
                NaiveDate::from_ymd_opt(2015, 1, 2).unwrap(),
                NaiveDate::from_ymd_opt(2015, 1, 6).unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(bars.len(), 2, "bar dated exactly `end` must be excluded");
        assert_eq!(bars[1].date, NaiveDate::from_ymd_opt(2015, 1, 5).unwrap());
    }

    #[tokio::test]
    async fn unknown_symbol_is_empty_not_error() {
        let source = MockDataSource::new();
        let bars = source
            .daily_bars(
                "NOPE",
                NaiveDate::from_ymd_opt(2015, 1, 1).unwrap(),
                NaiveDate::from_ymd_opt(2016, 1, 1).unwrap(),
            )
            .await
            .unwrap();
        assert!(bars.is_empty());
    }

    #[tokio::test]
    async fn failing_symbol_errors() {
        let source = MockDataSource::new().with_failure("BAD");
        let result = source
            .daily_bars(
                "BAD",
                NaiveDate::from_ymd_opt(2015, 1, 1).unwrap(),
                NaiveDate::from_ymd_opt(2016, 1, 1).unwrap(),
            )
            .await;
        assert!(result.is_err());
    }
}
