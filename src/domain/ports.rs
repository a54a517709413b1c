use crate::domain::types::DailyBar;
use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;

/// Source of historical daily price data.
///
/// `start` is inclusive, `end` is exclusive: a bar dated exactly `end`
/// is never returned. An empty vector means the symbol had no data in
/// range (delisted, unknown, market holiday span); an `Err` means the
/// fetch itself failed. Callers treat both as "exclude this ticker and
/// continue", never as a reason to abort the other tickers.
#[async_trait]
pub trait HistoricalDataSource: Send + Sync {
    async fn daily_bars(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DailyBar>>;
}
