pub mod yahoo;

use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;

use crate::types::PriceRow;

pub use yahoo::YahooClient;

/// Anything that can supply daily OHLCV rows for a ticker.
///
/// `start` is inclusive and `end` exclusive.  An unknown ticker or an empty
/// range is `Ok(vec![])`, not an error.
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    async fn fetch(&self, ticker: &str, start: NaiveDate, end: NaiveDate) -> Result<Vec<PriceRow>>;
}

/// Fixed in-memory source keyed by ticker, used by the request-flow tests.
#[cfg(test)]
pub struct StaticSource {
    pub tables: std::collections::HashMap<String, Vec<PriceRow>>,
    pub calls: std::sync::atomic::AtomicUsize,
    pub fail_with: Option<String>,
}

#[cfg(test)]
impl StaticSource {
    pub fn new() -> Self {
        Self {
            tables: std::collections::HashMap::new(),
            calls: std::sync::atomic::AtomicUsize::new(0),
            fail_with: None,
        }
    }

    pub fn with_table(mut self, ticker: &str, rows: Vec<PriceRow>) -> Self {
        self.tables.insert(ticker.to_string(), rows);
        self
    }

    pub fn failing(message: &str) -> Self {
        Self {
            fail_with: Some(message.to_string()),
            ..Self::new()
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[cfg(test)]
#[async_trait]
impl MarketDataSource for StaticSource {
    async fn fetch(&self, ticker: &str, start: NaiveDate, end: NaiveDate) -> Result<Vec<PriceRow>> {
        self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        if let Some(msg) = &self.fail_with {
            anyhow::bail!("{msg}");
        }
        Ok(self
            .tables
            .get(ticker)
            .map(|rows| {
                rows.iter()
                    .filter(|r| r.date >= start && r.date < end)
                    .copied()
                    .collect()
            })
            .unwrap_or_default())
    }
}
