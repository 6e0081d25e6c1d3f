// =============================================================================
// Shared types used across the dashboard backend
// =============================================================================

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One daily OHLCV row as returned by the market data provider.
///
/// Missing prices are carried as `NaN` so that rolling computations can
/// propagate gaps the same way the provider reports them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceRow {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    #[serde(default)]
    pub volume: u64,
}

impl PriceRow {
    pub fn new(date: NaiveDate, open: f64, high: f64, low: f64, close: f64, volume: u64) -> Self {
        Self {
            date,
            open,
            high,
            low,
            close,
            volume,
        }
    }
}

/// Role tag attached to every chart series handed to the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeriesRole {
    Candlestick,
    Volume,
    Ma,
    BandUpper,
    BandLower,
    Rsi,
    Macd,
    Signal,
}

/// Inclusive numeric bounds plus default for a slider-style input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SliderBounds {
    pub min: usize,
    pub max: usize,
    pub default: usize,
}

impl SliderBounds {
    pub const fn new(min: usize, max: usize, default: usize) -> Self {
        Self { min, max, default }
    }

    pub fn contains(&self, value: usize) -> bool {
        (self.min..=self.max).contains(&value)
    }
}
