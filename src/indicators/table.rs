// =============================================================================
// Derived table — every overlay column for one chart request
// =============================================================================

use serde::{Deserialize, Serialize};

use super::bollinger::calculate_bollinger;
use super::macd::calculate_macd;
use super::rsi::calculate_rsi;
use super::sma::calculate_sma;
use super::IndicatorError;
use crate::types::PriceRow;

/// Window sizes chosen on the chart sliders.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IndicatorParams {
    pub ma_window: usize,
    pub bb_window: usize,
    pub rsi_period: usize,
    pub band_multiplier: f64,
}

impl Default for IndicatorParams {
    fn default() -> Self {
        Self {
            ma_window: 20,
            bb_window: 20,
            rsi_period: 14,
            band_multiplier: 2.0,
        }
    }
}

/// The fetched price table plus all derived columns, row-aligned.
#[derive(Debug, Clone)]
pub struct DerivedTable {
    pub rows: Vec<PriceRow>,
    pub params: IndicatorParams,
    pub ma: Vec<f64>,
    pub bb_middle: Vec<f64>,
    pub bb_upper: Vec<f64>,
    pub bb_lower: Vec<f64>,
    pub rsi: Vec<f64>,
    pub macd: Vec<f64>,
    pub signal: Vec<f64>,
}

impl DerivedTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Header of the tabular dump, in column order.
    pub fn column_names(&self) -> Vec<String> {
        vec![
            "Date".to_string(),
            "Open".to_string(),
            "High".to_string(),
            "Low".to_string(),
            "Close".to_string(),
            "Volume".to_string(),
            format!("MA{}", self.params.ma_window),
            "BB_middle".to_string(),
            "BB_upper".to_string(),
            "BB_lower".to_string(),
            format!("RSI{}", self.params.rsi_period),
            "MACD".to_string(),
            "Signal".to_string(),
        ]
    }

    /// Derived values for row `i`, in the same order as the trailing
    /// entries of [`Self::column_names`].
    pub fn derived_at(&self, i: usize) -> [f64; 7] {
        [
            self.ma[i],
            self.bb_middle[i],
            self.bb_upper[i],
            self.bb_lower[i],
            self.rsi[i],
            self.macd[i],
            self.signal[i],
        ]
    }
}

/// Validate `rows` and compute every overlay column.
///
/// Empty and all-NaN tables are accepted and produce undefined columns.
///
/// # Errors
/// - any window / period of zero
/// - any infinite price
/// - dates not strictly ascending
pub fn derive_table(rows: &[PriceRow], params: &IndicatorParams) -> Result<DerivedTable, IndicatorError> {
    if params.ma_window == 0 {
        return Err(IndicatorError::invalid_period("moving average window", 0));
    }
    if params.bb_window == 0 {
        return Err(IndicatorError::invalid_period("bollinger window", 0));
    }
    if params.rsi_period == 0 {
        return Err(IndicatorError::invalid_period("rsi period", 0));
    }
    if !params.band_multiplier.is_finite() {
        return Err(IndicatorError::invalid_input("band multiplier must be finite"));
    }

    validate_rows(rows)?;

    let closes: Vec<f64> = rows.iter().map(|r| r.close).collect();

    let ma = calculate_sma(&closes, params.ma_window);
    let bands = calculate_bollinger(&closes, params.bb_window, params.band_multiplier);
    let rsi = calculate_rsi(&closes, params.rsi_period);
    let macd = calculate_macd(&closes);

    Ok(DerivedTable {
        rows: rows.to_vec(),
        params: *params,
        ma,
        bb_middle: bands.middle,
        bb_upper: bands.upper,
        bb_lower: bands.lower,
        rsi,
        macd: macd.macd,
        signal: macd.signal,
    })
}

fn validate_rows(rows: &[PriceRow]) -> Result<(), IndicatorError> {
    for row in rows {
        let prices = [row.open, row.high, row.low, row.close];
        if prices.iter().any(|p| p.is_infinite()) {
            return Err(IndicatorError::invalid_input(format!(
                "non-numeric price on {}",
                row.date
            )));
        }
    }

    if let Some(w) = rows.windows(2).find(|w| w[1].date <= w[0].date) {
        return Err(IndicatorError::invalid_input(format!(
            "dates must be strictly ascending ({} follows {})",
            w[1].date, w[0].date
        )));
    }

    Ok(())
}
