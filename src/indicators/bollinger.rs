// =============================================================================
// Bollinger Bands
// =============================================================================
//
// Bollinger Bands consist of a middle band (SMA), an upper band (SMA + k*σ),
// and a lower band (SMA - k*σ), where σ is the sample standard deviation of
// closes over exactly the same trailing window as the SMA.

use super::sma::{rolling_mean, rolling_std};

/// Column-wise Bollinger output, one value per input row.
#[derive(Debug, Clone, Default)]
pub struct BollingerBands {
    pub upper: Vec<f64>,
    pub middle: Vec<f64>,
    pub lower: Vec<f64>,
}

/// Calculate Bollinger Bands for every row of `closes`.
///
/// The first `period - 1` rows of every band are NaN.
pub fn calculate_bollinger(closes: &[f64], period: usize, num_std: f64) -> BollingerBands {
    let middle = rolling_mean(closes, period);
    let std = rolling_std(closes, period);

    let upper = middle
        .iter()
        .zip(&std)
        .map(|(m, s)| m + num_std * s)
        .collect();
    let lower = middle
        .iter()
        .zip(&std)
        .map(|(m, s)| m - num_std * s)
        .collect();

    BollingerBands {
        upper,
        middle,
        lower,
    }
}
