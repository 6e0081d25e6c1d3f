// =============================================================================
// Relative Strength Index (RSI) — simple rolling averages
// =============================================================================
//
// Step 1 — delta[i] = close[i] - close[i-1]   (undefined at i = 0)
// Step 2 — up = max(delta, 0), down = max(-delta, 0)
// Step 3 — avg_up / avg_down = trailing mean of up / down over `period`
// Step 4 — RS  = avg_up / avg_down
//          RSI = 100 - 100 / (1 + RS)
//
// The first defined value is at index `period` (one delta is lost at the
// start).  avg_down == 0 never reaches the division: RSI is 100, including
// for a completely flat window.
//
// Thresholds:  RSI >= 70 => OVERBOUGHT,  RSI <= 30 => OVERSOLD.
// =============================================================================

use super::sma::rolling_mean;

/// Compute the RSI series for `closes`, one value per row.
///
/// # Edge cases
/// - `period == 0` => all NaN
/// - `closes.len() <= period` => all NaN
/// - NaN closes propagate into every window that spans them.
pub fn calculate_rsi(closes: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || closes.len() <= period {
        return vec![f64::NAN; closes.len()];
    }

    let mut up = Vec::with_capacity(closes.len());
    let mut down = Vec::with_capacity(closes.len());
    up.push(f64::NAN);
    down.push(f64::NAN);
    for w in closes.windows(2) {
        let delta = w[1] - w[0];
        if delta.is_nan() {
            up.push(f64::NAN);
            down.push(f64::NAN);
        } else {
            up.push(delta.max(0.0));
            down.push((-delta).max(0.0));
        }
    }

    let avg_up = rolling_mean(&up, period);
    let avg_down = rolling_mean(&down, period);

    avg_up
        .iter()
        .zip(&avg_down)
        .map(|(&g, &l)| rsi_from_averages(g, l))
        .collect()
}

/// Classify an RSI reading for display.
pub fn rsi_zone(value: f64) -> Option<&'static str> {
    if !value.is_finite() {
        return None;
    }
    let label = if value >= 70.0 {
        "OVERBOUGHT"
    } else if value <= 30.0 {
        "OVERSOLD"
    } else {
        "NEUTRAL"
    };
    Some(label)
}

// =============================================================================
// Internal helpers
// =============================================================================

/// Convert average gain / average loss into an RSI value in [0, 100].
///
/// - Either average undefined => NaN.
/// - Average loss zero => 100.0, whatever the average gain.
fn rsi_from_averages(avg_up: f64, avg_down: f64) -> f64 {
    if avg_up.is_nan() || avg_down.is_nan() {
        return f64::NAN;
    }
    if avg_down == 0.0 {
        return 100.0;
    }
    let rs = avg_up / avg_down;
    100.0 - 100.0 / (1.0 + rs)
}
