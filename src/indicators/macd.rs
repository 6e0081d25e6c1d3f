// =============================================================================
// MACD — Moving Average Convergence Divergence
// =============================================================================
//
//   MACD   = EMA(close, 12) - EMA(close, 26)
//   Signal = EMA(MACD, 9)
//
// Both EMAs use the recursive form seeded with the first close, so MACD is
// defined from the first row onward.

use super::ema::calculate_ema;

pub const FAST_SPAN: usize = 12;
pub const SLOW_SPAN: usize = 26;
pub const SIGNAL_SPAN: usize = 9;

/// MACD line and its signal line, one value per input row.
#[derive(Debug, Clone, Default)]
pub struct MacdSeries {
    pub macd: Vec<f64>,
    pub signal: Vec<f64>,
}

/// MACD with the standard 12 / 26 / 9 spans.
pub fn calculate_macd(closes: &[f64]) -> MacdSeries {
    calculate_macd_with(closes, FAST_SPAN, SLOW_SPAN, SIGNAL_SPAN)
}

pub fn calculate_macd_with(closes: &[f64], fast: usize, slow: usize, signal: usize) -> MacdSeries {
    let fast_ema = calculate_ema(closes, fast);
    let slow_ema = calculate_ema(closes, slow);
    let macd: Vec<f64> = fast_ema.iter().zip(&slow_ema).map(|(f, s)| f - s).collect();
    let signal = calculate_ema(&macd, signal);
    MacdSeries { macd, signal }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn macd_empty_input() {
        let m = calculate_macd(&[]);
        assert!(m.macd.is_empty());
        assert!(m.signal.is_empty());
    }

    #[test]
    fn macd_constant_series_is_zero() {
        let m = calculate_macd(&vec![150.25; 60]);
        for (macd, signal) in m.macd.iter().zip(&m.signal) {
            assert!(macd.abs() < 1e-12);
            assert!(signal.abs() < 1e-12);
        }
    }

    #[test]
    fn macd_rising_series_is_positive() {
        let closes: Vec<f64> = (1..=100).map(|x| x as f64).collect();
        let m = calculate_macd(&closes);
        assert_eq!(m.macd[0], 0.0);
        assert!(m.macd[99] > 0.0);
        assert!(m.signal[99] > 0.0);
        assert!(m.signal[99] < m.macd[99]);
    }

    #[test]
    fn macd_matches_component_emas() {
        let closes = vec![10.0, 10.5, 10.2, 11.0, 11.4, 10.9, 11.8];
        let m = calculate_macd(&closes);
        let fast = calculate_ema(&closes, 12);
        let slow = calculate_ema(&closes, 26);
        for i in 0..closes.len() {
            assert!((m.macd[i] - (fast[i] - slow[i])).abs() < 1e-12);
        }
        assert!(m.signal[6].is_finite());
    }

    #[test]
    fn macd_all_nan_is_all_nan() {
        let m = calculate_macd(&[f64::NAN; 10]);
        assert!(m.macd.iter().all(|v| v.is_nan()));
        assert!(m.signal.iter().all(|v| v.is_nan()));
    }
}
