// =============================================================================
// Simple Moving Average (SMA) and rolling statistics
// =============================================================================
//
//   MA[i] = mean(close[i-w+1 ..= i])   for i >= w - 1
//
// The first `w - 1` outputs are NaN.  A NaN anywhere inside a window makes
// that window's output NaN, so gaps in the source data stay visible.
// =============================================================================

/// Trailing mean of `values` over `window` rows.
///
/// Returns a vector the same length as `values`. `window == 0` yields an
/// all-NaN vector.
pub fn rolling_mean(values: &[f64], window: usize) -> Vec<f64> {
    let mut out = vec![f64::NAN; values.len()];
    if window == 0 || values.len() < window {
        return out;
    }

    let divisor = window as f64;
    for (i, slot) in out.iter_mut().enumerate().skip(window - 1) {
        let slice = &values[i + 1 - window..=i];
        *slot = slice.iter().sum::<f64>() / divisor;
    }
    out
}

/// Trailing sample standard deviation (ddof = 1) of `values` over `window`
/// rows, aligned with [`rolling_mean`].
///
/// A window of one row has no sample deviation and yields NaN.
pub fn rolling_std(values: &[f64], window: usize) -> Vec<f64> {
    let mut out = vec![f64::NAN; values.len()];
    if window < 2 || values.len() < window {
        return out;
    }

    let n = window as f64;
    for (i, slot) in out.iter_mut().enumerate().skip(window - 1) {
        let slice = &values[i + 1 - window..=i];
        let mean = slice.iter().sum::<f64>() / n;
        let ss: f64 = slice.iter().map(|x| (x - mean).powi(2)).sum();
        *slot = (ss / (n - 1.0)).sqrt();
    }
    out
}

/// Moving average of closing prices.
pub fn calculate_sma(closes: &[f64], window: usize) -> Vec<f64> {
    rolling_mean(closes, window)
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sma_empty_input() {
        assert!(calculate_sma(&[], 5).is_empty());
    }

    #[test]
    fn sma_window_zero_is_all_nan() {
        let out = calculate_sma(&[1.0, 2.0, 3.0], 0);
        assert_eq!(out.len(), 3);
        assert!(out.iter().all(|v| v.is_nan()));
    }

    #[test]
    fn sma_window_longer_than_series() {
        let out = calculate_sma(&[1.0, 2.0], 5);
        assert_eq!(out.len(), 2);
        assert!(out.iter().all(|v| v.is_nan()));
    }

    #[test]
    fn sma_ascending_closes_window_five() {
        let closes: Vec<f64> = (10..=20).map(|x| x as f64).collect();
        let ma = calculate_sma(&closes, 5);
        assert_eq!(ma.len(), 11);
        for v in &ma[..4] {
            assert!(v.is_nan());
        }
        assert!((ma[4] - 12.0).abs() < 1e-12);
        assert!((ma[10] - 18.0).abs() < 1e-12);
        for (i, v) in ma.iter().enumerate().skip(4) {
            assert!((v - (i as f64 + 8.0)).abs() < 1e-12, "index {i}: {v}");
        }
    }

    #[test]
    fn sma_constant_series_equals_constant() {
        let closes = vec![42.5; 50];
        for window in [1, 5, 20, 50] {
            let ma = calculate_sma(&closes, window);
            for v in ma.iter().skip(window - 1) {
                assert!((v - 42.5).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn sma_nan_poisons_only_windows_containing_it() {
        let closes = vec![1.0, 2.0, f64::NAN, 4.0, 5.0, 6.0, 7.0];
        let ma = calculate_sma(&closes, 3);
        assert!(ma[2].is_nan());
        assert!(ma[3].is_nan());
        assert!(ma[4].is_nan());
        assert!((ma[5] - 5.0).abs() < 1e-12);
        assert!((ma[6] - 6.0).abs() < 1e-12);
    }

    #[test]
    fn rolling_std_is_sample_deviation() {
        // [2, 4, 4, 4, 5, 5, 7, 9]: mean 5, sum of squares 32, n-1 = 7.
        let values = vec![2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        let std = rolling_std(&values, 8);
        assert!(std[..7].iter().all(|v| v.is_nan()));
        assert!((std[7] - (32.0_f64 / 7.0).sqrt()).abs() < 1e-12);
    }

    #[test]
    fn rolling_std_window_one_is_nan() {
        let std = rolling_std(&[1.0, 2.0, 3.0], 1);
        assert!(std.iter().all(|v| v.is_nan()));
    }
}
