// =============================================================================
// Exponential Moving Average (EMA), recursive form
// =============================================================================
//
//   k      = 2 / (span + 1)
//   EMA_0  = x_0
//   EMA_t  = x_t * k + EMA_{t-1} * (1 - k)
//
// The series is seeded with the first observation rather than an SMA, so
// every row from the first non-NaN input onward has a value.  A missing
// input carries the previous EMA forward; the weight of that previous value
// keeps decaying by (1 - k) per missing row, so the next observation is
// blended as if the gap rows had been seen.
// =============================================================================

/// Compute the EMA of `values` for the given `span`.
///
/// Returns a vector the same length as `values`. `span == 0` yields an
/// all-NaN vector.
pub fn calculate_ema(values: &[f64], span: usize) -> Vec<f64> {
    let mut out = vec![f64::NAN; values.len()];
    if span == 0 {
        return out;
    }

    let alpha = 2.0 / (span as f64 + 1.0);
    let decay = 1.0 - alpha;

    let mut weighted = f64::NAN;
    let mut old_wt = 1.0;

    for (slot, &x) in out.iter_mut().zip(values) {
        let observed = !x.is_nan();
        if weighted.is_nan() {
            if observed {
                weighted = x;
            }
        } else {
            old_wt *= decay;
            if observed {
                if weighted != x {
                    weighted = (old_wt * weighted + alpha * x) / (old_wt + alpha);
                }
                old_wt = 1.0;
            }
        }
        *slot = weighted;
    }

    out
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ema_empty_input() {
        assert!(calculate_ema(&[], 5).is_empty());
    }

    #[test]
    fn ema_span_zero() {
        assert!(calculate_ema(&[1.0, 2.0, 3.0], 0).iter().all(|v| v.is_nan()));
    }

    #[test]
    fn ema_seeded_with_first_value() {
        let ema = calculate_ema(&[7.0, 8.0], 12);
        assert!((ema[0] - 7.0).abs() < 1e-12);
    }

    #[test]
    fn ema_known_values() {
        let closes: Vec<f64> = (1..=10).map(|x| x as f64).collect();
        let ema = calculate_ema(&closes, 5);
        assert_eq!(ema.len(), 10);

        let k = 2.0 / 6.0;
        let mut expected = closes[0];
        assert!((ema[0] - expected).abs() < 1e-12);
        for i in 1..closes.len() {
            expected = closes[i] * k + expected * (1.0 - k);
            assert!((ema[i] - expected).abs() < 1e-10, "index {i}: got {}, expected {expected}", ema[i]);
        }
    }

    #[test]
    fn ema_constant_series_is_constant() {
        let ema = calculate_ema(&vec![3.3; 40], 26);
        assert!(ema.iter().all(|&v| v == 3.3));
    }

    #[test]
    fn ema_leading_nan_stays_nan() {
        let ema = calculate_ema(&[f64::NAN, f64::NAN, 4.0, 6.0], 3);
        assert!(ema[0].is_nan());
        assert!(ema[1].is_nan());
        assert!((ema[2] - 4.0).abs() < 1e-12);
        assert!((ema[3] - 5.0).abs() < 1e-12);
    }

    #[test]
    fn ema_interior_nan_carries_forward() {
        let ema = calculate_ema(&[2.0, f64::NAN, 4.0], 3);
        assert!((ema[1] - 2.0).abs() < 1e-12);
        // Previous weight decayed twice: (0.25*2 + 0.5*4) / (0.25 + 0.5).
        let expected = (0.25 * 2.0 + 0.5 * 4.0) / 0.75;
        assert!((ema[2] - expected).abs() < 1e-12);
    }

    #[test]
    fn ema_all_nan() {
        assert!(calculate_ema(&[f64::NAN; 5], 9).iter().all(|v| v.is_nan()));
    }
}
