// =============================================================================
// Exponential Moving Average (EMA)
// =============================================================================
//
// EMA gives more weight to recent outcomes, making it more responsive than the
// Simple Moving Average (SMA).
//
// Formula:
//   multiplier = 2 / (period + 1)
//   EMA_t      = value_t * multiplier + EMA_{t-1} * (1 - multiplier)
//
// The very first EMA value is seeded with the SMA of the oldest `period`
// values, then the recurrence walks forward in time.
// =============================================================================

/// Compute the EMA series for a chronological slice (oldest first).
///
/// Returns an empty `Vec` when the input is too short or the period is zero.
/// Each output element corresponds to an input starting at index `period - 1`.
///
/// # Edge cases
/// - `period == 0` => empty vec
/// - `chronological.len() < period` => empty vec
/// - A non-finite intermediate value truncates the series.
pub fn calculate_ema(chronological: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || chronological.len() < period {
        return Vec::new();
    }

    let multiplier = 2.0 / (period + 1) as f64;

    let seed: f64 = chronological[..period].iter().sum::<f64>() / period as f64;
    if !seed.is_finite() {
        return Vec::new();
    }

    let mut result = Vec::with_capacity(chronological.len() - period + 1);
    result.push(seed);

    let mut prev_ema = seed;
    for &value in &chronological[period..] {
        let ema = value * multiplier + prev_ema * (1.0 - multiplier);
        if !ema.is_finite() {
            break;
        }
        result.push(ema);
        prev_ema = ema;
    }

    result
}

/// Current EMA of a newest-first sequence.
///
/// The sequence is reversed into chronological order, seeded with the SMA of
/// its oldest `period` points and walked forward to the newest point.
pub fn ema(values: &[f64], period: usize) -> Option<f64> {
    let chronological: Vec<f64> = values.iter().rev().copied().collect();
    calculate_ema(&chronological, period).last().copied()
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
        assert!(ema(&[], 5).is_none());
    }

    #[test]
    fn ema_period_zero() {
        assert!(calculate_ema(&[1.0, 2.0, 3.0], 0).is_empty());
    }

    #[test]
    fn ema_insufficient_data() {
        assert!(ema(&[1.0, 2.0], 5).is_none());
    }

    #[test]
    fn ema_period_equals_length_is_sma() {
        let value = ema(&[2.0, 4.0, 6.0], 3).unwrap();
        assert!((value - 4.0).abs() < 1e-10);
    }

    #[test]
    fn ema_known_values() {
        // Chronological 1..=10, period 5: seed 3.0, multiplier 1/3.
        let chronological: Vec<f64> = (1..=10).map(|x| x as f64).collect();
        let series = calculate_ema(&chronological, 5);
        assert_eq!(series.len(), 6);

        let mult = 2.0 / 6.0;
        let mut expected = 3.0;
        for &c in &chronological[5..] {
            expected = c * mult + expected * (1.0 - mult);
        }
        assert!((series[5] - expected).abs() < 1e-10);

        // Newest-first input gives the same final value.
        let newest_first: Vec<f64> = chronological.iter().rev().copied().collect();
        let current = ema(&newest_first, 5).unwrap();
        assert!((current - expected).abs() < 1e-10);
    }

    #[test]
    fn ema_tracks_recent_values_more_closely() {
        // Newest values are high, older ones low.
        let mut values = vec![9.0; 5];
        values.extend(vec![0.0; 20]);
        let fast = ema(&values, 3).unwrap();
        let slow = ema(&values, 20).unwrap();
        assert!(fast > slow);
    }

    #[test]
    fn ema_handles_nan_in_input() {
        let series = calculate_ema(&[1.0, 2.0, 3.0, f64::NAN, 5.0], 3);
        assert_eq!(series.len(), 1);
    }
}
