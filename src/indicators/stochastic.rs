// =============================================================================
// Stochastic Oscillator (%K / %D)
// =============================================================================
//
//   raw %K_t = (value_t - lowest_n) / (highest_n - lowest_n) * 100
//   %K       = SMA(k_smooth) of raw %K
//   %D       = SMA(d_smooth) of %K
//
// A flat lookback window (highest == lowest) maps raw %K to 50.

use crate::indicators::sma::sma;

/// One bar of stochastic output.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StochasticPoint {
    pub k: f64,
    pub d: f64,
}

/// Current and previous stochastic bars.
#[derive(Debug, Clone, Copy)]
pub struct StochasticResult {
    pub current: StochasticPoint,
    pub previous: StochasticPoint,
}

/// Raw %K for every bar that has a full lookback window, newest first.
fn raw_k_series(values: &[f64], lookback: usize) -> Vec<f64> {
    if lookback == 0 || values.len() < lookback {
        return Vec::new();
    }
    (0..=values.len() - lookback)
        .map(|start| {
            let window = &values[start..start + lookback];
            let low = window.iter().copied().fold(f64::INFINITY, f64::min);
            let high = window.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            let range = high - low;
            if range < f64::EPSILON {
                50.0
            } else {
                (values[start] - low) / range * 100.0
            }
        })
        .collect()
}

/// Smoothed %K / %D on a newest-first sequence, current and previous bar.
///
/// Needs `lookback + k_smooth + d_smooth - 1` points.
pub fn calculate_stochastic(
    values: &[f64],
    lookback: usize,
    k_smooth: usize,
    d_smooth: usize,
) -> Option<StochasticResult> {
    if k_smooth == 0 || d_smooth == 0 {
        return None;
    }

    let raw = raw_k_series(values, lookback);
    if raw.len() < k_smooth {
        return None;
    }

    let k_series: Vec<f64> = (0..=raw.len() - k_smooth)
        .filter_map(|i| sma(&raw[i..], k_smooth))
        .collect();
    if k_series.len() < d_smooth + 1 {
        return None;
    }

    let point = |i: usize| -> Option<StochasticPoint> {
        Some(StochasticPoint {
            k: *k_series.get(i)?,
            d: sma(k_series.get(i..)?, d_smooth)?,
        })
    };

    Some(StochasticResult {
        current: point(0)?,
        previous: point(1)?,
    })
}
