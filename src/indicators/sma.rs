// =============================================================================
// Simple and Volume-Weighted Averages
// =============================================================================
//
// Both operate on newest-first sequences and only ever look at the first
// `period` points.

/// Mean of the `period` most recent values.
///
/// Returns `None` when `period == 0` or fewer than `period` points exist.
pub fn sma(values: &[f64], period: usize) -> Option<f64> {
    if period == 0 || values.len() < period {
        return None;
    }
    let mean = values[..period].iter().sum::<f64>() / period as f64;
    mean.is_finite().then_some(mean)
}

/// Weighted average of the `period` most recent values.
///
/// `weights` is aligned with `values`; a missing weight (short slice or `None`)
/// counts as 1.0. Returns `None` when the total weight is not positive.
pub fn volume_weighted_average(
    values: &[f64],
    weights: Option<&[f64]>,
    period: usize,
) -> Option<f64> {
    if period == 0 || values.len() < period {
        return None;
    }

    let (weighted_sum, weight_total) = values[..period].iter().enumerate().fold(
        (0.0_f64, 0.0_f64),
        |(sum, total), (i, &v)| {
            let w = weights.and_then(|ws| ws.get(i).copied()).unwrap_or(1.0);
            (sum + v * w, total + w)
        },
    );

    if weight_total <= 0.0 {
        return None;
    }
    let avg = weighted_sum / weight_total;
    avg.is_finite().then_some(avg)
}
