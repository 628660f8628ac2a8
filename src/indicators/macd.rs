// =============================================================================
// MACD (Moving Average Convergence / Divergence)
// =============================================================================
//
//   MACD line   = EMA(short) - EMA(long)
//   Signal line = EMA(signal) of the MACD line
//   Histogram   = MACD line - Signal line
//
// Crossover detection needs both the current and the previous bar, so the
// result carries the last two points.

use crate::indicators::ema::calculate_ema;

/// One bar of MACD output.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MacdPoint {
    pub macd: f64,
    pub signal: f64,
    pub histogram: f64,
}

/// Current and previous MACD bars.
#[derive(Debug, Clone, Copy)]
pub struct MacdResult {
    pub current: MacdPoint,
    pub previous: MacdPoint,
}

/// Compute MACD on a newest-first sequence.
///
/// Requires `long + signal` points so that the signal line has two values.
/// Returns `None` for zero periods, `short >= long`, or insufficient data.
pub fn calculate_macd(
    values: &[f64],
    short: usize,
    long: usize,
    signal: usize,
) -> Option<MacdResult> {
    if short == 0 || signal == 0 || short >= long || values.len() < long + signal {
        return None;
    }

    let chronological: Vec<f64> = values.iter().rev().copied().collect();
    let short_ema = calculate_ema(&chronological, short);
    let long_ema = calculate_ema(&chronological, long);
    if long_ema.is_empty() {
        return None;
    }

    // short_ema starts (long - short) bars before long_ema.
    let offset = long - short;
    let macd_line: Vec<f64> = long_ema
        .iter()
        .enumerate()
        .filter_map(|(i, l)| short_ema.get(i + offset).map(|s| s - l))
        .collect();

    let signal_line = calculate_ema(&macd_line, signal);
    if signal_line.len() < 2 {
        return None;
    }

    let point = |back: usize| -> Option<MacdPoint> {
        let macd = *macd_line.get(macd_line.len().checked_sub(1 + back)?)?;
        let sig = *signal_line.get(signal_line.len().checked_sub(1 + back)?)?;
        Some(MacdPoint {
            macd,
            signal: sig,
            histogram: macd - sig,
        })
    };

    Some(MacdResult {
        current: point(0)?,
        previous: point(1)?,
    })
}
