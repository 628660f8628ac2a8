// =============================================================================
// MACD Cross — signal-line crossover between the previous and current bar
// =============================================================================
//
//   previous MACD <= signal, current MACD > signal  => BIG
//   previous MACD >= signal, current MACD < signal  => SMALL
//
// Strength = min(1, |histogram| / scale), scale defaulting to 0.5.

use tracing::trace;

use crate::indicators::calculate_macd;
use crate::regime::TrendContext;
use crate::runtime_config::SignalParams;
use crate::signals::generator::{Signal, SignalGenerator};
use crate::types::{Category, OutcomeSeries};

/// Histograms smaller than this are recurrence noise, not a crossover.
const HISTOGRAM_EPSILON: f64 = 1e-9;

pub struct MacdCross {
    short: usize,
    long: usize,
    signal: usize,
    scale: f64,
}

impl MacdCross {
    pub fn from_params(params: &SignalParams) -> Self {
        Self {
            short: params.macd_short,
            long: params.macd_long,
            signal: params.macd_signal,
            scale: params.macd_scale,
        }
    }
}

impl SignalGenerator for MacdCross {
    fn source(&self) -> &'static str {
        "macd_cross"
    }

    fn generate(
        &self,
        history: &OutcomeSeries,
        context: &TrendContext,
        base_weight: f64,
    ) -> Option<Signal> {
        if context.is_unknown() || self.scale <= 0.0 {
            return None;
        }
        let macd = calculate_macd(&history.values, self.short, self.long, self.signal)?;
        let (prev, cur) = (macd.previous, macd.current);
        if cur.histogram.abs() < HISTOGRAM_EPSILON {
            return None;
        }

        let prediction = if prev.macd <= prev.signal && cur.macd > cur.signal {
            Category::Big
        } else if prev.macd >= prev.signal && cur.macd < cur.signal {
            Category::Small
        } else {
            trace!(histogram = format!("{:.4}", cur.histogram), "MACD: no crossover");
            return None;
        };

        let strength = (cur.histogram.abs() / self.scale).min(1.0);
        Some(Signal::new(self.source(), prediction, base_weight * strength))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::regime::TrendStrength;

    fn known() -> TrendContext {
        TrendContext {
            strength: TrendStrength::Weak,
            ..TrendContext::unknown()
        }
    }

    fn generator() -> MacdCross {
        MacdCross::from_params(&SignalParams::default())
    }

    #[test]
    fn rebound_after_drop_crosses_up() {
        // Newest-first: two 9s after a sharp drop from a long flat 5.
        let mut digits = vec![9u8, 9, 0, 0, 0];
        digits.extend(vec![5u8; 45]);
        let history = OutcomeSeries::from_digits(&digits);
        let signal = generator().generate(&history, &known(), 1.0).unwrap();
        assert_eq!(signal.prediction, Category::Big);
        assert!(signal.base_weight > 0.0 && signal.base_weight <= 1.0);
    }

    #[test]
    fn pullback_after_spike_crosses_down() {
        let mut digits = vec![0u8, 0, 9, 9, 9];
        digits.extend(vec![4u8; 45]);
        let history = OutcomeSeries::from_digits(&digits);
        let signal = generator().generate(&history, &known(), 1.0).unwrap();
        assert_eq!(signal.prediction, Category::Small);
    }

    #[test]
    fn flat_history_abstains() {
        let history = OutcomeSeries::from_digits(&[5; 60]);
        assert!(generator().generate(&history, &known(), 1.0).is_none());
    }
}
