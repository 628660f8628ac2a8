// =============================================================================
// RSI Reversal — volatility-aware overbought / oversold fade
// =============================================================================
//
// Bands tighten as volatility falls, so a calm stream needs a smaller
// excursion to trigger:
//
//   VERY_LOW  65 / 35
//   LOW       68 / 32
//   MEDIUM    72 / 28
//   HIGH      78 / 22
//   UNKNOWN   70 / 30
//
// Below oversold => BIG, above overbought => SMALL. Strength runs from 0.5
// at the band to 1.0 at the RSI extreme.

use tracing::trace;

use crate::indicators::rsi;
use crate::regime::{TrendContext, VolatilityTier};
use crate::runtime_config::SignalParams;
use crate::signals::generator::{Signal, SignalGenerator};
use crate::types::{Category, OutcomeSeries};

/// `(overbought, oversold)` for a volatility tier.
pub fn rsi_thresholds(volatility: VolatilityTier) -> (f64, f64) {
    match volatility {
        VolatilityTier::VeryLow => (65.0, 35.0),
        VolatilityTier::Low => (68.0, 32.0),
        VolatilityTier::Medium => (72.0, 28.0),
        VolatilityTier::High => (78.0, 22.0),
        VolatilityTier::Unknown => (70.0, 30.0),
    }
}

pub struct RsiReversal {
    period: usize,
}

impl RsiReversal {
    pub fn from_params(params: &SignalParams) -> Self {
        Self {
            period: params.rsi_period,
        }
    }
}

impl SignalGenerator for RsiReversal {
    fn source(&self) -> &'static str {
        "rsi_reversal"
    }

    fn generate(
        &self,
        history: &OutcomeSeries,
        context: &TrendContext,
        base_weight: f64,
    ) -> Option<Signal> {
        if context.is_unknown() {
            return None;
        }
        let value = rsi(&history.values, self.period)?;
        let (overbought, oversold) = rsi_thresholds(context.volatility);

        let (prediction, depth) = if value < oversold {
            (Category::Big, (oversold - value) / oversold)
        } else if value > overbought {
            (Category::Small, (value - overbought) / (100.0 - overbought))
        } else {
            trace!(rsi = format!("{:.2}", value), "RSI reversal: inside bands");
            return None;
        };

        let strength = (0.5 + 0.5 * depth).clamp(0.5, 1.0);
        Some(Signal::new(self.source(), prediction, base_weight * strength))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::regime::TrendStrength;

    fn ctx(volatility: VolatilityTier) -> TrendContext {
        TrendContext {
            strength: TrendStrength::Weak,
            volatility,
            ..TrendContext::unknown()
        }
    }

    #[test]
    fn thresholds_widen_with_volatility() {
        let (ob_vl, os_vl) = rsi_thresholds(VolatilityTier::VeryLow);
        let (ob_l, os_l) = rsi_thresholds(VolatilityTier::Low);
        let (ob_m, os_m) = rsi_thresholds(VolatilityTier::Medium);
        let (ob_h, os_h) = rsi_thresholds(VolatilityTier::High);
        assert_eq!((os_vl, os_l, os_m, os_h), (35.0, 32.0, 28.0, 22.0));
        assert!(os_vl > os_l && os_l > os_m && os_m > os_h);
        assert!(ob_vl < ob_l && ob_l < ob_m && ob_m < ob_h);
    }

    #[test]
    fn falling_stream_predicts_big() {
        // Newest-first: values keep dropping toward the present.
        let digits: Vec<u8> = (0..20).map(|i| (i / 2).min(9) as u8).collect();
        let history = OutcomeSeries::from_digits(&digits);
        let signal = RsiReversal::from_params(&SignalParams::default())
            .generate(&history, &ctx(VolatilityTier::Medium), 1.0)
            .unwrap();
        assert_eq!(signal.prediction, Category::Big);
        assert!(signal.base_weight > 0.5 && signal.base_weight <= 1.0);
    }

    #[test]
    fn rising_stream_predicts_small() {
        let digits: Vec<u8> = (0..20).map(|i| 9 - (i / 2).min(9) as u8).collect();
        let history = OutcomeSeries::from_digits(&digits);
        let signal = RsiReversal::from_params(&SignalParams::default())
            .generate(&history, &ctx(VolatilityTier::High), 1.0)
            .unwrap();
        assert_eq!(signal.prediction, Category::Small);
    }

    #[test]
    fn insufficient_history_abstains() {
        let history = OutcomeSeries::from_digits(&[1, 2, 3]);
        assert!(RsiReversal::from_params(&SignalParams::default())
            .generate(&history, &ctx(VolatilityTier::Low), 1.0)
            .is_none());
    }
}
