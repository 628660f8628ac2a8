// =============================================================================
// Stochastic Cross — %K / %D crossover near the extremes
// =============================================================================
//
// Bands move with volatility the same way the RSI bands do:
//
//   VERY_LOW  75 / 25
//   LOW       78 / 22
//   MEDIUM    80 / 20
//   HIGH      85 / 15
//   UNKNOWN   80 / 20
//
// A bullish cross (%K from <= %D to > %D) votes BIG only while %K sits within
// `buffer` of the oversold line; a bearish cross votes SMALL only within
// `buffer` of the overbought line. Crosses deep inside an extreme, or in the
// middle of the range, are ignored.

use tracing::trace;

use crate::indicators::calculate_stochastic;
use crate::regime::{TrendContext, VolatilityTier};
use crate::runtime_config::SignalParams;
use crate::signals::generator::{Signal, SignalGenerator};
use crate::types::{Category, OutcomeSeries};

/// `(overbought, oversold)` for a volatility tier.
pub fn stochastic_bands(volatility: VolatilityTier) -> (f64, f64) {
    match volatility {
        VolatilityTier::VeryLow => (75.0, 25.0),
        VolatilityTier::Low => (78.0, 22.0),
        VolatilityTier::Medium => (80.0, 20.0),
        VolatilityTier::High => (85.0, 15.0),
        VolatilityTier::Unknown => (80.0, 20.0),
    }
}

pub struct StochasticCross {
    lookback: usize,
    k_smooth: usize,
    d_smooth: usize,
    buffer: f64,
}

impl StochasticCross {
    pub fn from_params(params: &SignalParams) -> Self {
        Self {
            lookback: params.stochastic_lookback,
            k_smooth: params.stochastic_k_smooth,
            d_smooth: params.stochastic_d_smooth,
            buffer: params.stochastic_buffer,
        }
    }
}

impl SignalGenerator for StochasticCross {
    fn source(&self) -> &'static str {
        "stochastic_cross"
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
        let stoch =
            calculate_stochastic(&history.values, self.lookback, self.k_smooth, self.d_smooth)?;
        let (prev, cur) = (stoch.previous, stoch.current);
        let (overbought, oversold) = stochastic_bands(context.volatility);
        let near = |level: f64| (cur.k - level).abs() <= self.buffer;

        let prediction = if prev.k <= prev.d && cur.k > cur.d && near(oversold) {
            Category::Big
        } else if prev.k >= prev.d && cur.k < cur.d && near(overbought) {
            Category::Small
        } else {
            trace!(
                k = format!("{:.1}", cur.k),
                d = format!("{:.1}", cur.d),
                "Stochastic: no qualifying cross"
            );
            return None;
        };

        let strength = (0.5 + (cur.k - cur.d).abs() / 20.0).min(1.0);
        Some(Signal::new(self.source(), prediction, base_weight * strength))
    }
}
