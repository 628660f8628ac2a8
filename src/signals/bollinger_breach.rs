// =============================================================================
// Bollinger Breach — mean reversion from outside the band
// =============================================================================
//
// Latest value above the upper band => SMALL, below the lower band => BIG.
// Strength = min(1, 0.5 + depth / half_width), depth measured past the band.

use tracing::trace;

use crate::indicators::calculate_bollinger;
use crate::regime::TrendContext;
use crate::runtime_config::SignalParams;
use crate::signals::generator::{Signal, SignalGenerator};
use crate::types::{Category, OutcomeSeries};

pub struct BollingerBreach {
    period: usize,
    num_std: f64,
}

impl BollingerBreach {
    pub fn from_params(params: &SignalParams) -> Self {
        Self {
            period: params.bollinger_period,
            num_std: params.bollinger_std,
        }
    }
}

impl SignalGenerator for BollingerBreach {
    fn source(&self) -> &'static str {
        "bollinger_breach"
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
        let bands = calculate_bollinger(&history.values, self.period, self.num_std)?;
        let latest = *history.values.first()?;

        let (prediction, depth) = if latest > bands.upper {
            (Category::Small, latest - bands.upper)
        } else if latest < bands.lower {
            (Category::Big, bands.lower - latest)
        } else {
            trace!(
                latest,
                upper = format!("{:.3}", bands.upper),
                lower = format!("{:.3}", bands.lower),
                "Bollinger: inside band"
            );
            return None;
        };

        let strength = (0.5 + depth / bands.half_width).min(1.0);
        Some(Signal::new(self.source(), prediction, base_weight * strength))
    }
}
