// =============================================================================
// Extreme Reversion — jump between the two numeric extremes
// =============================================================================
//
// Fires when the two newest outcomes sit at opposite extremes of the digit
// range (one <= low, the other >= high). The next outcome is predicted to
// reverse the newest one. A second jump one bar further back (a 3-point
// extreme zig-zag) raises the factor from 0.60 to 0.85.

use tracing::trace;

use crate::regime::TrendContext;
use crate::runtime_config::SignalParams;
use crate::signals::generator::{Signal, SignalGenerator};
use crate::types::OutcomeSeries;

const SINGLE_JUMP_FACTOR: f64 = 0.60;
const DOUBLE_JUMP_FACTOR: f64 = 0.85;

pub struct ExtremeReversion {
    low: f64,
    high: f64,
}

impl ExtremeReversion {
    pub fn from_params(params: &SignalParams) -> Self {
        Self {
            low: params.extreme_low,
            high: params.extreme_high,
        }
    }

    fn is_jump(&self, a: f64, b: f64) -> bool {
        (a <= self.low && b >= self.high) || (a >= self.high && b <= self.low)
    }
}

impl SignalGenerator for ExtremeReversion {
    fn source(&self) -> &'static str {
        "extreme_reversion"
    }

    fn generate(
        &self,
        history: &OutcomeSeries,
        context: &TrendContext,
        base_weight: f64,
    ) -> Option<Signal> {
        if context.is_unknown() || self.low >= self.high {
            return None;
        }
        let (newest, previous) = match history.values.as_slice() {
            [a, b, ..] => (*a, *b),
            _ => return None,
        };
        if !self.is_jump(newest, previous) {
            return None;
        }

        let double = history
            .values
            .get(2)
            .is_some_and(|third| self.is_jump(previous, *third));
        let factor = if double { DOUBLE_JUMP_FACTOR } else { SINGLE_JUMP_FACTOR };
        trace!(newest, previous, double, "Extreme reversion: jump detected");

        let latest = history.latest_category()?;
        Some(Signal::new(self.source(), latest.opposite(), base_weight * factor))
    }
}
