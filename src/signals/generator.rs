// =============================================================================
// Signal contract shared by every generator
// =============================================================================

use serde::{Deserialize, Serialize};

use crate::regime::TrendContext;
use crate::types::{Category, OutcomeSeries};

/// A single directional vote for the next outcome.
///
/// Created by a generator with `adjusted_weight == base_weight`, re-weighted
/// once by the performance ledger, then read-only for the rest of the cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub source: String,
    pub prediction: Category,
    pub base_weight: f64,
    pub adjusted_weight: f64,
}

impl Signal {
    pub fn new(source: impl Into<String>, prediction: Category, weight: f64) -> Self {
        let weight = if weight.is_finite() { weight.max(0.0) } else { 0.0 };
        Self {
            source: source.into(),
            prediction,
            base_weight: weight,
            adjusted_weight: weight,
        }
    }
}

/// Compact form of a signal as reported to callers and round-tripped through
/// feedback: who voted, which way, and with what adjusted weight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContributingSignal {
    pub source: String,
    pub prediction: Category,
    pub weight: f64,
}

impl From<&Signal> for ContributingSignal {
    fn from(signal: &Signal) -> Self {
        Self {
            source: signal.source.clone(),
            prediction: signal.prediction,
            weight: signal.adjusted_weight,
        }
    }
}

/// Uniform generator interface: history + trend snapshot + base weight in,
/// an optional vote out. Returning `None` means the generator abstains.
///
/// Generators needing derived inputs (oscillators, feature vectors) compute
/// them from the series themselves.
pub trait SignalGenerator: Send + Sync {
    /// Stable identifier used as the performance-ledger key.
    fn source(&self) -> &'static str;

    fn generate(
        &self,
        history: &OutcomeSeries,
        context: &TrendContext,
        base_weight: f64,
    ) -> Option<Signal>;
}
