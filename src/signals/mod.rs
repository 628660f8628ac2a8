// =============================================================================
// Signals Module
// =============================================================================
//
// Independent directional voters for the next outcome:
// - Streak break, extreme reversion (run / jump patterns)
// - RSI reversal, MACD cross, Bollinger breach, stochastic cross (oscillators)
// - External model adapter (injected model behind a trait)
// - Consensus factor and the weighted-majority meta-signal

pub mod bollinger_breach;
pub mod consensus;
pub mod extreme_reversion;
pub mod external_model;
pub mod generator;
pub mod macd_cross;
pub mod rsi_reversal;
pub mod stochastic_cross;
pub mod streak;

use std::sync::Arc;

use crate::external::ExternalModel;
use crate::runtime_config::SignalParams;

pub use bollinger_breach::BollingerBreach;
pub use consensus::{category_weights, consensus_factor, weighted_majority_signal};
pub use extreme_reversion::ExtremeReversion;
pub use external_model::ExternalModelSignal;
pub use generator::{ContributingSignal, Signal, SignalGenerator};
pub use macd_cross::MacdCross;
pub use rsi_reversal::RsiReversal;
pub use stochastic_cross::StochasticCross;
pub use streak::StreakBreak;

/// A generator paired with the base weight it votes with.
pub struct WeightedGenerator {
    pub generator: Box<dyn SignalGenerator>,
    pub base_weight: f64,
}

/// The full generator roster in evaluation order.
pub fn build_generators(
    params: &SignalParams,
    model: Arc<dyn ExternalModel>,
) -> Vec<WeightedGenerator> {
    let w = &params.weights;
    let roster: Vec<(Box<dyn SignalGenerator>, f64)> = vec![
        (Box::new(StreakBreak::from_params(params)), w.streak_break),
        (Box::new(RsiReversal::from_params(params)), w.rsi_reversal),
        (Box::new(MacdCross::from_params(params)), w.macd_cross),
        (Box::new(BollingerBreach::from_params(params)), w.bollinger_breach),
        (Box::new(StochasticCross::from_params(params)), w.stochastic_cross),
        (Box::new(ExtremeReversion::from_params(params)), w.extreme_reversion),
        (Box::new(ExternalModelSignal::new(model, params)), w.external_model),
    ];
    roster
        .into_iter()
        .map(|(generator, base_weight)| WeightedGenerator { generator, base_weight })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::external::RuleTableModel;
    use std::collections::HashSet;

    #[test]
    fn roster_sources_are_unique() {
        let roster = build_generators(&SignalParams::default(), Arc::new(RuleTableModel));
        let sources: HashSet<&str> = roster.iter().map(|g| g.generator.source()).collect();
        assert_eq!(sources.len(), roster.len());
        assert_eq!(roster.len(), 7);
    }
}
