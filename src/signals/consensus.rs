// =============================================================================
// Consensus — agreement factor and the weighted-majority meta-signal
// =============================================================================
//
// consensus factor:
//   f = 1 + 0.5 * |w_big - w_small| / w_total, clamped to [0.5, 1.5]
//   neutral 1.0 with fewer than 3 signals or no weight
//
// weighted majority (needs >= 4 adjusted signals):
//   p_big   = w_big / w_total        scaled_big   = p_big * f
//   p_small = w_small / w_total      scaled_small = p_small * (2 - f)
//   emit the side whose scaled mass is >= (1 + margin) times the other's

use tracing::debug;

use crate::runtime_config::SignalParams;
use crate::signals::generator::Signal;
use crate::types::Category;

pub const CONSENSUS_MIN_SIGNALS: usize = 3;
pub const CONSENSUS_MIN: f64 = 0.5;
pub const CONSENSUS_MAX: f64 = 1.5;

/// Adjusted weight summed per category: `(big, small)`.
pub fn category_weights(signals: &[Signal]) -> (f64, f64) {
    signals.iter().fold((0.0, 0.0), |(big, small), s| match s.prediction {
        Category::Big => (big + s.adjusted_weight, small),
        Category::Small => (big, small + s.adjusted_weight),
    })
}

pub fn consensus_factor(signals: &[Signal]) -> f64 {
    if signals.len() < CONSENSUS_MIN_SIGNALS {
        return 1.0;
    }
    let (big, small) = category_weights(signals);
    let total = big + small;
    if total <= 0.0 || !total.is_finite() {
        return 1.0;
    }
    (1.0 + 0.5 * (big - small).abs() / total).clamp(CONSENSUS_MIN, CONSENSUS_MAX)
}

/// Meta-signal over already-adjusted signals. Its weight is `base_weight`
/// times the winning side's share of the scaled mass.
pub fn weighted_majority_signal(
    signals: &[Signal],
    factor: f64,
    base_weight: f64,
    params: &SignalParams,
) -> Option<Signal> {
    if signals.len() < params.majority_min_signals.max(1) {
        return None;
    }
    let (big, small) = category_weights(signals);
    let total = big + small;
    if total <= 0.0 || !total.is_finite() {
        return None;
    }

    let scaled_big = big / total * factor;
    let scaled_small = small / total * (2.0 - factor);
    let threshold = 1.0 + params.majority_margin;

    let (prediction, winner, loser) = if scaled_big >= scaled_small * threshold {
        (Category::Big, scaled_big, scaled_small)
    } else if scaled_small >= scaled_big * threshold {
        (Category::Small, scaled_small, scaled_big)
    } else {
        debug!(
            scaled_big = format!("{:.3}", scaled_big),
            scaled_small = format!("{:.3}", scaled_small),
            "Weighted majority: no clear side"
        );
        return None;
    };

    let share = winner / (winner + loser);
    Some(Signal::new("weighted_majority", prediction, base_weight * share))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sig(prediction: Category, weight: f64) -> Signal {
        Signal::new("test", prediction, weight)
    }

    #[test]
    fn neutral_below_three_signals() {
        let signals = vec![sig(Category::Big, 1.0), sig(Category::Big, 1.0)];
        assert_eq!(consensus_factor(&signals), 1.0);
    }

    #[test]
    fn unanimous_signals_hit_upper_bound() {
        let signals = vec![sig(Category::Big, 0.4); 5];
        assert!((consensus_factor(&signals) - CONSENSUS_MAX).abs() < 1e-10);
    }

    #[test]
    fn balanced_signals_are_neutral() {
        let signals = vec![
            sig(Category::Big, 1.0),
            sig(Category::Small, 1.0),
            sig(Category::Big, 0.5),
            sig(Category::Small, 0.5),
        ];
        assert!((consensus_factor(&signals) - 1.0).abs() < 1e-10);
    }

    #[test]
    fn factor_always_within_bounds() {
        for n_big in 0..6 {
            for n_small in 0..6 {
                let mut signals = vec![sig(Category::Big, 0.7); n_big];
                signals.extend(vec![sig(Category::Small, 1.3); n_small]);
                let f = consensus_factor(&signals);
                assert!((CONSENSUS_MIN..=CONSENSUS_MAX).contains(&f));
            }
        }
    }

    #[test]
    fn majority_needs_four_signals() {
        let signals = vec![sig(Category::Big, 1.0); 3];
        assert!(weighted_majority_signal(&signals, 1.5, 1.2, &SignalParams::default()).is_none());
    }

    #[test]
    fn clear_majority_emits() {
        let signals = vec![
            sig(Category::Big, 1.0),
            sig(Category::Big, 0.9),
            sig(Category::Big, 0.8),
            sig(Category::Small, 0.5),
        ];
        let f = consensus_factor(&signals);
        let meta = weighted_majority_signal(&signals, f, 1.2, &SignalParams::default()).unwrap();
        assert_eq!(meta.source, "weighted_majority");
        assert_eq!(meta.prediction, Category::Big);
        assert!(meta.base_weight > 0.6 && meta.base_weight <= 1.2);
    }

    #[test]
    fn near_tie_abstains() {
        let signals = vec![
            sig(Category::Big, 1.0),
            sig(Category::Small, 1.0),
            sig(Category::Big, 0.5),
            sig(Category::Small, 0.55),
        ];
        let f = consensus_factor(&signals);
        assert!(weighted_majority_signal(&signals, f, 1.2, &SignalParams::default()).is_none());
    }
}
