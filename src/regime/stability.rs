// =============================================================================
// Trend Stability Check
// =============================================================================
//
// Looks at the raw BIG/SMALL stream over a short window and flags three
// kinds of instability that make an EMA-derived trend untrustworthy:
//
//   1. Outcome Dominance   : one category fills >= dominance_share of the
//                             window (a run that long is due to break)
//   2. Excessive Alternation: adjacent flips fill >= alternation_share of
//                             the window (pure chop)
//   3. Direction Conflict  : an aligned EMA trend points against the
//                             majority of the last ten outcomes

use serde::{Deserialize, Serialize};

use crate::regime::detector::{TrendContext, TrendDirection};
use crate::runtime_config::RegimeParams;
use crate::types::Category;

const CONFLICT_WINDOW: usize = 10;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendStability {
    pub is_stable: bool,
    /// `"Stable"` or `"Unstable: <cause>"`.
    pub reason: String,
    /// Share of the most frequent category in the window.
    pub dominance: f64,
    /// Share of adjacent pairs that flip category.
    pub alternation: f64,
}

impl TrendStability {
    fn stable(dominance: f64, alternation: f64) -> Self {
        Self {
            is_stable: true,
            reason: "Stable".to_string(),
            dominance,
            alternation,
        }
    }

    fn unstable(cause: &str, dominance: f64, alternation: f64) -> Self {
        Self {
            is_stable: false,
            reason: format!("Unstable: {cause}"),
            dominance,
            alternation,
        }
    }
}

/// Evaluate trend stability over the `stability_window` newest categories.
///
/// With fewer than two outcomes there is nothing to judge and the trend is
/// reported stable.
pub fn assess_stability(
    categories: &[Category],
    context: &TrendContext,
    params: &RegimeParams,
) -> TrendStability {
    let window = &categories[..categories.len().min(params.stability_window)];
    if window.len() < 2 {
        return TrendStability::stable(0.0, 0.0);
    }

    let big = window.iter().filter(|c| **c == Category::Big).count();
    let dominance = big.max(window.len() - big) as f64 / window.len() as f64;

    let flips = window.windows(2).filter(|w| w[0] != w[1]).count();
    let alternation = flips as f64 / (window.len() - 1) as f64;

    if dominance >= params.dominance_share {
        return TrendStability::unstable("Outcome Dominance", dominance, alternation);
    }
    if alternation >= params.alternation_share {
        return TrendStability::unstable("Excessive Alternation", dominance, alternation);
    }

    let recent = &window[..window.len().min(CONFLICT_WINDOW)];
    let recent_big = recent.iter().filter(|c| **c == Category::Big).count();
    let recent_small = recent.len() - recent_big;
    let conflict = match context.direction {
        TrendDirection::Big => recent_small > recent_big,
        TrendDirection::Small => recent_big > recent_small,
        _ => false,
    };
    if conflict {
        return TrendStability::unstable("Direction Conflict", dominance, alternation);
    }

    TrendStability::stable(dominance, alternation)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(direction: TrendDirection) -> TrendContext {
        TrendContext {
            direction,
            ..TrendContext::unknown()
        }
    }

    #[test]
    fn all_big_is_outcome_dominance() {
        let s = assess_stability(
            &[Category::Big; 60],
            &ctx(TrendDirection::Big),
            &RegimeParams::default(),
        );
        assert!(!s.is_stable);
        assert_eq!(s.reason, "Unstable: Outcome Dominance");
        assert!((s.dominance - 1.0).abs() < 1e-10);
    }

    #[test]
    fn strict_alternation_is_chop() {
        let cats: Vec<Category> = (0..60)
            .map(|i| if i % 2 == 0 { Category::Big } else { Category::Small })
            .collect();
        let s = assess_stability(&cats, &ctx(TrendDirection::Ranging), &RegimeParams::default());
        assert!(!s.is_stable);
        assert_eq!(s.reason, "Unstable: Excessive Alternation");
    }

    #[test]
    fn direction_conflict_detected() {
        // Newest ten mostly SMALL while the EMA stack says BIG.
        let mut cats = vec![
            Category::Small, Category::Small, Category::Big, Category::Small, Category::Small,
            Category::Small, Category::Big, Category::Small, Category::Small, Category::Big,
        ];
        cats.extend([
            Category::Big,
            Category::Big,
            Category::Small,
            Category::Big,
            Category::Big,
        ]);
        let s = assess_stability(&cats, &ctx(TrendDirection::Big), &RegimeParams::default());
        assert_eq!(s.reason, "Unstable: Direction Conflict");
    }

    #[test]
    fn mixed_stream_is_stable() {
        let cats = vec![
            Category::Big, Category::Big, Category::Small, Category::Small, Category::Big,
            Category::Small, Category::Small, Category::Big, Category::Big, Category::Small,
        ];
        let s = assess_stability(&cats, &ctx(TrendDirection::Ranging), &RegimeParams::default());
        assert!(s.is_stable);
        assert_eq!(s.reason, "Stable");
    }
}
