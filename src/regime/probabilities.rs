// =============================================================================
// Regime Probabilities — coarse BIG / SMALL bias from the trend snapshot
// =============================================================================
//
// A rule table, not a model. The base pair comes from trend direction and
// strength; high volatility and chaotic entropy then pull both sides back
// toward each other. Whatever mass is left over is "neutral".
//
//   direction            STRONG       MODERATE     WEAK / RANGING
//   BIG                  0.60/0.15    0.50/0.25    0.40/0.30
//   SMALL                0.15/0.60    0.25/0.50    0.30/0.40
//   RANGING_BIG_BIAS     0.38/0.32 regardless of strength
//   RANGING_SMALL_BIAS   0.32/0.38
//   RANGING / UNKNOWN    0.33/0.33

use serde::{Deserialize, Serialize};

use crate::regime::detector::{TrendContext, TrendDirection, TrendStrength, VolatilityTier};
use crate::regime::entropy::EntropyState;

/// Shrink applied to the bull/bear gap under HIGH volatility.
const HIGH_VOLATILITY_SHRINK: f64 = 0.7;
/// Shrink applied to the bull/bear gap under CHAOS entropy.
const CHAOS_SHRINK: f64 = 0.5;

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RegimeProbabilities {
    pub bull: f64,
    pub bear: f64,
    pub neutral: f64,
}

impl RegimeProbabilities {
    /// `bull - bear`, the tilt applied to the category scores.
    pub fn tilt(&self) -> f64 {
        self.bull - self.bear
    }
}

pub fn regime_probabilities(context: &TrendContext, entropy: EntropyState) -> RegimeProbabilities {
    let strong = |s: f64, m: f64, w: f64| match context.strength {
        TrendStrength::Strong => s,
        TrendStrength::Moderate => m,
        _ => w,
    };

    let (mut bull, mut bear) = match context.direction {
        TrendDirection::Big => (strong(0.60, 0.50, 0.40), strong(0.15, 0.25, 0.30)),
        TrendDirection::Small => (strong(0.15, 0.25, 0.30), strong(0.60, 0.50, 0.40)),
        TrendDirection::RangingBigBias => (0.38, 0.32),
        TrendDirection::RangingSmallBias => (0.32, 0.38),
        TrendDirection::Ranging | TrendDirection::Unknown => (0.33, 0.33),
    };

    let mut shrink = |factor: f64| {
        let mid = (bull + bear) / 2.0;
        bull = mid + (bull - mid) * factor;
        bear = mid + (bear - mid) * factor;
    };
    if context.volatility == VolatilityTier::High {
        shrink(HIGH_VOLATILITY_SHRINK);
    }
    if entropy == EntropyState::Chaos {
        shrink(CHAOS_SHRINK);
    }

    RegimeProbabilities {
        bull,
        bear,
        neutral: (1.0 - bull - bear).max(0.0),
    }
}
