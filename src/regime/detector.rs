// =============================================================================
// Trend Regime Classifier
// =============================================================================
//
// Classifies the outcome sequence with a three-EMA stack (short / medium /
// long, default 5 / 10 / 20):
//
//   Direction   BIG   when short > medium > long
//               SMALL when short < medium < long
//               otherwise RANGING, biased toward the side short sits on
//               relative to long
//   Strength    |short - long| / stdDev(long)   (epsilon-guarded)
//                 > 0.80 => STRONG, > 0.45 => MODERATE,
//                 else WEAK (aligned stack) or RANGING (mixed stack)
//   Volatility  population σ of the most recent <= 30 points
//                 > 3.0 => HIGH, > 1.8 => MEDIUM, > 0.9 => LOW, else VERY_LOW
//   Transition  sign of (short - medium) with vs without the newest point
//
// The macro regime label joins strength and volatility (plus `_TRANSITION`)
// and is only used to partition learning statistics.

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::indicators::{ema, std_dev};
use crate::runtime_config::RegimeParams;

/// Guards the spread normalisation against a zero standard deviation.
const SPREAD_EPSILON: f64 = 1e-9;

/// EMA differences below this are treated as equal (float recurrence noise).
const ORDER_TOLERANCE: f64 = 1e-9;

fn above(a: f64, b: f64) -> bool {
    a - b > ORDER_TOLERANCE
}

// =============================================================================
// Types
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TrendStrength {
    Strong,
    Moderate,
    Weak,
    Ranging,
    Unknown,
}

impl std::fmt::Display for TrendStrength {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Strong => write!(f, "STRONG"),
            Self::Moderate => write!(f, "MODERATE"),
            Self::Weak => write!(f, "WEAK"),
            Self::Ranging => write!(f, "RANGING"),
            Self::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TrendDirection {
    Big,
    Small,
    /// Mixed stack with short EMA above long EMA.
    RangingBigBias,
    /// Mixed stack with short EMA below long EMA.
    RangingSmallBias,
    Ranging,
    Unknown,
}

impl std::fmt::Display for TrendDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Big => write!(f, "BIG"),
            Self::Small => write!(f, "SMALL"),
            Self::RangingBigBias => write!(f, "RANGING_BIG_BIAS"),
            Self::RangingSmallBias => write!(f, "RANGING_SMALL_BIAS"),
            Self::Ranging => write!(f, "RANGING"),
            Self::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

impl TrendDirection {
    pub fn is_trending(self) -> bool {
        matches!(self, Self::Big | Self::Small)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VolatilityTier {
    VeryLow,
    Low,
    Medium,
    High,
    Unknown,
}

impl std::fmt::Display for VolatilityTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::VeryLow => write!(f, "VERY_LOW"),
            Self::Low => write!(f, "LOW"),
            Self::Medium => write!(f, "MEDIUM"),
            Self::High => write!(f, "HIGH"),
            Self::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

/// Trend snapshot recomputed on every invocation. Never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendContext {
    pub strength: TrendStrength,
    pub direction: TrendDirection,
    pub volatility: VolatilityTier,
    pub macro_regime: String,
    pub is_transitioning: bool,
    /// Volatility-normalised EMA spread; 0.0 when unknown.
    pub normalized_spread: f64,
    /// σ of the volatility window; 0.0 when unknown.
    pub volatility_value: f64,
}

impl TrendContext {
    /// Context returned when there is not enough data to classify.
    pub fn unknown() -> Self {
        Self {
            strength: TrendStrength::Unknown,
            direction: TrendDirection::Unknown,
            volatility: VolatilityTier::Unknown,
            macro_regime: macro_regime_label(
                TrendStrength::Unknown,
                VolatilityTier::Unknown,
                false,
            ),
            is_transitioning: false,
            normalized_spread: 0.0,
            volatility_value: 0.0,
        }
    }

    /// `true` when the classifier lacked data; generators abstain on this.
    pub fn is_unknown(&self) -> bool {
        self.strength == TrendStrength::Unknown
    }
}

// =============================================================================
// Classification
// =============================================================================

/// Classify the newest-first outcome sequence.
///
/// Returns [`TrendContext::unknown`] when fewer than `params.ema_long` points
/// are available or any EMA cannot be computed.
pub fn classify_trend(values: &[f64], params: &RegimeParams) -> TrendContext {
    if values.len() < params.ema_long {
        trace!(
            available = values.len(),
            required = params.ema_long,
            "Regime: insufficient data"
        );
        return TrendContext::unknown();
    }

    let (Some(short), Some(medium), Some(long)) = (
        ema(values, params.ema_short),
        ema(values, params.ema_medium),
        ema(values, params.ema_long),
    ) else {
        return TrendContext::unknown();
    };

    let direction = if above(short, medium) && above(medium, long) {
        TrendDirection::Big
    } else if above(medium, short) && above(long, medium) {
        TrendDirection::Small
    } else if above(short, long) {
        TrendDirection::RangingBigBias
    } else if above(long, short) {
        TrendDirection::RangingSmallBias
    } else {
        TrendDirection::Ranging
    };

    let long_sd = std_dev(values, params.ema_long).unwrap_or(0.0);
    let normalized_spread = (short - long) / long_sd.max(SPREAD_EPSILON);
    let strength = classify_strength(normalized_spread.abs(), direction.is_trending(), params);

    let window = values.len().min(params.volatility_window);
    let volatility_value = std_dev(values, window).unwrap_or(0.0);
    let volatility = classify_volatility(volatility_value, params);

    let is_transitioning = detect_transition(values, params);
    let macro_regime = macro_regime_label(strength, volatility, is_transitioning);

    debug!(
        direction = %direction,
        strength = %strength,
        volatility = %volatility,
        spread = format!("{:.3}", normalized_spread),
        sigma = format!("{:.3}", volatility_value),
        transitioning = is_transitioning,
        "Trend classified"
    );

    TrendContext {
        strength,
        direction,
        volatility,
        macro_regime,
        is_transitioning,
        normalized_spread,
        volatility_value,
    }
}

fn classify_strength(magnitude: f64, trending: bool, params: &RegimeParams) -> TrendStrength {
    if magnitude > params.strong_spread {
        TrendStrength::Strong
    } else if magnitude > params.moderate_spread {
        TrendStrength::Moderate
    } else if trending {
        TrendStrength::Weak
    } else {
        TrendStrength::Ranging
    }
}

fn classify_volatility(sigma: f64, params: &RegimeParams) -> VolatilityTier {
    if sigma > params.volatility_high {
        VolatilityTier::High
    } else if sigma > params.volatility_medium {
        VolatilityTier::Medium
    } else if sigma > params.volatility_low {
        VolatilityTier::Low
    } else {
        VolatilityTier::VeryLow
    }
}

/// Compare the short-vs-medium crossover excluding and including the newest
/// point. A sign change means the fast average just crossed.
fn detect_transition(values: &[f64], params: &RegimeParams) -> bool {
    let Some(previous) = values.get(1..) else {
        return false;
    };
    let crossover_sign = |series: &[f64]| -> Option<i8> {
        let short = ema(series, params.ema_short)?;
        let medium = ema(series, params.ema_medium)?;
        Some(if above(short, medium) {
            1
        } else if above(medium, short) {
            -1
        } else {
            0
        })
    };
    match (crossover_sign(previous), crossover_sign(values)) {
        (Some(before), Some(now)) => before != 0 && now != 0 && before != now,
        _ => false,
    }
}

/// Deterministic learning-partition key, e.g. `MODERATE_LOW_TRANSITION`.
pub fn macro_regime_label(
    strength: TrendStrength,
    volatility: VolatilityTier,
    transitioning: bool,
) -> String {
    let mut label = format!("{strength}_{volatility}");
    if transitioning {
        label.push_str("_TRANSITION");
    }
    label
}
