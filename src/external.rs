// =============================================================================
// External Collaborators — Injectable model, sentiment and clock interfaces
// =============================================================================
//
// The engine depends on three things it does not own:
//
//   ExternalModel      feature vector -> {prediction, confidence}
//   SentimentProvider  -> bounded multiplicative confidence factor + reason
//   SessionClock       -> hour of day for the trading-session multiplier
//
// Each ships with a reference implementation. `RuleTableModel` is a
// hand-written rule table standing in for a trained model; swap in any real
// model behind the same trait without touching the engine.

use chrono::Timelike;
use serde::{Deserialize, Serialize};

use crate::types::Category;

/// Bounds every sentiment factor is clamped to before use.
pub const SENTIMENT_FACTOR_MIN: f64 = 0.5;
pub const SENTIMENT_FACTOR_MAX: f64 = 1.5;

// =============================================================================
// External model
// =============================================================================

/// Features handed to an external model.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FeatureVector {
    pub rsi: f64,
    pub macd_histogram: f64,
    pub short_volatility: f64,
    pub long_volatility: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelVerdict {
    pub prediction: Category,
    /// Model confidence in [0, 1].
    pub confidence: f64,
}

pub trait ExternalModel: Send + Sync {
    fn name(&self) -> &str;

    /// Returns `None` when the model has no opinion.
    fn predict(&self, features: &FeatureVector) -> Option<ModelVerdict>;
}

/// Reference stub: a fixed rule table, not a trained model.
///
/// - RSI < 40 with a rising histogram  => BIG (0.60)
/// - RSI > 60 with a falling histogram => SMALL (0.60)
/// - short-term volatility 30% above long-term => fade the RSI side (0.55)
#[derive(Debug, Default, Clone, Copy)]
pub struct RuleTableModel;

impl ExternalModel for RuleTableModel {
    fn name(&self) -> &str {
        "rule_table_stub"
    }

    fn predict(&self, f: &FeatureVector) -> Option<ModelVerdict> {
        if f.rsi < 40.0 && f.macd_histogram > 0.0 {
            return Some(ModelVerdict {
                prediction: Category::Big,
                confidence: 0.60,
            });
        }
        if f.rsi > 60.0 && f.macd_histogram < 0.0 {
            return Some(ModelVerdict {
                prediction: Category::Small,
                confidence: 0.60,
            });
        }
        if f.long_volatility > 0.0 && f.short_volatility > f.long_volatility * 1.3 {
            let prediction = if f.rsi >= 50.0 { Category::Small } else { Category::Big };
            return Some(ModelVerdict {
                prediction,
                confidence: 0.55,
            });
        }
        None
    }
}

// =============================================================================
// Sentiment / external volatility
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SentimentReading {
    /// Multiplier applied to the confidence margin, in [0.5, 1.5].
    pub factor: f64,
    pub reason: String,
}

impl SentimentReading {
    /// Clamp the factor into the documented bounds; non-finite becomes 1.0.
    pub fn bounded(self) -> Self {
        let factor = if self.factor.is_finite() {
            self.factor.clamp(SENTIMENT_FACTOR_MIN, SENTIMENT_FACTOR_MAX)
        } else {
            1.0
        };
        Self { factor, ..self }
    }
}

pub trait SentimentProvider: Send + Sync {
    fn reading(&self) -> SentimentReading;
}

/// Provider that never moves confidence. Default in tests and when no feed
/// is configured.
#[derive(Debug, Clone)]
pub struct FixedSentiment {
    pub factor: f64,
}

impl Default for FixedSentiment {
    fn default() -> Self {
        Self { factor: 1.0 }
    }
}

impl SentimentProvider for FixedSentiment {
    fn reading(&self) -> SentimentReading {
        SentimentReading {
            factor: self.factor,
            reason: "fixed".to_string(),
        }
    }
}

// =============================================================================
// Session clock
// =============================================================================

pub trait SessionClock: Send + Sync {
    /// Hour of day, 0..=23.
    fn hour(&self) -> u32;
}

/// Wall clock in UTC.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl SessionClock for SystemClock {
    fn hour(&self) -> u32 {
        chrono::Utc::now().hour()
    }
}

/// Frozen hour for deterministic runs.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub u32);

impl SessionClock for FixedClock {
    fn hour(&self) -> u32 {
        self.0 % 24
    }
}
