// =============================================================================
// Decision Envelope — Auditable record of every forecast
// =============================================================================
//
// Every forecast, genuine or fallback, leaves the engine as one envelope:
// the per-category probabilities, the final call and its tier, the signals
// that backed it, the uncertainty that damped it, a human-readable trace of
// each stage, and the feedback block the caller must send back next time.
// =============================================================================

use serde::{Deserialize, Serialize};

use crate::drift_detector::DriftLevel;
use crate::feedback::PredictionFeedback;
use crate::regime::TrendContext;
use crate::signals::ContributingSignal;
use crate::types::Category;

/// Probability bounds reported for either category.
pub const PROBABILITY_FLOOR: f64 = 0.001;
pub const PROBABILITY_CEIL: f64 = 0.999;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryForecast {
    pub label: Category,
    pub confidence: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryPredictions {
    pub big: CategoryForecast,
    pub small: CategoryForecast,
}

impl CategoryPredictions {
    /// Winner gets `confidence` clamped into (0.001, 0.999), the other side
    /// its complement.
    pub fn from_winner(winner: Category, confidence: f64) -> Self {
        let confidence = if confidence.is_finite() { confidence } else { 0.5 };
        let win = confidence.clamp(PROBABILITY_FLOOR, PROBABILITY_CEIL);
        let lose = 1.0 - win;
        let (big, small) = match winner {
            Category::Big => (win, lose),
            Category::Small => (lose, win),
        };
        Self {
            big: CategoryForecast {
                label: Category::Big,
                confidence: big,
            },
            small: CategoryForecast {
                label: Category::Small,
                confidence: small,
            },
        }
    }
}

/// Complete record of one forecast.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionEnvelope {
    /// Unique identifier for this decision (UUID v4).
    pub id: String,

    pub predictions: CategoryPredictions,

    pub final_decision: Category,

    /// Winning probability after every damping stage.
    pub final_confidence: f64,

    /// Tier 1..=3.
    pub confidence_level: u8,

    /// True for fallbacks and for overridden low-trust decisions.
    pub is_forced_prediction: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub forced_reason: Option<String>,

    /// Top signals by adjusted weight.
    pub contributing_signals: Vec<ContributingSignal>,

    pub uncertainty_score: f64,

    pub drift_level: DriftLevel,

    pub trend: TrendContext,

    /// Stage-by-stage account of how the decision was reached.
    pub trace: String,

    /// Round-trip this into the next call.
    pub feedback: PredictionFeedback,

    /// ISO 8601 timestamp of when this decision was created.
    pub created_at: String,
}

impl DecisionEnvelope {
    /// Lowest-tier fallback decision, flagged as forced.
    pub fn forced(
        decision: Category,
        reason: impl Into<String>,
        trend: TrendContext,
        drift_level: DriftLevel,
        uncertainty_score: f64,
        trace: String,
        feedback: PredictionFeedback,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            predictions: CategoryPredictions::from_winner(decision, 0.5),
            final_decision: decision,
            final_confidence: 0.5,
            confidence_level: 1,
            is_forced_prediction: true,
            forced_reason: Some(reason.into()),
            contributing_signals: Vec::new(),
            uncertainty_score,
            drift_level,
            trend,
            trace,
            feedback,
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn probabilities_are_complements() {
        let p = CategoryPredictions::from_winner(Category::Small, 0.68);
        assert!((p.small.confidence - 0.68).abs() < 1e-10);
        assert!((p.big.confidence + p.small.confidence - 1.0).abs() < 1e-10);
        assert_eq!(p.big.label, Category::Big);
    }

    #[test]
    fn probabilities_are_clamped() {
        let p = CategoryPredictions::from_winner(Category::Big, 1.0);
        assert!((p.big.confidence - PROBABILITY_CEIL).abs() < 1e-12);
        assert!(p.small.confidence >= PROBABILITY_FLOOR - 1e-12);
        let p = CategoryPredictions::from_winner(Category::Big, f64::NAN);
        assert!((p.big.confidence - 0.5).abs() < 1e-12);
    }

    #[test]
    fn forced_envelope_is_tier_one() {
        let env = DecisionEnvelope::forced(
            Category::Big,
            "insufficient history",
            TrendContext::unknown(),
            DriftLevel::Stable,
            0.0,
            String::new(),
            PredictionFeedback::default(),
        );
        assert!(env.is_forced_prediction);
        assert_eq!(env.confidence_level, 1);
        assert!(env.contributing_signals.is_empty());
        let json = serde_json::to_value(&env).unwrap();
        assert_eq!(json["final_decision"], "BIG");
        assert_eq!(json["predictions"]["small"]["label"], "SMALL");
    }
}
