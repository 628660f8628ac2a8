// =============================================================================
// Prediction Feedback — state round-tripped by the caller between calls
// =============================================================================
//
// The engine keeps no per-caller memory. Whatever the previous call needs to
// teach the next one travels in `PredictionFeedback`: what was predicted, how
// confidently, under which regime, by which signals, and for which period.
//
// Resolution order for the actual outcome of that period:
//   1. `last_actual_outcome` if the caller supplied it
//   2. the confirmed history record whose period equals `period_full`

use serde::{Deserialize, Serialize};

use crate::signals::ContributingSignal;
use crate::types::{Category, HistoryRecord};

/// Cold-start value of the long-term accuracy EMA.
pub const COLD_START_ACCURACY: f64 = 0.5;

fn default_global_accuracy() -> f64 {
    COLD_START_ACCURACY
}

/// Actual outcome as a caller may report it: a category label or the raw
/// digit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ObservedOutcome {
    Category(Category),
    Digit(u8),
}

impl ObservedOutcome {
    pub fn category(self) -> Option<Category> {
        match self {
            ObservedOutcome::Category(c) => Some(c),
            ObservedOutcome::Digit(d) => Category::from_outcome(d),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionFeedback {
    #[serde(default = "default_global_accuracy", alias = "longTermGlobalAccuracy")]
    pub long_term_global_accuracy: f64,
    #[serde(default, alias = "lastPredictedOutcome")]
    pub last_predicted_outcome: Option<Category>,
    #[serde(default, alias = "lastFinalConfidence")]
    pub last_final_confidence: Option<f64>,
    #[serde(default, alias = "lastConfidenceLevel")]
    pub last_confidence_level: Option<u8>,
    #[serde(default, alias = "lastMacroRegime")]
    pub last_macro_regime: Option<String>,
    #[serde(default, alias = "lastPredictionSignals")]
    pub last_prediction_signals: Vec<ContributingSignal>,
    #[serde(default, alias = "lastActualOutcome")]
    pub last_actual_outcome: Option<ObservedOutcome>,
    /// Period the previous prediction was made for.
    #[serde(default, alias = "periodFull")]
    pub period_full: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

impl Default for PredictionFeedback {
    fn default() -> Self {
        Self {
            long_term_global_accuracy: COLD_START_ACCURACY,
            last_predicted_outcome: None,
            last_final_confidence: None,
            last_confidence_level: None,
            last_macro_regime: None,
            last_prediction_signals: Vec::new(),
            last_actual_outcome: None,
            period_full: None,
            timestamp: None,
        }
    }
}

impl PredictionFeedback {
    /// Long-term accuracy, sanitised into [0, 1].
    pub fn global_accuracy(&self) -> f64 {
        if self.long_term_global_accuracy.is_finite() {
            self.long_term_global_accuracy.clamp(0.0, 1.0)
        } else {
            COLD_START_ACCURACY
        }
    }

    /// Actual category of the previously predicted period, if known.
    pub fn resolve_actual(&self, history: &[HistoryRecord]) -> Option<Category> {
        if let Some(observed) = self.last_actual_outcome {
            return observed.category();
        }
        let period = self.period_full.as_deref()?;
        history
            .iter()
            .find(|r| r.period == period && r.is_confirmed())
            .and_then(HistoryRecord::category)
    }
}

/// One exponential step of the long-term accuracy toward the latest result.
pub fn update_global_accuracy(previous: f64, correct: bool, rate: f64) -> f64 {
    let x = if correct { 1.0 } else { 0.0 };
    let rate = rate.clamp(0.0, 1.0);
    (previous + rate * (x - previous)).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RecordStatus;

    #[test]
    fn empty_json_is_cold_start() {
        let fb: PredictionFeedback = serde_json::from_str("{}").unwrap();
        assert!((fb.global_accuracy() - 0.5).abs() < 1e-10);
        assert!(fb.last_prediction_signals.is_empty());
        assert!(fb.resolve_actual(&[]).is_none());
    }

    #[test]
    fn camel_case_fields_are_accepted() {
        let json = r#"{
            "longTermGlobalAccuracy": 0.61,
            "lastPredictedOutcome": "BIG",
            "lastFinalConfidence": 0.7,
            "periodFull": "20240101100"
        }"#;
        let fb: PredictionFeedback = serde_json::from_str(json).unwrap();
        assert!((fb.global_accuracy() - 0.61).abs() < 1e-10);
        assert_eq!(fb.last_predicted_outcome, Some(Category::Big));
        assert_eq!(fb.period_full.as_deref(), Some("20240101100"));
    }

    #[test]
    fn explicit_actual_outcome_wins() {
        let fb: PredictionFeedback =
            serde_json::from_str(r#"{"last_actual_outcome": 7, "period_full": "5"}"#).unwrap();
        let history = vec![HistoryRecord::new("5", 2, RecordStatus::Win)];
        assert_eq!(fb.resolve_actual(&history), Some(Category::Big));

        let fb: PredictionFeedback =
            serde_json::from_str(r#"{"last_actual_outcome": "SMALL"}"#).unwrap();
        assert_eq!(fb.resolve_actual(&[]), Some(Category::Small));
    }

    #[test]
    fn actual_outcome_looked_up_by_period() {
        let fb = PredictionFeedback {
            period_full: Some("102".to_string()),
            ..Default::default()
        };
        let history = vec![
            HistoryRecord::pending("103"),
            HistoryRecord::new("102", 8, RecordStatus::Loss),
            HistoryRecord::new("101", 1, RecordStatus::Win),
        ];
        assert_eq!(fb.resolve_actual(&history), Some(Category::Big));

        // A pending record for the period does not resolve.
        let fb = PredictionFeedback {
            period_full: Some("103".to_string()),
            ..Default::default()
        };
        assert!(fb.resolve_actual(&history).is_none());
    }

    #[test]
    fn global_accuracy_moves_toward_result() {
        let up = update_global_accuracy(0.5, true, 0.02);
        assert!((up - 0.51).abs() < 1e-10);
        let down = update_global_accuracy(0.5, false, 0.02);
        assert!((down - 0.49).abs() < 1e-10);
    }

    #[test]
    fn out_of_range_accuracy_is_sanitised() {
        let fb = PredictionFeedback {
            long_term_global_accuracy: f64::NAN,
            ..Default::default()
        };
        assert!((fb.global_accuracy() - 0.5).abs() < 1e-10);
    }
}
