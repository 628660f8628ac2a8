// =============================================================================
// Prediction Engine — The decision synthesizer
// =============================================================================
//
// Produces one forecast per call from the caller's history and feedback.
//
// Pipeline:
//   0. Resolve the previous prediction (ledger, drift detector, global accuracy)
//   1. Filter confirmed history; fewer than 52 records => forced random
//   2. Classify trend, entropy, stability, regime probabilities
//   3. Run every generator, re-weight through the ledger, drop negligible votes
//   4. Consensus factor + weighted-majority meta-signal; fewer than 3 => forced
//   5. Score categories: regime tilt, then consensus factor / complement
//   6. Damp confidence: session, sentiment, uncertainty
//   7. Tier and forced override (uncertainty >= 85 or DRIFT)
//   8. Output DecisionEnvelope with the feedback block for the next call
//
// The only shared mutable state is the ledger and the drift detector inside
// `EngineContext`; each lock is held for a single read-modify-write.
// =============================================================================

use std::sync::Arc;

use parking_lot::Mutex;
use rand::Rng;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::decision_envelope::{CategoryPredictions, DecisionEnvelope};
use crate::drift_detector::{DriftDetector, DriftLevel};
use crate::external::{
    ExternalModel, FixedSentiment, RuleTableModel, SentimentProvider, SessionClock, SystemClock,
};
use crate::feedback::{update_global_accuracy, PredictionFeedback};
use crate::performance::PerformanceLedger;
use crate::regime::{
    assess_stability, classify_trend, regime_probabilities, EntropyState, ShannonEntropyFilter,
    TrendContext, VolatilityTier,
};
use crate::runtime_config::{DecisionParams, EngineConfig, SessionParams};
use crate::signals::{
    build_generators, category_weights, consensus_factor, weighted_majority_signal,
    ContributingSignal, Signal,
};
use crate::types::{next_period_id, Category, HistoryRecord, OutcomeSeries, RecordStatus};

/// Ledger key used for the previous decision when its regime is unknown.
const UNKNOWN_REGIME: &str = "UNKNOWN_UNKNOWN";

// =============================================================================
// Request / shared context
// =============================================================================

/// One forecasting request. History is newest first.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PredictionRequest {
    #[serde(default, deserialize_with = "crate::types::lenient_records")]
    pub history: Vec<HistoryRecord>,
    #[serde(default)]
    pub feedback: Option<PredictionFeedback>,
    /// Period being forecast. Derived from the history when absent.
    #[serde(default)]
    pub target_period: Option<String>,
}

/// Process-wide learning state, created by the caller and shared by
/// reference.
pub struct EngineContext {
    pub ledger: Mutex<PerformanceLedger>,
    pub drift: Mutex<DriftDetector>,
}

impl EngineContext {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            ledger: Mutex::new(PerformanceLedger::new(config.learner.clone())),
            drift: Mutex::new(DriftDetector::new(config.drift.clone())),
        }
    }

    /// Clear all learned state, picking up the learner and drift
    /// parameters from `config`.
    pub fn reset(&self, config: &EngineConfig) {
        *self.ledger.lock() = PerformanceLedger::new(config.learner.clone());
        *self.drift.lock() = DriftDetector::new(config.drift.clone());
        info!("Engine learning state reset");
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// Pull `confidence` toward (m < 1) or away from (m > 1) 0.5.
fn scale_margin(confidence: f64, multiplier: f64) -> f64 {
    (0.5 + (confidence - 0.5) * multiplier).clamp(0.0, 1.0)
}

pub fn session_multiplier(hour: u32, params: &SessionParams) -> f64 {
    if params.prime_hours.contains(&hour) {
        params.prime_multiplier
    } else if params.quiet_hours.contains(&hour) {
        params.quiet_multiplier
    } else {
        1.0
    }
}

pub fn confidence_level(confidence: f64, params: &DecisionParams) -> u8 {
    if confidence > params.tier3_confidence {
        3
    } else if confidence > params.tier2_confidence {
        2
    } else {
        1
    }
}

/// Additive uncertainty penalties for the current state.
pub fn uncertainty_score(
    drift: DriftLevel,
    stable_trend: bool,
    entropy: EntropyState,
    trend: &TrendContext,
    global_accuracy: f64,
    params: &DecisionParams,
) -> f64 {
    let p = &params.penalties;
    let mut score = match drift {
        DriftLevel::Drift => p.drift,
        DriftLevel::Warning => p.warning,
        DriftLevel::Stable => 0.0,
    };
    if !stable_trend {
        score += p.unstable_trend;
    }
    if entropy == EntropyState::Chaos {
        score += p.chaos;
    }
    if trend.is_transitioning {
        score += p.transition;
    }
    if trend.volatility == VolatilityTier::High {
        score += p.high_volatility;
    }
    score += (params.accuracy_floor - global_accuracy).max(0.0) * params.accuracy_penalty_scale;
    score
}

/// Period the forecast is for: explicit target, else a pending head record,
/// else the newest period incremented.
fn forecast_period(history: &[HistoryRecord], target: Option<&str>) -> Option<String> {
    if let Some(target) = target.filter(|t| !t.trim().is_empty()) {
        return Some(target.to_string());
    }
    let newest = history.first()?;
    if newest.status == RecordStatus::Pending && !newest.period.is_empty() {
        return Some(newest.period.clone());
    }
    next_period_id(&newest.period)
}

fn random_category() -> Category {
    if rand::thread_rng().gen_bool(0.5) {
        Category::Big
    } else {
        Category::Small
    }
}

fn format_signals(signals: &[Signal]) -> String {
    signals
        .iter()
        .map(|s| format!("{}:{}@{:.3}", s.source, s.prediction, s.adjusted_weight))
        .collect::<Vec<_>>()
        .join(",")
}

// =============================================================================
// Prediction Engine
// =============================================================================

pub struct PredictionEngine {
    model: Arc<dyn ExternalModel>,
    sentiment: Arc<dyn SentimentProvider>,
    clock: Arc<dyn SessionClock>,
}

impl Default for PredictionEngine {
    fn default() -> Self {
        Self::new(
            Arc::new(RuleTableModel),
            Arc::new(FixedSentiment::default()),
            Arc::new(SystemClock),
        )
    }
}

impl PredictionEngine {
    pub fn new(
        model: Arc<dyn ExternalModel>,
        sentiment: Arc<dyn SentimentProvider>,
        clock: Arc<dyn SessionClock>,
    ) -> Self {
        Self { model, sentiment, clock }
    }

    /// Apply the previous call's feedback. Returns the updated long-term
    /// accuracy and a trace fragment.
    fn absorb_feedback(
        &self,
        ctx: &EngineContext,
        config: &EngineConfig,
        feedback: &PredictionFeedback,
        history: &[HistoryRecord],
    ) -> (f64, String) {
        let accuracy = feedback.global_accuracy();
        let (Some(predicted), Some(actual)) = (
            feedback.last_predicted_outcome,
            feedback.resolve_actual(history),
        ) else {
            return (accuracy, "feedback: none".to_string());
        };

        let correct = predicted == actual;
        let accuracy =
            update_global_accuracy(accuracy, correct, config.decision.global_accuracy_rate);

        let fresh = match feedback.period_full.as_deref() {
            Some(period) => ctx.ledger.lock().claim_period(period),
            None => true,
        };
        if !fresh {
            debug!(
                period = ?feedback.period_full,
                "Feedback already recorded, skipping ledger update"
            );
            return (
                accuracy,
                format!("feedback: {predicted}->{actual} (already recorded) acc={accuracy:.3}"),
            );
        }

        let regime = feedback.last_macro_regime.as_deref().unwrap_or(UNKNOWN_REGIME);
        ctx.ledger.lock().record_outcome(
            &feedback.last_prediction_signals,
            actual,
            regime,
            Some(predicted),
            feedback.last_final_confidence.unwrap_or(0.5),
        );
        let level = ctx.drift.lock().update(!correct);

        info!(
            predicted = %predicted,
            actual = %actual,
            correct,
            accuracy = format!("{:.3}", accuracy),
            drift = %level,
            "Previous prediction resolved"
        );
        (
            accuracy,
            format!(
                "feedback: {predicted}->{actual} {} acc={accuracy:.3} drift={level}",
                if correct { "hit" } else { "miss" }
            ),
        )
    }

    /// Forecast the next outcome.
    pub fn predict(
        &self,
        ctx: &EngineContext,
        config: &EngineConfig,
        request: &PredictionRequest,
    ) -> DecisionEnvelope {
        let decision_params = &config.decision;
        let feedback_in = request.feedback.clone().unwrap_or_default();
        let mut trace: Vec<String> = Vec::new();

        // ── 0. Previous prediction ───────────────────────────────────────
        let (global_accuracy, feedback_trace) =
            self.absorb_feedback(ctx, config, &feedback_in, &request.history);
        trace.push(feedback_trace);

        let period_full = forecast_period(&request.history, request.target_period.as_deref());
        let drift_level = ctx.drift.lock().level();

        let feedback_out =
            |decision, confidence, level, regime: &str, signals| PredictionFeedback {
                long_term_global_accuracy: global_accuracy,
                last_predicted_outcome: Some(decision),
                last_final_confidence: Some(confidence),
                last_confidence_level: Some(level),
                last_macro_regime: Some(regime.to_string()),
                last_prediction_signals: signals,
                last_actual_outcome: None,
                period_full: period_full.clone(),
                timestamp: Some(chrono::Utc::now().to_rfc3339()),
            };

        // ── 1. Confirmed history ─────────────────────────────────────────
        let series = OutcomeSeries::from_records(&request.history);
        trace.push(format!("history: {}/{} confirmed", series.len(), request.history.len()));

        if series.len() < decision_params.min_confirmed_history {
            let decision = random_category();
            let reason = format!(
                "Insufficient confirmed history: {} < {}",
                series.len(),
                decision_params.min_confirmed_history
            );
            warn!(
                confirmed = series.len(),
                decision = %decision,
                "Forced prediction: insufficient history"
            );
            trace.push(format!("forced: {reason}"));
            let trend = TrendContext::unknown();
            let feedback = feedback_out(decision, 0.5, 1, &trend.macro_regime, Vec::new());
            return DecisionEnvelope::forced(
                decision,
                reason,
                trend,
                drift_level,
                0.0,
                trace.join(" | "),
                feedback,
            );
        }

        // ── 2. Regime ────────────────────────────────────────────────────
        let trend = classify_trend(&series.values, &config.regime);
        let entropy = ShannonEntropyFilter::check(&series.categories, &config.regime);
        let stability = assess_stability(&series.categories, &trend, &config.regime);
        let probabilities = regime_probabilities(&trend, entropy.state);
        trace.push(format!(
            "regime: {} {} {} entropy={:.3}/{} {}",
            trend.direction,
            trend.strength,
            trend.volatility,
            entropy.entropy,
            entropy.state,
            stability.reason
        ));

        let uncertainty = uncertainty_score(
            drift_level,
            stability.is_stable,
            entropy.state,
            &trend,
            global_accuracy,
            decision_params,
        );

        // ── 3. Signals ───────────────────────────────────────────────────
        let generators = build_generators(&config.signals, Arc::clone(&self.model));
        let raw: Vec<Signal> = generators
            .iter()
            .filter_map(|g| g.generator.generate(&series, &trend, g.base_weight))
            .collect();

        let mut signals: Vec<Signal> = {
            let ledger = ctx.ledger.lock();
            raw.into_iter()
                .map(|mut s| {
                    s.adjusted_weight =
                        ledger.adjusted_weight(&s.source, s.base_weight, &trend.macro_regime);
                    if ledger.is_on_probation(&s.source) {
                        debug!(
                            source = %s.source,
                            rolling_accuracy = ?ledger.rolling_accuracy(&s.source),
                            weight = format!("{:.3}", s.adjusted_weight),
                            "Signal on probation, weight capped"
                        );
                    }
                    s
                })
                .filter(|s| s.adjusted_weight >= decision_params.negligible_weight)
                .collect()
        };

        // ── 4. Consensus + meta-signal ───────────────────────────────────
        let consensus = consensus_factor(&signals);
        if let Some(mut meta) = weighted_majority_signal(
            &signals,
            consensus,
            config.signals.weights.weighted_majority,
            &config.signals,
        ) {
            meta.adjusted_weight = ctx
                .ledger
                .lock()
                .adjusted_weight(&meta.source, meta.base_weight, &trend.macro_regime);
            if meta.adjusted_weight >= decision_params.negligible_weight {
                signals.push(meta);
            }
        }
        trace.push(format!(
            "signals: {} [{}] consensus={:.3}",
            signals.len(),
            format_signals(&signals),
            consensus
        ));

        if signals.len() < decision_params.min_signals {
            let decision = random_category();
            let reason = format!(
                "Insufficient valid signals: {} < {}",
                signals.len(),
                decision_params.min_signals
            );
            warn!(
                signals = signals.len(),
                decision = %decision,
                "Forced prediction: too few signals"
            );
            trace.push(format!("forced: {reason}"));
            let feedback = feedback_out(decision, 0.5, 1, &trend.macro_regime, Vec::new());
            return DecisionEnvelope::forced(
                decision,
                reason,
                trend,
                drift_level,
                uncertainty,
                trace.join(" | "),
                feedback,
            );
        }

        // ── 5. Category scores ───────────────────────────────────────────
        let (weight_big, weight_small) = category_weights(&signals);
        let tilt = probabilities.tilt();
        let score_big = weight_big * (1.0 + tilt) * consensus;
        let score_small = weight_small * (1.0 - tilt) * (2.0 - consensus);
        let total = score_big + score_small;

        let decision = if score_big > score_small {
            Category::Big
        } else if score_small > score_big {
            Category::Small
        } else {
            random_category()
        };
        let raw_confidence = if total > 0.0 {
            score_big.max(score_small) / total
        } else {
            0.5
        };
        trace.push(format!(
            "scores: big={score_big:.3} small={score_small:.3} tilt={tilt:.3} \
             -> {decision} {raw_confidence:.3}"
        ));

        // ── 6. Damping ───────────────────────────────────────────────────
        let hour = self.clock.hour();
        let session = session_multiplier(hour, &config.session);
        let sentiment = self.sentiment.reading().bounded();
        let uncertainty_factor = 1.0 - (uncertainty / 100.0).clamp(0.0, 1.0);

        let mut confidence = scale_margin(raw_confidence, session);
        confidence = scale_margin(confidence, sentiment.factor);
        confidence = scale_margin(confidence, uncertainty_factor);
        trace.push(format!(
            "damping: session(h{hour})={session:.2} sentiment={:.2} ({}) \
             uncertainty={uncertainty:.1} -> {confidence:.3}",
            sentiment.factor, sentiment.reason
        ));

        // ── 7. Tier / forced override ────────────────────────────────────
        let mut level = confidence_level(confidence, decision_params);
        let forced_reason = if drift_level == DriftLevel::Drift {
            Some("Concept drift detected".to_string())
        } else if uncertainty >= decision_params.forced_uncertainty {
            Some(format!(
                "Uncertainty {:.1} >= {:.1}",
                uncertainty, decision_params.forced_uncertainty
            ))
        } else {
            None
        };
        if let Some(reason) = &forced_reason {
            level = 1;
            trace.push(format!("forced: {reason}"));
        }
        trace.push(format!("tier: {level}"));

        // ── 8. Output ────────────────────────────────────────────────────
        let predictions = CategoryPredictions::from_winner(decision, confidence);
        let final_confidence = match decision {
            Category::Big => predictions.big.confidence,
            Category::Small => predictions.small.confidence,
        };

        let mut ranked = signals.clone();
        ranked.sort_by(|a, b| b.adjusted_weight.total_cmp(&a.adjusted_weight));
        let contributing: Vec<ContributingSignal> = ranked
            .iter()
            .take(decision_params.max_contributing_signals)
            .map(ContributingSignal::from)
            .collect();
        let all_signals: Vec<ContributingSignal> =
            signals.iter().map(ContributingSignal::from).collect();

        info!(
            decision = %decision,
            confidence = format!("{:.3}", final_confidence),
            level,
            forced = forced_reason.is_some(),
            uncertainty = format!("{:.1}", uncertainty),
            regime = %trend.macro_regime,
            signals = signals.len(),
            "Prediction generated"
        );

        let feedback = feedback_out(
            decision,
            final_confidence,
            level,
            &trend.macro_regime,
            all_signals,
        );
        DecisionEnvelope {
            id: uuid::Uuid::new_v4().to_string(),
            predictions,
            final_decision: decision,
            final_confidence,
            confidence_level: level,
            is_forced_prediction: forced_reason.is_some(),
            forced_reason,
            contributing_signals: contributing,
            uncertainty_score: uncertainty,
            drift_level,
            trend,
            trace: trace.join(" | "),
            feedback,
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::external::FixedClock;
    use crate::regime::{TrendDirection, TrendStrength};

    fn engine() -> PredictionEngine {
        PredictionEngine::new(
            Arc::new(RuleTableModel),
            Arc::new(FixedSentiment::default()),
            Arc::new(FixedClock(12)),
        )
    }

    /// Newest-first records with descending numeric periods ending at 1000.
    fn records(digits: &[u8]) -> Vec<HistoryRecord> {
        let n = digits.len();
        digits
            .iter()
            .enumerate()
            .map(|(i, d)| HistoryRecord::new((1000 + n - 1 - i).to_string(), *d, RecordStatus::Win))
            .collect()
    }

    /// Mostly-SMALL cycle broken by a double zero under an 8. Fires streak,
    /// MACD, Bollinger and the rule-table model with zero uncertainty.
    fn calm_digits() -> Vec<u8> {
        let mut digits = vec![0u8, 0, 8];
        for _ in 0..6 {
            digits.extend([6u8, 4, 2, 1, 3, 3, 6, 3, 3, 2]);
        }
        digits
    }

    /// A 4/5 chop broken by a fresh 9: choppy, chaotic, transitioning.
    fn spike_digits() -> Vec<u8> {
        let mut digits = vec![9u8, 0, 0];
        for _ in 0..28 {
            digits.extend([4u8, 5]);
        }
        digits.push(4);
        digits
    }

    fn request(digits: &[u8]) -> PredictionRequest {
        PredictionRequest {
            history: records(digits),
            ..Default::default()
        }
    }

    #[test]
    fn short_history_is_forced_tier_one() {
        let config = EngineConfig::default();
        let ctx = EngineContext::new(&config);
        let out = engine().predict(&ctx, &config, &request(&[3; 51]));
        assert!(out.is_forced_prediction);
        assert_eq!(out.confidence_level, 1);
        assert!(out.forced_reason.unwrap().contains("Insufficient confirmed history"));
        let total = out.predictions.big.confidence + out.predictions.small.confidence;
        assert!((total - 1.0).abs() < 1e-10);
    }

    #[test]
    fn pending_records_do_not_count_as_history() {
        let config = EngineConfig::default();
        let ctx = EngineContext::new(&config);
        let mut history = vec![HistoryRecord::pending("1060")];
        history.extend(records(&[5; 51]));
        let req = PredictionRequest {
            history,
            ..Default::default()
        };
        let out = engine().predict(&ctx, &config, &req);
        assert!(out.is_forced_prediction);
        assert_eq!(out.feedback.period_full.as_deref(), Some("1060"));
    }

    #[test]
    fn one_bad_record_does_not_reject_the_request() {
        let json = r#"{"history": [
            {"period": "3", "outcome": 7, "status": "Win"},
            {"period": 2, "outcome": 1, "status": "WIN"},
            {"period": "1", "outcome": 4, "status": "???"},
            "not a record",
            {"period": "0", "outcome": 9, "status": "Loss"}
        ]}"#;
        let req: PredictionRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.history.len(), 4);
        let series = OutcomeSeries::from_records(&req.history);
        assert_eq!(series.values, vec![7.0, 1.0, 9.0]);
        assert_eq!(series.periods[1], "2");
    }

    #[test]
    fn too_few_signals_is_forced_tier_one() {
        // A flat history: only streak break and RSI vote, the oscillators
        // see no range and the meta-signal needs four voters.
        let config = EngineConfig::default();
        let ctx = EngineContext::new(&config);
        let out = engine().predict(&ctx, &config, &request(&[5; 60]));
        assert!(out.is_forced_prediction);
        assert_eq!(out.confidence_level, 1);
        assert!(out
            .forced_reason
            .as_deref()
            .unwrap()
            .contains("Insufficient valid signals"));
        assert!(out.contributing_signals.is_empty());
        assert!(out.feedback.last_prediction_signals.is_empty());
        assert_eq!(out.feedback.last_confidence_level, Some(1));
        assert!(!out.trend.is_unknown());
    }

    #[test]
    fn calm_history_produces_a_confident_forecast() {
        let config = EngineConfig::default();
        let ctx = EngineContext::new(&config);
        let out = engine().predict(&ctx, &config, &request(&calm_digits()));
        assert!(!out.is_forced_prediction);
        assert_eq!(out.final_decision, Category::Big);
        assert_eq!(out.confidence_level, 3);
        assert!(out.uncertainty_score.abs() < 1e-10);
        assert!(out.final_confidence > 0.75 && out.final_confidence < 1.0);
        // Four generators plus the weighted-majority meta-signal.
        assert_eq!(out.contributing_signals.len(), 5);
        assert!(out.contributing_signals.iter().any(|s| s.source == "weighted_majority"));
        assert_eq!(out.feedback.last_predicted_outcome, Some(out.final_decision));
        assert_eq!(out.feedback.last_prediction_signals.len(), 5);
        assert_eq!(out.feedback.period_full.as_deref(), Some("1063"));
        assert!(out.trace.contains("signals:"));
        // Sorted by weight, strongest first.
        for pair in out.contributing_signals.windows(2) {
            assert!(pair[0].weight >= pair[1].weight);
        }
    }

    #[test]
    fn choppy_spike_is_forced_by_uncertainty() {
        let config = EngineConfig::default();
        let ctx = EngineContext::new(&config);
        let out = engine().predict(&ctx, &config, &request(&spike_digits()));
        // Alternation + chaos + transition.
        assert!(out.uncertainty_score >= config.decision.forced_uncertainty);
        assert!(out.is_forced_prediction);
        assert_eq!(out.confidence_level, 1);
        assert!((out.final_confidence - 0.5).abs() < 1e-10);
        assert!(out.contributing_signals.len() >= 3);
    }

    #[test]
    fn fixed_collaborators_make_predictions_deterministic() {
        let config = EngineConfig::default();
        let req = request(&calm_digits());
        let a = engine().predict(&EngineContext::new(&config), &config, &req);
        let b = engine().predict(&EngineContext::new(&config), &config, &req);
        assert!(!a.trace.contains("Insufficient valid signals"));
        assert_eq!(a.final_decision, b.final_decision);
        assert_eq!(a.final_confidence.to_bits(), b.final_confidence.to_bits());
        assert_eq!(a.confidence_level, b.confidence_level);
    }

    #[test]
    fn all_big_history_is_unstable() {
        let config = EngineConfig::default();
        let ctx = EngineContext::new(&config);
        let out = engine().predict(&ctx, &config, &request(&[7; 60]));
        assert!(out.trace.contains("Unstable: Outcome Dominance"));
        assert!(out.uncertainty_score >= config.decision.penalties.unstable_trend);
    }

    #[test]
    fn alternating_history_is_ranging_weak_chop() {
        let config = EngineConfig::default();
        let ctx = EngineContext::new(&config);
        let digits: Vec<u8> = (0..60).map(|i| if i % 2 == 0 { 9 } else { 0 }).collect();
        let out = engine().predict(&ctx, &config, &request(&digits));
        assert!(matches!(
            out.trend.strength,
            TrendStrength::Ranging | TrendStrength::Weak
        ));
        assert!((out.trend.volatility_value - 4.5).abs() < 1e-9);
        assert!(!out.contributing_signals.iter().any(|s| s.source == "streak_break"));
    }

    #[test]
    fn feedback_updates_ledger_once_per_period() {
        let config = EngineConfig::default();
        let ctx = EngineContext::new(&config);
        let digits = calm_digits();
        let feedback = PredictionFeedback {
            last_predicted_outcome: Some(Category::Big),
            last_final_confidence: Some(0.6),
            last_macro_regime: Some("WEAK_LOW".to_string()),
            last_prediction_signals: vec![
                ContributingSignal {
                    source: "macd_cross".to_string(),
                    prediction: Category::Small,
                    weight: 0.5,
                },
                ContributingSignal {
                    source: "bollinger_breach".to_string(),
                    prediction: Category::Big,
                    weight: 0.9,
                },
            ],
            // Newest record (digit 0) is period 1062.
            period_full: Some("1062".to_string()),
            ..Default::default()
        };
        let req = PredictionRequest {
            history: records(&digits),
            feedback: Some(feedback),
            target_period: Some("1063".to_string()),
        };

        let out = engine().predict(&ctx, &config, &req);
        // Predicted BIG, actual SMALL: accuracy steps down from 0.5.
        assert!((out.feedback.long_term_global_accuracy - 0.49).abs() < 1e-10);
        assert_eq!(ctx.drift.lock().observations(), 1);
        let snap = ctx.ledger.lock().snapshot();
        assert_eq!(snap.sources.len(), 2);
        assert_eq!(snap.last_recorded_period.as_deref(), Some("1062"));
        let macd = snap.sources.iter().find(|s| s.source == "macd_cross").unwrap();
        assert_eq!((macd.total, macd.correct), (1, 1));

        // Re-submitting the same feedback does not double count.
        engine().predict(&ctx, &config, &req);
        let snap = ctx.ledger.lock().snapshot();
        assert!(snap.sources.iter().all(|s| s.total == 1));
        assert_eq!(ctx.drift.lock().observations(), 1);
    }

    #[test]
    fn drift_forces_low_tier() {
        let config = EngineConfig::default();
        let ctx = EngineContext::new(&config);
        {
            let mut drift = ctx.drift.lock();
            for i in 0..100 {
                drift.update(i % 10 == 0);
            }
            while drift.level() != DriftLevel::Drift {
                drift.update(true);
            }
        }
        let out = engine().predict(&ctx, &config, &request(&calm_digits()));
        assert!(out.is_forced_prediction);
        assert_eq!(out.confidence_level, 1);
        assert_eq!(out.drift_level, DriftLevel::Drift);
        assert_eq!(out.forced_reason.as_deref(), Some("Concept drift detected"));
        assert!(out.uncertainty_score >= config.decision.penalties.drift);
    }

    #[test]
    fn uncertainty_accumulates_penalties() {
        let params = DecisionParams::default();
        let trend = TrendContext {
            strength: TrendStrength::Weak,
            direction: TrendDirection::Big,
            volatility: VolatilityTier::High,
            is_transitioning: true,
            ..TrendContext::unknown()
        };
        let score = uncertainty_score(
            DriftLevel::Warning,
            false,
            EntropyState::Chaos,
            &trend,
            0.5,
            &params,
        );
        assert!((score - (40.0 + 45.0 + 35.0 + 25.0 + 20.0)).abs() < 1e-10);

        let calm = TrendContext {
            volatility: VolatilityTier::Low,
            is_transitioning: false,
            ..trend
        };
        let score = uncertainty_score(
            DriftLevel::Stable,
            true,
            EntropyState::Ordered,
            &calm,
            0.44,
            &params,
        );
        assert!((score - 10.0).abs() < 1e-9);
    }

    #[test]
    fn session_multiplier_by_hour() {
        let params = SessionParams::default();
        assert!((session_multiplier(10, &params) - 1.05).abs() < 1e-10);
        assert!((session_multiplier(3, &params) - 0.95).abs() < 1e-10);
        assert!((session_multiplier(12, &params) - 1.0).abs() < 1e-10);
    }

    #[test]
    fn margin_scaling_is_symmetric_around_half() {
        assert!((scale_margin(0.7, 0.5) - 0.6).abs() < 1e-10);
        assert!((scale_margin(0.5, 1.5) - 0.5).abs() < 1e-10);
        assert!((scale_margin(0.9, 0.0) - 0.5).abs() < 1e-10);
        assert!(scale_margin(0.99, 1.5) <= 1.0);
    }

    #[test]
    fn tiers_follow_thresholds() {
        let params = DecisionParams::default();
        assert_eq!(confidence_level(0.80, &params), 3);
        assert_eq!(confidence_level(0.70, &params), 2);
        assert_eq!(confidence_level(0.62, &params), 1);
    }

    #[test]
    fn forecast_period_prefers_target() {
        let history = records(&[1, 2, 3]);
        assert_eq!(forecast_period(&history, Some("42")).as_deref(), Some("42"));
        assert_eq!(forecast_period(&history, None).as_deref(), Some("1003"));
        assert!(forecast_period(&[], None).is_none());
    }

    #[test]
    fn context_reset_picks_up_new_parameters() {
        let mut config = EngineConfig::default();
        let ctx = EngineContext::new(&config);
        ctx.drift.lock().update(true);
        ctx.ledger.lock().claim_period("7");

        config.learner.performance_window = 12;
        ctx.reset(&config);
        assert_eq!(ctx.drift.lock().observations(), 0);
        assert!(ctx.ledger.lock().last_recorded_period().is_none());
    }
}
