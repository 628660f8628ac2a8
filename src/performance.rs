// =============================================================================
// Performance Ledger — Adaptive per-source weight learning
// =============================================================================
//
// Every signal source carries:
//   - lifetime total / correct counters
//   - a rolling window of correctness scores (newest at the back)
//   - per-regime total / correct counters keyed by macro-regime label
//   - a probation flag
//
// Adjusted weight blends two exponential-deviation factors:
//
//   a = exp((rolling_accuracy - 0.5) * 1.2)   if >= 10 rolling scores, else 1
//   b = exp((regime_accuracy  - 0.5) * 1.5)   if >= 5 regime outcomes, else 1
//   factor = clamp((a + b) / 2, 0.1, 1.8), capped at 0.2 on probation
//   weight = max(base * factor, epsilon)      for base > 0
//
// Correctness scores are +1 for a correct vote and 0 for a wrong one, except
// that every wrong vote in a confidently wrong decision scores -0.5.

use std::collections::{HashMap, VecDeque};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::runtime_config::LearnerParams;
use crate::signals::ContributingSignal;
use crate::types::Category;

/// How many recently recorded periods are remembered for replay detection.
pub const CLAIMED_PERIOD_MEMORY: usize = 256;

// =============================================================================
// Types
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegimeTally {
    pub total: u64,
    pub correct: u64,
}

impl RegimeTally {
    pub fn accuracy(&self) -> Option<f64> {
        (self.total > 0).then(|| self.correct as f64 / self.total as f64)
    }
}

#[derive(Debug, Clone, Default)]
struct SourceStats {
    total: u64,
    correct: u64,
    rolling: VecDeque<f64>,
    regimes: HashMap<String, RegimeTally>,
    on_probation: bool,
}

impl SourceStats {
    fn rolling_accuracy(&self) -> Option<f64> {
        if self.rolling.is_empty() {
            return None;
        }
        Some(self.rolling.iter().sum::<f64>() / self.rolling.len() as f64)
    }
}

/// Per-source view exposed over the API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourcePerformance {
    pub source: String,
    pub total: u64,
    pub correct: u64,
    pub rolling_accuracy: Option<f64>,
    pub rolling_len: usize,
    pub on_probation: bool,
    pub regimes: HashMap<String, RegimeTally>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceSnapshot {
    pub sources: Vec<SourcePerformance>,
    pub last_recorded_period: Option<String>,
}

// =============================================================================
// PerformanceLedger
// =============================================================================

pub struct PerformanceLedger {
    params: LearnerParams,
    stats: HashMap<String, SourceStats>,
    /// Recently recorded periods, newest at the back.
    claimed_periods: VecDeque<String>,
}

impl PerformanceLedger {
    pub fn new(params: LearnerParams) -> Self {
        Self {
            params,
            stats: HashMap::new(),
            claimed_periods: VecDeque::new(),
        }
    }

    /// Learned weight for `source` in `regime`. Never exactly zero for a
    /// positive base weight.
    pub fn adjusted_weight(&self, source: &str, base_weight: f64, regime: &str) -> f64 {
        if base_weight <= 0.0 || !base_weight.is_finite() {
            return 0.0;
        }
        let p = &self.params;
        let factor = match self.stats.get(source) {
            None => 1.0,
            Some(stats) => {
                let overall = match stats.rolling_accuracy() {
                    Some(acc) if stats.rolling.len() >= p.min_overall_observations => {
                        ((acc - 0.5) * p.overall_scale).exp()
                    }
                    _ => 1.0,
                };
                let regime_factor = match stats.regimes.get(regime) {
                    Some(tally) if tally.total >= p.min_regime_observations => {
                        let acc = tally.accuracy().unwrap_or(0.5);
                        ((acc - 0.5) * p.regime_scale).exp()
                    }
                    _ => 1.0,
                };
                let blended =
            ((overall + regime_factor) / 2.0).clamp(p.min_weight_factor, p.max_weight_factor);
                if stats.on_probation {
                    blended.min(p.probation_cap)
                } else {
                    blended
                }
            }
        };
        (base_weight * factor).max(p.weight_epsilon)
    }

    /// Score every signal that backed the previous decision against the
    /// actual outcome. Returns the number of sources updated.
    pub fn record_outcome(
        &mut self,
        signals: &[ContributingSignal],
        actual: Category,
        regime: &str,
        last_prediction: Option<Category>,
        last_confidence: f64,
    ) -> usize {
        let confidently_wrong = last_prediction.is_some_and(|prediction| prediction != actual)
            && last_confidence > self.params.confident_wrong_threshold;
        let window = self.params.performance_window.max(1);

        for signal in signals {
            let correct = signal.prediction == actual;
            let score = if correct {
                1.0
            } else if confidently_wrong {
                self.params.confident_wrong_score
            } else {
                0.0
            };

            let stats = self.stats.entry(signal.source.clone()).or_default();
            stats.total += 1;
            let tally = stats.regimes.entry(regime.to_string()).or_default();
            tally.total += 1;
            if correct {
                stats.correct += 1;
                tally.correct += 1;
            }
            stats.rolling.push_back(score);
            while stats.rolling.len() > window {
                stats.rolling.pop_front();
            }

            let acc = stats.rolling_accuracy().unwrap_or(0.5);
            if !stats.on_probation
                && stats.rolling.len() >= self.params.probation_min_observations
                && acc < self.params.probation_enter_accuracy
            {
                stats.on_probation = true;
                info!(
                    source = %signal.source,
                    accuracy = format!("{:.3}", acc),
                    "Source placed on probation"
                );
            } else if stats.on_probation && acc > self.params.probation_exit_accuracy {
                stats.on_probation = false;
                info!(
                    source = %signal.source,
                    accuracy = format!("{:.3}", acc),
                    "Source released from probation"
                );
            }
        }

        debug!(
            updated = signals.len(),
            actual = %actual,
            regime,
            confidently_wrong,
            "Performance ledger updated"
        );
        signals.len()
    }

    /// Claim `period` for recording. Returns false if it is among the last
    /// [`CLAIMED_PERIOD_MEMORY`] periods recorded, so a replayed outcome is
    /// never counted twice even when it arrives out of order.
    pub fn claim_period(&mut self, period: &str) -> bool {
        if self.claimed_periods.iter().any(|p| p == period) {
            return false;
        }
        self.claimed_periods.push_back(period.to_string());
        while self.claimed_periods.len() > CLAIMED_PERIOD_MEMORY {
            self.claimed_periods.pop_front();
        }
        true
    }

    pub fn last_recorded_period(&self) -> Option<&str> {
        self.claimed_periods.back().map(String::as_str)
    }

    pub fn is_on_probation(&self, source: &str) -> bool {
        self.stats.get(source).is_some_and(|s| s.on_probation)
    }

    pub fn rolling_accuracy(&self, source: &str) -> Option<f64> {
        self.stats.get(source).and_then(SourceStats::rolling_accuracy)
    }

    pub fn snapshot(&self) -> PerformanceSnapshot {
        let mut sources: Vec<SourcePerformance> = self
            .stats
            .iter()
            .map(|(source, s)| SourcePerformance {
                source: source.clone(),
                total: s.total,
                correct: s.correct,
                rolling_accuracy: s.rolling_accuracy(),
                rolling_len: s.rolling.len(),
                on_probation: s.on_probation,
                regimes: s.regimes.clone(),
            })
            .collect();
        sources.sort_by(|a, b| a.source.cmp(&b.source));
        PerformanceSnapshot {
            sources,
            last_recorded_period: self.last_recorded_period().map(str::to_string),
        }
    }
}
