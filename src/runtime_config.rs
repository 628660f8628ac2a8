// =============================================================================
// Engine Configuration — Tunable forecasting parameters with atomic save
// =============================================================================
//
// Every tunable constant of the forecasting pipeline lives here so that the
// engine can be re-tuned without a rebuild.
//
// Persistence uses an atomic tmp + rename pattern to prevent corruption on
// crash. All fields carry serde defaults so that adding new fields never
// breaks loading an older config file.
//
// =============================================================================

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

// =============================================================================
// Default-value helpers (required by serde `default = "..."` attribute)
// =============================================================================

fn default_min_confirmed_history() -> usize {
    52
}

fn default_min_signals() -> usize {
    3
}

fn default_negligible_weight() -> f64 {
    0.001
}

fn default_tier3_confidence() -> f64 {
    0.75
}

fn default_tier2_confidence() -> f64 {
    0.62
}

fn default_forced_uncertainty() -> f64 {
    85.0
}

fn default_accuracy_floor() -> f64 {
    0.48
}

fn default_accuracy_penalty_scale() -> f64 {
    250.0
}

fn default_global_accuracy_rate() -> f64 {
    0.02
}

fn default_max_contributing_signals() -> usize {
    10
}

fn default_uncertainty_penalties() -> UncertaintyPenalties {
    UncertaintyPenalties::default()
}

// =============================================================================
// RegimeParams
// =============================================================================

/// Trend, volatility, entropy and stability thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegimeParams {
    pub ema_short: usize,
    pub ema_medium: usize,
    pub ema_long: usize,
    /// Maximum number of recent points used for the volatility tier.
    pub volatility_window: usize,
    pub strong_spread: f64,
    pub moderate_spread: f64,
    pub volatility_high: f64,
    pub volatility_medium: f64,
    pub volatility_low: f64,
    pub entropy_window: usize,
    /// Binary entropy at or above which the sequence is treated as chaos.
    pub chaos_entropy: f64,
    pub uncertain_entropy: f64,
    pub stability_window: usize,
    /// Share of one category in the stability window that counts as dominance.
    pub dominance_share: f64,
    /// Share of adjacent flips in the stability window that counts as chop.
    pub alternation_share: f64,
}

impl Default for RegimeParams {
    fn default() -> Self {
        Self {
            ema_short: 5,
            ema_medium: 10,
            ema_long: 20,
            volatility_window: 30,
            strong_spread: 0.80,
            moderate_spread: 0.45,
            volatility_high: 3.0,
            volatility_medium: 1.8,
            volatility_low: 0.9,
            entropy_window: 50,
            chaos_entropy: 0.98,
            uncertain_entropy: 0.90,
            stability_window: 20,
            dominance_share: 0.85,
            alternation_share: 0.85,
        }
    }
}

// =============================================================================
// SignalParams
// =============================================================================

/// Base weight per signal source.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalWeights {
    pub streak_break: f64,
    pub rsi_reversal: f64,
    pub macd_cross: f64,
    pub bollinger_breach: f64,
    pub stochastic_cross: f64,
    pub extreme_reversion: f64,
    pub external_model: f64,
    pub weighted_majority: f64,
}

impl Default for SignalWeights {
    fn default() -> Self {
        Self {
            streak_break: 1.0,
            rsi_reversal: 1.0,
            macd_cross: 1.0,
            bollinger_breach: 0.9,
            stochastic_cross: 0.9,
            extreme_reversion: 0.8,
            external_model: 0.7,
            weighted_majority: 1.2,
        }
    }
}

/// Generator lookbacks and shaping constants.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalParams {
    pub weights: SignalWeights,
    pub streak_min_run: usize,
    pub streak_max_factor: f64,
    pub rsi_period: usize,
    pub macd_short: usize,
    pub macd_long: usize,
    pub macd_signal: usize,
    /// Histogram magnitude that maps to full MACD strength.
    pub macd_scale: f64,
    pub bollinger_period: usize,
    pub bollinger_std: f64,
    pub stochastic_lookback: usize,
    pub stochastic_k_smooth: usize,
    pub stochastic_d_smooth: usize,
    /// Distance around a band inside which a %K/%D cross is actionable.
    pub stochastic_buffer: f64,
    pub extreme_low: f64,
    pub extreme_high: f64,
    pub majority_min_signals: usize,
    /// Relative margin one side's scaled mass must exceed the other's by.
    pub majority_margin: f64,
}

impl Default for SignalParams {
    fn default() -> Self {
        Self {
            weights: SignalWeights::default(),
            streak_min_run: 2,
            streak_max_factor: 0.90,
            rsi_period: 14,
            macd_short: 12,
            macd_long: 26,
            macd_signal: 9,
            macd_scale: 0.5,
            bollinger_period: 20,
            bollinger_std: 1.5,
            stochastic_lookback: 14,
            stochastic_k_smooth: 3,
            stochastic_d_smooth: 3,
            stochastic_buffer: 10.0,
            extreme_low: 1.0,
            extreme_high: 8.0,
            majority_min_signals: 4,
            majority_margin: 0.20,
        }
    }
}

// =============================================================================
// LearnerParams
// =============================================================================

/// Adaptive weight learner constants.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LearnerParams {
    /// Maximum rolling-accuracy entries kept per source.
    pub performance_window: usize,
    pub min_overall_observations: usize,
    pub min_regime_observations: u64,
    pub overall_scale: f64,
    pub regime_scale: f64,
    pub min_weight_factor: f64,
    pub max_weight_factor: f64,
    pub probation_enter_accuracy: f64,
    pub probation_min_observations: usize,
    pub probation_exit_accuracy: f64,
    pub probation_cap: f64,
    /// Previous-decision confidence above which a wrong call is penalised.
    pub confident_wrong_threshold: f64,
    pub confident_wrong_score: f64,
    /// Floor for any positive adjusted weight.
    pub weight_epsilon: f64,
}

impl Default for LearnerParams {
    fn default() -> Self {
        Self {
            performance_window: 30,
            min_overall_observations: 10,
            min_regime_observations: 5,
            overall_scale: 1.2,
            regime_scale: 1.5,
            min_weight_factor: 0.1,
            max_weight_factor: 1.8,
            probation_enter_accuracy: 0.40,
            probation_min_observations: 15,
            probation_exit_accuracy: 0.55,
            probation_cap: 0.2,
            confident_wrong_threshold: 0.75,
            confident_wrong_score: -0.5,
            weight_epsilon: 0.001,
        }
    }
}

// =============================================================================
// DriftParams
// =============================================================================

/// Concept-drift detector thresholds (in standard errors).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DriftParams {
    /// Observations required before WARNING / DRIFT can be signalled.
    pub min_samples: u64,
    pub warning_level: f64,
    pub drift_level: f64,
}

impl Default for DriftParams {
    fn default() -> Self {
        Self {
            min_samples: 30,
            warning_level: 2.0,
            drift_level: 3.0,
        }
    }
}

// =============================================================================
// SessionParams
// =============================================================================

/// Time-of-day confidence multipliers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionParams {
    pub prime_hours: Vec<u32>,
    pub quiet_hours: Vec<u32>,
    pub prime_multiplier: f64,
    pub quiet_multiplier: f64,
}

impl Default for SessionParams {
    fn default() -> Self {
        Self {
            prime_hours: vec![9, 10, 11, 14, 15, 16, 19, 20, 21],
            quiet_hours: vec![0, 1, 2, 3, 4, 5],
            prime_multiplier: 1.05,
            quiet_multiplier: 0.95,
        }
    }
}

// =============================================================================
// DecisionParams
// =============================================================================

/// Additive uncertainty penalties (score points, 100 = full damping).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UncertaintyPenalties {
    pub drift: f64,
    pub warning: f64,
    pub unstable_trend: f64,
    pub chaos: f64,
    pub transition: f64,
    pub high_volatility: f64,
}

impl Default for UncertaintyPenalties {
    fn default() -> Self {
        Self {
            drift: 70.0,
            warning: 40.0,
            unstable_trend: 45.0,
            chaos: 35.0,
            transition: 25.0,
            high_volatility: 20.0,
        }
    }
}

/// Decision synthesizer thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionParams {
    /// Confirmed records required before a real forecast is attempted.
    #[serde(default = "default_min_confirmed_history")]
    pub min_confirmed_history: usize,

    /// Surviving signals required before a real forecast is attempted.
    #[serde(default = "default_min_signals")]
    pub min_signals: usize,

    /// Adjusted weight below which a signal is dropped.
    #[serde(default = "default_negligible_weight")]
    pub negligible_weight: f64,

    #[serde(default = "default_tier3_confidence")]
    pub tier3_confidence: f64,

    #[serde(default = "default_tier2_confidence")]
    pub tier2_confidence: f64,

    /// Uncertainty score at or above which the decision is forced.
    #[serde(default = "default_forced_uncertainty")]
    pub forced_uncertainty: f64,

    /// Long-term accuracy below which an uncertainty penalty applies.
    #[serde(default = "default_accuracy_floor")]
    pub accuracy_floor: f64,

    /// Penalty points per unit of accuracy below the floor.
    #[serde(default = "default_accuracy_penalty_scale")]
    pub accuracy_penalty_scale: f64,

    /// EMA rate for updating the long-term global accuracy.
    #[serde(default = "default_global_accuracy_rate")]
    pub global_accuracy_rate: f64,

    #[serde(default = "default_max_contributing_signals")]
    pub max_contributing_signals: usize,

    #[serde(default = "default_uncertainty_penalties")]
    pub penalties: UncertaintyPenalties,
}

impl Default for DecisionParams {
    fn default() -> Self {
        Self {
            min_confirmed_history: default_min_confirmed_history(),
            min_signals: default_min_signals(),
            negligible_weight: default_negligible_weight(),
            tier3_confidence: default_tier3_confidence(),
            tier2_confidence: default_tier2_confidence(),
            forced_uncertainty: default_forced_uncertainty(),
            accuracy_floor: default_accuracy_floor(),
            accuracy_penalty_scale: default_accuracy_penalty_scale(),
            global_accuracy_rate: default_global_accuracy_rate(),
            max_contributing_signals: default_max_contributing_signals(),
            penalties: UncertaintyPenalties::default(),
        }
    }
}

// =============================================================================
// EngineConfig
// =============================================================================

/// Top-level configuration for the forecasting engine.
///
/// Every section has a serde default so that older JSON files missing new
/// fields still deserialise correctly.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub regime: RegimeParams,

    #[serde(default)]
    pub signals: SignalParams,

    #[serde(default)]
    pub learner: LearnerParams,

    #[serde(default)]
    pub drift: DriftParams,

    #[serde(default)]
    pub session: SessionParams,

    #[serde(default)]
    pub decision: DecisionParams,
}

impl EngineConfig {
    /// Load configuration from a JSON file at `path`.
    ///
    /// If the file does not exist, returns an error so the caller can fall
    /// back to defaults with a warning.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read engine config from {}", path.display()))?;

        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse engine config from {}", path.display()))?;

        info!(
            path = %path.display(),
            min_history = config.decision.min_confirmed_history,
            performance_window = config.learner.performance_window,
            "engine config loaded"
        );

        Ok(config)
    }

    /// Persist the current configuration to `path` using an atomic write
    /// (write to `.tmp`, then rename).
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        let content = serde_json::to_string_pretty(self)
            .context("failed to serialise engine config to JSON")?;

        let tmp_path = path.with_extension("json.tmp");

        std::fs::write(&tmp_path, &content)
            .with_context(|| format!("failed to write tmp config to {}", tmp_path.display()))?;

        std::fs::rename(&tmp_path, path)
            .with_context(|| format!("failed to rename tmp config to {}", path.display()))?;

        info!(path = %path.display(), "engine config saved (atomic)");
        Ok(())
    }
}
