// =============================================================================
// Central Application State — Outcome Oracle
// =============================================================================
//
// Ties the forecasting core to the HTTP surface. The engine's learning state
// lives in `EngineContext`; everything here is either configuration, the
// collaborators the engine was built with, or the audit trail of recent
// decisions.
//
// Thread safety:
//   - Atomic counter for lock-free version tracking.
//   - parking_lot::RwLock for configuration and the decision ring.
//   - EngineContext guards its own ledger / detector with mutexes.
// =============================================================================

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;

use crate::decision_envelope::DecisionEnvelope;
use crate::engine::{EngineContext, PredictionEngine, PredictionRequest};
use crate::runtime_config::EngineConfig;

/// Maximum number of recent decisions to retain.
const MAX_RECENT_DECISIONS: usize = 100;

/// Central application state shared across handlers via `Arc<AppState>`.
pub struct AppState {
    /// Monotonically increasing version counter, bumped on every decision,
    /// config change and reset.
    pub state_version: AtomicU64,

    pub config: RwLock<EngineConfig>,
    /// Where config updates are persisted. `None` keeps them in memory.
    pub config_path: Option<PathBuf>,

    pub engine: PredictionEngine,
    pub context: EngineContext,

    pub recent_decisions: RwLock<Vec<DecisionEnvelope>>,

    /// Bearer token for protected routes. `None` rejects them all.
    pub admin_token: Option<String>,

    pub start_time: std::time::Instant,
}

impl AppState {
    pub fn new(
        config: EngineConfig,
        config_path: Option<PathBuf>,
        engine: PredictionEngine,
        admin_token: Option<String>,
    ) -> Self {
        let context = EngineContext::new(&config);
        Self {
            state_version: AtomicU64::new(1),
            config: RwLock::new(config),
            config_path,
            engine,
            context,
            recent_decisions: RwLock::new(Vec::new()),
            admin_token: admin_token.filter(|t| !t.is_empty()),
            start_time: std::time::Instant::now(),
        }
    }

    // ── Version Management ──────────────────────────────────────────────

    pub fn increment_version(&self) -> u64 {
        self.state_version.fetch_add(1, Ordering::SeqCst)
    }

    pub fn current_state_version(&self) -> u64 {
        self.state_version.load(Ordering::SeqCst)
    }

    // ── Forecasting ─────────────────────────────────────────────────────

    /// Run one prediction against a config snapshot and record it.
    pub fn predict(&self, request: &PredictionRequest) -> DecisionEnvelope {
        let config = self.config.read().clone();
        let envelope = self.engine.predict(&self.context, &config, request);
        self.push_decision(envelope.clone());
        envelope
    }

    // ── Decision Audit ──────────────────────────────────────────────────

    /// Record a decision envelope. The ring buffer is capped at
    /// [`MAX_RECENT_DECISIONS`]; oldest entries are evicted first.
    pub fn push_decision(&self, envelope: DecisionEnvelope) {
        let mut decisions = self.recent_decisions.write();
        decisions.push(envelope);
        while decisions.len() > MAX_RECENT_DECISIONS {
            decisions.remove(0);
        }

        self.increment_version();
    }

    /// Drop all learned performance and drift state. Learner and drift
    /// parameters changed since startup take effect here.
    pub fn reset_learning(&self) {
        let config = self.config.read().clone();
        self.context.reset(&config);
        self.increment_version();
    }
}
