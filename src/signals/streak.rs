// =============================================================================
// Streak Break — fade a run of identical outcomes
// =============================================================================
//
// A run of >= 2 identical categories at the head of the stream predicts the
// opposite category next. Weight grows with run length:
//
//   factor = min(max_factor, 0.30 + 0.15 * (run - 1))
//
// so a run of 2 votes at 0.45, 3 at 0.60, 4 at 0.75, and 5+ at the cap.

use tracing::trace;

use crate::regime::TrendContext;
use crate::runtime_config::SignalParams;
use crate::signals::generator::{Signal, SignalGenerator};
use crate::types::OutcomeSeries;

pub struct StreakBreak {
    min_run: usize,
    max_factor: f64,
}

impl StreakBreak {
    pub fn from_params(params: &SignalParams) -> Self {
        Self {
            min_run: params.streak_min_run.max(2),
            max_factor: params.streak_max_factor,
        }
    }
}

/// Length of the run of identical categories at the newest end.
pub fn current_run(history: &OutcomeSeries) -> usize {
    match history.categories.first() {
        Some(first) => history.categories.iter().take_while(|c| *c == first).count(),
        None => 0,
    }
}

impl SignalGenerator for StreakBreak {
    fn source(&self) -> &'static str {
        "streak_break"
    }

    fn generate(
        &self,
        history: &OutcomeSeries,
        context: &TrendContext,
        base_weight: f64,
    ) -> Option<Signal> {
        if context.is_unknown() {
            return None;
        }
        let latest = history.latest_category()?;
        let run = current_run(history);
        if run < self.min_run {
            trace!(run, "Streak break: no run");
            return None;
        }

        let factor = (0.30 + 0.15 * (run - 1) as f64).min(self.max_factor);
        Some(Signal::new(self.source(), latest.opposite(), base_weight * factor))
    }
}
