// =============================================================================
// Concept-Drift Detector — error-rate control chart over ensemble decisions
// =============================================================================
//
// Drift Detection Method (DDM) over a stream of 0/1 error indicators, one
// per resolved decision:
//
//   n   += 1
//   p   += (x - p) / n            running error rate
//   s    = sqrt(p (1 - p) / n)    its standard error
//
// Once n >= min_samples the detector tracks the smallest p + s seen so far
// (p_min, s_min) and classifies the current point:
//
//   p + s > p_min + 3 s_min   => DRIFT   (then n = 1, p_min = s_min = inf)
//   p + s > p_min + 2 s_min   => WARNING
//   otherwise                 => STABLE
//
// This watches the ensemble's overall correctness, independent of the
// per-signal learner.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::runtime_config::DriftParams;

// =============================================================================
// Types
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DriftLevel {
    #[default]
    Stable,
    Warning,
    Drift,
}

impl fmt::Display for DriftLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DriftLevel::Stable => write!(f, "STABLE"),
            DriftLevel::Warning => write!(f, "WARNING"),
            DriftLevel::Drift => write!(f, "DRIFT"),
        }
    }
}

/// Point-in-time view of the detector for the API and the trace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriftSnapshot {
    pub level: DriftLevel,
    pub observations: u64,
    pub error_rate: f64,
    pub std_error: f64,
    /// `None` until the minimum has been established.
    pub min_error_rate: Option<f64>,
    pub min_std_error: Option<f64>,
    pub drift_events: u64,
}

// =============================================================================
// DriftDetector
// =============================================================================

pub struct DriftDetector {
    params: DriftParams,
    n: u64,
    p: f64,
    s: f64,
    p_min: f64,
    s_min: f64,
    level: DriftLevel,
    drift_events: u64,
}

impl DriftDetector {
    pub fn new(params: DriftParams) -> Self {
        Self {
            params,
            n: 0,
            p: 0.0,
            s: 0.0,
            p_min: f64::INFINITY,
            s_min: f64::INFINITY,
            level: DriftLevel::Stable,
            drift_events: 0,
        }
    }

    /// Level as of the last update.
    pub fn level(&self) -> DriftLevel {
        self.level
    }

    pub fn observations(&self) -> u64 {
        self.n
    }

    /// Feed one resolved decision. `error` is true when it was wrong.
    pub fn update(&mut self, error: bool) -> DriftLevel {
        let x = if error { 1.0 } else { 0.0 };
        self.n += 1;
        let n = self.n as f64;
        self.p += (x - self.p) / n;
        self.s = (self.p * (1.0 - self.p) / n).max(0.0).sqrt();

        if self.n < self.params.min_samples {
            self.level = DriftLevel::Stable;
            return self.level;
        }

        let current = self.p + self.s;
        if current < self.p_min + self.s_min {
            self.p_min = self.p;
            self.s_min = self.s;
        }

        self.level = if current > self.p_min + self.params.drift_level * self.s_min {
            self.drift_events += 1;
            warn!(
                error_rate = format!("{:.3}", self.p),
                baseline = format!("{:.3}", self.p_min),
                observations = self.n,
                "Concept drift detected, resetting detector"
            );
            self.n = 1;
            self.p_min = f64::INFINITY;
            self.s_min = f64::INFINITY;
            DriftLevel::Drift
        } else if current > self.p_min + self.params.warning_level * self.s_min {
            debug!(
                error_rate = format!("{:.3}", self.p),
                baseline = format!("{:.3}", self.p_min),
                "Drift warning"
            );
            DriftLevel::Warning
        } else {
            DriftLevel::Stable
        };
        self.level
    }

    pub fn snapshot(&self) -> DriftSnapshot {
        DriftSnapshot {
            level: self.level,
            observations: self.n,
            error_rate: self.p,
            std_error: self.s,
            min_error_rate: self.p_min.is_finite().then_some(self.p_min),
            min_std_error: self.s_min.is_finite().then_some(self.s_min),
            drift_events: self.drift_events,
        }
    }
}
