// =============================================================================
// Shannon Entropy Filter — How random is the recent BIG/SMALL stream?
// =============================================================================
//
// Computes the binary Shannon entropy of the BIG / SMALL distribution over a
// rolling window of the most recent outcomes:
//
//   H = -p_big * log2(p_big) - p_small * log2(p_small)
//
// For a binary variable the maximum entropy is 1.0 (50/50 split).
//
// States:
//   H >= chaos threshold      =>  CHAOS    : indistinguishable from noise
//   H >= uncertain threshold  =>  UNCERTAIN: weak bias
//   otherwise                 =>  ORDERED  : clear bias toward one side
//
// The decision synthesizer adds an uncertainty penalty in CHAOS and the
// regime probability table flattens its bias.

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::runtime_config::RegimeParams;
use crate::types::Category;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntropyState {
    Ordered,
    Uncertain,
    Chaos,
    Unknown,
}

impl std::fmt::Display for EntropyState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ordered => write!(f, "ORDERED"),
            Self::Uncertain => write!(f, "UNCERTAIN"),
            Self::Chaos => write!(f, "CHAOS"),
            Self::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

/// Entropy value plus its classified state.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct EntropyReading {
    pub entropy: f64,
    pub state: EntropyState,
}

/// Stateless entropy filter; all input comes from the caller's series.
pub struct ShannonEntropyFilter;

impl ShannonEntropyFilter {
    /// Binary entropy over the `window` most recent categories.
    ///
    /// Returns `None` if there are fewer categories than `window` or the
    /// window is zero.
    pub fn calculate(categories: &[Category], window: usize) -> Option<f64> {
        if window == 0 || categories.len() < window {
            trace!(
                available = categories.len(),
                window,
                "Entropy: insufficient outcomes"
            );
            return None;
        }

        let big_count = categories[..window]
            .iter()
            .filter(|c| **c == Category::Big)
            .count();

        let p_big = big_count as f64 / window as f64;
        let entropy = binary_entropy(p_big, 1.0 - p_big);

        trace!(
            p_big = format!("{:.4}", p_big),
            entropy = format!("{:.4}", entropy),
            window,
            "Entropy calculated"
        );

        Some(entropy)
    }

    /// Entropy over the configured window, classified into a state.
    ///
    /// With insufficient data the state is `Unknown`, which carries no
    /// penalty downstream.
    pub fn check(categories: &[Category], params: &RegimeParams) -> EntropyReading {
        match Self::calculate(categories, params.entropy_window) {
            Some(entropy) => {
                let state = if entropy >= params.chaos_entropy {
                    EntropyState::Chaos
                } else if entropy >= params.uncertain_entropy {
                    EntropyState::Uncertain
                } else {
                    EntropyState::Ordered
                };
                EntropyReading { entropy, state }
            }
            None => EntropyReading {
                entropy: 0.0,
                state: EntropyState::Unknown,
            },
        }
    }
}

/// Binary Shannon entropy: H = -p * log2(p) - q * log2(q).
///
/// Handles the degenerate cases where p or q is 0 (0 * log2(0) := 0).
#[inline]
fn binary_entropy(p: f64, q: f64) -> f64 {
    let h_p = if p > 0.0 { -p * p.log2() } else { 0.0 };
    let h_q = if q > 0.0 { -q * q.log2() } else { 0.0 };
    h_p + h_q
}
