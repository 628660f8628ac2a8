// =============================================================================
// Indicator Library
// =============================================================================
//
// Pure, side-effect-free numeric primitives over an ordered outcome sequence
// where index 0 is the most recent point. Every public function returns
// `Option<T>` so callers must treat insufficient data and degenerate
// denominators as "this indicator abstains".

pub mod bollinger;
pub mod ema;
pub mod macd;
pub mod rsi;
pub mod sma;
pub mod stochastic;

pub use bollinger::{calculate_bollinger, std_dev, BollingerResult};
pub use ema::ema;
pub use macd::{calculate_macd, MacdResult};
pub use rsi::rsi;
pub use sma::{sma, volume_weighted_average};
pub use stochastic::{calculate_stochastic, StochasticResult};
