// =============================================================================
// Regime Detection Module
// =============================================================================
//
// Market regime classification for the outcome stream:
// - Three-EMA trend direction / strength, volatility tier, transition flag
// - Shannon entropy (randomness of the BIG/SMALL split)
// - Trend stability (dominance, chop, direction conflict)
// - Coarse bull / bear probability table

pub mod detector;
pub mod entropy;
pub mod probabilities;
pub mod stability;

pub use detector::{classify_trend, TrendContext, TrendDirection, TrendStrength, VolatilityTier};
pub use entropy::{EntropyReading, EntropyState, ShannonEntropyFilter};
pub use probabilities::{regime_probabilities, RegimeProbabilities};
pub use stability::{assess_stability, TrendStability};
