// =============================================================================
// External Model — adapter from the model interface to a signal
// =============================================================================
//
// Builds the feature vector from the series and forwards it to whatever
// `ExternalModel` was injected. The vote carries base_weight * confidence.

use std::sync::Arc;

use tracing::debug;

use crate::external::{ExternalModel, FeatureVector};
use crate::indicators::{calculate_macd, rsi, std_dev};
use crate::regime::TrendContext;
use crate::runtime_config::SignalParams;
use crate::signals::generator::{Signal, SignalGenerator};
use crate::types::OutcomeSeries;

const SHORT_VOLATILITY_WINDOW: usize = 10;
const LONG_VOLATILITY_WINDOW: usize = 30;

pub struct ExternalModelSignal {
    model: Arc<dyn ExternalModel>,
    rsi_period: usize,
    macd: (usize, usize, usize),
}

impl ExternalModelSignal {
    pub fn new(model: Arc<dyn ExternalModel>, params: &SignalParams) -> Self {
        Self {
            model,
            rsi_period: params.rsi_period,
            macd: (params.macd_short, params.macd_long, params.macd_signal),
        }
    }
}

/// Feature vector for the newest point, or `None` if any input abstains.
pub fn feature_vector(
    history: &OutcomeSeries,
    rsi_period: usize,
    macd: (usize, usize, usize),
) -> Option<FeatureVector> {
    let values = &history.values;
    let (short, long, signal) = macd;
    Some(FeatureVector {
        rsi: rsi(values, rsi_period)?,
        macd_histogram: calculate_macd(values, short, long, signal)?.current.histogram,
        short_volatility: std_dev(values, SHORT_VOLATILITY_WINDOW)?,
        long_volatility: std_dev(values, values.len().min(LONG_VOLATILITY_WINDOW))?,
    })
}

impl SignalGenerator for ExternalModelSignal {
    fn source(&self) -> &'static str {
        "external_model"
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
        let features = feature_vector(history, self.rsi_period, self.macd)?;
        let verdict = self.model.predict(&features)?;
        if !verdict.confidence.is_finite() {
            return None;
        }
        debug!(
            model = self.model.name(),
            prediction = %verdict.prediction,
            confidence = format!("{:.2}", verdict.confidence),
            "External model verdict"
        );
        Some(Signal::new(
            self.source(),
            verdict.prediction,
            base_weight * verdict.confidence.clamp(0.0, 1.0),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::external::{ModelVerdict, RuleTableModel};
    use crate::regime::TrendStrength;
    use crate::types::Category;

    struct AlwaysSmall(f64);

    impl ExternalModel for AlwaysSmall {
        fn name(&self) -> &str {
            "always_small"
        }

        fn predict(&self, _features: &FeatureVector) -> Option<ModelVerdict> {
            Some(ModelVerdict {
                prediction: Category::Small,
                confidence: self.0,
            })
        }
    }

    fn known() -> TrendContext {
        TrendContext {
            strength: TrendStrength::Weak,
            ..TrendContext::unknown()
        }
    }

    fn mixed_history() -> OutcomeSeries {
        let digits: Vec<u8> = (0..60).map(|i| ((i * 7 + 3) % 10) as u8).collect();
        OutcomeSeries::from_digits(&digits)
    }

    #[test]
    fn injected_model_drives_the_vote() {
        let generator =
            ExternalModelSignal::new(Arc::new(AlwaysSmall(0.5)), &SignalParams::default());
        let signal = generator.generate(&mixed_history(), &known(), 0.8).unwrap();
        assert_eq!(signal.prediction, Category::Small);
        assert!((signal.base_weight - 0.4).abs() < 1e-10);
    }

    #[test]
    fn confidence_is_clamped() {
        let generator =
            ExternalModelSignal::new(Arc::new(AlwaysSmall(4.0)), &SignalParams::default());
        let signal = generator.generate(&mixed_history(), &known(), 0.7).unwrap();
        assert!((signal.base_weight - 0.7).abs() < 1e-10);
    }

    #[test]
    fn short_history_has_no_features() {
        let history = OutcomeSeries::from_digits(&[1, 8, 3, 6]);
        assert!(feature_vector(&history, 14, (12, 26, 9)).is_none());
        let generator =
            ExternalModelSignal::new(Arc::new(RuleTableModel), &SignalParams::default());
        assert!(generator.generate(&history, &known(), 1.0).is_none());
    }

    #[test]
    fn features_are_finite() {
        let f = feature_vector(&mixed_history(), 14, (12, 26, 9)).unwrap();
        assert!((0.0..=100.0).contains(&f.rsi));
        assert!(f.short_volatility > 0.0 && f.long_volatility > 0.0);
        assert!(f.macd_histogram.is_finite());
    }
}
