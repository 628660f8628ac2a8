// =============================================================================
// Dispersion and Bollinger Bands
// =============================================================================
//
// Bollinger Bands consist of a middle band (SMA), an upper band (SMA + k*σ),
// and a lower band (SMA - k*σ). σ is the population standard deviation over
// the same `period` most recent points.

use crate::indicators::sma::sma;

/// Result of a Bollinger Band calculation.
#[derive(Debug, Clone)]
pub struct BollingerResult {
    pub upper: f64,
    pub middle: f64,
    pub lower: f64,
    /// Distance from the middle band to either outer band (k * σ).
    pub half_width: f64,
}

/// Population standard deviation over the `period` most recent values.
pub fn std_dev(values: &[f64], period: usize) -> Option<f64> {
    let mean = sma(values, period)?;
    let variance = values[..period]
        .iter()
        .map(|x| (x - mean).powi(2))
        .sum::<f64>()
        / period as f64;
    let sd = variance.sqrt();
    sd.is_finite().then_some(sd)
}

/// Calculate Bollinger Bands over the `period` most recent values.
///
/// Returns `None` when:
/// - Fewer than `period` data points.
/// - The band collapses (σ == 0), since no breach can be measured.
pub fn calculate_bollinger(values: &[f64], period: usize, num_std: f64) -> Option<BollingerResult> {
    let middle = sma(values, period)?;
    let sd = std_dev(values, period)?;
    if sd < f64::EPSILON {
        return None;
    }

    let half_width = num_std * sd;
    Some(BollingerResult {
        upper: middle + half_width,
        middle,
        lower: middle - half_width,
        half_width,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn std_dev_population() {
        // Mean 5, squared deviations 9+1+1+9 = 20, / 4 = 5.
        let sd = std_dev(&[2.0, 4.0, 6.0, 8.0], 4).unwrap();
        assert!((sd - 5.0_f64.sqrt()).abs() < 1e-10);
    }

    #[test]
    fn std_dev_insufficient_data() {
        assert!(std_dev(&[1.0], 2).is_none());
    }

    #[test]
    fn bollinger_basic() {
        let values: Vec<f64> = (0..20).map(|x| (x % 10) as f64).collect();
        let bb = calculate_bollinger(&values, 20, 2.0).unwrap();
        assert!(bb.upper > bb.middle);
        assert!(bb.lower < bb.middle);
        assert!((bb.upper - bb.middle - bb.half_width).abs() < 1e-10);
    }

    #[test]
    fn bollinger_insufficient_data() {
        assert!(calculate_bollinger(&[1.0, 2.0, 3.0], 20, 2.0).is_none());
    }

    #[test]
    fn bollinger_flat_abstains() {
        assert!(calculate_bollinger(&[4.0; 20], 20, 2.0).is_none());
    }
}
