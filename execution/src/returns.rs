//! Return calculation applied to each bucket when a round closes.

/// How a rate is applied to a principal over one round.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InterestModel {
    /// The rate is applied once.
    Simple,
    /// The rate is split across `periods` sub-periods and compounded.
    Compound { periods: u32 },
}

impl InterestModel {
    /// Model for a compounding frequency; a frequency of 0 or 1 is simple interest.
    pub fn from_freq(freq: u32) -> Self {
        if freq <= 1 {
            Self::Simple
        } else {
            Self::Compound { periods: freq }
        }
    }

    /// Principal after one round at `rate_percent`.
    ///
    /// A zero principal always stays zero. Negative rates are applied as-is.
    pub fn apply(&self, principal: f64, rate_percent: f64) -> f64 {
        if principal == 0.0 {
            return 0.0;
        }
        let rate = rate_percent / 100.0;
        match *self {
            Self::Simple => principal + principal * rate,
            Self::Compound { periods } => {
                let periods = f64::from(periods);
                principal * (1.0 + rate / periods).powf(periods)
            }
        }
    }
}

/// Apply `rate_percent` to `principal` compounded `freq` times per round.
pub fn apply(principal: f64, rate_percent: f64, freq: u32) -> f64 {
    InterestModel::from_freq(freq).apply(principal, rate_percent)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-6,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn test_zero_principal_stays_zero() {
        for freq in [0, 1, 2, 12, 365] {
            for rate in [-100.0, -12.5, 0.0, 7.0, 250.0] {
                assert_eq!(apply(0.0, rate, freq), 0.0);
            }
        }
    }

    #[test]
    fn test_simple_interest() {
        assert_close(apply(10_000.0, 10.0, 1), 11_000.0);
        assert_close(apply(2_500.0, -20.0, 1), 2_000.0);
        assert_close(apply(1_234.5, 0.0, 1), 1_234.5);
        for principal in [1.0, 99.99, 10_000.0] {
            for rate in [-50.0, 3.0, 12.0] {
                assert_close(apply(principal, rate, 1), principal * (1.0 + rate / 100.0));
            }
        }
    }

    #[test]
    fn test_monthly_compounding() {
        let value = apply(10_000.0, 10.0, 12);
        assert!((value - 11_047.13).abs() < 0.01, "got {value}");
    }

    #[test]
    fn test_compounding_beats_simple_for_gains() {
        let simple = apply(10_000.0, 8.0, 1);
        let quarterly = apply(10_000.0, 8.0, 4);
        let daily = apply(10_000.0, 8.0, 365);
        assert!(simple < quarterly);
        assert!(quarterly < daily);
    }

    #[test]
    fn test_negative_rate_compounds_losses() {
        let value = apply(10_000.0, -10.0, 12);
        assert_close(value, 10_000.0 * (1.0 - 0.10 / 12.0_f64).powf(12.0));
        assert!(value < 10_000.0);
        assert!(value > 9_000.0);
    }

    #[test]
    fn test_total_loss() {
        assert_close(apply(10_000.0, -100.0, 1), 0.0);
    }

    #[test]
    fn test_model_from_freq() {
        assert_eq!(InterestModel::from_freq(0), InterestModel::Simple);
        assert_eq!(InterestModel::from_freq(1), InterestModel::Simple);
        assert_eq!(
            InterestModel::from_freq(12),
            InterestModel::Compound { periods: 12 }
        );
    }
}
