//! Six-way regime classification with hysteresis, layered on top of
//! [`crate::domain::market::market_regime::MarketRegimeDetector`].
//!
//! The underlying detector only distinguishes trend/range/volatile; this
//! module adds the bull/bear split and the strong/weak split the strategy
//! dispatcher needs, driven by a VIX-like volatility index plus a trend
//! score, and wraps both in a hysteresis band so a measure oscillating
//! around a threshold doesn't flip the regime every tick.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RegimeClass {
    StrongBull,
    WeakBull,
    Range,
    WeakBear,
    StrongBear,
    HighVol,
}

impl fmt::Display for RegimeClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RegimeClass::StrongBull => "STRONG_BULL",
            RegimeClass::WeakBull => "WEAK_BULL",
            RegimeClass::Range => "RANGE",
            RegimeClass::WeakBear => "WEAK_BEAR",
            RegimeClass::StrongBear => "STRONG_BEAR",
            RegimeClass::HighVol => "HIGH_VOL",
        };
        write!(f, "{}", s)
    }
}

/// Classifies a raw (vix, trend_score) pair into a [`RegimeClass`], applying
/// a hysteresis band around each threshold so a measure hovering near a
/// boundary doesn't cause the regime to chatter tick to tick.
pub struct RegimeClassifier {
    pub high_vol_threshold: Decimal,
    pub elevated_vol_threshold: Decimal,
    pub hysteresis: Decimal,
    last: Option<RegimeClass>,
}

impl RegimeClassifier {
    pub fn new(high_vol_threshold: Decimal, elevated_vol_threshold: Decimal, hysteresis: Decimal) -> Self {
        Self {
            high_vol_threshold,
            elevated_vol_threshold,
            hysteresis,
            last: None,
        }
    }

    /// `vix` is the volatility index reading; `trend_score` is positive for
    /// bullish trend, negative for bearish, magnitude indicating strength.
    pub fn classify(&mut self, vix: Decimal, trend_score: Decimal) -> RegimeClass {
        let candidate = self.raw_classify(vix, trend_score);

        let accepted = match self.last {
            None => candidate,
            Some(prev) if prev == candidate => candidate,
            Some(prev) => {
                if self.crosses_with_hysteresis(prev, candidate, vix) {
                    candidate
                } else {
                    prev
                }
            }
        };

        self.last = Some(accepted);
        accepted
    }

    fn raw_classify(&self, vix: Decimal, trend_score: Decimal) -> RegimeClass {
        if vix > self.high_vol_threshold {
            return RegimeClass::HighVol;
        }
        if vix > self.elevated_vol_threshold {
            return if trend_score < Decimal::ZERO {
                RegimeClass::WeakBear
            } else {
                RegimeClass::Range
            };
        }

        if trend_score >= dec!(0.6) {
            RegimeClass::StrongBull
        } else if trend_score >= dec!(0.15) {
            RegimeClass::WeakBull
        } else if trend_score <= dec!(-0.6) {
            RegimeClass::StrongBear
        } else if trend_score <= dec!(-0.15) {
            RegimeClass::WeakBear
        } else {
            RegimeClass::Range
        }
    }

    /// A transition away from `HighVol` must have vix drop below
    /// `high_vol_threshold - hysteresis`; any other transition is accepted
    /// directly since only the vol-driven boundary is prone to chatter.
    fn crosses_with_hysteresis(&self, prev: RegimeClass, candidate: RegimeClass, vix: Decimal) -> bool {
        if prev == RegimeClass::HighVol && candidate != RegimeClass::HighVol {
            return vix < self.high_vol_threshold - self.hysteresis;
        }
        if prev != RegimeClass::HighVol && candidate == RegimeClass::HighVol {
            return vix > self.high_vol_threshold + self.hysteresis;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> RegimeClassifier {
        RegimeClassifier::new(dec!(30), dec!(20), dec!(2))
    }

    #[test]
    fn test_strong_bull_low_vix() {
        let mut c = classifier();
        assert_eq!(c.classify(dec!(12), dec!(0.8)), RegimeClass::StrongBull);
    }

    #[test]
    fn test_high_vol_overrides_trend() {
        let mut c = classifier();
        assert_eq!(c.classify(dec!(35), dec!(0.9)), RegimeClass::HighVol);
    }

    #[test]
    fn test_hysteresis_suppresses_chatter_at_boundary() {
        let mut c = classifier();
        assert_eq!(c.classify(dec!(32), dec!(0.0)), RegimeClass::HighVol);
        // Dips just below threshold but still inside the hysteresis band - stays HighVol.
        assert_eq!(c.classify(dec!(29), dec!(0.0)), RegimeClass::HighVol);
        // Drops below threshold - hysteresis, regime finally releases.
        assert_eq!(c.classify(dec!(27), dec!(0.0)), RegimeClass::Range);
    }

    #[test]
    fn test_weak_bear_in_elevated_vol() {
        let mut c = classifier();
        assert_eq!(c.classify(dec!(22), dec!(-0.5)), RegimeClass::WeakBear);
    }
}
