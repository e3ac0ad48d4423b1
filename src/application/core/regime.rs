//! Six-variant market regime classification with VIX hysteresis (§4.5).
//!
//! Wraps [`crate::domain::market::market_regime::{MarketRegime, MarketRegimeDetector}`]
//! (four-variant Trending{Up,Down}/Ranging/Volatile/Unknown) and splits the
//! trending variants by strength into the spec's six, the way
//! `regime_handler::detect_market_regime` splits trend strength into
//! discrete buckets. Hysteresis is carried from the teacher's
//! `RISK_RESTORE_HYSTERESIS_BARS` countdown idiom, generalized from "risk
//! score restore" to "regime transition".

use crate::application::core::config::VixConfig;
use crate::domain::market::market_regime::{MarketRegime, MarketRegimeType};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Regime {
    StrongBull,
    WeakBull,
    Range,
    WeakBear,
    StrongBear,
    HighVol,
}

impl fmt::Display for Regime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Regime::StrongBull => "STRONG_BULL",
            Regime::WeakBull => "WEAK_BULL",
            Regime::Range => "RANGE",
            Regime::WeakBear => "WEAK_BEAR",
            Regime::StrongBear => "STRONG_BEAR",
            Regime::HighVol => "HIGH_VOL",
        };
        write!(f, "{s}")
    }
}

impl Regime {
    /// Split the teacher's four-variant classification into the spec's six
    /// using trend strength as the strong/weak discriminator (§4.5).
    pub fn from_market_regime(mr: &MarketRegime, strong_trend_strength: Decimal) -> Self {
        match mr.regime_type {
            MarketRegimeType::Volatile => Regime::HighVol,
            MarketRegimeType::Ranging => Regime::Range,
            MarketRegimeType::Unknown => Regime::Range,
            MarketRegimeType::TrendingUp => {
                if mr.trend_strength >= strong_trend_strength {
                    Regime::StrongBull
                } else {
                    Regime::WeakBull
                }
            }
            MarketRegimeType::TrendingDown => {
                if mr.trend_strength >= strong_trend_strength {
                    Regime::StrongBear
                } else {
                    Regime::WeakBear
                }
            }
        }
    }

    /// VIX-driven override per §4.5 defaults: "VIX > 30 => HIGH_VOL/EXTREME;
    /// > 20 => WEAK_BEAR or VOLATILE depending on trend; else BULL variants
    /// by trend sign."
    pub fn from_vix(vix: Decimal, trend_score: Decimal, cfg: &VixConfig) -> Self {
        if vix > cfg.extreme_threshold {
            return Regime::HighVol;
        }
        if vix > cfg.threshold {
            return if trend_score < Decimal::ZERO {
                Regime::WeakBear
            } else {
                Regime::HighVol
            };
        }
        if trend_score > dec!(0.5) {
            Regime::StrongBull
        } else if trend_score > Decimal::ZERO {
            Regime::WeakBull
        } else if trend_score > dec!(-0.5) {
            Regime::WeakBear
        } else {
            Regime::StrongBear
        }
    }

    pub fn is_bullish(&self) -> bool {
        matches!(self, Regime::StrongBull | Regime::WeakBull)
    }

    pub fn is_bearish(&self) -> bool {
        matches!(self, Regime::StrongBear | Regime::WeakBear)
    }
}

/// Tracks which side of the VIX threshold was last confirmed, applying a
/// hysteresis band so a print that merely grazes the threshold doesn't flip
/// regimes back and forth every cycle.
pub struct RegimeHysteresis {
    cfg: VixConfig,
    last_regime: Regime,
    /// `true` once VIX has been confirmed above `threshold`.
    elevated: bool,
}

impl RegimeHysteresis {
    pub fn new(cfg: VixConfig) -> Self {
        Self {
            cfg,
            last_regime: Regime::Range,
            elevated: false,
        }
    }

    pub fn current(&self) -> Regime {
        self.last_regime
    }

    /// Feed a new VIX/trend reading. Crossing into the elevated state
    /// requires `vix > threshold + hysteresis`; crossing back out requires
    /// `vix < threshold - hysteresis`. Prints that only reach the
    /// threshold itself are absorbed and the prior side is held ("no
    /// oscillation within one step", §3 `Regime`).
    pub fn update(&mut self, vix: Decimal, trend_score: Decimal) -> Regime {
        let upper = self.cfg.threshold + self.cfg.hysteresis;
        let lower = self.cfg.threshold - self.cfg.hysteresis;

        if !self.elevated && vix > upper {
            self.elevated = true;
        } else if self.elevated && vix < lower {
            self.elevated = false;
        }

        let effective_vix = if self.elevated {
            vix.max(self.cfg.threshold + Decimal::new(1, 0)) // keep on the elevated side of from_vix
        } else {
            vix.min(self.cfg.threshold)
        };

        let candidate = Regime::from_vix(effective_vix, trend_score, &self.cfg);
        self.last_regime = candidate;
        candidate
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mr(regime_type: MarketRegimeType, trend_strength: Decimal) -> MarketRegime {
        MarketRegime::new(regime_type, dec!(0.8), dec!(1.0), trend_strength)
    }

    #[test]
    fn strong_vs_weak_bull_splits_on_trend_strength() {
        let strong = mr(MarketRegimeType::TrendingUp, dec!(40));
        let weak = mr(MarketRegimeType::TrendingUp, dec!(10));
        assert_eq!(Regime::from_market_regime(&strong, dec!(25)), Regime::StrongBull);
        assert_eq!(Regime::from_market_regime(&weak, dec!(25)), Regime::WeakBull);
    }

    #[test]
    fn volatile_and_ranging_map_directly() {
        let volatile = mr(MarketRegimeType::Volatile, Decimal::ZERO);
        let ranging = mr(MarketRegimeType::Ranging, Decimal::ZERO);
        assert_eq!(Regime::from_market_regime(&volatile, dec!(25)), Regime::HighVol);
        assert_eq!(Regime::from_market_regime(&ranging, dec!(25)), Regime::Range);
    }

    #[test]
    fn vix_above_extreme_is_high_vol_regardless_of_trend() {
        let cfg = VixConfig::default();
        assert_eq!(Regime::from_vix(dec!(35), dec!(1.0), &cfg), Regime::HighVol);
    }

    #[test]
    fn vix_above_threshold_with_negative_trend_is_weak_bear() {
        let cfg = VixConfig::default();
        assert_eq!(Regime::from_vix(dec!(22), dec!(-0.1), &cfg), Regime::WeakBear);
    }

    #[test]
    fn hysteresis_ignores_grazing_crossings() {
        let cfg = VixConfig::default(); // threshold 20, hysteresis 2
        let mut h = RegimeHysteresis::new(cfg);
        let first = h.update(dec!(19), dec!(1.0));
        assert_eq!(first, Regime::StrongBull);

        // Grazes just over threshold but within the hysteresis band - held.
        let second = h.update(dec!(20.5), dec!(1.0));
        assert_eq!(second, first);
    }

    #[test]
    fn hysteresis_honors_clean_crossings() {
        let cfg = VixConfig::default();
        let mut h = RegimeHysteresis::new(cfg);
        h.update(dec!(10), dec!(1.0));
        let crossed = h.update(dec!(25), dec!(-1.0));
        assert_eq!(crossed, Regime::WeakBear);
    }
}
