//! StrategyDispatcher (L2, §4.6).
//!
//! Maps `(regime, asset class)` to a strategy family, the way
//! `StrategySelector::select_strategy` maps `MarketRegimeType` to a
//! `StrategyMode` and hands back a `TradingStrategy` via `StrategyFactory`.
//! This dispatcher works purely off the regime table - picking a concrete
//! `TradingStrategy` instance for a `StrategyMode` remains `StrategyFactory`'s
//! job; callers combine the two.

use crate::application::core::regime::Regime;
use crate::application::core::signal::Signal;
use crate::domain::market::strategy_config::StrategyMode;
use rust_decimal::Decimal;

/// Whether a symbol is configured as a momentum name (profile-level tag) or
/// a generic one, per the §4.6 regime table's "momentum ticker" vs "other"
/// split.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetClass {
    Momentum,
    Other,
}

/// Recommendation from an (optional) multi-timeframe analyzer, overriding
/// the per-regime pick when confident (§4.6 paragraph 2).
#[derive(Debug, Clone, Copy)]
pub struct MultiTimeframeRecommendation {
    pub mode: StrategyMode,
    pub confidence: f64,
    pub timeframes_agree: bool,
}

pub struct StrategyDispatcher;

impl StrategyDispatcher {
    /// Pick a strategy mode for the given regime and asset class, per the
    /// §4.6 table. The teacher's `StrategyMode` has no dedicated `MACD` or
    /// `RSI` variants, so the table's "MACD" cell maps to `TrendRiding`
    /// (trend-following, same role as MACD crossover) and its "RSI" cell
    /// maps to `ZScoreMR` (oscillator-driven mean reversion, same role as
    /// RSI overbought/oversold) - see DESIGN.md Open Question resolution.
    pub fn pick_mode(regime: Regime, class: AssetClass) -> StrategyMode {
        use AssetClass::*;
        use Regime::*;
        match (regime, class) {
            (StrongBull, Momentum) => StrategyMode::Momentum,
            (StrongBull, Other) => StrategyMode::TrendRiding,
            (WeakBull, Momentum) => StrategyMode::Momentum,
            (WeakBull, Other) => StrategyMode::ZScoreMR,
            (WeakBear, _) | (StrongBear, _) => StrategyMode::ZScoreMR,
            (Range, _) => StrategyMode::MeanReversion,
            (HighVol, _) => StrategyMode::MeanReversion,
        }
    }

    /// Resolve the final mode for this cycle, applying the multi-timeframe
    /// override/veto described in §4.6: override when confidence > 0.7;
    /// force HOLD (represented here as `None`) when confidence < 0.6 and
    /// the timeframes disagree.
    pub fn resolve_mode(
        regime: Regime,
        class: AssetClass,
        mtf: Option<MultiTimeframeRecommendation>,
    ) -> Option<StrategyMode> {
        if let Some(rec) = mtf {
            if rec.confidence > 0.7 {
                return Some(rec.mode);
            }
            if rec.confidence < 0.6 && !rec.timeframes_agree {
                return None;
            }
        }
        Some(Self::pick_mode(regime, class))
    }
}

/// `regime, asset class -> strategy mode` table entry used for the HOLD
/// short-circuit: if `resolve_mode` returns `None`, the caller should emit a
/// `Signal::Hold` without invoking any strategy.
pub fn hold_signal_for_mtf_veto() -> Signal {
    Signal::Hold("multi-timeframe disagreement below confidence floor".to_string())
}

/// Defensive sizing penalty applied by the sizer for `HighVol`/bearish
/// regimes, mirroring `regime_size_multiplier` but against the spec's
/// six-variant set.
pub fn regime_size_multiplier(regime: Regime) -> Decimal {
    use rust_decimal_macros::dec;
    match regime {
        Regime::StrongBull => dec!(1.0),
        Regime::WeakBull => dec!(0.85),
        Regime::Range => dec!(0.7),
        Regime::WeakBear => dec!(0.5),
        Regime::StrongBear => dec!(0.3),
        Regime::HighVol => dec!(0.5),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strong_bull_splits_by_asset_class() {
        assert_eq!(
            StrategyDispatcher::pick_mode(Regime::StrongBull, AssetClass::Momentum),
            StrategyMode::Momentum
        );
        assert_eq!(
            StrategyDispatcher::pick_mode(Regime::StrongBull, AssetClass::Other),
            StrategyMode::TrendRiding
        );
    }

    #[test]
    fn range_and_high_vol_use_mean_reversion() {
        assert_eq!(
            StrategyDispatcher::pick_mode(Regime::Range, AssetClass::Other),
            StrategyMode::MeanReversion
        );
        assert_eq!(
            StrategyDispatcher::pick_mode(Regime::HighVol, AssetClass::Momentum),
            StrategyMode::MeanReversion
        );
    }

    #[test]
    fn mtf_override_wins_above_confidence_threshold() {
        let mtf = MultiTimeframeRecommendation {
            mode: StrategyMode::Breakout,
            confidence: 0.9,
            timeframes_agree: true,
        };
        let resolved = StrategyDispatcher::resolve_mode(Regime::Range, AssetClass::Other, Some(mtf));
        assert_eq!(resolved, Some(StrategyMode::Breakout));
    }

    #[test]
    fn mtf_veto_forces_hold_on_low_confidence_disagreement() {
        let mtf = MultiTimeframeRecommendation {
            mode: StrategyMode::Breakout,
            confidence: 0.5,
            timeframes_agree: false,
        };
        let resolved = StrategyDispatcher::resolve_mode(Regime::StrongBull, AssetClass::Momentum, Some(mtf));
        assert_eq!(resolved, None);
    }

    #[test]
    fn mtf_present_but_mid_confidence_falls_back_to_table() {
        let mtf = MultiTimeframeRecommendation {
            mode: StrategyMode::Breakout,
            confidence: 0.65,
            timeframes_agree: false,
        };
        let resolved = StrategyDispatcher::resolve_mode(Regime::StrongBull, AssetClass::Momentum, Some(mtf));
        assert_eq!(resolved, Some(StrategyMode::Momentum));
    }
}
