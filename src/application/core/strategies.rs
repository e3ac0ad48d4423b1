//! Indicator-driven signal evaluation (L2, completing §4.6's data flow).
//!
//! `StrategyDispatcher::pick_mode` answers "which strategy family applies
//! this cycle"; this module answers "what does that family say to do right
//! now", playing the role the teacher's `TradingStrategy::analyze` plays
//! against an `AnalysisContext` - but against the lighter
//! `IndicatorSnapshot` this core computes directly, not the teacher's
//! candle/OFI/volume-profile pipeline. Only the four modes
//! `StrategyDispatcher::pick_mode` can actually produce are handled; any
//! other `StrategyMode` falls back to `Hold` since nothing in this core
//! computes its heavier inputs (ML score, order flow, SMC structure, ...).

use crate::application::core::indicators::IndicatorSnapshot;
use crate::application::core::signal::Signal;
use crate::domain::market::strategy_config::StrategyMode;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Evaluate one symbol's signal for `mode` given its current indicator
/// state and whether a position is already open.
pub fn evaluate(mode: StrategyMode, snap: &IndicatorSnapshot, has_position: bool) -> Signal {
    if snap.bars_seen == 0 {
        return Signal::Hold("no bars observed yet".to_string());
    }
    if snap.rsi.is_none() && snap.macd_line.is_none() && snap.momentum_pct.is_none() {
        return Signal::Hold("insufficient indicator history".to_string());
    }

    match mode {
        StrategyMode::Momentum => momentum_signal(snap, has_position),
        StrategyMode::TrendRiding => trend_riding_signal(snap, has_position),
        StrategyMode::ZScoreMR => zscore_mr_signal(snap, has_position),
        StrategyMode::MeanReversion => mean_reversion_signal(snap, has_position),
        other => Signal::Hold(format!("{other:?} not wired to live indicator-driven dispatch")),
    }
}

fn momentum_signal(snap: &IndicatorSnapshot, has_position: bool) -> Signal {
    let Some(momentum) = snap.momentum_pct else {
        return Signal::Hold("momentum not yet available".to_string());
    };
    if !has_position && momentum > dec!(0.01) && snap.momentum_consistent {
        return Signal::Buy(format!("momentum {momentum} consistent over lookback"));
    }
    if has_position && (momentum < Decimal::ZERO || !snap.momentum_consistent) {
        return Signal::Sell("momentum faded or reversed".to_string());
    }
    Signal::Hold("momentum unconfirmed".to_string())
}

fn trend_riding_signal(snap: &IndicatorSnapshot, has_position: bool) -> Signal {
    match snap.macd_bullish() {
        Some(true) if !has_position && snap.bullish_alignment() => {
            Signal::Buy("MACD bullish crossover with EMA alignment".to_string())
        }
        Some(false) if has_position => Signal::Sell("MACD bearish crossover".to_string()),
        _ => Signal::Hold("no confirmed MACD crossover".to_string()),
    }
}

fn zscore_mr_signal(snap: &IndicatorSnapshot, has_position: bool) -> Signal {
    if !has_position && snap.oversold() {
        return Signal::Buy("RSI oversold".to_string());
    }
    if has_position && snap.overbought() {
        return Signal::Sell("RSI overbought".to_string());
    }
    Signal::Hold("RSI within neutral band".to_string())
}

fn mean_reversion_signal(snap: &IndicatorSnapshot, has_position: bool) -> Signal {
    if !has_position && snap.oversold() && snap.ema_fast.is_some() {
        return Signal::Buy("oversold reversion candidate below short-term average".to_string());
    }
    if has_position && snap.bullish_alignment() && !snap.oversold() {
        return Signal::Sell("reversion target reached".to_string());
    }
    Signal::Hold("no reversion edge detected".to_string())
}
