use crate::domain::market::order_flow::VolumeProfile;
use crate::domain::market::timeframe::Timeframe;
use crate::domain::trading::types::{Candle, FeatureSet, OrderSide};
use rust_decimal::Decimal;
use std::collections::{HashMap, VecDeque};

/// Snapshot of the strategy's own open position in the symbol being analyzed.
///
/// Strategies that don't need position-aware exits can ignore this and rely
/// on `has_position` alone.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionInfo {
    pub side: OrderSide,
    pub entry_price: Decimal,
    pub quantity: Decimal,
    pub unrealized_pnl: Decimal,
}

/// Everything a `TradingStrategy` needs to produce a signal for one symbol
/// at one point in time.
///
/// Built fresh per bar by the indicator pipeline upstream of the strategy
/// dispatcher. Indicator fields are plain `Decimal` rather than `Option` -
/// strategies are only invoked once warmup has produced a full set of
/// values, so a zeroed/default context is only ever seen in tests.
#[derive(Debug, Clone)]
pub struct AnalysisContext {
    pub symbol: String,
    pub current_price: Decimal,
    /// Same value as `current_price`, pre-converted for strategies that do
    /// float math (divergence ratios, HVN proximity, etc).
    pub price_f64: f64,
    pub fast_sma: Decimal,
    pub slow_sma: Decimal,
    pub trend_sma: Decimal,
    pub rsi: Decimal,
    pub macd_value: Decimal,
    pub macd_signal: Decimal,
    pub macd_histogram: Decimal,
    /// MACD histogram from the previous bar, used to detect rising/falling.
    pub last_macd_histogram: Option<Decimal>,
    pub atr: Decimal,
    pub bb_lower: Decimal,
    pub bb_middle: Decimal,
    pub bb_upper: Decimal,
    pub adx: Decimal,
    pub has_position: bool,
    pub position: Option<PositionInfo>,
    pub timestamp: i64,
    /// Higher-timeframe feature sets, keyed by timeframe, for multi-timeframe
    /// confirmation filters. Absent when only one timeframe is configured.
    pub timeframe_features: Option<HashMap<Timeframe, FeatureSet>>,
    pub candles: VecDeque<Candle>,
    pub rsi_history: VecDeque<Decimal>,
    pub ofi_value: Decimal,
    pub cumulative_delta: Decimal,
    pub volume_profile: Option<VolumeProfile>,
    pub ofi_history: VecDeque<Decimal>,
    pub hurst_exponent: Option<Decimal>,
    pub skewness: Option<Decimal>,
    pub momentum_normalized: Option<Decimal>,
    pub realized_volatility: Option<Decimal>,
    /// Precomputed feature vector, when the ML pipeline has already built one
    /// for this bar. Strategies that need features fall back to assembling
    /// one from the individual fields above when this is `None`.
    pub feature_set: Option<FeatureSet>,
}

impl AnalysisContext {
    /// ADX from the highest available higher-timeframe feature set, falling
    /// back to the base-timeframe `adx` when no multi-timeframe data exists.
    ///
    /// Used by regime detection so a 1-minute chop doesn't flip the regime
    /// away from what the 4-hour trend actually shows.
    pub fn get_highest_timeframe_adx(&self) -> Decimal {
        if let Some(map) = &self.timeframe_features {
            for tf in [Timeframe::FourHour, Timeframe::OneHour, Timeframe::FifteenMin] {
                if let Some(Some(adx)) = map.get(&tf).map(|fs| fs.adx) {
                    return adx;
                }
            }
        }
        self.adx
    }

    /// Whether the given higher timeframe confirms the trend direction
    /// implied by `side`. Permissive (`true`) when that timeframe wasn't
    /// computed - callers that require confirmation should check
    /// `timeframe_features.is_none()` themselves first if they want to
    /// fall back to single-timeframe filtering entirely.
    pub fn higher_timeframe_confirms_trend(&self, side: OrderSide, tf: Timeframe) -> bool {
        let Some(features) = &self.timeframe_features else {
            return true;
        };
        let Some(fs) = features.get(&tf) else {
            return true;
        };
        let Some(trend) = fs.sma_50.or(fs.sma_20) else {
            return true;
        };
        match side {
            OrderSide::Buy => self.current_price > trend,
            OrderSide::Sell => self.current_price < trend,
        }
    }
}

/// A directional trade idea produced by a `TradingStrategy`.
#[derive(Debug, Clone)]
pub struct Signal {
    pub side: OrderSide,
    pub reason: String,
    pub confidence: f64,
    pub stop_loss: Option<Decimal>,
}

impl Signal {
    pub fn buy(reason: String) -> Self {
        Self {
            side: OrderSide::Buy,
            reason,
            confidence: 1.0,
            stop_loss: None,
        }
    }

    pub fn sell(reason: String) -> Self {
        Self {
            side: OrderSide::Sell,
            reason,
            confidence: 1.0,
            stop_loss: None,
        }
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence.clamp(0.0, 1.0);
        self
    }

    pub fn with_stop_loss(mut self, price: Decimal) -> Self {
        self.stop_loss = Some(price);
        self
    }
}

/// Implemented by every entry/exit strategy that plugs into the dispatcher.
pub trait TradingStrategy: Send + Sync {
    fn analyze(&self, ctx: &AnalysisContext) -> Option<Signal>;

    fn name(&self) -> &str;

    /// Called once per symbol when a strategy is first attached, before any
    /// `analyze()` calls feed into live trading. Stateful strategies (ML
    /// predictors with an internal buffer) can use this to prime themselves
    /// without producing a signal. No-op by default.
    fn warmup(&self, _ctx: &AnalysisContext) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn ctx_with_defaults() -> AnalysisContext {
        AnalysisContext {
            symbol: "TEST".to_string(),
            current_price: dec!(100.0),
            price_f64: 100.0,
            fast_sma: Decimal::ZERO,
            slow_sma: Decimal::ZERO,
            trend_sma: Decimal::ZERO,
            rsi: dec!(50.0),
            macd_value: Decimal::ZERO,
            macd_signal: Decimal::ZERO,
            macd_histogram: Decimal::ZERO,
            last_macd_histogram: None,
            atr: Decimal::ONE,
            bb_lower: Decimal::ZERO,
            bb_middle: Decimal::ZERO,
            bb_upper: Decimal::ZERO,
            adx: dec!(20.0),
            has_position: false,
            position: None,
            timestamp: 0,
            timeframe_features: None,
            candles: VecDeque::new(),
            rsi_history: VecDeque::new(),
            ofi_value: Decimal::ZERO,
            cumulative_delta: Decimal::ZERO,
            volume_profile: None,
            ofi_history: VecDeque::new(),
            hurst_exponent: None,
            skewness: None,
            momentum_normalized: None,
            realized_volatility: None,
            feature_set: None,
        }
    }

    #[test]
    fn signal_builders_set_defaults() {
        let sig = Signal::buy("test".to_string());
        assert_eq!(sig.side, OrderSide::Buy);
        assert_eq!(sig.confidence, 1.0);
        assert!(sig.stop_loss.is_none());
    }

    #[test]
    fn with_confidence_clamps_range() {
        let sig = Signal::buy("test".to_string()).with_confidence(1.5);
        assert_eq!(sig.confidence, 1.0);
        let sig = Signal::sell("test".to_string()).with_confidence(-0.2);
        assert_eq!(sig.confidence, 0.0);
    }

    #[test]
    fn with_stop_loss_sets_price() {
        let sig = Signal::buy("test".to_string()).with_stop_loss(dec!(95.0));
        assert_eq!(sig.stop_loss, Some(dec!(95.0)));
    }

    #[test]
    fn highest_timeframe_adx_falls_back_without_multi_timeframe_data() {
        let ctx = ctx_with_defaults();
        assert_eq!(ctx.get_highest_timeframe_adx(), dec!(20.0));
    }

    #[test]
    fn higher_timeframe_confirms_trend_is_permissive_without_data() {
        let ctx = ctx_with_defaults();
        assert!(ctx.higher_timeframe_confirms_trend(OrderSide::Buy, Timeframe::OneHour));
    }
}
