use crate::application::strategies::traits::{AnalysisContext, Signal, TradingStrategy};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal_macros::dec;

/// VWAP (Volume Weighted Average Price) Strategy
///
/// VWAP is a key institutional indicator showing the average price weighted by volume.
/// - Buy: Price below VWAP - deviation AND RSI < oversold threshold
/// - Sell: Price above VWAP + deviation OR position touches VWAP from below
#[derive(Debug, Clone)]
pub struct VWAPStrategy {
    pub deviation_threshold_pct: f64, // % deviation from VWAP for signal (e.g., 0.02 = 2%)
    pub rsi_oversold: f64,            // RSI threshold for oversold condition
    pub rsi_overbought: f64,          // RSI threshold for overbought condition
}

impl VWAPStrategy {
    pub fn new(deviation_threshold_pct: f64, rsi_oversold: f64, rsi_overbought: f64) -> Self {
        Self {
            deviation_threshold_pct,
            rsi_oversold,
            rsi_overbought,
        }
    }

    /// Calculate VWAP from candle history
    /// VWAP = Σ(Typical Price × Volume) / Σ(Volume)
    /// Typical Price = (High + Low + Close) / 3
    fn calculate_vwap(&self, ctx: &AnalysisContext) -> Option<f64> {
        if ctx.candles.is_empty() {
            return None;
        }

        let mut cumulative_tp_vol = Decimal::ZERO;
        let mut cumulative_vol = Decimal::ZERO;

        for candle in &ctx.candles {
            let volume = candle.volume;

            if volume <= Decimal::ZERO {
                continue;
            }

            let typ_price = (candle.high + candle.low + candle.close) / dec!(3.0);
            cumulative_tp_vol += typ_price * volume;
            cumulative_vol += volume;
        }

        if cumulative_vol > Decimal::ZERO {
            (cumulative_tp_vol / cumulative_vol).to_f64()
        } else {
            None
        }
    }
}

impl Default for VWAPStrategy {
    fn default() -> Self {
        Self {
            deviation_threshold_pct: 0.02, // 2% deviation
            rsi_oversold: 35.0,
            rsi_overbought: 65.0,
        }
    }
}

impl TradingStrategy for VWAPStrategy {
    fn analyze(&self, ctx: &AnalysisContext) -> Option<Signal> {
        let vwap = self.calculate_vwap(ctx)?;

        if vwap <= 0.0 {
            return None;
        }

        let deviation = (ctx.price_f64 - vwap) / vwap;

        // Buy: Price significantly below VWAP AND RSI indicates oversold
        if !ctx.has_position
            && deviation < -self.deviation_threshold_pct
            && ctx.rsi < self.rsi_oversold
        {
            return Some(
                Signal::buy(format!(
                    "VWAP: Price {:.2} is {:.2}% below VWAP {:.2}, RSI {:.1} < {:.0}",
                    ctx.price_f64,
                    deviation * 100.0,
                    vwap,
                    ctx.rsi,
                    self.rsi_oversold
                ))
                .with_confidence(0.80),
            );
        }

        // Sell conditions (only if we have a position)
        if ctx.has_position {
            // 1. Price significantly above VWAP
            if deviation > self.deviation_threshold_pct {
                return Some(
                    Signal::sell(format!(
                        "VWAP: Price {:.2} is {:.2}% above VWAP {:.2} - Taking profit",
                        ctx.price_f64,
                        deviation * 100.0,
                        vwap
                    ))
                    .with_confidence(0.75),
                );
            }

            // 2. RSI overbought
            if ctx.rsi > self.rsi_overbought {
                return Some(
                    Signal::sell(format!(
                        "VWAP: RSI {:.1} > {:.0} (overbought) near VWAP {:.2}",
                        ctx.rsi, self.rsi_overbought, vwap
                    ))
                    .with_confidence(0.70),
                );
            }
        }

        None
    }

    fn name(&self) -> &str {
        "VWAP"
    }
}
