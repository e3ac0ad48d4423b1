use crate::application::strategies::traits::{AnalysisContext, Signal, TradingStrategy};
use rust_decimal::Decimal;

/// Breakout Strategy
///
/// Detects breakouts from consolidation patterns by monitoring:
/// - Price breaking above recent highs (bullish breakout)
/// - Price breaking below recent lows (bearish breakout)
/// - Optional volume confirmation for stronger signals
#[derive(Debug, Clone)]
pub struct BreakoutStrategy {
    pub lookback_period: usize,          // Period to calculate high/low
    pub breakout_threshold_pct: Decimal, // % above/below high/low to confirm breakout
    pub volume_multiplier: Decimal,      // Required volume vs average (e.g., 1.5 = 50% above avg)
}

impl BreakoutStrategy {
    pub fn new(
        lookback_period: usize,
        breakout_threshold_pct: Decimal,
        volume_multiplier: Decimal,
    ) -> Self {
        Self {
            lookback_period,
            breakout_threshold_pct,
            volume_multiplier,
        }
    }

    /// Calculate recent high and low from candle history
    /// Excludes the most recent (current) candle to prevent looking ahead/comparing to self
    fn calculate_range(&self, ctx: &AnalysisContext) -> Option<(Decimal, Decimal, Decimal)> {
        // Need at least lookback + 1 candle (history + current)
        if ctx.candles.len() < self.lookback_period + 1 {
            return None;
        }

        // We want to look at the 'lookback_period' candles BEFORE the current one
        // ctx.candles.len() - 1 is the index of the last item (current)
        // So we take the range [len - 1 - lookback, len - 1)
        let end_idx = ctx.candles.len().saturating_sub(1);
        let start_idx = end_idx.saturating_sub(self.lookback_period);

        let mut highest_high = Decimal::MIN;
        let mut lowest_low = Decimal::MAX;
        let mut total_volume = Decimal::ZERO;
        let mut count = 0;

        // Iterating up to end_idx (exclusive) effectively excludes the current candle
        for candle in ctx
            .candles
            .iter()
            .skip(start_idx)
            .take(self.lookback_period)
        {
            let high = candle.high;
            let low = candle.low;

            if high > highest_high {
                highest_high = high;
            }
            if low < lowest_low {
                lowest_low = low;
            }
            total_volume += candle.volume;
            count += 1;
        }

        let avg_volume = if count > 0 {
            total_volume / Decimal::from(count)
        } else {
            Decimal::ZERO
        };

        Some((highest_high, lowest_low, avg_volume))
    }
}

impl Default for BreakoutStrategy {
    fn default() -> Self {
        use rust_decimal_macros::dec;
        Self {
            lookback_period: 10,                 // Reduced from 20 for faster detection
            breakout_threshold_pct: dec!(0.002), // 0.2% above high (reduced from 0.5%)
            volume_multiplier: dec!(1.1),        // 10% above average (reduced from 30%)
        }
    }
}

impl TradingStrategy for BreakoutStrategy {
    fn analyze(&self, ctx: &AnalysisContext) -> Option<Signal> {
        if let Some((high, low, avg_vol)) = self.calculate_range(ctx) {
            let current_vol = ctx.candles.back()?.volume;
            let current_price = ctx.current_price;

            let vol_ok = current_vol >= avg_vol * self.volume_multiplier;

            // Breakout Long: Price breaks above recent high
            if !ctx.has_position
                && current_price > high * (Decimal::ONE + self.breakout_threshold_pct)
                && vol_ok
            {
                return Some(Signal::buy(format!(
                    "Bullish Breakout (Price={} > High={}, Vol={} > Avg={})",
                    current_price, high, current_vol, avg_vol
                )));
            }

            // Breakout Short: Price breaks below recent low
            if ctx.has_position
                && current_price < low * (Decimal::ONE - self.breakout_threshold_pct)
                && vol_ok
            {
                return Some(Signal::sell(format!(
                    "Bearish Breakout (Price={} < Low={}, Vol={} > Avg={})",
                    current_price, low, current_vol, avg_vol
                )));
            }
        }

        None
    }

    fn name(&self) -> &str {
        "Breakout"
    }
}
