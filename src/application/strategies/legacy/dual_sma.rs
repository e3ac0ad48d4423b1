use crate::application::strategies::traits::{AnalysisContext, Signal, TradingStrategy};
use rust_decimal::Decimal;

/// Dual Simple Moving Average (SMA) crossover strategy
///
/// Generates buy signal when fast SMA crosses above slow SMA
/// Generates sell signal when fast SMA crosses below slow SMA
#[derive(Debug, Clone)]
pub struct DualSMAStrategy {
    pub fast_period: usize,
    pub slow_period: usize,
    pub threshold: Decimal,
}

impl DualSMAStrategy {
    pub fn new(fast_period: usize, slow_period: usize, threshold: Decimal) -> Self {
        Self {
            fast_period,
            slow_period,
            threshold,
        }
    }
}

impl TradingStrategy for DualSMAStrategy {
    fn analyze(&self, ctx: &AnalysisContext) -> Option<Signal> {
        let fast = ctx.fast_sma;
        let slow = ctx.slow_sma;

        // Buy: Golden cross (fast SMA crosses above slow SMA)
        // Guard: only emit buy if no position open (avoid spam in sustained uptrend)
        if !ctx.has_position && fast > slow * (Decimal::ONE + self.threshold) {
            return Some(Signal::buy(format!(
                "Golden Cross (Fast={} > Slow={})",
                fast, slow
            )));
        }

        // Sell: Death cross or trend reversal (exit on either condition)
        if ctx.has_position {
            let death_cross = fast < slow * (Decimal::ONE - self.threshold);
            let trend_break = ctx.current_price < ctx.trend_sma;

            if death_cross || trend_break {
                let reason = if death_cross {
                    "Death Cross"
                } else {
                    "Trend Break"
                };
                return Some(Signal::sell(format!(
                    "{} (Fast={}, Slow={}, Price={}, Trend={})",
                    reason, fast, slow, ctx.current_price, ctx.trend_sma
                )));
            }
        }

        None
    }

    fn name(&self) -> &str {
        "DualSMA"
    }
}
