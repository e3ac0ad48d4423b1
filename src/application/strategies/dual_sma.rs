use super::traits::{AnalysisContext, Signal, TradingStrategy};

/// Dual Simple Moving Average (SMA) crossover strategy
///
/// Generates buy signal when fast SMA crosses above slow SMA
/// Generates sell signal when fast SMA crosses below slow SMA
#[derive(Debug, Clone)]
pub struct DualSMAStrategy {
    pub fast_period: usize,
    pub slow_period: usize,
    pub threshold: f64,
}

impl DualSMAStrategy {
    pub fn new(fast_period: usize, slow_period: usize, threshold: f64) -> Self {
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

        // Golden Cross: Fast SMA crosses above Slow SMA
        if fast > slow * (1.0 + self.threshold) {
            tracing::debug!(
                "DualSMA [{}]: Golden Cross detected (fast={:.2}, slow={:.2}, threshold={:.4})",
                ctx.symbol,
                fast,
                slow,
                self.threshold
            );
            return Some(Signal::buy(format!(
                "Golden Cross (Fast={:.2} > Slow={:.2})",
                fast, slow
            )));
        }

        // Death Cross: Fast SMA crosses below Slow SMA
        if fast < slow * (1.0 - self.threshold) && ctx.has_position {
            tracing::debug!(
                "DualSMA [{}]: Death Cross detected (fast={:.2}, slow={:.2}, has_pos=true)",
                ctx.symbol,
                fast,
                slow
            );
            return Some(Signal::sell(format!(
                "Death Cross (Fast={:.2} < Slow={:.2})",
                fast, slow
            )));
        }

        None
    }

    fn name(&self) -> &str {
        "DualSMA"
    }
}
