use super::traits::{AnalysisContext, Signal, TradingStrategy};

/// Trend Riding Strategy
///
/// Designed to capture and ride strong trends:
/// - Buy when golden cross occurs above trend SMA
/// - Hold position with buffer zone to avoid whipsaws
/// - Exit only when price drops significantly below trend
#[derive(Debug, Clone)]
pub struct TrendRidingStrategy {
    #[allow(dead_code)]
    fast_period: usize,
    #[allow(dead_code)]
    slow_period: usize,
    sma_threshold: f64,
    exit_buffer_pct: f64, // Buffer below trend SMA before exiting
}

impl TrendRidingStrategy {
    pub fn new(
        fast_period: usize,
        slow_period: usize,
        sma_threshold: f64,
        exit_buffer_pct: f64,
    ) -> Self {
        Self {
            fast_period,
            slow_period,
            sma_threshold,
            exit_buffer_pct,
        }
    }
}

impl TradingStrategy for TrendRidingStrategy {
    fn analyze(&self, ctx: &AnalysisContext) -> Option<Signal> {
        let fast = ctx.fast_sma;
        let slow = ctx.slow_sma;

        // Buy: Golden cross above trend SMA
        if fast > slow * (1.0 + self.sma_threshold) && ctx.price_f64 > ctx.trend_sma {
            return Some(Signal::buy(format!(
                "TrendRiding: Golden Cross above Trend (price={:.2}, trend={:.2})",
                ctx.price_f64, ctx.trend_sma
            )));
        }

        // Sell: Price drops below trend SMA with buffer
        if ctx.has_position {
            let exit_threshold = ctx.trend_sma * (1.0 - self.exit_buffer_pct);
            if ctx.price_f64 < exit_threshold {
                return Some(Signal::sell(format!(
                    "TrendRiding: Price below trend buffer (price={:.2}, threshold={:.2})",
                    ctx.price_f64, exit_threshold
                )));
            }
        }

        None
    }

    fn name(&self) -> &str {
        "TrendRiding"
    }
}
