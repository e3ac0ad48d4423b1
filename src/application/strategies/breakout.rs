use super::traits::{AnalysisContext, Signal, TradingStrategy};
use rust_decimal::prelude::ToPrimitive;

/// Breakout Strategy
///
/// Detects breakouts from consolidation patterns by monitoring:
/// - Price breaking above recent highs (bullish breakout)
/// - Price breaking below recent lows (bearish breakout)
/// - Optional volume confirmation for stronger signals
#[derive(Debug, Clone)]
pub struct BreakoutStrategy {
    pub lookback_period: usize,      // Period to calculate high/low
    pub breakout_threshold_pct: f64, // % above/below high/low to confirm breakout
    pub volume_multiplier: f64,      // Required volume vs average (e.g., 1.5 = 50% above avg)
}

impl BreakoutStrategy {
    pub fn new(
        lookback_period: usize,
        breakout_threshold_pct: f64,
        volume_multiplier: f64,
    ) -> Self {
        Self {
            lookback_period,
            breakout_threshold_pct,
            volume_multiplier,
        }
    }

    /// Calculate recent high and low from candle history
    fn calculate_range(&self, ctx: &AnalysisContext) -> Option<(f64, f64, f64)> {
        if ctx.candles.len() < self.lookback_period {
            return None;
        }

        let start_idx = ctx.candles.len().saturating_sub(self.lookback_period);

        let mut highest_high = f64::MIN;
        let mut lowest_low = f64::MAX;
        let mut total_volume = 0.0;
        let mut count = 0;

        for candle in ctx.candles.iter().skip(start_idx) {
            let high = candle.high.to_f64().unwrap_or(0.0);
            let low = candle.low.to_f64().unwrap_or(0.0);

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
            total_volume / count as f64
        } else {
            0.0
        };

        Some((highest_high, lowest_low, avg_volume))
    }

    /// Get current candle volume
    fn current_volume(&self, ctx: &AnalysisContext) -> f64 {
        ctx.candles.back().map(|c| c.volume).unwrap_or(0.0)
    }
}

impl Default for BreakoutStrategy {
    fn default() -> Self {
        Self {
            lookback_period: 20,
            breakout_threshold_pct: 0.005, // 0.5% above high
            volume_multiplier: 1.3,        // 30% above average volume
        }
    }
}

impl TradingStrategy for BreakoutStrategy {
    fn analyze(&self, ctx: &AnalysisContext) -> Option<Signal> {
        let (highest_high, lowest_low, avg_volume) = self.calculate_range(ctx)?;
        let current_volume = self.current_volume(ctx);

        // Volume confirmation (optional but increases confidence)
        let volume_confirmed = current_volume > avg_volume * self.volume_multiplier;
        let confidence_boost = if volume_confirmed { 0.15 } else { 0.0 };

        // Bullish breakout: Price breaks above recent high
        let bullish_threshold = highest_high * (1.0 + self.breakout_threshold_pct);
        if !ctx.has_position && ctx.price_f64 > bullish_threshold {
            let confidence = 0.70 + confidence_boost;
            let volume_note = if volume_confirmed {
                format!(", Volume {:.0} > Avg {:.0}", current_volume, avg_volume)
            } else {
                String::new()
            };

            return Some(
                Signal::buy(format!(
                    "Breakout: Price {:.2} > High {:.2} (+{:.2}%){}",
                    ctx.price_f64,
                    highest_high,
                    ((ctx.price_f64 / highest_high) - 1.0) * 100.0,
                    volume_note
                ))
                .with_confidence(confidence),
            );
        }

        // Bearish breakout: Price breaks below recent low (exit signal if holding)
        if ctx.has_position {
            let bearish_threshold = lowest_low * (1.0 - self.breakout_threshold_pct);
            if ctx.price_f64 < bearish_threshold {
                let confidence = 0.75 + confidence_boost;

                return Some(
                    Signal::sell(format!(
                        "Breakout: Price {:.2} < Low {:.2} (-{:.2}%) - Exit on breakdown",
                        ctx.price_f64,
                        lowest_low,
                        (1.0 - (ctx.price_f64 / lowest_low)) * 100.0
                    ))
                    .with_confidence(confidence),
                );
            }
        }

        None
    }

    fn name(&self) -> &str {
        "Breakout"
    }
}
