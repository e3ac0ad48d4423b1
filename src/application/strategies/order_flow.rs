use super::traits::{AnalysisContext, Signal, TradingStrategy};
use crate::domain::market::order_flow::detect_stacked_imbalances;

/// Order Flow Imbalance (OFI) Strategy
///
/// Trades based on institutional order flow patterns:
/// - Stacked imbalances (consecutive OFI in same direction)
/// - Cumulative Delta trends
/// - High Volume Node support/resistance
///
/// This strategy is designed to capture institutional buying/selling pressure.
#[derive(Debug, Clone)]
pub struct OrderFlowStrategy {
    /// Minimum OFI value to consider significant (default: 0.3)
    pub ofi_threshold: f64,
    /// Number of consecutive OFI values required for stacked imbalance (default: 3)
    pub stacked_count: usize,
    /// Lookback period for volume profile analysis (default: 100)
    pub volume_profile_lookback: usize,
}

impl OrderFlowStrategy {
    pub fn new(ofi_threshold: f64, stacked_count: usize, volume_profile_lookback: usize) -> Self {
        Self {
            ofi_threshold,
            stacked_count,
            volume_profile_lookback,
        }
    }
}

impl Default for OrderFlowStrategy {
    fn default() -> Self {
        Self::new(0.3, 3, 100)
    }
}

impl TradingStrategy for OrderFlowStrategy {
    fn analyze(&self, ctx: &AnalysisContext) -> Option<Signal> {
        // Check for stacked imbalances
        let (is_stacked, direction) =
            detect_stacked_imbalances(&ctx.ofi_history, self.ofi_threshold, self.stacked_count);

        if !is_stacked {
            return None; // No clear institutional pressure
        }

        // Bullish stacked imbalances
        if direction == 1 {
            // Additional confirmation: Cumulative Delta rising
            let delta_rising = if ctx.ofi_history.len() >= 5 {
                let recent_avg: f64 = ctx.ofi_history.iter().rev().take(5).sum::<f64>() / 5.0;
                ctx.cumulative_delta > recent_avg
            } else {
                true // Not enough history, allow signal
            };

            // Check if price is near a High Volume Node (support)
            let near_hvn = if let Some(ref profile) = ctx.volume_profile {
                profile
                    .high_volume_nodes
                    .iter()
                    .any(|&hvn| (ctx.price_f64 - hvn).abs() / ctx.price_f64 < 0.02) // Within 2%
            } else {
                true // No volume profile, allow signal
            };

            if delta_rising && ctx.ofi_value > self.ofi_threshold {
                let confidence = if near_hvn { 0.9 } else { 0.7 };
                return Some(
                    Signal::buy(format!(
                        "Stacked Bullish OFI (OFI={:.2}, Delta={:.2}, HVN={})",
                        ctx.ofi_value,
                        ctx.cumulative_delta,
                        if near_hvn { "Yes" } else { "No" }
                    ))
                    .with_confidence(confidence),
                );
            }
        }

        // Bearish stacked imbalances
        if direction == -1 && ctx.has_position {
            // Additional confirmation: Cumulative Delta falling
            let delta_falling = if ctx.ofi_history.len() >= 5 {
                let recent_avg: f64 = ctx.ofi_history.iter().rev().take(5).sum::<f64>() / 5.0;
                ctx.cumulative_delta < recent_avg
            } else {
                true // Not enough history, allow signal
            };

            // Check if price is near a High Volume Node (resistance)
            let near_hvn = if let Some(ref profile) = ctx.volume_profile {
                profile
                    .high_volume_nodes
                    .iter()
                    .any(|&hvn| (ctx.price_f64 - hvn).abs() / ctx.price_f64 < 0.02) // Within 2%
            } else {
                true // No volume profile, allow signal
            };

            if delta_falling && ctx.ofi_value < -self.ofi_threshold {
                let confidence = if near_hvn { 0.9 } else { 0.7 };
                return Some(
                    Signal::sell(format!(
                        "Stacked Bearish OFI (OFI={:.2}, Delta={:.2}, HVN={})",
                        ctx.ofi_value,
                        ctx.cumulative_delta,
                        if near_hvn { "Yes" } else { "No" }
                    ))
                    .with_confidence(confidence),
                );
            }
        }

        None
    }

    fn name(&self) -> &str {
        "OrderFlow"
    }
}
