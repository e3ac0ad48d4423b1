use async_trait::async_trait;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use tracing::debug;

use crate::domain::risk::filters::validator_trait::{
    RiskValidator, ValidationContext, ValidationResult,
};
use crate::domain::trading::types::Candle;

/// Configuration for price anomaly detection
#[derive(Debug, Clone)]
pub struct PriceAnomalyConfig {
    /// Maximum allowed price deviation from SMA as percentage (e.g., 0.05 = 5%)
    pub max_deviation_pct: f64,

    /// Lookback period in candles for SMA calculation (default: 5 for 5-minute SMA with 1-min candles)
    pub lookback_candles: usize,
}

impl Default for PriceAnomalyConfig {
    fn default() -> Self {
        Self {
            max_deviation_pct: 0.05, // 5% threshold
            lookback_candles: 5,     // 5 candles = 5 minutes with 1-min timeframe
        }
    }
}

/// Validates that trade prices are not anomalously different from recent market prices
///
/// This validator protects against:
/// - Fat finger errors (typos in order entry)
/// - Flash crashes / flash rallies
/// - Stale or corrupted price feeds
///
/// It calculates a Simple Moving Average (SMA) of recent candle closes and rejects
/// trades if the proposal price deviates more than the configured threshold.
pub struct PriceAnomalyValidator {
    config: PriceAnomalyConfig,
}

impl PriceAnomalyValidator {
    pub fn new(config: PriceAnomalyConfig) -> Self {
        Self { config }
    }

    /// Calculate SMA from recent candles
    fn calculate_sma(&self, candles: &[Candle]) -> Option<Decimal> {
        if candles.is_empty() {
            return None;
        }

        let sum: Decimal = candles.iter().map(|c| c.close).sum();
        let count = Decimal::from(candles.len());

        if count > Decimal::ZERO {
            Some(sum / count)
        } else {
            None
        }
    }

    /// Check if price deviates too much from SMA
    fn check_price_deviation(&self, price: Decimal, sma: Decimal) -> Option<String> {
        if sma <= Decimal::ZERO {
            return None; // Cannot calculate deviation with zero or negative SMA
        }

        let deviation = ((price - sma) / sma).abs().to_f64().unwrap_or(0.0);

        if deviation > self.config.max_deviation_pct {
            return Some(format!(
                "Price anomaly detected: {:.2}% deviation from {}-candle SMA (limit: {:.2}%) [Price: {}, SMA: {}]",
                deviation * 100.0,
                self.config.lookback_candles,
                self.config.max_deviation_pct * 100.0,
                price,
                sma
            ));
        }

        None
    }
}

#[async_trait]
impl RiskValidator for PriceAnomalyValidator {
    fn name(&self) -> &str {
        "PriceAnomalyValidator"
    }

    async fn validate(&self, ctx: &ValidationContext<'_>) -> ValidationResult {
        // If no candle data available, approve (fail-safe on startup)
        let candles = match ctx.recent_candles {
            Some(c) if !c.is_empty() => c,
            _ => {
                debug!(
                    "PriceAnomalyValidator: No candle data for {} - approving (fail-safe)",
                    ctx.proposal.symbol
                );
                return ValidationResult::Approve;
            }
        };

        // If insufficient data for SMA, approve
        if candles.len() < self.config.lookback_candles {
            debug!(
                "PriceAnomalyValidator: Insufficient data for {} ({} candles, need {}) - approving",
                ctx.proposal.symbol,
                candles.len(),
                self.config.lookback_candles
            );
            return ValidationResult::Approve;
        }

        // Take last N candles for SMA
        let recent_candles = &candles[candles.len().saturating_sub(self.config.lookback_candles)..];

        // Calculate SMA
        let sma = match self.calculate_sma(recent_candles) {
            Some(s) => s,
            None => {
                debug!(
                    "PriceAnomalyValidator: Failed to calculate SMA for {} - approving",
                    ctx.proposal.symbol
                );
                return ValidationResult::Approve;
            }
        };

        // Check deviation
        if let Some(reason) = self.check_price_deviation(ctx.proposal.price, sma) {
            return ValidationResult::Reject(reason);
        }

        ValidationResult::Approve
    }

    fn priority(&self) -> u8 {
        10 // After circuit breakers (1), same as position size
    }
}
