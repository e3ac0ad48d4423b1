use async_trait::async_trait;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use tracing::debug;

use crate::domain::risk::filters::validator_trait::{RiskValidator, ValidationContext, ValidationResult};
use crate::domain::sentiment::SentimentClassification;
use crate::domain::trading::types::OrderSide;

/// Configuration for position size validation
#[derive(Debug, Clone)]
pub struct PositionSizeConfig {
    /// Maximum position size as percentage of equity (e.g., 0.25 = 25%)
    pub max_position_size_pct: f64,
}

impl Default for PositionSizeConfig {
    fn default() -> Self {
        Self {
            max_position_size_pct: 0.10, // Conservative 10% default
        }
    }
}

/// Validates that position sizes don't exceed configured limits
/// 
/// This validator ensures that no single position can grow too large relative to
/// total equity. It also applies sentiment-based adjustments, reducing position
/// sizes during periods of extreme market fear.
pub struct PositionSizeValidator {
    config: PositionSizeConfig,
}

impl PositionSizeValidator {
    pub fn new(config: PositionSizeConfig) -> Self {
        Self { config }
    }

    /// Calculate adjusted max position size based on sentiment
    fn calculate_adjusted_limit(&self, ctx: &ValidationContext<'_>, side: OrderSide) -> f64 {
        let mut adjusted_max_pct = self.config.max_position_size_pct;

        // Apply sentiment-based risk adjustment
        if let Some(sentiment) = ctx.current_sentiment {
            // In Extreme Fear, reduce position size by 50% for Long positions
            if side == OrderSide::Buy && sentiment.classification == SentimentClassification::ExtremeFear {
                adjusted_max_pct *= 0.5;
                debug!(
                    "PositionSizeValidator: Extreme Fear ({}) detected. Reducing max position size to {:.2}%",
                    sentiment.value,
                    adjusted_max_pct * 100.0
                );
            }
        }

        // Apply volatility-based adjustment
        if let Some(multiplier) = ctx.volatility_multiplier {
            adjusted_max_pct *= multiplier;
            debug!(
                "PositionSizeValidator: Volatility multiplier {:.2}x applied. Adjusted max position size: {:.2}%",
                multiplier,
                adjusted_max_pct * 100.0
            );
        }

        adjusted_max_pct
    }
}

#[async_trait]
impl RiskValidator for PositionSizeValidator {
    fn name(&self) -> &str {
        "PositionSizeValidator"
    }

    async fn validate(&self, ctx: &ValidationContext<'_>) -> ValidationResult {
        // Only validate Buy orders (sells reduce exposure)
        if !matches!(ctx.proposal.side, OrderSide::Buy) {
            return ValidationResult::Approve;
        }

        // Skip validation if equity is zero or negative (edge case)
        if ctx.current_equity <= Decimal::ZERO {
            return ValidationResult::Approve;
        }

        // Calculate total exposure after this trade
        let current_position_qty = ctx.get_current_position_qty();
        let total_qty = current_position_qty + ctx.proposal.quantity;
        let total_exposure = total_qty * ctx.proposal.price;

        // Calculate adjusted limit based on sentiment
        let adjusted_max_pct = self.calculate_adjusted_limit(ctx, ctx.proposal.side);

        // Calculate position percentage
        let position_pct = (total_exposure / ctx.current_equity)
            .to_f64()
            .unwrap_or(0.0);

        if position_pct > adjusted_max_pct {
            return ValidationResult::Reject(format!(
                "Position size ({:.2}%) exceeds limit ({:.2}%) [Sentiment Adjusted]",
                position_pct * 100.0,
                adjusted_max_pct * 100.0
            ));
        }

        ValidationResult::Approve
    }

    fn priority(&self) -> u8 {
        10 // Early check - no point validating other rules if position is too large
    }
}
