//! PositionSizer (L2, §4.8).
//!
//! A pipeline of multiplicative adjustments on a base size, grounded in
//! `application::risk_management::sizing_engine::SizingEngine`'s staged
//! Kelly/vol-targeting/halt-level/regime-multiplier pattern, rewritten as a
//! pure function chain over the spec's six-variant regime and VIX input
//! rather than the teacher's `HaltLevel`/four-variant regime.

use crate::application::core::dispatcher::regime_size_multiplier;
use crate::application::core::regime::Regime;
use crate::application::risk_management::sizing_engine::KellyStats;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnomalyAction {
    Continue,
    ReduceSize,
}

#[derive(Debug, Clone)]
pub struct SizingInput {
    pub buying_power: Decimal,
    pub equity: Decimal,
    pub entry_price: Decimal,
    pub risk_fraction: Decimal,
    pub kelly: Option<KellyStats>,
    pub vix: Decimal,
    pub vix_threshold: Decimal,
    pub regime: Regime,
    pub ml_confidence: Option<Decimal>,
    pub max_correlation_with_portfolio: Decimal,
    pub anomaly_action: AnomalyAction,
    pub daily_target_met: bool,
    pub broker_min_order_value: Decimal,
    /// 8 for crypto, 0 for whole-share equities.
    pub quantity_decimals: u32,
}

pub struct PositionSizer;

impl PositionSizer {
    /// Compute the final order quantity, or `None` if the resulting order
    /// value would fall below the broker minimum ("enforce broker minimum
    /// order value (skip if below)", §4.8).
    pub fn size(input: &SizingInput) -> Option<Decimal> {
        if input.entry_price <= Decimal::ZERO {
            return None;
        }

        let base_capital = input.buying_power.min(input.equity) * dec!(0.95);
        let mut amount = base_capital * input.risk_fraction;

        if let Some(kelly) = &input.kelly {
            if let Some(fraction) = kelly.quarter_kelly_fraction() {
                amount *= fraction.max(dec!(0.01));
            }
        }

        if input.vix > input.vix_threshold {
            amount *= dec!(0.7);
        }

        if let Some(confidence) = input.ml_confidence {
            let regime_vol_damp = regime_size_multiplier(input.regime);
            amount *= confidence.clamp(Decimal::ZERO, Decimal::ONE) * regime_vol_damp
                + (Decimal::ONE - regime_vol_damp) * dec!(0.5);
        } else {
            amount *= regime_size_multiplier(input.regime);
        }

        amount *= Decimal::ONE - input.max_correlation_with_portfolio.clamp(Decimal::ZERO, dec!(0.95));

        if input.anomaly_action == AnomalyAction::ReduceSize {
            amount *= dec!(0.5);
        }

        if input.daily_target_met {
            amount *= dec!(0.5);
        }

        if amount <= Decimal::ZERO {
            return None;
        }

        if amount < input.broker_min_order_value {
            return None;
        }

        let raw_qty = amount / input.entry_price;
        let quantity = raw_qty.round_dp(input.quantity_decimals);

        if quantity <= Decimal::ZERO {
            None
        } else {
            Some(quantity)
        }
    }
}
