use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::HashMap;

use crate::domain::risk::state::RiskState;
use crate::domain::sentiment::Sentiment;
use crate::domain::trading::portfolio::Portfolio;
use crate::domain::trading::types::{Candle, TradeProposal};

/// Result of a risk validation check
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationResult {
    /// Validation passed, trade can proceed
    Approve,
    /// Validation failed, trade should be rejected with a reason
    Reject(String),
    /// Validation uncovered a condition severe enough that the whole cycle
    /// (all symbols, not just this proposal) should be aborted.
    Halt(String),
}

impl ValidationResult {
    /// Check if the result is approval
    pub fn is_approved(&self) -> bool {
        matches!(self, ValidationResult::Approve)
    }

    /// Check if the result is rejection
    pub fn is_rejected(&self) -> bool {
        matches!(self, ValidationResult::Reject(_))
    }

    /// Check if the result demands the whole cycle be halted
    pub fn is_halt(&self) -> bool {
        matches!(self, ValidationResult::Halt(_))
    }

    /// Get rejection reason if rejected or halted
    pub fn rejection_reason(&self) -> Option<&str> {
        match self {
            ValidationResult::Reject(reason) => Some(reason),
            ValidationResult::Halt(reason) => Some(reason),
            ValidationResult::Approve => None,
        }
    }
}

/// Context shared across all validators during a validation run
/// 
/// This struct provides all the necessary information for validators to make decisions
/// without needing direct access to the RiskManager's internal state.
#[derive(Debug)]
pub struct ValidationContext<'a> {
    /// The trade proposal being validated
    pub proposal: &'a TradeProposal,
    
    /// Current portfolio state
    pub portfolio: &'a Portfolio,
    
    /// Current total equity (cash + positions value)
    pub current_equity: Decimal,
    
    /// Current market prices for all symbols
    pub current_prices: &'a HashMap<String, Decimal>,
    
    /// Current risk state (HWM, consecutive losses, etc.)
    pub risk_state: &'a RiskState,
    
    /// Current market sentiment (if available)
    pub current_sentiment: Option<&'a Sentiment>,
    
    /// Current correlation matrix (if available)
    pub correlation_matrix: Option<&'a HashMap<(String, String), f64>>,
    
    /// Current volatility multiplier (if available, e.g. from VolatilityManager)
    pub volatility_multiplier: Option<f64>,

    /// Exposure already committed by orders pending fill on this symbol, on
    /// the same side as the proposal. Guards against double-counting risk
    /// while an earlier order hasn't settled yet.
    pub pending_exposure: Decimal,

    /// Cash immediately available for this order (distinct from total
    /// equity, which includes position value).
    pub available_cash: Decimal,

    /// Recent candle history for the proposal's symbol, used by validators
    /// that need to detect price anomalies or compute short-window stats.
    pub recent_candles: Option<&'a [Candle]>,
}

impl<'a> ValidationContext<'a> {
    /// Create a new validation context
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        proposal: &'a TradeProposal,
        portfolio: &'a Portfolio,
        current_equity: Decimal,
        current_prices: &'a HashMap<String, Decimal>,
        risk_state: &'a RiskState,
        current_sentiment: Option<&'a Sentiment>,
        correlation_matrix: Option<&'a HashMap<(String, String), f64>>,
        volatility_multiplier: Option<f64>,
        pending_exposure: Decimal,
        available_cash: Decimal,
        recent_candles: Option<&'a [Candle]>,
    ) -> Self {
        Self {
            proposal,
            portfolio,
            current_equity,
            current_prices,
            risk_state,
            current_sentiment,
            correlation_matrix,
            volatility_multiplier,
            pending_exposure,
            available_cash,
            recent_candles,
        }
    }

    /// Get the current price for the proposal's symbol
    pub fn get_proposal_price(&self) -> Decimal {
        self.current_prices
            .get(&self.proposal.symbol)
            .copied()
            .unwrap_or(self.proposal.price)
    }

    /// Calculate the total exposure for the proposal
    pub fn calculate_proposal_exposure(&self) -> Decimal {
        self.proposal.price * self.proposal.quantity
    }

    /// Get current position quantity for the proposal's symbol
    pub fn get_current_position_qty(&self) -> Decimal {
        self.portfolio
            .positions
            .get(&self.proposal.symbol)
            .map(|p| p.quantity)
            .unwrap_or(Decimal::ZERO)
    }
}

/// Trait for all risk validators
/// 
/// Each validator implements a specific risk check (e.g., position size, circuit breaker).
/// Validators are executed in priority order by the ValidationPipeline.
#[async_trait]
pub trait RiskValidator: Send + Sync {
    /// Unique name for logging and debugging
    fn name(&self) -> &str;

    /// Perform validation check
    /// 
    /// Returns:
    /// - `ValidationResult::Approve` if the trade passes this validator's checks
    /// - `ValidationResult::Reject(reason)` if the trade should be blocked
    async fn validate(&self, ctx: &ValidationContext<'_>) -> ValidationResult;

    /// Whether this validator is currently enabled
    /// 
    /// Disabled validators are skipped during pipeline execution.
    /// Default: true (always enabled)
    fn is_enabled(&self) -> bool {
        true
    }

    /// Priority order (lower = earlier execution)
    /// 
    /// Validators with lower priority values execute first.
    /// This allows critical checks (e.g., circuit breakers) to run before
    /// less critical ones (e.g., correlation filters).
    /// 
    /// Default: 100 (medium priority)
    fn priority(&self) -> u8 {
        100
    }
}
