use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize)]
pub struct Portfolio {
    pub cash: Decimal,
    pub positions: HashMap<String, Position>,
    pub realized_pnl: Decimal, // Track total realized profit/loss
    pub trade_history: Vec<crate::domain::trading::types::Trade>, // Complete audit trail
    pub starting_cash: Decimal,

    pub max_equity: Decimal,
    pub day_trades_count: u64, // Added for PDT tracking
    pub synchronized: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct Position {
    pub symbol: String,
    pub quantity: Decimal,
    pub average_price: Decimal,
}

impl Portfolio {
    pub fn new() -> Self {
        Self {
            cash: Decimal::ZERO,
            positions: HashMap::new(),
            realized_pnl: Decimal::ZERO,
            trade_history: Vec::new(),
            starting_cash: Decimal::ZERO,

            max_equity: Decimal::ZERO,
            day_trades_count: 0,
            synchronized: false,
        }
    }
}

impl Default for Portfolio {
    fn default() -> Self {
        Self::new()
    }
}

impl Portfolio {
    /// Calculate total equity (cash + unrealized position value)
    pub fn total_equity(&self, current_prices: &HashMap<String, Decimal>) -> Decimal {
        let mut equity = self.cash;

        for (symbol, position) in &self.positions {
            if let Some(&current_price) = current_prices.get(symbol) {
                equity += position.quantity * current_price;
            } else {
                // If no current price available, use average price (conservative)
                equity += position.quantity * position.average_price;
            }
        }

        equity
    }

    /// Calculate unrealized P&L for all positions
    pub fn unrealized_pnl(&self, current_prices: &HashMap<String, Decimal>) -> Decimal {
        let mut unrealized = Decimal::ZERO;

        for (symbol, position) in &self.positions {
            if let Some(&current_price) = current_prices.get(symbol) {
                let position_value = position.quantity * current_price;
                let cost_basis = position.quantity * position.average_price;
                unrealized += position_value - cost_basis;
            }
        }

        unrealized
    }

    /// Record a completed trade and update realized P&L
    pub fn record_trade(&mut self, trade: crate::domain::trading::types::Trade) {
        self.realized_pnl += trade.pnl;
        self.trade_history.push(trade);
    }

    /// Get total P&L (realized + unrealized)
    pub fn total_pnl(&self, current_prices: &HashMap<String, Decimal>) -> Decimal {
        self.realized_pnl + self.unrealized_pnl(current_prices)
    }
}
