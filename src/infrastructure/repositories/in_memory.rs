//! In-Memory Repository Implementations
//!
//! This module provides thread-safe, in-memory implementations of the
//! repository traits defined in `domain::repositories`.
//!
//! # Features
//!
//! - **Thread-safe**: Uses `Arc<RwLock>` for concurrent access
//! - **Async**: All operations are async-ready
//! - **Testing**: Ideal for unit tests and development
//! - **Production**: Suitable for single-instance deployments
//!
//! # Limitations
//!
//! - Data is lost on application restart
//! - No persistence across multiple instances
//! - Limited by available RAM
//!
//! For production persistence, implement `TradeRepository` and
//! `PortfolioRepository` with PostgreSQL or similar.

use crate::domain::portfolio::Portfolio;
use crate::domain::repositories::{PortfolioRepository, TradeRepository};
use crate::domain::trading::types::Order;
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::sync::Arc;
use tokio::sync::RwLock;

/// In-memory implementation of TradeRepository
/// Suitable for testing and single-instance deployments
pub struct InMemoryTradeRepository {
    trades: Arc<RwLock<Vec<Order>>>,
}

impl InMemoryTradeRepository {
    pub fn new() -> Self {
        Self {
            trades: Arc::new(RwLock::new(Vec::new())),
        }
    }
}

impl Default for InMemoryTradeRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TradeRepository for InMemoryTradeRepository {
    async fn save(&self, trade: &Order) -> Result<()> {
        self.trades.write().await.push(trade.clone());
        Ok(())
    }

    async fn find_by_symbol(&self, symbol: &str) -> Result<Vec<Order>> {
        let trades = self.trades.read().await;
        Ok(trades
            .iter()
            .filter(|t| t.symbol == symbol)
            .cloned()
            .collect())
    }

    async fn find_recent(&self, limit: usize) -> Result<Vec<Order>> {
        let trades = self.trades.read().await;
        Ok(trades.iter().rev().take(limit).cloned().collect())
    }

    async fn get_all(&self) -> Result<Vec<Order>> {
        Ok(self.trades.read().await.clone())
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.trades.read().await.len())
    }
}

/// In-memory implementation of PortfolioRepository
/// Stores portfolio state with equity history tracking
type EquityHistory = Vec<(DateTime<Utc>, Decimal)>;

/// In-memory implementation of PortfolioRepository
/// Stores portfolio state with equity history tracking
pub struct InMemoryPortfolioRepository {
    portfolio: Arc<RwLock<Portfolio>>,
    history: Arc<RwLock<EquityHistory>>,
}

impl InMemoryPortfolioRepository {
    pub fn new(initial: Portfolio) -> Self {
        Self {
            portfolio: Arc::new(RwLock::new(initial)),
            history: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Record a snapshot of equity at a given time
    pub async fn record_equity(&self, timestamp: DateTime<Utc>, equity: Decimal) {
        self.history.write().await.push((timestamp, equity));
    }
}

#[async_trait]
impl PortfolioRepository for InMemoryPortfolioRepository {
    async fn load(&self) -> Result<Portfolio> {
        Ok(self.portfolio.read().await.clone())
    }

    async fn save(&self, portfolio: &Portfolio) -> Result<()> {
        *self.portfolio.write().await = portfolio.clone();
        Ok(())
    }

    async fn get_equity_history(
        &self,
        start: DateTime<Utc>,
    ) -> Result<Vec<(DateTime<Utc>, Decimal)>> {
        let history = self.history.read().await;
        Ok(history
            .iter()
            .filter(|(ts, _)| ts >= &start)
            .cloned()
            .collect())
    }
}
