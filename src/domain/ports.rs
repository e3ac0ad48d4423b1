//! Broker and service port abstractions (L0).
//!
//! These traits are the capability seams between the application layer
//! and the exchange-specific adapters in `infrastructure`. Keeping
//! `BrokerEquity`/`BrokerCrypto` thin mirrors the two brokerages the
//! system actually talks to (Alpaca for equities, Binance for crypto) -
//! the trait surface is exactly what `ProfileRunner`/`CryptoLoop`/
//! `EmergencyProtocol` need and nothing else.

use crate::domain::errors::BrokerError;
use crate::domain::trading::portfolio::Position;
use crate::domain::trading::types::{Candle, MarketEvent, Order, OrderSide};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::HashMap;
use tokio::sync::{broadcast, mpsc};

pub type BrokerResult<T> = Result<T, BrokerError>;

/// Account snapshot as reported by the brokerage.
#[derive(Debug, Clone)]
pub struct Account {
    pub equity: Decimal,
    pub last_equity: Decimal,
    pub buying_power: Decimal,
    pub cash: Decimal,
}

/// Fill/cancel/reject notification pushed out of order-update streams.
#[derive(Debug, Clone)]
pub struct OrderUpdate {
    pub order_id: String,
    pub symbol: String,
    pub status: crate::domain::trading::types::OrderStatus,
    pub filled_quantity: Decimal,
    pub filled_avg_price: Option<Decimal>,
    pub timestamp: i64,
}

/// A request to place a new order, independent of brokerage wire format.
#[derive(Debug, Clone)]
pub struct OrderIntent {
    pub symbol: String,
    pub side: OrderSide,
    pub quantity: Decimal,
    pub limit_price: Option<Decimal>,
    pub stop_price: Option<Decimal>,
    pub take_profit_price: Option<Decimal>,
    pub client_order_id: Option<String>,
}

/// 24h ticker snapshot for a crypto trading pair.
#[derive(Debug, Clone)]
pub struct Ticker {
    pub last: Decimal,
    pub open: Decimal,
    pub high24: Decimal,
    pub low24: Decimal,
    pub vwap24: Decimal,
    pub vol24: Decimal,
    pub bid: Decimal,
    pub ask: Decimal,
}

/// Free-margin-style balance snapshot for a crypto venue.
#[derive(Debug, Clone)]
pub struct TradeBalance {
    pub equivalent_balance: Decimal,
    pub free_margin: Decimal,
}

/// Raw, unwrapped broker access used exclusively by `EmergencyProtocol` to
/// bypass retry/rate-limit/circuit-breaker middleware during liquidation.
#[async_trait]
pub trait BrokerRaw: Send + Sync {
    async fn cancel_all_orders_now(&self) -> BrokerResult<()>;
    async fn liquidate_position_now(&self, symbol: &str, quantity: Decimal) -> BrokerResult<Order>;
}

/// Capability set common to both equity and crypto brokers: the resilient,
/// production path used by ordinary trading. `delegate()` hands back the
/// unwrapped client for emergency use.
#[async_trait]
pub trait BrokerEquity: Send + Sync {
    async fn get_account(&self) -> BrokerResult<Account>;
    async fn get_positions(&self) -> BrokerResult<Vec<Position>>;
    async fn get_open_orders(&self, symbol: Option<&str>) -> BrokerResult<Vec<Order>>;
    async fn cancel_order(&self, order_id: &str) -> BrokerResult<()>;
    async fn cancel_all_orders(&self) -> BrokerResult<()>;
    async fn place_order(&self, intent: OrderIntent) -> BrokerResult<Order>;
    async fn place_bracket(
        &self,
        intent: OrderIntent,
        stop_loss: Decimal,
        take_profit: Decimal,
    ) -> BrokerResult<Order>;
    async fn get_latest_bar(&self, symbol: &str) -> BrokerResult<Candle>;
    async fn get_bars(&self, symbol: &str, timeframe: &str, n: usize) -> BrokerResult<Vec<Candle>>;
    async fn get_market_history(&self, symbol: &str, n: usize) -> BrokerResult<Vec<Candle>>;
    async fn is_market_open(&self) -> BrokerResult<bool>;

    fn delegate(&self) -> &dyn BrokerRaw;
}

/// Crypto brokers additionally expose venue-native balance/ticker access and
/// a pre-flight check since crypto venues enforce min-notional/lot-size
/// rules the risk pipeline cannot evaluate on its own.
#[async_trait]
pub trait BrokerCrypto: Send + Sync {
    async fn get_ticker(&self, symbol: &str) -> BrokerResult<Ticker>;
    async fn get_balance(&self) -> BrokerResult<HashMap<String, Decimal>>;
    async fn get_trade_balance(&self) -> BrokerResult<TradeBalance>;
    async fn get_trades_history(&self, symbol: &str) -> BrokerResult<Vec<Order>>;
    async fn place_limit_order(
        &self,
        symbol: &str,
        side: OrderSide,
        quantity: Decimal,
        price: Decimal,
    ) -> BrokerResult<Order>;
    async fn place_market_order(
        &self,
        symbol: &str,
        side: OrderSide,
        quantity: Decimal,
    ) -> BrokerResult<Order>;
    async fn can_place_order(&self, symbol: &str, quantity: Decimal, price: Decimal) -> BrokerResult<bool>;
    async fn cancel_order(&self, symbol: &str, order_id: &str) -> BrokerResult<()>;
    async fn cancel_all_orders(&self, symbol: &str) -> BrokerResult<()>;

    fn delegate(&self) -> &dyn BrokerRaw;
}

/// Streaming market data, shared by both broker families.
#[async_trait]
pub trait MarketDataService: Send + Sync {
    async fn subscribe(&self, symbols: Vec<String>) -> anyhow::Result<mpsc::Receiver<MarketEvent>>;
    async fn get_top_movers(&self) -> anyhow::Result<Vec<String>>;
    async fn get_prices(&self, symbols: Vec<String>) -> anyhow::Result<HashMap<String, Decimal>>;
    async fn get_historical_bars(
        &self,
        symbol: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        timeframe: &str,
    ) -> anyhow::Result<Vec<Candle>>;
    async fn subscribe_order_updates(&self) -> anyhow::Result<broadcast::Receiver<OrderUpdate>>;
}
