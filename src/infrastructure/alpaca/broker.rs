//! Concrete `BrokerEquity`/`BrokerRaw` adapter over the Alpaca trading and
//! market-data REST APIs, grounded in the request/response shapes already
//! proven out in `execution.rs`/`market_data.rs` (same headers, same bar
//! deserialization) but speaking the `domain::ports` trait surface the
//! core engine (`ProfileRunner`, `EmergencyProtocol`) depends on instead of
//! the legacy `ExecutionService`/`MarketDataService` pair.

use super::common::AlpacaBar;
use crate::domain::errors::{BrokerError, BrokerErrorKind};
use crate::domain::ports::{Account, BrokerEquity, BrokerRaw, BrokerResult, OrderIntent};
use crate::domain::trading::portfolio::Position;
use crate::domain::trading::types::{Candle, Order, OrderSide, OrderStatus, OrderType};
use crate::infrastructure::core::circuit_breaker::CircuitBreaker;
use crate::infrastructure::core::http_client_factory::{HttpClientFactory, build_url_with_query};
use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest_middleware::ClientWithMiddleware;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;

pub struct AlpacaBroker {
    client: ClientWithMiddleware,
    api_key: String,
    api_secret: String,
    trading_base_url: String,
    data_base_url: String,
    circuit_breaker: Arc<CircuitBreaker>,
}

impl AlpacaBroker {
    pub fn new(api_key: String, api_secret: String, trading_base_url: String, data_base_url: String) -> Self {
        Self {
            client: HttpClientFactory::create_client(),
            api_key,
            api_secret,
            trading_base_url,
            data_base_url,
            circuit_breaker: Arc::new(CircuitBreaker::new(
                "AlpacaBroker",
                5,
                2,
                std::time::Duration::from_secs(30),
            )),
        }
    }

    fn auth(&self, req: reqwest_middleware::RequestBuilder) -> reqwest_middleware::RequestBuilder {
        req.header("APCA-API-KEY-ID", &self.api_key)
            .header("APCA-API-SECRET-KEY", &self.api_secret)
    }

    async fn status_to_broker_error(resp: reqwest::Response) -> BrokerError {
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        let kind = match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => BrokerErrorKind::Auth,
            StatusCode::TOO_MANY_REQUESTS => BrokerErrorKind::RateLimit,
            StatusCode::NOT_FOUND => BrokerErrorKind::NotFound,
            StatusCode::CONFLICT => BrokerErrorKind::Conflict,
            StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => BrokerErrorKind::Timeout,
            s if s.is_client_error() => BrokerErrorKind::Validation,
            _ => BrokerErrorKind::Internal,
        };
        BrokerError::new(kind, format!("alpaca {status}: {body}"))
    }

    fn network_error(e: impl std::fmt::Display) -> BrokerError {
        BrokerError::new(BrokerErrorKind::Network, e.to_string())
    }

    fn parse_error(e: impl std::fmt::Display) -> BrokerError {
        BrokerError::new(BrokerErrorKind::Internal, e.to_string())
    }

    fn parse_bar(symbol: &str, bar: &AlpacaBar) -> Candle {
        Candle {
            symbol: symbol.to_string(),
            open: Decimal::from_f64_retain(bar.open).unwrap_or(Decimal::ZERO),
            high: Decimal::from_f64_retain(bar.high).unwrap_or(Decimal::ZERO),
            low: Decimal::from_f64_retain(bar.low).unwrap_or(Decimal::ZERO),
            close: Decimal::from_f64_retain(bar.close).unwrap_or(Decimal::ZERO),
            volume: Decimal::from_f64_retain(bar.volume).unwrap_or(Decimal::ZERO),
            timestamp: chrono::DateTime::parse_from_rfc3339(&bar.timestamp)
                .map(|dt| dt.timestamp_millis())
                .unwrap_or(0),
        }
    }

    async fn fetch_bars(&self, symbol: &str, timeframe: &str, n: usize) -> BrokerResult<Vec<Candle>> {
        self.circuit_breaker
            .call(async {
                let url = format!("{}/v2/stocks/bars", self.data_base_url);
                let limit = n.to_string();
                let url = build_url_with_query(
                    &url,
                    &[("symbols", symbol), ("timeframe", timeframe), ("limit", &limit), ("feed", "iex")],
                );
                let resp = self
                    .auth(self.client.get(&url))
                    .send()
                    .await
                    .map_err(Self::network_error)?;
                if !resp.status().is_success() {
                    return Err(Self::status_to_broker_error(resp).await);
                }
                #[derive(Deserialize)]
                struct Resp {
                    bars: std::collections::HashMap<String, Vec<AlpacaBar>>,
                }
                let body: Resp = resp.json().await.map_err(Self::parse_error)?;
                Ok(body
                    .bars
                    .get(symbol)
                    .map(|bars| bars.iter().map(|b| Self::parse_bar(symbol, b)).collect())
                    .unwrap_or_default())
            })
            .await
            .map_err(Self::unwrap_cb)
    }

    fn unwrap_cb(
        e: crate::infrastructure::core::circuit_breaker::CircuitBreakerError<BrokerError>,
    ) -> BrokerError {
        match e {
            crate::infrastructure::core::circuit_breaker::CircuitBreakerError::Open(msg) => {
                BrokerError::new(BrokerErrorKind::RateLimit, msg)
            }
            crate::infrastructure::core::circuit_breaker::CircuitBreakerError::Inner(inner) => inner,
        }
    }
}

#[derive(Debug, Serialize)]
struct AlpacaOrderRequest {
    symbol: String,
    qty: String,
    side: String,
    #[serde(rename = "type")]
    order_type: String,
    time_in_force: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    limit_price: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop_price: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    order_class: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    take_profit: Option<AlpacaTakeProfit>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop_loss: Option<AlpacaStopLoss>,
    #[serde(skip_serializing_if = "Option::is_none")]
    client_order_id: Option<String>,
}

#[derive(Debug, Serialize)]
struct AlpacaTakeProfit {
    limit_price: String,
}

#[derive(Debug, Serialize)]
struct AlpacaStopLoss {
    stop_price: String,
}

#[derive(Debug, Deserialize)]
struct AlpacaOrderResponse {
    id: String,
    symbol: String,
    side: String,
    qty: String,
    #[serde(default)]
    filled_avg_price: Option<String>,
    #[serde(default)]
    limit_price: Option<String>,
    status: String,
    created_at: String,
}

fn map_order_status(status: &str) -> OrderStatus {
    match status {
        "new" | "accepted" | "pending_new" => OrderStatus::New,
        "partially_filled" => OrderStatus::PartiallyFilled,
        "filled" => OrderStatus::Filled,
        "done_for_day" => OrderStatus::DoneForDay,
        "canceled" => OrderStatus::Canceled,
        "expired" => OrderStatus::Expired,
        "rejected" => OrderStatus::Rejected,
        "suspended" => OrderStatus::Suspended,
        "pending_cancel" => OrderStatus::PendingCancel,
        "pending_replace" => OrderStatus::PendingReplace,
        "replaced" => OrderStatus::Replaced,
        "stopped" => OrderStatus::Stopped,
        "calculated" => OrderStatus::Calculated,
        _ => OrderStatus::Pending,
    }
}

impl From<AlpacaOrderResponse> for Order {
    fn from(o: AlpacaOrderResponse) -> Self {
        let side = if o.side == "buy" { OrderSide::Buy } else { OrderSide::Sell };
        let price = o
            .filled_avg_price
            .or(o.limit_price)
            .and_then(|p| Decimal::from_str(&p).ok())
            .unwrap_or(Decimal::ZERO);
        Order {
            id: o.id,
            symbol: o.symbol,
            side,
            price,
            quantity: Decimal::from_str(&o.qty).unwrap_or(Decimal::ZERO),
            order_type: OrderType::Market,
            status: map_order_status(&o.status),
            timestamp: chrono::DateTime::parse_from_rfc3339(&o.created_at)
                .map(|dt| dt.timestamp())
                .unwrap_or(0),
        }
    }
}

#[async_trait]
impl BrokerEquity for AlpacaBroker {
    async fn get_account(&self) -> BrokerResult<Account> {
        self.circuit_breaker
            .call(async {
                let url = format!("{}/v2/account", self.trading_base_url);
                let resp = self.auth(self.client.get(&url)).send().await.map_err(Self::network_error)?;
                if !resp.status().is_success() {
                    return Err(Self::status_to_broker_error(resp).await);
                }
                #[derive(Deserialize)]
                struct AccountResp {
                    equity: String,
                    last_equity: String,
                    buying_power: String,
                    cash: String,
                }
                let body: AccountResp = resp.json().await.map_err(Self::parse_error)?;
                Ok(Account {
                    equity: Decimal::from_str(&body.equity).unwrap_or(Decimal::ZERO),
                    last_equity: Decimal::from_str(&body.last_equity).unwrap_or(Decimal::ZERO),
                    buying_power: Decimal::from_str(&body.buying_power).unwrap_or(Decimal::ZERO),
                    cash: Decimal::from_str(&body.cash).unwrap_or(Decimal::ZERO),
                })
            })
            .await
            .map_err(Self::unwrap_cb)
    }

    async fn get_positions(&self) -> BrokerResult<Vec<Position>> {
        self.circuit_breaker
            .call(async {
                let url = format!("{}/v2/positions", self.trading_base_url);
                let resp = self.auth(self.client.get(&url)).send().await.map_err(Self::network_error)?;
                if !resp.status().is_success() {
                    return Err(Self::status_to_broker_error(resp).await);
                }
                #[derive(Deserialize)]
                struct PosResp {
                    symbol: String,
                    qty: String,
                    avg_entry_price: String,
                }
                let body: Vec<PosResp> = resp.json().await.map_err(Self::parse_error)?;
                Ok(body
                    .into_iter()
                    .map(|p| Position {
                        symbol: p.symbol,
                        quantity: Decimal::from_str(&p.qty).unwrap_or(Decimal::ZERO),
                        average_price: Decimal::from_str(&p.avg_entry_price).unwrap_or(Decimal::ZERO),
                    })
                    .collect())
            })
            .await
            .map_err(Self::unwrap_cb)
    }

    async fn get_open_orders(&self, symbol: Option<&str>) -> BrokerResult<Vec<Order>> {
        self.circuit_breaker
            .call(async {
                let url = format!("{}/v2/orders", self.trading_base_url);
                let mut params = vec![("status", "open")];
                if let Some(s) = symbol {
                    params.push(("symbols", s));
                }
                let url = build_url_with_query(&url, &params);
                let resp = self.auth(self.client.get(&url)).send().await.map_err(Self::network_error)?;
                if !resp.status().is_success() {
                    return Err(Self::status_to_broker_error(resp).await);
                }
                let orders: Vec<AlpacaOrderResponse> = resp.json().await.map_err(Self::parse_error)?;
                Ok(orders.into_iter().map(Order::from).collect())
            })
            .await
            .map_err(Self::unwrap_cb)
    }

    async fn cancel_order(&self, order_id: &str) -> BrokerResult<()> {
        self.circuit_breaker
            .call(async {
                let url = format!("{}/v2/orders/{}", self.trading_base_url, order_id);
                let resp = self.auth(self.client.delete(&url)).send().await.map_err(Self::network_error)?;
                if resp.status().is_success() || resp.status() == StatusCode::NOT_FOUND {
                    return Ok(());
                }
                Err(Self::status_to_broker_error(resp).await)
            })
            .await
            .map_err(Self::unwrap_cb)
    }

    async fn cancel_all_orders(&self) -> BrokerResult<()> {
        self.circuit_breaker
            .call(async {
                let url = format!("{}/v2/orders", self.trading_base_url);
                let resp = self.auth(self.client.delete(&url)).send().await.map_err(Self::network_error)?;
                if !resp.status().is_success() {
                    return Err(Self::status_to_broker_error(resp).await);
                }
                Ok(())
            })
            .await
            .map_err(Self::unwrap_cb)
    }

    async fn place_order(&self, intent: OrderIntent) -> BrokerResult<Order> {
        self.circuit_breaker
            .call(async {
                let side = match intent.side {
                    OrderSide::Buy => "buy",
                    OrderSide::Sell => "sell",
                };
                let (order_type, tif) = if intent.limit_price.is_some() {
                    ("limit", "gtc")
                } else {
                    ("market", "day")
                };
                let req = AlpacaOrderRequest {
                    symbol: intent.symbol.clone(),
                    qty: intent.quantity.to_string(),
                    side: side.to_string(),
                    order_type: order_type.to_string(),
                    time_in_force: tif.to_string(),
                    limit_price: intent.limit_price.map(|p| p.to_string()),
                    stop_price: intent.stop_price.map(|p| p.to_string()),
                    order_class: None,
                    take_profit: None,
                    stop_loss: None,
                    client_order_id: intent.client_order_id.clone(),
                };
                self.submit_order(&req).await
            })
            .await
            .map_err(Self::unwrap_cb)
    }

    async fn place_bracket(&self, intent: OrderIntent, stop_loss: Decimal, take_profit: Decimal) -> BrokerResult<Order> {
        self.circuit_breaker
            .call(async {
                let side = match intent.side {
                    OrderSide::Buy => "buy",
                    OrderSide::Sell => "sell",
                };
                let req = AlpacaOrderRequest {
                    symbol: intent.symbol.clone(),
                    qty: intent.quantity.to_string(),
                    side: side.to_string(),
                    order_type: "market".to_string(),
                    time_in_force: "gtc".to_string(),
                    limit_price: None,
                    stop_price: None,
                    order_class: Some("bracket".to_string()),
                    take_profit: Some(AlpacaTakeProfit { limit_price: take_profit.to_string() }),
                    stop_loss: Some(AlpacaStopLoss { stop_price: stop_loss.to_string() }),
                    client_order_id: intent.client_order_id.clone(),
                };
                self.submit_order(&req).await
            })
            .await
            .map_err(Self::unwrap_cb)
    }

    async fn get_latest_bar(&self, symbol: &str) -> BrokerResult<Candle> {
        let bars = self.fetch_bars(symbol, "1Min", 1).await?;
        bars.into_iter()
            .last()
            .ok_or_else(|| BrokerError::new(BrokerErrorKind::NotFound, format!("no bars for {symbol}")))
    }

    async fn get_bars(&self, symbol: &str, timeframe: &str, n: usize) -> BrokerResult<Vec<Candle>> {
        self.fetch_bars(symbol, timeframe, n).await
    }

    async fn get_market_history(&self, symbol: &str, n: usize) -> BrokerResult<Vec<Candle>> {
        self.fetch_bars(symbol, "1Day", n).await
    }

    async fn is_market_open(&self) -> BrokerResult<bool> {
        self.circuit_breaker
            .call(async {
                let url = format!("{}/v2/clock", self.trading_base_url);
                let resp = self.auth(self.client.get(&url)).send().await.map_err(Self::network_error)?;
                if !resp.status().is_success() {
                    return Err(Self::status_to_broker_error(resp).await);
                }
                #[derive(Deserialize)]
                struct Clock {
                    is_open: bool,
                }
                let clock: Clock = resp.json().await.map_err(Self::parse_error)?;
                Ok(clock.is_open)
            })
            .await
            .map_err(Self::unwrap_cb)
    }

    fn delegate(&self) -> &dyn BrokerRaw {
        self
    }
}

impl AlpacaBroker {
    async fn submit_order(&self, req: &AlpacaOrderRequest) -> Result<Order, BrokerError> {
        let url = format!("{}/v2/orders", self.trading_base_url);
        let resp = self
            .auth(self.client.post(&url))
            .json(req)
            .send()
            .await
            .map_err(Self::network_error)?;
        if !resp.status().is_success() {
            return Err(Self::status_to_broker_error(resp).await);
        }
        let order: AlpacaOrderResponse = resp.json().await.map_err(Self::parse_error)?;
        Ok(order.into())
    }
}

/// `BrokerRaw` bypasses the circuit breaker entirely - `EmergencyProtocol`
/// needs flatten attempts to go out even while the resilient path is open.
#[async_trait]
impl BrokerRaw for AlpacaBroker {
    async fn cancel_all_orders_now(&self) -> BrokerResult<()> {
        let url = format!("{}/v2/orders", self.trading_base_url);
        let resp = self.auth(self.client.delete(&url)).send().await.map_err(Self::network_error)?;
        if !resp.status().is_success() {
            return Err(Self::status_to_broker_error(resp).await);
        }
        Ok(())
    }

    async fn liquidate_position_now(&self, symbol: &str, quantity: Decimal) -> BrokerResult<Order> {
        let url = format!("{}/v2/positions/{}", self.trading_base_url, symbol);
        let percentage = if quantity > Decimal::ZERO { "100" } else { "0" };
        let url = build_url_with_query(&url, &[("percentage", percentage)]);
        let resp = self.auth(self.client.delete(&url)).send().await.map_err(Self::network_error)?;
        if !resp.status().is_success() {
            return Err(Self::status_to_broker_error(resp).await);
        }
        let order: AlpacaOrderResponse = resp.json().await.map_err(Self::parse_error)?;
        Ok(order.into())
    }
}
