//! Telemetry push surface (§6).
//!
//! Grounded in `application::monitoring::connection_health_service::
//! ConnectionHealthService`'s broadcast-channel shape: a single
//! `broadcast::Sender` fed by every loop/component, with a tagged event
//! enum instead of the connection service's single `ConnectionHealthEvent`
//! shape, to cover the spec's ACCOUNT/POSITIONS/MARKET_UPDATE/TRADE_EVENT/
//! ACTIVITY/SYSTEM_STATUS/PROFIT_TARGETS/BOT_STATUS/ORDER_UPDATE/
//! PHASE3_EVENT/PROCESSING_STATUS tags.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ActivityLevel {
    Info,
    Warning,
    Critical,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum TelemetryEvent {
    Account { equity: Decimal, buying_power: Decimal },
    Positions { count: usize, symbols: Vec<String> },
    MarketUpdate { symbol: String, price: Decimal },
    TradeEvent { symbol: String, side: String, quantity: Decimal, price: Decimal },
    Activity { level: ActivityLevel, message: String },
    SystemStatus { component: String, healthy: bool },
    ProfitTargets { profile: String, daily_target_met: bool, pnl_pct: Decimal },
    BotStatus { running: bool, paused: bool },
    OrderUpdate { symbol: String, order_id: String, status: String },
    Phase3Event { description: String },
    ProcessingStatus { stage: String, detail: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct TelemetryMessage {
    pub timestamp: DateTime<Utc>,
    pub event: TelemetryEvent,
}

/// Fan-in telemetry bus. Every `ProfileRunner`/`CryptoLoop`/`Supervisor`
/// holds a clone of the sender and pushes events as they occur; the UI or
/// any other consumer subscribes independently.
pub struct TelemetryBus {
    tx: broadcast::Sender<TelemetryMessage>,
}

impl Default for TelemetryBus {
    fn default() -> Self {
        Self::new(1024)
    }
}

impl TelemetryBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TelemetryMessage> {
        self.tx.subscribe()
    }

    pub fn publish(&self, event: TelemetryEvent, now: DateTime<Utc>) {
        if let TelemetryEvent::Activity { level, message } = &event {
            match level {
                ActivityLevel::Critical => tracing::error!(%message, "telemetry: activity"),
                ActivityLevel::Warning => tracing::warn!(%message, "telemetry: activity"),
                ActivityLevel::Info => info!(%message, "telemetry: activity"),
            }
        }
        let _ = self.tx.send(TelemetryMessage { timestamp: now, event });
    }
}
