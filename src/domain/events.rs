//! Internal trading event bus payloads.
//!
//! These are the events `infrastructure::EventBus` fans out to listeners.
//! They are a superset of the telemetry surface's `TRADE_EVENT`/`ORDER_UPDATE`
//! tags (see spec §6) kept internal to the process rather than pushed over a
//! transport - the transport itself is out of scope.

use crate::domain::trading::types::OrderSide;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TradingEvent {
    SignalGenerated {
        symbol: String,
        side: OrderSide,
        price: Decimal,
        reason: String,
        timestamp: i64,
    },
    TradeApproved {
        symbol: String,
        side: OrderSide,
        quantity: Decimal,
        reason: String,
    },
    TradeRejected {
        symbol: String,
        side: OrderSide,
        reason: String,
    },
    OrderFilled {
        symbol: String,
        side: OrderSide,
        quantity: Decimal,
        price: Decimal,
    },
    PositionClosed {
        symbol: String,
        pnl: Decimal,
        reason: String,
    },
}

/// A subscriber to the internal event bus. Implementors must not block or
/// perform I/O synchronously; the bus invokes them inline under a read lock.
pub trait EventListener: Send + Sync {
    fn on_event(&self, event: &TradingEvent);
}

/// Listener that just logs at `info!`, used as the default subscriber and in
/// tests.
pub struct LoggingListener;

impl EventListener for LoggingListener {
    fn on_event(&self, event: &TradingEvent) {
        tracing::info!(?event, "trading event");
    }
}
