//! `PositionBook`: the per-profile position map used by `ProfileRunner`/
//! `CryptoLoop`/`ExitEvaluator`/`GridOrderEngine`.
//!
//! This is a richer sibling of [`super::portfolio::Position`] (which mirrors
//! the broker's wire-format holding) carrying the fields the core strategy
//! layer needs: stop/take-profit levels, entry time, and the owning profile.
//! Writes go through a single writer (the owning `ProfileRunner`, or
//! `CryptoLoop` for crypto); readers (telemetry) see a cloned snapshot.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// A tracked open position, as opposed to the broker's raw holding snapshot.
///
/// Invariants (enforced by the mutation methods below, not by construction):
/// `quantity > 0`; `stop_loss < entry_price < take_profit` when both are
/// set; `entry_time <= now`.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackedPosition {
    pub symbol: String,
    pub entry_price: Decimal,
    pub quantity: Decimal,
    pub stop_loss: Option<Decimal>,
    pub take_profit: Option<Decimal>,
    pub entry_time: DateTime<Utc>,
    pub profile_id: String,
    /// Set when the entry price was reconstructed from a fallback (today's
    /// open or current price) rather than actual trade history, per the
    /// CryptoLoop sync rule in spec §9 - downstream stop-loss logic should
    /// treat this position's `stop_loss` as advisory only.
    pub stop_unreliable: bool,
}

impl TrackedPosition {
    pub fn new(
        symbol: impl Into<String>,
        entry_price: Decimal,
        quantity: Decimal,
        profile_id: impl Into<String>,
        entry_time: DateTime<Utc>,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            entry_price,
            quantity,
            stop_loss: None,
            take_profit: None,
            entry_time,
            profile_id: profile_id.into(),
            stop_unreliable: false,
        }
    }

    pub fn pnl_pct(&self, current_price: Decimal) -> Decimal {
        if self.entry_price <= Decimal::ZERO {
            return Decimal::ZERO;
        }
        (current_price - self.entry_price) / self.entry_price
    }

    /// Raise the stop only upward - stops never ratchet down (§8 invariant:
    /// "stops only ratchet upward").
    pub fn raise_stop(&mut self, candidate: Decimal) {
        match self.stop_loss {
            Some(existing) if existing >= candidate => {}
            _ => self.stop_loss = Some(candidate),
        }
    }

    /// Reduce quantity after a partial exit. Returns the quantity actually
    /// removed (clamped to what was held).
    pub fn reduce_quantity(&mut self, fraction: Decimal) -> Decimal {
        let sell_qty = (self.quantity * fraction).min(self.quantity);
        self.quantity -= sell_qty;
        sell_qty
    }
}

/// Ordered `symbol -> position` map for a single profile (or the crypto
/// loop, which owns its own book). Holds at most one position per symbol.
#[derive(Debug, Default)]
pub struct PositionBook {
    inner: Arc<RwLock<BTreeMap<String, TrackedPosition>>>,
}

impl Clone for PositionBook {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl PositionBook {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(BTreeMap::new())),
        }
    }

    pub async fn snapshot(&self) -> BTreeMap<String, TrackedPosition> {
        self.inner.read().await.clone()
    }

    pub async fn get(&self, symbol: &str) -> Option<TrackedPosition> {
        self.inner.read().await.get(symbol).cloned()
    }

    pub async fn contains(&self, symbol: &str) -> bool {
        self.inner.read().await.contains_key(symbol)
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }

    /// Insert or replace a position. Only the owning single writer should
    /// call this.
    pub async fn upsert(&self, position: TrackedPosition) {
        self.inner
            .write()
            .await
            .insert(position.symbol.clone(), position);
    }

    pub async fn remove(&self, symbol: &str) -> Option<TrackedPosition> {
        self.inner.write().await.remove(symbol)
    }

    /// Mutate a position in place under the write lock, e.g. for a partial
    /// exit that must be atomic with respect to the evaluator re-reading the
    /// book in the same tick (§4.9: "re-read the book after a partial sell
    /// before testing subsequent rules").
    pub async fn mutate<F, R>(&self, symbol: &str, f: F) -> Option<R>
    where
        F: FnOnce(&mut TrackedPosition) -> R,
    {
        let mut guard = self.inner.write().await;
        guard.get_mut(symbol).map(f)
    }
}
