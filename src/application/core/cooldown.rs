//! Per-symbol cooldown map (§3 `Cooldown`, §5 "Cooldown maps are
//! concurrent: writes on sell, reads on entry").
//!
//! One instance is owned per loop (one for a `ProfileRunner`, one for the
//! `CryptoLoop`) rather than shared globally - the spec's Open Questions
//! settle this as "cooldown source is per-loop, not unified" (see
//! DESIGN.md). Two timers share the same map, keyed by reason, so a
//! post-stop-loss cooldown and a post-sell cooldown on the same symbol
//! don't clobber each other.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::RwLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CooldownReason {
    StopLoss,
    Sell,
}

#[derive(Debug, Default)]
pub struct Cooldown {
    entries: RwLock<HashMap<(String, CooldownReason), DateTime<Utc>>>,
}

impl Cooldown {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a cooldown for `symbol` that expires at `now + duration_ms`.
    pub fn start(&self, symbol: &str, reason: CooldownReason, now: DateTime<Utc>, duration_ms: i64) {
        let expires = now + chrono::Duration::milliseconds(duration_ms);
        self.entries
            .write()
            .expect("cooldown lock poisoned")
            .insert((symbol.to_string(), reason), expires);
    }

    /// Whether `symbol` is still cooling down for `reason` as of `now`.
    /// Expired entries are treated as absent but not evicted here -
    /// `gc_expired` does that in bulk.
    pub fn is_active(&self, symbol: &str, reason: CooldownReason, now: DateTime<Utc>) -> bool {
        self.entries
            .read()
            .expect("cooldown lock poisoned")
            .get(&(symbol.to_string(), reason))
            .is_some_and(|expiry| *expiry > now)
    }

    /// Whether `symbol` is cooling down for *any* reason.
    pub fn is_active_any(&self, symbol: &str, now: DateTime<Utc>) -> bool {
        self.is_active(symbol, CooldownReason::StopLoss, now)
            || self.is_active(symbol, CooldownReason::Sell, now)
    }

    /// Drop entries that have expired as of `now` ("entries expire
    /// implicitly", §3 `Cooldown`).
    pub fn gc_expired(&self, now: DateTime<Utc>) {
        self.entries
            .write()
            .expect("cooldown lock poisoned")
            .retain(|_, expiry| *expiry > now);
    }
}
