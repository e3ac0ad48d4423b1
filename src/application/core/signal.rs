//! The dispatcher-level trade signal.
//!
//! Distinct from [`crate::application::strategies::traits::Signal`], which
//! is Buy/Sell-only and feeds the older per-symbol `Analyst` loop. This one
//! is tagged with an explicit `Hold` arm (§3 `Signal`: "tagged variant
//! `Buy(reason) | Sell(reason) | Hold(reason)`") so the dispatcher, filter
//! pipeline, and profile runner can all reason about "no trade, and here's
//! why" without overloading an `Option`.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Signal {
    Buy(String),
    Sell(String),
    Hold(String),
}

impl Signal {
    pub fn is_buy(&self) -> bool {
        matches!(self, Signal::Buy(_))
    }

    pub fn is_sell(&self) -> bool {
        matches!(self, Signal::Sell(_))
    }

    pub fn is_hold(&self) -> bool {
        matches!(self, Signal::Hold(_))
    }

    pub fn reason(&self) -> &str {
        match self {
            Signal::Buy(r) | Signal::Sell(r) | Signal::Hold(r) => r,
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Signal::Buy(r) => write!(f, "BUY ({r})"),
            Signal::Sell(r) => write!(f, "SELL ({r})"),
            Signal::Hold(r) => write!(f, "HOLD ({r})"),
        }
    }
}
