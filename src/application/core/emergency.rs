//! EmergencyProtocol (L3, §4.12).
//!
//! Grounded in the teacher's `RiskManager` liquidation/circuit-breaker path
//! (the external-command branch that flattens positions on a halt),
//! generalized to the spec's two-broker raw-delegate-bypass model and given
//! an explicit atomic single-flight guard instead of relying on the
//! command channel's sequencing.

use crate::domain::errors::BrokerError;
use crate::domain::ports::BrokerRaw;
use crate::domain::trading::portfolio::Position;
use rust_decimal::Decimal;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;
use tracing::{error, info, warn};

#[derive(Debug, Clone)]
pub struct SymbolFlattenResult {
    pub symbol: String,
    pub quantity: Decimal,
    pub outcome: Result<String, String>,
}

#[derive(Debug, Clone)]
pub struct EmergencyExecutionResult {
    pub success: bool,
    pub per_symbol: Vec<SymbolFlattenResult>,
    pub error: Option<String>,
}

/// Atomic flatten-everything safety valve. Exactly one `trigger()` runs at
/// a time across all callers (Supervisor, UI command, safety monitor).
pub struct EmergencyProtocol {
    triggered: AtomicBool,
    last_execution_result: RwLock<Option<EmergencyExecutionResult>>,
}

impl Default for EmergencyProtocol {
    fn default() -> Self {
        Self::new()
    }
}

impl EmergencyProtocol {
    pub fn new() -> Self {
        Self {
            triggered: AtomicBool::new(false),
            last_execution_result: RwLock::new(None),
        }
    }

    pub fn is_triggered(&self) -> bool {
        self.triggered.load(Ordering::SeqCst)
    }

    /// Flatten everything on both brokers via their raw delegates, bypassing
    /// retry, rate-limit, and circuit-breaker middleware. Both legs run
    /// under the same single-flight guard so a halt can never flatten only
    /// the equity book while the crypto book races past a second, rejected
    /// `trigger()` call (or vice versa). Returns `Err` only when another
    /// trigger is already in flight - per-symbol failures on either broker
    /// are reported inside `EmergencyExecutionResult`, not as an `Err`.
    pub async fn trigger(
        &self,
        equity: &dyn BrokerRaw,
        equity_positions: Vec<Position>,
        crypto: &dyn BrokerRaw,
        crypto_positions: Vec<Position>,
        reason: &str,
    ) -> Result<EmergencyExecutionResult, &'static str> {
        if self
            .triggered
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err("emergency protocol already triggered");
        }

        warn!(reason, "EmergencyProtocol: trigger fired, flattening all positions on both brokers");

        let mut per_symbol = Vec::with_capacity(equity_positions.len() + crypto_positions.len());
        for (broker, positions, leg) in [(equity, equity_positions, "equity"), (crypto, crypto_positions, "crypto")] {
            if let Err(e) = broker.cancel_all_orders_now().await {
                error!(error = %e, leg, "EmergencyProtocol: cancel_all_orders_now failed, continuing with flatten");
            }

            for position in &positions {
                let outcome = match broker.liquidate_position_now(&position.symbol, position.quantity).await {
                    Ok(order) => {
                        info!(symbol = %position.symbol, order_id = %order.id, leg, "EmergencyProtocol: position flattened");
                        Ok(order.id)
                    }
                    Err(err) => {
                        error!(symbol = %position.symbol, error = %err, leg, "EmergencyProtocol: flatten failed for symbol");
                        Err(Self::describe(&err))
                    }
                };
                per_symbol.push(SymbolFlattenResult {
                    symbol: position.symbol.clone(),
                    quantity: position.quantity,
                    outcome,
                });
            }
        }

        let success = per_symbol.iter().all(|r| r.outcome.is_ok());
        let result = EmergencyExecutionResult {
            success,
            per_symbol,
            error: if success { None } else { Some("one or more symbols failed to flatten".to_string()) },
        };

        *self.last_execution_result.write().expect("emergency result lock poisoned") = Some(result.clone());
        Ok(result)
    }

    /// Allow a subsequent `trigger()` call after this one has settled.
    pub fn reset(&self) {
        self.triggered.store(false, Ordering::SeqCst);
    }

    pub fn last_execution_result(&self) -> Option<EmergencyExecutionResult> {
        self.last_execution_result
            .read()
            .expect("emergency result lock poisoned")
            .clone()
    }

    fn describe(err: &BrokerError) -> String {
        format!("{:?}: {}", err.kind, err.detail)
    }
}
