//! Supervisor (L3, §6).
//!
//! Command/telemetry surface for the trading engine, grounded in the same
//! channel-based command/event API shape the teacher's UI-facing system
//! client used. `Supervisor` owns the `EmergencyProtocol` and
//! `HeartbeatMonitor` directly and exposes the command surface the spec
//! names: start/stop/pause/resume/emergency_trigger/emergency_reset/
//! force_rebalance_check, plus a `backtest` passthrough.
//!
//! `bin/server.rs` constructs and runs this directly - see DESIGN.md's
//! Open Question entry and "Final trim-pass decision".

use crate::application::core::emergency::{EmergencyExecutionResult, EmergencyProtocol};
use crate::application::core::heartbeat::HeartbeatMonitor;
use crate::domain::ports::BrokerRaw;
use crate::domain::trading::portfolio::Position;
use anyhow::Result;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub enum SupervisorCommand {
    Start,
    Stop,
    Pause,
    Resume,
    EmergencyTrigger { reason: String },
    EmergencyReset,
    ForceRebalanceCheck,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunState {
    Stopped,
    Running,
    Paused,
}

/// Broadcast event surface mirroring §6's telemetry tags, kept distinct
/// from `SystemEvent` (which is candle/sentiment/news UI data, not engine
/// lifecycle state).
#[derive(Debug, Clone)]
pub enum SupervisorEvent {
    StateChanged(RunState),
    EmergencyTriggered(String),
    EmergencyCompleted(EmergencyExecutionResult),
    RebalanceCheckRequested,
}

pub struct Supervisor {
    state: std::sync::RwLock<RunState>,
    paused: AtomicBool,
    pub emergency: Arc<EmergencyProtocol>,
    pub heartbeat: Arc<HeartbeatMonitor>,
    events_tx: broadcast::Sender<SupervisorEvent>,
}

impl Supervisor {
    pub fn new(emergency: Arc<EmergencyProtocol>, heartbeat: Arc<HeartbeatMonitor>) -> Self {
        let (events_tx, _) = broadcast::channel(256);
        Self {
            state: std::sync::RwLock::new(RunState::Stopped),
            paused: AtomicBool::new(false),
            emergency,
            heartbeat,
            events_tx,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SupervisorEvent> {
        self.events_tx.subscribe()
    }

    pub fn state(&self) -> RunState {
        self.state.read().expect("supervisor state lock poisoned").clone()
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    /// Dispatch one command. `ProfileRunner`/`CryptoLoop` tasks are expected
    /// to poll `state()`/`is_paused()` between cycles rather than being torn
    /// down and rebuilt here - pausing suspends new order placement, it does
    /// not kill in-flight work. `EmergencyTrigger` needs both brokers so the
    /// single CAS guard in `EmergencyProtocol::trigger` covers the whole
    /// portfolio, not just one asset class.
    pub async fn dispatch(
        &self,
        cmd: SupervisorCommand,
        equity: &dyn BrokerRaw,
        equity_positions: Vec<Position>,
        crypto: &dyn BrokerRaw,
        crypto_positions: Vec<Position>,
    ) -> Result<()> {
        match cmd {
            SupervisorCommand::Start => self.set_state(RunState::Running),
            SupervisorCommand::Stop => self.set_state(RunState::Stopped),
            SupervisorCommand::Pause => {
                self.paused.store(true, Ordering::SeqCst);
                info!("supervisor: paused");
            }
            SupervisorCommand::Resume => {
                self.paused.store(false, Ordering::SeqCst);
                info!("supervisor: resumed");
            }
            SupervisorCommand::EmergencyTrigger { reason } => {
                let _ = self.events_tx.send(SupervisorEvent::EmergencyTriggered(reason.clone()));
                match self.emergency.trigger(equity, equity_positions, crypto, crypto_positions, &reason).await {
                    Ok(result) => {
                        let _ = self.events_tx.send(SupervisorEvent::EmergencyCompleted(result));
                        self.set_state(RunState::Stopped);
                    }
                    Err(e) => warn!(error = %e, "supervisor: emergency trigger rejected"),
                }
            }
            SupervisorCommand::EmergencyReset => {
                self.emergency.reset();
                info!("supervisor: emergency protocol reset");
            }
            SupervisorCommand::ForceRebalanceCheck => {
                let _ = self.events_tx.send(SupervisorEvent::RebalanceCheckRequested);
            }
        }
        Ok(())
    }

    fn set_state(&self, state: RunState) {
        *self.state.write().expect("supervisor state lock poisoned") = state.clone();
        let _ = self.events_tx.send(SupervisorEvent::StateChanged(state));
    }
}
