//! ExitEvaluator (L2, §4.9).
//!
//! Eleven ordered exit rules over one open position. Grounded in
//! `application::risk_management::trailing_stops::StopState` for the
//! ratchet-only-upward idiom and in `domain::trading::types::{TrailingTpState,
//! PartialExitState}` for the crypto-only ladder/trailing-TP state
//! machines, generalized into a single ordered chain the way
//! `position_lifecycle.rs` extracts position-related checks out of the
//! per-symbol loop.
//!
//! Full-exit rules stop the chain; partial-exit rules (3 and 7) mutate the
//! position in place and the chain continues, matching the "re-read the
//! book after a partial sell before testing subsequent rules" requirement -
//! trivial here since the mutation is local, not a remote re-fetch.

use crate::application::core::config::{FeatureFlags, PartialExitConfig, TrailingTpConfig};
use crate::domain::trading::position_book::TrackedPosition;
use crate::domain::trading::types::{PartialExitState, TrailingTpState};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Per-symbol mutable state the evaluator needs beyond what's in
/// `TrackedPosition` - owned by the same single writer as the position
/// book (`ProfileRunner` or `CryptoLoop`).
#[derive(Debug, Clone)]
pub struct ExitTrackingState {
    pub partial_exit: PartialExitState,
    pub trailing_tp: Option<TrailingTpState>,
    /// Best price seen since entry, for the generic trailing stop (rule 11).
    pub best_price: Decimal,
    pub generic_trailing_stop: Option<Decimal>,
}

impl ExitTrackingState {
    pub fn new(entry_price: Decimal, trailing_tp_cfg: Option<&TrailingTpConfig>) -> Self {
        Self {
            partial_exit: PartialExitState::default(),
            trailing_tp: trailing_tp_cfg.map(|cfg| TrailingTpState::new(entry_price, cfg.activation_pct)),
            best_price: entry_price,
            generic_trailing_stop: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExitAction {
    FullExit { reason: String },
    PartialExit { fraction: Decimal, reason: String },
    RaiseStop { to: Decimal },
}

pub struct ExitMarketSnapshot {
    pub current_price: Decimal,
    pub rsi: Option<Decimal>,
    pub momentum_spike: bool,
    pub health_score: Option<Decimal>,
    pub now: DateTime<Utc>,
    pub is_equity: bool,
    pub is_eod_exit_time: bool,
}

pub struct ExitParams<'a> {
    pub stop_loss_pct: Decimal,
    pub take_profit_pct: Decimal,
    pub trailing_pct: Decimal,
    pub max_hold_secs: i64,
    pub partial_exit: &'a PartialExitConfig,
    pub trailing_tp: &'a TrailingTpConfig,
    pub rsi_exit_min_profit_pct: Decimal,
    pub rsi_overbought: Decimal,
    pub momentum_exit_fraction: Decimal,
    pub health_score_threshold: Decimal,
    pub flags: &'a FeatureFlags,
}

pub struct ExitEvaluator;

impl ExitEvaluator {
    /// Evaluate all rules for one position, mutating `position` and `state`
    /// in place as partial exits/stop raises occur, and returning the
    /// ordered list of actions the caller must execute against the broker.
    pub fn evaluate(
        position: &mut TrackedPosition,
        state: &mut ExitTrackingState,
        market: &ExitMarketSnapshot,
        params: &ExitParams,
    ) -> Vec<ExitAction> {
        let mut actions = Vec::new();
        let pnl_pct = position.pnl_pct(market.current_price);

        // 1. Stop loss.
        if pnl_pct <= -params.stop_loss_pct {
            actions.push(ExitAction::FullExit {
                reason: "stop_loss".to_string(),
            });
            return actions;
        }

        // 2. Break-even protection.
        if params.flags.break_even && pnl_pct > dec!(0.005) {
            let candidate = position.entry_price * dec!(1.001);
            if position.stop_loss.is_none_or(|existing| candidate > existing) {
                position.raise_stop(candidate);
                actions.push(ExitAction::RaiseStop { to: candidate });
            }
        }

        // 3. Partial exit ladder (crypto).
        if !market.is_equity {
            if let Some(fraction) = state.partial_exit.evaluate(pnl_pct, &params.partial_exit.thresholds) {
                position.reduce_quantity(fraction);
                actions.push(ExitAction::PartialExit {
                    fraction,
                    reason: "partial_exit_ladder".to_string(),
                });
            }
        }

        // 4. Trailing take-profit (crypto).
        if !market.is_equity && params.flags.trailing_targets {
            if let Some(tp_state) = state.trailing_tp.as_mut() {
                if let Some(_exit_price) = tp_state.on_price_update(
                    market.current_price,
                    params.trailing_tp.trail_pct,
                    params.trailing_tp.cap_pct,
                    market.now.timestamp(),
                ) {
                    actions.push(ExitAction::FullExit {
                        reason: "trailing_take_profit".to_string(),
                    });
                    return actions;
                }
            }
        }

        // 5. Fixed take-profit (equities).
        if market.is_equity && pnl_pct >= params.take_profit_pct {
            actions.push(ExitAction::FullExit {
                reason: "fixed_take_profit".to_string(),
            });
            return actions;
        }

        // 6. RSI overbought exit.
        if let Some(rsi) = market.rsi {
            if rsi > params.rsi_overbought && pnl_pct > params.rsi_exit_min_profit_pct {
                actions.push(ExitAction::FullExit {
                    reason: "rsi_overbought".to_string(),
                });
                return actions;
            }
        }

        // 7. Momentum-acceleration exit (partial).
        if params.flags.momentum_accel_exit && market.momentum_spike {
            position.reduce_quantity(params.momentum_exit_fraction);
            actions.push(ExitAction::PartialExit {
                fraction: params.momentum_exit_fraction,
                reason: "momentum_acceleration".to_string(),
            });
        }

        // 8. Health-score exit.
        if params.flags.health_score_exit {
            if let Some(score) = market.health_score {
                if score < params.health_score_threshold {
                    actions.push(ExitAction::FullExit {
                        reason: "health_score".to_string(),
                    });
                    return actions;
                }
            }
        }

        // 9. Time-decay.
        if params.flags.time_decay_exit {
            let held_secs = (market.now.timestamp() - position.entry_time.timestamp()).max(0);
            if held_secs > params.max_hold_secs && pnl_pct <= Decimal::ZERO {
                actions.push(ExitAction::FullExit {
                    reason: "time_decay".to_string(),
                });
                return actions;
            }
        }

        // 10. EOD exit (equities only).
        if market.is_equity && market.is_eod_exit_time {
            actions.push(ExitAction::FullExit {
                reason: "end_of_day".to_string(),
            });
            return actions;
        }

        // 11. Generic trailing stop, ratchets upward only.
        if market.current_price > state.best_price {
            state.best_price = market.current_price;
        }
        let trail_stop = state.best_price * (Decimal::ONE - params.trailing_pct);
        if state.generic_trailing_stop.is_none_or(|existing| trail_stop > existing) {
            state.generic_trailing_stop = Some(trail_stop);
        }
        if let Some(stop) = state.generic_trailing_stop {
            if market.current_price <= stop {
                actions.push(ExitAction::FullExit {
                    reason: "trailing_stop".to_string(),
                });
            }
        }

        actions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn position(entry: Decimal, now: DateTime<Utc>) -> TrackedPosition {
        TrackedPosition::new("BTC/USD", entry, dec!(1), "MAIN", now)
    }

    fn params(flags: &FeatureFlags, partial: &PartialExitConfig, trailing_tp: &TrailingTpConfig) -> ExitParams<'_> {
        ExitParams {
            stop_loss_pct: dec!(0.02),
            take_profit_pct: dec!(0.03),
            trailing_pct: dec!(0.01),
            max_hold_secs: 3600,
            partial_exit: partial,
            trailing_tp,
            rsi_exit_min_profit_pct: dec!(0.004),
            rsi_overbought: dec!(70),
            momentum_exit_fraction: dec!(0.3),
            health_score_threshold: dec!(0.3),
            flags,
        }
    }

    fn snapshot(price: Decimal, now: DateTime<Utc>, is_equity: bool) -> ExitMarketSnapshot {
        ExitMarketSnapshot {
            current_price: price,
            rsi: None,
            momentum_spike: false,
            health_score: None,
            now,
            is_equity,
            is_eod_exit_time: false,
        }
    }

    #[test]
    fn stop_loss_triggers_full_exit_first() {
        let now = Utc::now();
        let mut pos = position(dec!(100), now);
        let mut state = ExitTrackingState::new(dec!(100), None);
        let flags = FeatureFlags::default();
        let partial = PartialExitConfig::default();
        let ttp = TrailingTpConfig::default();
        let p = params(&flags, &partial, &ttp);

        let actions = ExitEvaluator::evaluate(&mut pos, &mut state, &snapshot(dec!(97), now, true), &p);
        assert_eq!(actions, vec![ExitAction::FullExit { reason: "stop_loss".into() }]);
    }

    #[test]
    fn break_even_raises_stop_without_exiting() {
        let now = Utc::now();
        let mut pos = position(dec!(100), now);
        let mut state = ExitTrackingState::new(dec!(100), None);
        let flags = FeatureFlags::default();
        let partial = PartialExitConfig::default();
        let ttp = TrailingTpConfig::default();
        let p = params(&flags, &partial, &ttp);

        let actions = ExitEvaluator::evaluate(&mut pos, &mut state, &snapshot(dec!(100.6), now, true), &p);
        assert!(actions.iter().any(|a| matches!(a, ExitAction::RaiseStop { .. })));
        assert_eq!(pos.stop_loss, Some(dec!(100.1)));
    }

    #[test]
    fn partial_exit_ladder_fires_for_crypto_and_continues_chain() {
        let now = Utc::now();
        let mut pos = position(dec!(100), now);
        let mut state = ExitTrackingState::new(dec!(100), Some(&TrailingTpConfig::default()));
        let flags = FeatureFlags::default();
        let partial = PartialExitConfig::default();
        let ttp = TrailingTpConfig::default();
        let p = params(&flags, &partial, &ttp);

        // +0.6% triggers the first partial-exit level.
        let actions = ExitEvaluator::evaluate(&mut pos, &mut state, &snapshot(dec!(100.6), now, false), &p);
        assert!(actions.iter().any(|a| matches!(a, ExitAction::PartialExit { .. })));
        assert_eq!(pos.quantity, dec!(0.75));
        assert_eq!(state.partial_exit.level, 1);
    }

    #[test]
    fn fixed_take_profit_exits_equities() {
        let now = Utc::now();
        let mut pos = position(dec!(100), now);
        let mut state = ExitTrackingState::new(dec!(100), None);
        let flags = FeatureFlags::default();
        let partial = PartialExitConfig::default();
        let ttp = TrailingTpConfig::default();
        let p = params(&flags, &partial, &ttp);

        let actions = ExitEvaluator::evaluate(&mut pos, &mut state, &snapshot(dec!(103.5), now, true), &p);
        assert_eq!(
            actions.last(),
            Some(&ExitAction::FullExit { reason: "fixed_take_profit".into() })
        );
    }

    #[test]
    fn time_decay_exits_stale_losers() {
        let now = Utc::now();
        let entry_time = now - Duration::seconds(7200);
        let mut pos = TrackedPosition::new("AAPL", dec!(100), dec!(10), "MAIN", entry_time);
        let mut state = ExitTrackingState::new(dec!(100), None);
        let flags = FeatureFlags::default();
        let partial = PartialExitConfig::default();
        let ttp = TrailingTpConfig::default();
        let p = params(&flags, &partial, &ttp);

        let actions = ExitEvaluator::evaluate(&mut pos, &mut state, &snapshot(dec!(99), now, true), &p);
        assert_eq!(actions, vec![ExitAction::FullExit { reason: "time_decay".into() }]);
    }

    #[test]
    fn eod_exit_flattens_equities_at_configured_time() {
        let now = Utc::now();
        let mut pos = position(dec!(100), now);
        let mut state = ExitTrackingState::new(dec!(100), None);
        let flags = FeatureFlags::default();
        let partial = PartialExitConfig::default();
        let ttp = TrailingTpConfig::default();
        let p = params(&flags, &partial, &ttp);

        let mut snap = snapshot(dec!(100), now, true);
        snap.is_eod_exit_time = true;
        let actions = ExitEvaluator::evaluate(&mut pos, &mut state, &snap, &p);
        assert_eq!(actions, vec![ExitAction::FullExit { reason: "end_of_day".into() }]);
    }

    #[test]
    fn generic_trailing_stop_only_ratchets_up() {
        let now = Utc::now();
        let mut pos = position(dec!(100), now);
        let mut state = ExitTrackingState::new(dec!(100), None);
        let flags = FeatureFlags::default();
        let partial = PartialExitConfig::default();
        let ttp = TrailingTpConfig::default();
        let p = params(&flags, &partial, &ttp);

        // Price rises, trailing stop ratchets up.
        ExitEvaluator::evaluate(&mut pos, &mut state, &snapshot(dec!(101), now, true), &p);
        let stop_after_rise = state.generic_trailing_stop.unwrap();

        // Price dips slightly but stays above the ratcheted stop - no exit.
        let actions = ExitEvaluator::evaluate(&mut pos, &mut state, &snapshot(dec!(100.5), now, true), &p);
        assert!(actions.is_empty());
        assert_eq!(state.generic_trailing_stop, Some(stop_after_rise));
    }
}
