//! ProfileRunner (L3, §4.11).
//!
//! One cooperative task per `Profile`, generalized from `Analyst`'s
//! per-symbol loop shape: `AnalystConfig`/`SymbolContext` become
//! `Profile`/`PositionBook`, and the single-symbol cycle becomes a
//! cycle over the profile's bullish/bearish symbol universe plus any
//! broker-reported holdings outside it.

use crate::application::core::config::CoreConfig;
use crate::application::core::cooldown::Cooldown;
use crate::application::core::dispatcher::{AssetClass, StrategyDispatcher};
use crate::application::core::exit_evaluator::{ExitAction, ExitEvaluator, ExitMarketSnapshot, ExitParams, ExitTrackingState};
use crate::application::core::filters::{EntryFilterPipeline, FilterContext, FilterOutcome};
use crate::application::core::heartbeat::HeartbeatMonitor;
use crate::application::core::indicators::{IndicatorSnapshot, Indicators};
use crate::application::core::regime::RegimeHysteresis;
use crate::application::core::signal::Signal;
use crate::application::core::sizer::{PositionSizer, SizingInput};
use crate::application::core::strategies;
use crate::domain::ports::{BrokerEquity, OrderIntent};
use crate::domain::trading::position_book::{PositionBook, TrackedPosition};
use crate::domain::trading::types::{OrderSide, Profile, ProfileRole};
use chrono::Utc;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

/// Sort broker positions by unrealized P&L ascending, returning the symbols
/// to exit so the portfolio falls back within `max_positions`
/// (§4.11 "Cleanup excess positions").
pub fn symbols_to_trim(positions: &[(String, Decimal)], max_positions: usize) -> Vec<String> {
    if positions.len() <= max_positions {
        return Vec::new();
    }
    let mut sorted = positions.to_vec();
    sorted.sort_by(|a, b| a.1.cmp(&b.1));
    let excess = sorted.len() - max_positions;
    sorted.into_iter().take(excess).map(|(symbol, _)| symbol).collect()
}

/// Only the MAIN profile may send exit orders for shared broker positions
/// (§4.11, §5 "the sole protection against duplicate exits").
pub fn may_send_exit_orders(role: ProfileRole) -> bool {
    role == ProfileRole::Main
}

pub struct ProfileRunner {
    pub profile: Profile,
    pub broker: Arc<dyn BrokerEquity>,
    pub book: PositionBook,
    pub cooldown: Cooldown,
    pub heartbeat: Arc<HeartbeatMonitor>,
    pub config: Arc<CoreConfig>,
    exit_states: HashMap<String, ExitTrackingState>,
    indicators: HashMap<String, Indicators>,
    regime: RegimeHysteresis,
}

impl ProfileRunner {
    pub fn new(
        profile: Profile,
        broker: Arc<dyn BrokerEquity>,
        heartbeat: Arc<HeartbeatMonitor>,
        config: Arc<CoreConfig>,
    ) -> Self {
        let mut vix_cfg = config.vix;
        vix_cfg.threshold = profile.vix_threshold;
        vix_cfg.hysteresis = profile.vix_hysteresis;
        Self {
            profile,
            broker,
            book: PositionBook::new(),
            cooldown: Cooldown::new(),
            heartbeat,
            config,
            exit_states: HashMap::new(),
            indicators: HashMap::new(),
            regime: RegimeHysteresis::new(vix_cfg),
        }
    }

    fn heartbeat_name(&self) -> String {
        format!("profile_runner:{}", self.profile.id)
    }

    fn indicator_snapshot(&self, symbol: &str) -> Option<IndicatorSnapshot> {
        self.indicators.get(symbol).map(Indicators::snapshot)
    }

    /// Composite [0,1] position-health score fed to `ExitEvaluator`'s
    /// health-score exit rule: momentum direction/consistency, MACD
    /// alignment, and RSI extremity each contribute a third, so a position
    /// whose trend and oscillator both deteriorate scores low even before
    /// stop-loss/trailing levels are touched (§4.9 rule 8; formula is this
    /// core's own composite, not specified further upstream - see
    /// DESIGN.md).
    fn health_score(snap: IndicatorSnapshot) -> Decimal {
        let momentum_part = match snap.momentum_pct {
            Some(m) if m > Decimal::ZERO && snap.momentum_consistent => Decimal::ONE,
            Some(m) if m > Decimal::ZERO => dec!(0.5),
            _ => Decimal::ZERO,
        };
        let macd_part = match snap.macd_bullish() {
            Some(true) => Decimal::ONE,
            Some(false) => Decimal::ZERO,
            None => dec!(0.5),
        };
        let rsi_part = match snap.rsi {
            Some(rsi) => (Decimal::ONE - (rsi - dec!(50)).abs() / dec!(50)).max(Decimal::ZERO),
            None => dec!(0.5),
        };
        (momentum_part + macd_part + rsi_part) / dec!(3)
    }

    /// Pull the latest bar for `symbol` and feed it into this runner's
    /// per-symbol `Indicators`, building up history one bar per cycle
    /// (§4.11 cadence - there is no historical-bar backfill on startup, so
    /// indicator-dependent exit rules and filters stay neutral for the
    /// first `rsi_period` cycles after a (re)start).
    async fn refresh_indicators(&mut self, symbols: &[String]) {
        for symbol in symbols {
            let Ok(bar) = self.broker.get_latest_bar(symbol).await else { continue };
            self.indicators.entry(symbol.clone()).or_insert_with(Indicators::new).update(&bar);
        }
    }

    /// Trend score derived from the average momentum across the profile's
    /// tracked symbols, standing in for a VIX feed this core has no market
    /// data source for (§4.5 DESIGN.md Open Question: VIX proxy).
    fn trend_score(&self) -> Decimal {
        let momenta: Vec<Decimal> = self
            .indicators
            .values()
            .filter_map(|i| i.snapshot().momentum_pct)
            .collect();
        if momenta.is_empty() {
            return Decimal::ZERO;
        }
        momenta.iter().sum::<Decimal>() / Decimal::from(momenta.len())
    }

    /// Volatility proxy (average ATR%) standing in for VIX level itself.
    fn vix_proxy(&self) -> Decimal {
        let atrs: Vec<Decimal> = self.indicators.values().filter_map(|i| i.snapshot().atr_pct).collect();
        if atrs.is_empty() {
            return self.profile.vix_threshold; // neutral: sits exactly at threshold, no regime push either way
        }
        (atrs.iter().sum::<Decimal>() / Decimal::from(atrs.len())) * dec!(100)
    }

    /// Run one 10s cycle (§4.11). Returns the number of orders placed, for
    /// telemetry/testing.
    pub async fn run_cycle(&mut self, current_prices: &HashMap<String, Decimal>) -> anyhow::Result<usize> {
        let now = Utc::now();
        self.heartbeat.beat(&self.heartbeat_name(), now);

        let account = self.broker.get_account().await?;
        if account.equity <= Decimal::ZERO {
            warn!(profile = %self.profile.id, "aborting cycle: non-positive equity");
            return Ok(0);
        }

        let broker_positions = self.broker.get_positions().await?;
        let may_exit = may_send_exit_orders(self.profile.role);

        let mut orders_placed = 0;

        // Exit evaluation runs for every profile so the shared exit-state
        // bookkeeping (trailing stop, partial-exit ladder progress) stays
        // current; only MAIN may actually send the resulting orders -
        // satellites evaluate read-only (§4.11, §5).
        if may_exit {
            let unrealized: Vec<(String, Decimal)> = broker_positions
                .iter()
                .map(|p| (p.symbol.clone(), (current_prices.get(&p.symbol).copied().unwrap_or(p.average_price) - p.average_price) * p.quantity))
                .collect();

            for symbol in symbols_to_trim(&unrealized, self.config.max_positions) {
                if current_prices.contains_key(&symbol) {
                    info!(profile = %self.profile.id, %symbol, "trimming excess position over cap");
                    let _ = self
                        .broker
                        .place_order(OrderIntent {
                            symbol: symbol.clone(),
                            side: OrderSide::Sell,
                            quantity: broker_positions
                                .iter()
                                .find(|p| p.symbol == symbol)
                                .map(|p| p.quantity)
                                .unwrap_or(Decimal::ZERO),
                            limit_price: None,
                            stop_price: None,
                            take_profit_price: None,
                            client_order_id: None,
                        })
                        .await;
                    orders_placed += 1;
                }
            }
        }

        for position in &broker_positions {
            let Some(price) = current_prices.get(&position.symbol).copied() else {
                continue;
            };
            let mut tracked = TrackedPosition::new(
                position.symbol.clone(),
                position.average_price,
                position.quantity,
                self.profile.id.clone(),
                now,
            );
            let state = self
                .exit_states
                .entry(position.symbol.clone())
                .or_insert_with(|| ExitTrackingState::new(position.average_price, None));

            let ind_snap = self.indicator_snapshot(&position.symbol);
            let snapshot = ExitMarketSnapshot {
                current_price: price,
                rsi: ind_snap.and_then(|s| s.rsi),
                momentum_spike: ind_snap.map(|s| s.overbought() && s.momentum_consistent).unwrap_or(false),
                health_score: ind_snap.map(Self::health_score),
                now,
                is_equity: true,
                is_eod_exit_time: Self::is_eod(now, &self.config),
            };
            let flags = self.config.flags;
            let params = ExitParams {
                stop_loss_pct: self.profile.stop_loss_pct,
                take_profit_pct: self.profile.take_profit_pct,
                trailing_pct: self.profile.trailing_pct,
                max_hold_secs: self.profile.max_hold,
                partial_exit: &self.config.partial_exit,
                trailing_tp: &self.config.trailing_tp,
                rsi_exit_min_profit_pct: self.config.rsi_exit_min_profit_pct,
                rsi_overbought: Decimal::from(70),
                momentum_exit_fraction: Decimal::new(3, 1),
                health_score_threshold: Decimal::new(3, 1),
                flags: &flags,
            };

            let actions = ExitEvaluator::evaluate(&mut tracked, state, &snapshot, &params);
            if may_exit {
                for action in actions {
                    match action {
                        ExitAction::FullExit { reason } => {
                            info!(profile = %self.profile.id, symbol = %position.symbol, %reason, "exiting position");
                            let _ = self
                                .broker
                                .place_order(OrderIntent {
                                    symbol: position.symbol.clone(),
                                    side: OrderSide::Sell,
                                    quantity: position.quantity,
                                    limit_price: None,
                                    stop_price: None,
                                    take_profit_price: None,
                                    client_order_id: None,
                                })
                                .await;
                            self.cooldown.start(
                                &position.symbol,
                                crate::application::core::cooldown::CooldownReason::Sell,
                                now,
                                self.config.sell_cooldown_ms,
                            );
                            orders_placed += 1;
                        }
                        ExitAction::PartialExit { fraction, reason } => {
                            let qty = position.quantity * fraction;
                            info!(profile = %self.profile.id, symbol = %position.symbol, %reason, %qty, "partial exit");
                            let _ = self
                                .broker
                                .place_order(OrderIntent {
                                    symbol: position.symbol.clone(),
                                    side: OrderSide::Sell,
                                    quantity: qty,
                                    limit_price: None,
                                    stop_price: None,
                                    take_profit_price: None,
                                    client_order_id: None,
                                })
                                .await;
                            orders_placed += 1;
                        }
                        ExitAction::RaiseStop { .. } => {}
                    }
                }
            }
            self.book.upsert(tracked).await;
        }

        let entry_symbols = self.profile.all_symbols();
        self.refresh_indicators(&entry_symbols).await;
        let vix = self.vix_proxy();
        let regime = self.regime.update(vix, self.trend_score());
        let same_group_holdings = broker_positions.iter().filter(|p| entry_symbols.contains(&p.symbol)).count();

        for symbol in entry_symbols {
            let Some(&price) = current_prices.get(&symbol) else {
                continue;
            };
            if self.book.contains(&symbol).await {
                continue;
            }

            let ind_snap = self.indicator_snapshot(&symbol);
            let class = if self.profile.bullish_symbols.contains(&symbol) { AssetClass::Momentum } else { AssetClass::Other };
            let mode = StrategyDispatcher::pick_mode(regime, class);
            let signal = ind_snap.map(|s| strategies::evaluate(mode, &s, false)).unwrap_or_else(|| Signal::Hold("no indicator data yet".to_string()));
            if !signal.is_buy() {
                continue;
            }

            let cooldown = &self.cooldown;
            let filter_ctx = FilterContext {
                symbol: &symbol,
                now,
                cooldown,
                open_position_count: broker_positions.len(),
                max_positions: self.config.max_positions,
                sentiment_sign: 0,
                profile_bias: 0,
                market_breadth_healthy: true,
                ml_entry_score: None,
                ml_entry_threshold: Decimal::new(5, 1),
                volume_profile_near_support: None,
                strict_volume_profile: false,
                ml_win_probability: None,
                win_rate_threshold: Decimal::new(5, 1),
                anomaly_action: crate::application::core::filters::AnomalyAction::Continue,
                regime,
                trend_conditions_ok: ind_snap.map(|s| s.bullish_alignment()).unwrap_or(false),
                same_group_holdings,
                correlation_group_cap: 3,
                total_equity: account.equity,
                projected_symbol_exposure_pct: self.profile.capital_fraction,
                projected_group_exposure_pct: self.profile.capital_fraction * Decimal::from(same_group_holdings + 1),
                spread_pct: Decimal::ZERO,
                spread_cap_pct: self.config.spread_cap_pct,
                in_low_liquidity_window: false,
                volume_spike: ind_snap.map(|s| s.volume_spike).unwrap_or(false),
                oversold: ind_snap.map(|s| s.oversold()).unwrap_or(false),
            };

            if EntryFilterPipeline::run(&filter_ctx) != FilterOutcome::Pass {
                continue;
            }

            let sizing = SizingInput {
                buying_power: account.buying_power,
                equity: account.equity,
                entry_price: price,
                risk_fraction: self.profile.capital_fraction,
                kelly: None,
                vix,
                vix_threshold: self.profile.vix_threshold,
                regime,
                ml_confidence: None,
                max_correlation_with_portfolio: Decimal::ZERO,
                anomaly_action: crate::application::core::sizer::AnomalyAction::Continue,
                daily_target_met: false,
                broker_min_order_value: Decimal::ONE,
                quantity_decimals: 0,
            };

            let Some(quantity) = PositionSizer::size(&sizing) else {
                continue;
            };

            let intent = OrderIntent {
                symbol: symbol.clone(),
                side: OrderSide::Buy,
                quantity,
                limit_price: None,
                stop_price: None,
                take_profit_price: None,
                client_order_id: None,
            };
            let stop_loss = price * (Decimal::ONE - self.profile.stop_loss_pct);
            let take_profit = price * (Decimal::ONE + self.profile.take_profit_pct);

            match self.broker.place_bracket(intent.clone(), stop_loss, take_profit).await {
                Ok(_) => orders_placed += 1,
                Err(e) if e.kind == crate::domain::errors::BrokerErrorKind::InsufficientFunds => {
                    warn!(profile = %self.profile.id, %symbol, "bracket rejected for insufficient funds, not retrying plain market");
                }
                Err(_) => {
                    if self.broker.place_order(intent).await.is_ok() {
                        orders_placed += 1;
                    }
                }
            }
        }

        Ok(orders_placed)
    }

    /// `CoreConfig::eod_exit_hour_et`/`eod_exit_minute_et` are expressed in
    /// whatever timezone the caller's `now` clock already runs on; no
    /// timezone-conversion crate is in the dependency stack, so callers
    /// feeding wall-clock ET should pass an ET-adjusted `now`.
    fn is_eod(now: chrono::DateTime<Utc>, config: &CoreConfig) -> bool {
        now.time().hour() == config.eod_exit_hour_et && now.time().minute() >= config.eod_exit_minute_et
    }
}

use chrono::Timelike;
