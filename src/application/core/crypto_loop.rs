//! CryptoLoop (L3, §4.11).
//!
//! Dedicated 24/7 loop, independent of the per-profile schedule. Generalized
//! from `Analyst`'s per-symbol cycle the same way `ProfileRunner` is, but
//! owns its own `PositionBook`/`Cooldown` and additionally runs a
//! `GridOrderEngine` tick every cycle.

use crate::application::core::config::CoreConfig;
use crate::application::core::cooldown::{Cooldown, CooldownReason};
use crate::application::core::dispatcher::{AssetClass, StrategyDispatcher};
use crate::application::core::exit_evaluator::{ExitAction, ExitEvaluator, ExitMarketSnapshot, ExitParams, ExitTrackingState};
use crate::application::core::filters::{EntryFilterPipeline, FilterContext, FilterOutcome};
use crate::application::core::grid_engine::{GridCandidate, GridOrderEngine, PendingGridOrder, VolatilityTier};
use crate::application::core::heartbeat::HeartbeatMonitor;
use crate::application::core::indicators::{IndicatorSnapshot, Indicators};
use crate::application::core::regime::RegimeHysteresis;
use crate::application::core::signal::Signal;
use crate::application::core::sizer::{PositionSizer, SizingInput};
use crate::application::core::strategies;
use crate::domain::ports::{BrokerCrypto, Ticker};
use crate::domain::trading::position_book::{PositionBook, TrackedPosition};
use crate::domain::trading::types::{Candle, OrderSide, PerformanceStats, VolatilityStats};
use chrono::Utc;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Recompute the dynamic position cap from total equity (§4.11 step 1).
pub fn dynamic_max_positions(total_equity: Decimal, per_position_usd: Decimal, min: usize, max: usize) -> usize {
    if per_position_usd <= Decimal::ZERO {
        return min;
    }
    let capacity = (total_equity * dec!(0.80) / per_position_usd)
        .floor()
        .to_string()
        .parse::<i64>()
        .unwrap_or(min as i64)
        .max(0) as usize;
    capacity.clamp(min, max)
}

/// Classify daily volatility into a sizing tier for the grid engine.
pub fn volatility_tier(stats: &VolatilityStats, elevated_threshold: Decimal, high_threshold: Decimal) -> VolatilityTier {
    if stats.daily_vol >= high_threshold {
        VolatilityTier::High
    } else if stats.daily_vol >= elevated_threshold {
        VolatilityTier::Elevated
    } else {
        VolatilityTier::Normal
    }
}

pub struct CryptoLoop {
    pub broker: Arc<dyn BrokerCrypto>,
    pub watchlist: Vec<String>,
    pub book: PositionBook,
    pub cooldown: Cooldown,
    pub heartbeat: Arc<HeartbeatMonitor>,
    pub config: Arc<CoreConfig>,
    pub performance: HashMap<String, PerformanceStats>,
    pending_grid_orders: HashMap<String, PendingGridOrder>,
    exit_states: HashMap<String, ExitTrackingState>,
    indicators: HashMap<String, Indicators>,
    regime: RegimeHysteresis,
}

impl CryptoLoop {
    pub fn new(broker: Arc<dyn BrokerCrypto>, watchlist: Vec<String>, heartbeat: Arc<HeartbeatMonitor>, config: Arc<CoreConfig>) -> Self {
        let vix_cfg = config.vix;
        Self {
            broker,
            watchlist,
            book: PositionBook::new(),
            cooldown: Cooldown::new(),
            heartbeat,
            config,
            performance: HashMap::new(),
            pending_grid_orders: HashMap::new(),
            exit_states: HashMap::new(),
            indicators: HashMap::new(),
            regime: RegimeHysteresis::new(vix_cfg),
        }
    }

    fn indicator_snapshot(&self, symbol: &str) -> Option<IndicatorSnapshot> {
        self.indicators.get(symbol).map(Indicators::snapshot)
    }

    /// Crypto venues expose no candle stream through `BrokerCrypto`, only
    /// tickers; each cycle's ticker becomes one synthetic bar so
    /// `Indicators` still accumulates history, at the cost of using the
    /// rolling 24h high/low/open as that bar's range instead of the
    /// cycle's own (§4.4 DESIGN.md Open Question: crypto indicator input).
    fn ticker_to_bar(symbol: &str, ticker: &Ticker, now: chrono::DateTime<Utc>) -> Candle {
        Candle {
            symbol: symbol.to_string(),
            open: ticker.open,
            high: ticker.high24,
            low: ticker.low24,
            close: ticker.last,
            volume: ticker.vol24,
            timestamp: now.timestamp(),
        }
    }

    async fn refresh_indicator(&mut self, symbol: &str, ticker: &Ticker, now: chrono::DateTime<Utc>) {
        let bar = Self::ticker_to_bar(symbol, ticker, now);
        self.indicators.entry(symbol.to_string()).or_insert_with(Indicators::new).update(&bar);
    }

    fn trend_score(&self) -> Decimal {
        let momenta: Vec<Decimal> = self.indicators.values().filter_map(|i| i.snapshot().momentum_pct).collect();
        if momenta.is_empty() {
            return Decimal::ZERO;
        }
        momenta.iter().sum::<Decimal>() / Decimal::from(momenta.len())
    }

    fn vix_proxy(&self, default: Decimal) -> Decimal {
        let atrs: Vec<Decimal> = self.indicators.values().filter_map(|i| i.snapshot().atr_pct).collect();
        if atrs.is_empty() {
            return default;
        }
        (atrs.iter().sum::<Decimal>() / Decimal::from(atrs.len())) * dec!(100)
    }

    /// Reconstruct an unseen holding's entry price, in order of preference:
    /// weighted-average of recent buys, today's open, current price
    /// (flagging the stop as unreliable in the last case), per §4.11 step 2.
    pub fn reconstruct_entry_price(recent_buys: &[(Decimal, Decimal)], todays_open: Option<Decimal>, current_price: Decimal) -> (Decimal, bool) {
        if !recent_buys.is_empty() {
            let total_qty: Decimal = recent_buys.iter().map(|(_, qty)| *qty).sum();
            if total_qty > Decimal::ZERO {
                let weighted_sum: Decimal = recent_buys.iter().map(|(price, qty)| price * qty).sum();
                return (weighted_sum / total_qty, false);
            }
        }
        if let Some(open) = todays_open {
            return (open, false);
        }
        (current_price, true)
    }

    /// Run one cycle: sync book, exits, entries, grid tick. Returns orders
    /// placed, for telemetry/testing.
    pub async fn run_cycle(&mut self) -> anyhow::Result<usize> {
        let now = Utc::now();
        self.heartbeat.beat("crypto_loop", now);
        let mut orders_placed = 0;

        self.cooldown.gc_expired(now);

        let balance = self.broker.get_balance().await?;
        let trade_balance = self.broker.get_trade_balance().await?;

        for (symbol, qty) in balance.iter().filter(|(_, qty)| **qty > Decimal::ZERO) {
            if self.book.contains(symbol).await {
                continue;
            }
            let ticker = self.broker.get_ticker(symbol).await?;
            let history = self.broker.get_trades_history(symbol).await.unwrap_or_default();
            let recent_buys: Vec<(Decimal, Decimal)> = history
                .iter()
                .filter(|o| o.side == OrderSide::Buy)
                .map(|o| (o.price, o.quantity))
                .collect();
            let (entry_price, stop_unreliable) = Self::reconstruct_entry_price(&recent_buys, Some(ticker.open), ticker.last);

            let mut tracked = TrackedPosition::new(symbol.clone(), entry_price, *qty, "CRYPTO", now);
            tracked.stop_unreliable = stop_unreliable;
            self.book.upsert(tracked).await;
            info!(%symbol, %entry_price, stop_unreliable, "synced new crypto holding into position book");
        }

        let known_symbols: Vec<String> = self.book.snapshot().await.keys().cloned().collect();
        for symbol in &known_symbols {
            if !balance.contains_key(symbol) || balance.get(symbol).copied().unwrap_or_default() <= Decimal::ZERO {
                self.book.remove(symbol).await;
                continue;
            }

            let Some(mut tracked) = self.book.get(symbol).await else { continue };
            let ticker = match self.broker.get_ticker(symbol).await {
                Ok(t) => t,
                Err(e) => {
                    warn!(%symbol, error = %e, "failed to fetch ticker during exit evaluation");
                    continue;
                }
            };

            self.refresh_indicator(symbol, &ticker, now).await;
            let ind_snap = self.indicator_snapshot(symbol);

            let state = self
                .exit_states
                .entry(symbol.clone())
                .or_insert_with(|| ExitTrackingState::new(tracked.entry_price, Some(&self.config.trailing_tp)));

            let snapshot = ExitMarketSnapshot {
                current_price: ticker.last,
                rsi: ind_snap.and_then(|s| s.rsi),
                momentum_spike: ind_snap.map(|s| s.overbought() && s.momentum_consistent).unwrap_or(false),
                health_score: ind_snap.map(Self::health_score),
                now,
                is_equity: false,
                is_eod_exit_time: false,
            };
            let flags = self.config.flags;
            let params = ExitParams {
                stop_loss_pct: self.config.crypto_stop_loss_pct,
                take_profit_pct: self.config.crypto_take_profit_pct,
                trailing_pct: self.config.crypto_trailing_pct,
                max_hold_secs: self.config.crypto_max_hold_secs,
                partial_exit: &self.config.partial_exit,
                trailing_tp: &self.config.trailing_tp,
                rsi_exit_min_profit_pct: self.config.rsi_exit_min_profit_pct,
                rsi_overbought: dec!(70),
                momentum_exit_fraction: dec!(0.3),
                health_score_threshold: dec!(0.3),
                flags: &flags,
            };

            for action in ExitEvaluator::evaluate(&mut tracked, state, &snapshot, &params) {
                match action {
                    ExitAction::FullExit { reason } => {
                        info!(%symbol, %reason, "crypto exit");
                        if self.broker.place_market_order(symbol, OrderSide::Sell, tracked.quantity).await.is_ok() {
                            orders_placed += 1;
                        }
                        self.cooldown.start(symbol, CooldownReason::StopLoss, now, self.config.stop_loss_cooldown_ms);
                        self.performance
                            .entry(symbol.clone())
                            .or_default()
                            .record(tracked.pnl_pct(ticker.last), now.timestamp());
                        self.book.remove(symbol).await;
                        continue;
                    }
                    ExitAction::PartialExit { fraction, reason } => {
                        let qty = tracked.quantity * fraction;
                        info!(%symbol, %reason, %qty, "crypto partial exit");
                        if self.broker.place_market_order(symbol, OrderSide::Sell, qty).await.is_ok() {
                            orders_placed += 1;
                        }
                    }
                    ExitAction::RaiseStop { .. } => {}
                }
            }
            self.book.upsert(tracked).await;
        }

        let dynamic_cap = dynamic_max_positions(trade_balance.equivalent_balance, dec!(50), self.config.max_positions.min(3), self.config.max_positions);
        let current_count = self.book.len().await;
        let regime = self.regime.update(self.vix_proxy(dec!(25)), self.trend_score());

        if current_count < dynamic_cap {
            for symbol in &self.watchlist {
                if self.book.contains(symbol).await || self.cooldown.is_active_any(symbol, now) {
                    continue;
                }
                let ticker = match self.broker.get_ticker(symbol).await {
                    Ok(t) => t,
                    Err(_) => continue,
                };
                self.refresh_indicator(symbol, &ticker, now).await;
                let ind_snap = self.indicator_snapshot(symbol);

                let mode = StrategyDispatcher::pick_mode(regime, AssetClass::Other);
                let signal = ind_snap.map(|s| strategies::evaluate(mode, &s, false)).unwrap_or_else(|| Signal::Hold("no indicator data yet".to_string()));
                if !signal.is_buy() {
                    continue;
                }

                let spread_pct = if ticker.bid > Decimal::ZERO { (ticker.ask - ticker.bid) / ticker.bid } else { Decimal::ZERO };

                let filter_ctx = FilterContext {
                    symbol,
                    now,
                    cooldown: &self.cooldown,
                    open_position_count: current_count,
                    max_positions: dynamic_cap,
                    sentiment_sign: 0,
                    profile_bias: 0,
                    market_breadth_healthy: true,
                    ml_entry_score: None,
                    ml_entry_threshold: dec!(0.5),
                    volume_profile_near_support: None,
                    strict_volume_profile: false,
                    ml_win_probability: None,
                    win_rate_threshold: dec!(0.5),
                    anomaly_action: crate::application::core::filters::AnomalyAction::Continue,
                    regime,
                    trend_conditions_ok: ind_snap.map(|s| s.bullish_alignment()).unwrap_or(false),
                    same_group_holdings: 0,
                    correlation_group_cap: 3,
                    total_equity: trade_balance.equivalent_balance,
                    projected_symbol_exposure_pct: dec!(0.02),
                    projected_group_exposure_pct: dec!(0.02),
                    spread_pct,
                    spread_cap_pct: self.config.spread_cap_pct,
                    in_low_liquidity_window: Self::in_low_liquidity_window(now),
                    volume_spike: ind_snap.map(|s| s.volume_spike).unwrap_or(false),
                    oversold: ind_snap.map(|s| s.oversold()).unwrap_or(false),
                };

                if EntryFilterPipeline::run(&filter_ctx) != FilterOutcome::Pass {
                    continue;
                }

                let sizing = SizingInput {
                    buying_power: trade_balance.free_margin,
                    equity: trade_balance.equivalent_balance,
                    entry_price: ticker.last,
                    risk_fraction: dec!(0.02),
                    kelly: None,
                    vix: self.vix_proxy(dec!(25)),
                    vix_threshold: dec!(25),
                    regime,
                    ml_confidence: None,
                    max_correlation_with_portfolio: Decimal::ZERO,
                    anomaly_action: crate::application::core::sizer::AnomalyAction::Continue,
                    daily_target_met: false,
                    broker_min_order_value: dec!(11),
                    quantity_decimals: 8,
                };

                if let Some(quantity) = PositionSizer::size(&sizing) {
                    match self.broker.can_place_order(symbol, quantity, ticker.last).await {
                        Ok(true) => {
                            if self.broker.place_market_order(symbol, OrderSide::Buy, quantity).await.is_ok() {
                                orders_placed += 1;
                            }
                        }
                        Ok(false) => {}
                        Err(e) => error!(%symbol, error = %e, "can_place_order failed"),
                    }
                }
            }
        }

        orders_placed += self.run_grid_tick(now).await?;

        Ok(orders_placed)
    }

    /// §4.10 GridOrderEngine tick.
    async fn run_grid_tick(&mut self, now: chrono::DateTime<Utc>) -> anyhow::Result<usize> {
        let grid = &self.config.grid;

        for key in GridOrderEngine::stale_order_keys(&self.pending_grid_orders, grid, now) {
            if let Some(order) = self.pending_grid_orders.remove(&key) {
                let _ = self.broker.cancel_order(&order.symbol, &order.key).await;
            }
        }

        let trade_balance = self.broker.get_trade_balance().await?;
        let grid_size = GridOrderEngine::grid_size(trade_balance.free_margin, grid);

        if GridOrderEngine::should_abort(self.pending_grid_orders.len(), trade_balance.free_margin, grid) {
            return Ok(0);
        }

        let mut candidates = Vec::new();
        for symbol in &self.watchlist {
            let Ok(ticker) = self.broker.get_ticker(symbol).await else { continue };
            let stats = VolatilityStats::from_ticker(ticker.high24, ticker.low24, ticker.last, now.timestamp());
            let range = ticker.high24 - ticker.low24;
            let range_position = if range > Decimal::ZERO { (ticker.last - ticker.low24) / range } else { dec!(0.5) };
            let day_change_pct = if ticker.open > Decimal::ZERO { (ticker.last - ticker.open) / ticker.open } else { Decimal::ZERO };

            candidates.push((
                GridCandidate {
                    symbol: symbol.clone(),
                    price: ticker.last,
                    asset_minimum: dec!(11),
                    rsi: dec!(50),
                    range_position,
                    day_change_pct,
                    performance: self.performance.get(symbol).copied(),
                },
                stats,
            ));
        }

        let candidate_list: Vec<GridCandidate> = candidates.iter().map(|(c, _)| c.clone()).collect();
        let Some((best, _score)) = GridOrderEngine::pick_best(&candidate_list, grid_size, grid, dec!(70), dec!(30)) else {
            return Ok(0);
        };

        let stats = candidates.iter().find(|(c, _)| c.symbol == best.symbol).map(|(_, s)| *s);
        let tier = stats
            .map(|s| volatility_tier(&s, dec!(0.05), dec!(0.10)))
            .unwrap_or(VolatilityTier::Normal);
        let oversold = best.rsi < dec!(30);

        let ladder = GridOrderEngine::build_ladder(&best.symbol, best.price, grid_size, tier, oversold, grid, now);

        let mut placed = 0;
        for order in ladder {
            match self.broker.can_place_order(&order.symbol, order.size_usd / order.price, order.price).await {
                Ok(true) => {
                    if self
                        .broker
                        .place_limit_order(&order.symbol, OrderSide::Buy, order.size_usd / order.price, order.price)
                        .await
                        .is_ok()
                    {
                        self.pending_grid_orders.insert(order.key.clone(), order);
                        placed += 1;
                    }
                }
                _ => continue,
            }
        }

        Ok(placed)
    }

    fn in_low_liquidity_window(now: chrono::DateTime<Utc>) -> bool {
        use chrono::Timelike;
        let hour = now.hour();
        (2..6).contains(&hour)
    }

    /// Same composite definition as `ProfileRunner::health_score` (§4.9
    /// rule 8); kept duplicated rather than shared since the two loops'
    /// structs don't share a common indicator-owning base type.
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
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dynamic_cap_scales_with_equity() {
        assert_eq!(dynamic_max_positions(dec!(1000), dec!(50), 1, 10), 10 - 4); // floor(800/50)=16 clamps to max
    }

    #[test]
    fn dynamic_cap_respects_floor() {
        assert_eq!(dynamic_max_positions(dec!(10), dec!(50), 2, 10), 2);
    }

    #[test]
    fn reconstruct_from_weighted_buys_when_available() {
        let buys = vec![(dec!(100), dec!(1)), (dec!(110), dec!(1))];
        let (price, unreliable) = CryptoLoop::reconstruct_entry_price(&buys, Some(dec!(90)), dec!(120));
        assert_eq!(price, dec!(105));
        assert!(!unreliable);
    }

    #[test]
    fn reconstruct_falls_back_to_todays_open() {
        let (price, unreliable) = CryptoLoop::reconstruct_entry_price(&[], Some(dec!(95)), dec!(120));
        assert_eq!(price, dec!(95));
        assert!(!unreliable);
    }

    #[test]
    fn reconstruct_falls_back_to_current_price_and_flags_unreliable() {
        let (price, unreliable) = CryptoLoop::reconstruct_entry_price(&[], None, dec!(120));
        assert_eq!(price, dec!(120));
        assert!(unreliable);
    }

    #[test]
    fn volatility_tier_classifies_by_daily_vol() {
        let low = VolatilityStats { daily_vol: dec!(0.01), high: dec!(101), low: dec!(99), updated: 0 };
        let high = VolatilityStats { daily_vol: dec!(0.15), high: dec!(115), low: dec!(85), updated: 0 };
        assert_eq!(volatility_tier(&low, dec!(0.05), dec!(0.10)), VolatilityTier::Normal);
        assert_eq!(volatility_tier(&high, dec!(0.05), dec!(0.10)), VolatilityTier::High);
    }
}
