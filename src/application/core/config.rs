//! Tunables for the multi-profile scheduler, the crypto loop, and their
//! shared safety core (§6 of the spec: grid size, VIX hysteresis, trailing
//! take-profit, cooldowns, low-liquidity windows, per-feature enable flags).
//!
//! This is a sibling of [`crate::config::Config`], not a replacement: the
//! teacher's `Config` owns broker/strategy/risk env wiring; `CoreConfig`
//! owns the knobs this spec's L2/L3 layer adds on top, loaded the same way
//! (`from_env`, `anyhow::Result`, sensible defaults when a var is absent).

use anyhow::Result;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::env;
use std::str::FromStr;

fn env_decimal(key: &str, default: Decimal) -> Decimal {
    env::var(key)
        .ok()
        .and_then(|v| Decimal::from_str(&v).ok())
        .unwrap_or(default)
}

fn env_u32(key: &str, default: u32) -> u32 {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_u64(key: &str, default: u64) -> u64 {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_usize(key: &str, default: usize) -> usize {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_bool(key: &str, default: bool) -> bool {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Multi-level grid ladder offsets and weights (§4.10 step 6).
#[derive(Debug, Clone)]
pub struct GridLevel {
    pub offset_pct: Decimal,
    pub weight: Decimal,
}

#[derive(Debug, Clone)]
pub struct GridConfig {
    pub min_size_usd: Decimal,
    pub max_size_usd: Decimal,
    pub cash_ratio: Decimal,
    pub max_open_grid_orders: usize,
    pub stale_order_minutes: i64,
    pub levels: Vec<GridLevel>,
    pub min_score: Decimal,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            min_size_usd: dec!(11),
            max_size_usd: dec!(500),
            cash_ratio: dec!(0.80),
            max_open_grid_orders: 3,
            stale_order_minutes: 15,
            levels: vec![
                GridLevel {
                    offset_pct: dec!(-0.003),
                    weight: dec!(0.3),
                },
                GridLevel {
                    offset_pct: dec!(-0.005),
                    weight: dec!(0.4),
                },
                GridLevel {
                    offset_pct: dec!(-0.010),
                    weight: dec!(0.3),
                },
            ],
            min_score: dec!(5),
        }
    }
}

impl GridConfig {
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            min_size_usd: env_decimal("GRID_MIN_SIZE_USD", default.min_size_usd),
            max_size_usd: env_decimal("GRID_MAX_SIZE_USD", default.max_size_usd),
            cash_ratio: env_decimal("GRID_CASH_RATIO", default.cash_ratio),
            max_open_grid_orders: env_usize(
                "GRID_MAX_OPEN_ORDERS",
                default.max_open_grid_orders,
            ),
            stale_order_minutes: env_u64("GRID_STALE_ORDER_MINUTES", 15) as i64,
            min_score: env_decimal("GRID_MIN_SCORE", default.min_score),
            ..default
        }
    }

    /// Oversold ladders shift weight to the deepest level (§4.10 step 6).
    pub fn oversold_levels(&self) -> Vec<GridLevel> {
        let mut levels = self.levels.clone();
        if let Some(last) = levels.last_mut() {
            last.weight += dec!(0.15);
        }
        if let Some(first) = levels.first_mut() {
            first.weight -= dec!(0.15);
        }
        levels
    }
}

/// Trailing take-profit activation/trail/cap (§3 `TrailingTPState`).
#[derive(Debug, Clone, Copy)]
pub struct TrailingTpConfig {
    pub activation_pct: Decimal,
    pub trail_pct: Decimal,
    pub cap_pct: Decimal,
}

impl Default for TrailingTpConfig {
    fn default() -> Self {
        Self {
            activation_pct: dec!(0.005),
            trail_pct: dec!(0.003),
            cap_pct: dec!(0.02),
        }
    }
}

impl TrailingTpConfig {
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            activation_pct: env_decimal("TRAILING_TP_ACTIVATION_PCT", default.activation_pct),
            trail_pct: env_decimal("TRAILING_TP_TRAIL_PCT", default.trail_pct),
            cap_pct: env_decimal("TRAILING_TP_CAP_PCT", default.cap_pct),
        }
    }
}

/// Partial-exit ladder thresholds (§4.9 rule 3).
#[derive(Debug, Clone)]
pub struct PartialExitConfig {
    /// Ascending `(gain_pct, fraction_of_remaining)` pairs.
    pub thresholds: Vec<(Decimal, Decimal)>,
}

impl Default for PartialExitConfig {
    fn default() -> Self {
        Self {
            thresholds: vec![(dec!(0.006), dec!(0.25)), (dec!(0.010), dec!(0.33))],
        }
    }
}

/// VIX-based regime hysteresis (§4.5).
#[derive(Debug, Clone, Copy)]
pub struct VixConfig {
    pub threshold: Decimal,
    pub hysteresis: Decimal,
    pub extreme_threshold: Decimal,
}

impl Default for VixConfig {
    fn default() -> Self {
        Self {
            threshold: dec!(20),
            hysteresis: dec!(2),
            extreme_threshold: dec!(30),
        }
    }
}

impl VixConfig {
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            threshold: env_decimal("VIX_THRESHOLD", default.threshold),
            hysteresis: env_decimal("VIX_HYSTERESIS", default.hysteresis),
            extreme_threshold: env_decimal("VIX_EXTREME_THRESHOLD", default.extreme_threshold),
        }
    }
}

/// Feature enable flags listed explicitly in §6.
#[derive(Debug, Clone, Copy)]
pub struct FeatureFlags {
    pub regime_detection: bool,
    pub multi_timeframe: bool,
    pub ml_scoring: bool,
    pub adaptive_sizing: bool,
    pub trailing_targets: bool,
    pub time_decay_exit: bool,
    pub momentum_accel_exit: bool,
    pub health_score_exit: bool,
    pub volume_profile_filter: bool,
    pub portfolio_stop_loss: bool,
    pub pdt_protection: bool,
    pub max_loss_exit: bool,
    pub break_even: bool,
    pub avoid_first_15_min: bool,
    pub avoid_last_30_min: bool,
    pub daily_profit_target: bool,
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self {
            regime_detection: true,
            multi_timeframe: false,
            ml_scoring: false,
            adaptive_sizing: true,
            trailing_targets: true,
            time_decay_exit: true,
            momentum_accel_exit: false,
            health_score_exit: false,
            volume_profile_filter: false,
            portfolio_stop_loss: true,
            pdt_protection: true,
            max_loss_exit: true,
            break_even: true,
            avoid_first_15_min: true,
            avoid_last_30_min: false,
            daily_profit_target: false,
        }
    }
}

impl FeatureFlags {
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            regime_detection: env_bool("ENABLE_REGIME_DETECTION", d.regime_detection),
            multi_timeframe: env_bool("ENABLE_MULTI_TIMEFRAME", d.multi_timeframe),
            ml_scoring: env_bool("ENABLE_ML_SCORING", d.ml_scoring),
            adaptive_sizing: env_bool("ENABLE_ADAPTIVE_SIZING", d.adaptive_sizing),
            trailing_targets: env_bool("ENABLE_TRAILING_TARGETS", d.trailing_targets),
            time_decay_exit: env_bool("ENABLE_TIME_DECAY_EXIT", d.time_decay_exit),
            momentum_accel_exit: env_bool("ENABLE_MOMENTUM_ACCEL_EXIT", d.momentum_accel_exit),
            health_score_exit: env_bool("ENABLE_HEALTH_SCORE_EXIT", d.health_score_exit),
            volume_profile_filter: env_bool("ENABLE_VOLUME_PROFILE", d.volume_profile_filter),
            portfolio_stop_loss: env_bool("ENABLE_PORTFOLIO_STOP_LOSS", d.portfolio_stop_loss),
            pdt_protection: env_bool("ENABLE_PDT_PROTECTION", d.pdt_protection),
            max_loss_exit: env_bool("ENABLE_MAX_LOSS_EXIT", d.max_loss_exit),
            break_even: env_bool("ENABLE_BREAK_EVEN", d.break_even),
            avoid_first_15_min: env_bool("ENABLE_AVOID_FIRST_15_MIN", d.avoid_first_15_min),
            avoid_last_30_min: env_bool("ENABLE_AVOID_LAST_30_MIN", d.avoid_last_30_min),
            daily_profit_target: env_bool("ENABLE_DAILY_PROFIT_TARGET", d.daily_profit_target),
        }
    }
}

/// Top-level configuration for the L2/L3 core, composed alongside
/// `crate::config::Config`.
#[derive(Debug, Clone)]
pub struct CoreConfig {
    pub grid: GridConfig,
    pub trailing_tp: TrailingTpConfig,
    pub partial_exit: PartialExitConfig,
    pub vix: VixConfig,
    pub flags: FeatureFlags,

    pub max_positions: usize,
    pub spread_cap_pct: Decimal,
    pub stop_loss_cooldown_ms: i64,
    pub sell_cooldown_ms: i64,
    pub rsi_exit_min_profit_pct: Decimal,
    pub eod_exit_hour_et: u32,
    pub eod_exit_minute_et: u32,
    pub crypto_loop_interval_ms: u64,
    pub profile_cycle_interval_secs: u64,
    pub heartbeat_stale_secs: u64,

    /// Crypto `ExitParams` thresholds (§4.9), distinct from `Profile`'s
    /// equity stop/take-profit/trailing fields since crypto positions have
    /// no owning `Profile`.
    pub crypto_stop_loss_pct: Decimal,
    pub crypto_take_profit_pct: Decimal,
    pub crypto_trailing_pct: Decimal,
    pub crypto_max_hold_secs: i64,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            grid: GridConfig::default(),
            trailing_tp: TrailingTpConfig::default(),
            partial_exit: PartialExitConfig::default(),
            vix: VixConfig::default(),
            flags: FeatureFlags::default(),
            max_positions: 10,
            spread_cap_pct: dec!(0.003),
            stop_loss_cooldown_ms: 30 * 60 * 1000,
            sell_cooldown_ms: 5 * 60 * 1000,
            rsi_exit_min_profit_pct: dec!(0.004),
            eod_exit_hour_et: 15,
            eod_exit_minute_et: 30,
            crypto_loop_interval_ms: 500,
            profile_cycle_interval_secs: 10,
            heartbeat_stale_secs: 120,
            crypto_stop_loss_pct: dec!(0.02),
            crypto_take_profit_pct: dec!(0.03),
            crypto_trailing_pct: dec!(0.01),
            crypto_max_hold_secs: 7 * 24 * 3600,
        }
    }
}

impl CoreConfig {
    pub fn from_env() -> Result<Self> {
        let default = Self::default();
        Ok(Self {
            grid: GridConfig::from_env(),
            trailing_tp: TrailingTpConfig::from_env(),
            partial_exit: PartialExitConfig::default(),
            vix: VixConfig::from_env(),
            flags: FeatureFlags::from_env(),
            max_positions: env_usize("CORE_MAX_POSITIONS", default.max_positions),
            spread_cap_pct: env_decimal("SPREAD_CAP_PCT", default.spread_cap_pct),
            stop_loss_cooldown_ms: env_u64(
                "STOP_LOSS_COOLDOWN_MS",
                default.stop_loss_cooldown_ms as u64,
            ) as i64,
            sell_cooldown_ms: env_u64("SELL_COOLDOWN_MS", default.sell_cooldown_ms as u64) as i64,
            rsi_exit_min_profit_pct: env_decimal(
                "RSI_EXIT_MIN_PROFIT_PCT",
                default.rsi_exit_min_profit_pct,
            ),
            eod_exit_hour_et: env_u32("EOD_EXIT_HOUR_ET", default.eod_exit_hour_et),
            eod_exit_minute_et: env_u32("EOD_EXIT_MINUTE_ET", default.eod_exit_minute_et),
            crypto_loop_interval_ms: env_u64(
                "CRYPTO_LOOP_INTERVAL_MS",
                default.crypto_loop_interval_ms,
            ),
            profile_cycle_interval_secs: env_u64(
                "PROFILE_CYCLE_INTERVAL_SECS",
                default.profile_cycle_interval_secs,
            ),
            heartbeat_stale_secs: env_u64("HEARTBEAT_STALE_SECS", default.heartbeat_stale_secs),
            crypto_stop_loss_pct: env_decimal("CRYPTO_STOP_LOSS_PCT", default.crypto_stop_loss_pct),
            crypto_take_profit_pct: env_decimal("CRYPTO_TAKE_PROFIT_PCT", default.crypto_take_profit_pct),
            crypto_trailing_pct: env_decimal("CRYPTO_TRAILING_PCT", default.crypto_trailing_pct),
            crypto_max_hold_secs: env_u64("CRYPTO_MAX_HOLD_SECS", default.crypto_max_hold_secs as u64) as i64,
        })
    }
}
