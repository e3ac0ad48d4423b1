//! EntryFilterPipeline (L2, §4.7).
//!
//! An ordered chain of pure filters, each yielding `Pass | Skip(reason) |
//! Halt(reason)`, grounded in the teacher's
//! `domain::risk::filters::{RiskValidator, ValidationContext, ValidationResult}`
//! pipeline pattern (priority-ordered async validators over a shared
//! context). This pipeline is simpler and synchronous - every input is
//! already resolved by the caller before the tick runs - so filters are
//! plain functions over `FilterContext` rather than an async trait object
//! registry; the ordering discipline and three-way result are kept intact.

use crate::application::core::cooldown::{Cooldown, CooldownReason};
use crate::application::core::regime::Regime;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

#[derive(Debug, Clone, PartialEq)]
pub enum FilterOutcome {
    Pass,
    Skip(String),
    Halt(String),
}

impl FilterOutcome {
    pub fn is_pass(&self) -> bool {
        matches!(self, FilterOutcome::Pass)
    }
}

/// Anomaly detector's recommended action (§4.7 step 8).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnomalyAction {
    Continue,
    TightenStops,
    ReduceSize,
    Halt,
}

/// Everything the pipeline needs to evaluate one candidate entry. Built
/// fresh per symbol per cycle by the `ProfileRunner`/`CryptoLoop`.
pub struct FilterContext<'a> {
    pub symbol: &'a str,
    pub now: DateTime<Utc>,
    pub cooldown: &'a Cooldown,

    pub open_position_count: usize,
    pub max_positions: usize,

    /// Sign of recent sentiment for this symbol, compared against the
    /// profile's bullish/bearish bias.
    pub sentiment_sign: i8,
    pub profile_bias: i8,

    pub market_breadth_healthy: bool,

    pub ml_entry_score: Option<Decimal>,
    pub ml_entry_threshold: Decimal,

    /// `None` when no volume-profile support level was computed.
    pub volume_profile_near_support: Option<bool>,
    pub strict_volume_profile: bool,

    pub ml_win_probability: Option<Decimal>,
    pub win_rate_threshold: Decimal,

    pub anomaly_action: AnomalyAction,

    pub regime: Regime,
    pub trend_conditions_ok: bool,

    pub same_group_holdings: usize,
    pub correlation_group_cap: usize,

    pub total_equity: Decimal,
    pub projected_symbol_exposure_pct: Decimal,
    pub projected_group_exposure_pct: Decimal,

    pub spread_pct: Decimal,
    pub spread_cap_pct: Decimal,

    pub in_low_liquidity_window: bool,

    pub volume_spike: bool,
    pub oversold: bool,
}

pub struct EntryFilterPipeline;

impl EntryFilterPipeline {
    /// Run the full 14-step chain in spec order, short-circuiting on the
    /// first non-`Pass`. Returns `Pass` only when every step passes.
    pub fn run(ctx: &FilterContext) -> FilterOutcome {
        for step in Self::steps() {
            let outcome = step(ctx);
            if !outcome.is_pass() {
                return outcome;
            }
        }
        FilterOutcome::Pass
    }

    fn steps() -> [fn(&FilterContext) -> FilterOutcome; 14] {
        [
            Self::cooldown,
            Self::position_cap,
            Self::sentiment,
            Self::breadth,
            Self::ml_entry_score,
            Self::volume_profile_proximity,
            Self::ml_win_probability,
            Self::anomaly_detector,
            Self::trend_conditions,
            Self::correlation,
            Self::concentration,
            Self::spread,
            Self::time_of_day,
            Self::volume_spike,
        ]
    }

    fn cooldown(ctx: &FilterContext) -> FilterOutcome {
        if ctx.cooldown.is_active_any(ctx.symbol, ctx.now) {
            FilterOutcome::Skip("symbol in cooldown".into())
        } else {
            FilterOutcome::Pass
        }
    }

    fn position_cap(ctx: &FilterContext) -> FilterOutcome {
        if ctx.open_position_count >= ctx.max_positions {
            FilterOutcome::Skip("max_positions reached".into())
        } else {
            FilterOutcome::Pass
        }
    }

    fn sentiment(ctx: &FilterContext) -> FilterOutcome {
        if ctx.profile_bias != 0 && ctx.sentiment_sign != 0 && ctx.sentiment_sign != ctx.profile_bias {
            FilterOutcome::Skip("sentiment opposes profile bias".into())
        } else {
            FilterOutcome::Pass
        }
    }

    fn breadth(ctx: &FilterContext) -> FilterOutcome {
        if ctx.market_breadth_healthy {
            FilterOutcome::Pass
        } else {
            FilterOutcome::Skip("market breadth unhealthy".into())
        }
    }

    fn ml_entry_score(ctx: &FilterContext) -> FilterOutcome {
        match ctx.ml_entry_score {
            Some(score) if score < ctx.ml_entry_threshold => {
                FilterOutcome::Skip("ML entry score below threshold".into())
            }
            _ => FilterOutcome::Pass,
        }
    }

    fn volume_profile_proximity(ctx: &FilterContext) -> FilterOutcome {
        match ctx.volume_profile_near_support {
            Some(false) if ctx.strict_volume_profile => {
                FilterOutcome::Skip("not near volume-profile support (strict mode)".into())
            }
            _ => FilterOutcome::Pass,
        }
    }

    fn ml_win_probability(ctx: &FilterContext) -> FilterOutcome {
        match ctx.ml_win_probability {
            Some(p) if p < ctx.win_rate_threshold => {
                FilterOutcome::Skip("ML win-probability below configured win rate".into())
            }
            _ => FilterOutcome::Pass,
        }
    }

    fn anomaly_detector(ctx: &FilterContext) -> FilterOutcome {
        match ctx.anomaly_action {
            AnomalyAction::Halt => FilterOutcome::Halt("anomaly detector: HALT".into()),
            AnomalyAction::Continue | AnomalyAction::TightenStops | AnomalyAction::ReduceSize => {
                FilterOutcome::Pass
            }
        }
    }

    fn trend_conditions(ctx: &FilterContext) -> FilterOutcome {
        if ctx.trend_conditions_ok {
            FilterOutcome::Pass
        } else {
            FilterOutcome::Skip(format!("trend conditions not met for regime {}", ctx.regime))
        }
    }

    fn correlation(ctx: &FilterContext) -> FilterOutcome {
        if ctx.same_group_holdings >= ctx.correlation_group_cap {
            FilterOutcome::Skip("correlation group cap reached".into())
        } else {
            FilterOutcome::Pass
        }
    }

    fn concentration(ctx: &FilterContext) -> FilterOutcome {
        use rust_decimal_macros::dec;
        if ctx.total_equity < dec!(500) {
            return FilterOutcome::Pass; // skipped below $500 total equity
        }
        if ctx.projected_symbol_exposure_pct > dec!(0.40) {
            return FilterOutcome::Skip("would exceed 40% single-symbol concentration".into());
        }
        if ctx.projected_group_exposure_pct > dec!(0.60) {
            return FilterOutcome::Skip("would exceed 60% group concentration".into());
        }
        FilterOutcome::Pass
    }

    fn spread(ctx: &FilterContext) -> FilterOutcome {
        if ctx.spread_pct >= ctx.spread_cap_pct {
            FilterOutcome::Skip(format!("spread {} exceeds cap {}", ctx.spread_pct, ctx.spread_cap_pct))
        } else {
            FilterOutcome::Pass
        }
    }

    fn time_of_day(ctx: &FilterContext) -> FilterOutcome {
        if ctx.in_low_liquidity_window {
            FilterOutcome::Skip("low-liquidity time window".into())
        } else {
            FilterOutcome::Pass
        }
    }

    fn volume_spike(ctx: &FilterContext) -> FilterOutcome {
        if ctx.volume_spike && !ctx.oversold {
            FilterOutcome::Skip("volume spike without oversold condition".into())
        } else {
            FilterOutcome::Pass
        }
    }
}
