//! Profile roster loading (§4.1/§6), grounded in the env-var parsing style
//! `config/broker_config.rs` and `CoreConfig::from_env` already use - comma
//! separated symbol lists with a hardcoded fallback rather than a config
//! file format this core doesn't otherwise need.

use crate::domain::market::strategy_config::StrategyMode;
use crate::domain::trading::types::{Profile, ProfileRole};
use rust_decimal_macros::dec;
use std::env;

fn symbols_from_env(var: &str, default: &[&str]) -> Vec<String> {
    match env::var(var) {
        Ok(v) if !v.trim().is_empty() => v.split(',').map(|s| s.trim().to_string()).collect(),
        _ => default.iter().map(|s| s.to_string()).collect(),
    }
}

/// One MAIN profile plus zero or more satellite profiles, split by
/// `PROFILE_SATELLITES` (`"1"`/`"2"`, default `"1"`). Only MAIN is allowed
/// the EOD flatten and trimming orders (§4.1's `ProfileRole`).
pub fn load_profiles() -> Vec<Profile> {
    let satellite_count: usize = env::var("PROFILE_SATELLITES")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(1);

    let mut profiles = vec![Profile {
        id: "main".to_string(),
        role: ProfileRole::Main,
        capital_fraction: dec!(0.6),
        take_profit_pct: dec!(0.03),
        stop_loss_pct: dec!(0.02),
        trailing_pct: dec!(0.01),
        bullish_symbols: symbols_from_env("PROFILE_MAIN_BULLISH", &["AAPL", "MSFT", "NVDA"]),
        bearish_symbols: symbols_from_env("PROFILE_MAIN_BEARISH", &[]),
        vix_threshold: dec!(25),
        vix_hysteresis: dec!(2),
        strategy_class: StrategyMode::Momentum,
        min_hold: 60,
        max_hold: 7 * 24 * 3600,
    }];

    if satellite_count >= 1 {
        profiles.push(Profile {
            id: "satellite-trend".to_string(),
            role: ProfileRole::Satellite,
            capital_fraction: dec!(0.25),
            take_profit_pct: dec!(0.05),
            stop_loss_pct: dec!(0.025),
            trailing_pct: dec!(0.015),
            bullish_symbols: symbols_from_env("PROFILE_SAT1_BULLISH", &["QQQ", "SPY"]),
            bearish_symbols: symbols_from_env("PROFILE_SAT1_BEARISH", &[]),
            vix_threshold: dec!(28),
            vix_hysteresis: dec!(2),
            strategy_class: StrategyMode::TrendRiding,
            min_hold: 300,
            max_hold: 14 * 24 * 3600,
        });
    }

    if satellite_count >= 2 {
        profiles.push(Profile {
            id: "satellite-meanrev".to_string(),
            role: ProfileRole::Satellite,
            capital_fraction: dec!(0.15),
            take_profit_pct: dec!(0.02),
            stop_loss_pct: dec!(0.015),
            trailing_pct: dec!(0.008),
            bullish_symbols: symbols_from_env("PROFILE_SAT2_BULLISH", &["IWM"]),
            bearish_symbols: symbols_from_env("PROFILE_SAT2_BEARISH", &[]),
            vix_threshold: dec!(22),
            vix_hysteresis: dec!(1.5),
            strategy_class: StrategyMode::MeanReversion,
            min_hold: 120,
            max_hold: 3 * 24 * 3600,
        });
    }

    profiles
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn always_produces_exactly_one_main_profile() {
        let profiles = load_profiles();
        assert_eq!(profiles.iter().filter(|p| p.role == ProfileRole::Main).count(), 1);
    }

    #[test]
    fn default_satellite_count_is_one() {
        let profiles = load_profiles();
        assert_eq!(profiles.len(), 2);
    }
}
