//! Rustrade Server - Headless trading system
//!
//! Runs the regime-driven trading core: a `Supervisor` overseeing one
//! `ProfileRunner` per configured profile plus one dedicated `CryptoLoop`,
//! each its own cooperative tokio task. Metrics are pushed via structured
//! JSON logs to stdout - no HTTP server, no incoming connections.
//!
//! # Environment Variables
//! - `MODE` - `alpaca` drives the equity `ProfileRunner`s, `binance` drives
//!   `CryptoLoop`; both run when their respective API keys are present.
//! - `OBSERVABILITY_ENABLED` - Enable metrics reporting (default: true)
//! - `OBSERVABILITY_INTERVAL` - Interval in seconds between metric outputs (default: 60)
//! - `CRYPTO_WATCHLIST` - comma separated crypto pairs for `CryptoLoop` (default: BTC/USD,ETH/USD)

use anyhow::Result;
use rustrade::application::core::config::CoreConfig;
use rustrade::application::core::crypto_loop::CryptoLoop;
use rustrade::application::core::emergency::EmergencyProtocol;
use rustrade::application::core::heartbeat::default_heartbeat_monitor;
use rustrade::application::core::profile_runner::ProfileRunner;
use rustrade::application::core::profiles::load_profiles;
use rustrade::application::core::supervisor::{Supervisor, SupervisorCommand};
use rustrade::config::{AlpacaConfig, BinanceConfig};
use rustrade::domain::ports::{BrokerCrypto, BrokerEquity};
use rustrade::infrastructure::alpaca::AlpacaBroker;
use rustrade::infrastructure::binance::BinanceBroker;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{Level, error, info, warn};
use tracing_subscriber::prelude::*;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let stdout_layer = tracing_subscriber::fmt::layer().with_target(false).pretty();
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with(stdout_layer)
        .init();

    info!("Rustrade Server {} starting...", env!("CARGO_PKG_VERSION"));

    let config = Arc::new(CoreConfig::from_env()?);
    let heartbeat = Arc::new(default_heartbeat_monitor());
    let emergency = Arc::new(EmergencyProtocol::new());
    let supervisor = Arc::new(Supervisor::new(emergency, heartbeat.clone()));

    let alpaca_cfg = AlpacaConfig::from_env();
    let equity_broker: Arc<dyn BrokerEquity> = Arc::new(AlpacaBroker::new(
        alpaca_cfg.api_key.clone(),
        alpaca_cfg.secret_key.clone(),
        alpaca_cfg.base_url.clone(),
        alpaca_cfg.data_url.clone(),
    ));

    let binance_cfg = BinanceConfig::from_env();
    let crypto_broker: Arc<dyn BrokerCrypto> = Arc::new(BinanceBroker::new(
        binance_cfg.api_key.clone(),
        binance_cfg.secret_key.clone(),
        binance_cfg.base_url.clone(),
    ));

    supervisor.dispatch(SupervisorCommand::Start, equity_broker.delegate(), vec![], crypto_broker.delegate(), vec![]).await?;

    let profiles = load_profiles();
    info!("Loaded {} profile(s)", profiles.len());

    let mut handles = Vec::new();
    for profile in profiles {
        let broker = equity_broker.clone();
        let heartbeat = heartbeat.clone();
        let config = config.clone();
        let supervisor = supervisor.clone();
        let interval = std::time::Duration::from_secs(config.profile_cycle_interval_secs);
        handles.push(tokio::spawn(async move {
            let mut runner = ProfileRunner::new(profile, broker, heartbeat, config);
            loop {
                if supervisor.state() == rustrade::application::core::supervisor::RunState::Stopped {
                    break;
                }
                if !supervisor.is_paused() {
                    let symbols = runner.profile.all_symbols();
                    let mut prices = HashMap::new();
                    for symbol in &symbols {
                        if let Ok(bar) = runner.broker.get_latest_bar(symbol).await {
                            prices.insert(symbol.clone(), bar.close);
                        }
                    }
                    if let Err(e) = runner.run_cycle(&prices).await {
                        error!(profile = %runner.profile.id, error = %e, "profile cycle failed");
                    }
                }
                tokio::time::sleep(interval).await;
            }
        }));
    }

    {
        let broker = crypto_broker.clone();
        let heartbeat = heartbeat.clone();
        let config = config.clone();
        let supervisor = supervisor.clone();
        let watchlist = std::env::var("CRYPTO_WATCHLIST")
            .unwrap_or_else(|_| "BTC/USD,ETH/USD".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .collect::<Vec<_>>();
        let interval = std::time::Duration::from_millis(config.crypto_loop_interval_ms);
        handles.push(tokio::spawn(async move {
            let mut crypto_loop = CryptoLoop::new(broker, watchlist, heartbeat, config);
            loop {
                if supervisor.state() == rustrade::application::core::supervisor::RunState::Stopped {
                    break;
                }
                if !supervisor.is_paused()
                    && let Err(e) = crypto_loop.run_cycle().await
                {
                    error!(error = %e, "crypto loop cycle failed");
                }
                tokio::time::sleep(interval).await;
            }
        }));
    }

    if std::env::var("OBSERVABILITY_ENABLED").map(|v| v != "false").unwrap_or(true) {
        info!("Observability: structured tracing only (portfolio metrics reporter retired with the legacy Application)");
    }

    info!("Server running. Press Ctrl+C to shutdown.");
    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received, stopping engine...");

    supervisor.dispatch(SupervisorCommand::Stop, equity_broker.delegate(), vec![], crypto_broker.delegate(), vec![]).await?;
    for handle in handles {
        handle.abort();
    }
    warn!("Rustrade Server exiting.");

    Ok(())
}
