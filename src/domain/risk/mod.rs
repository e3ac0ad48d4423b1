// Risk management domain
pub mod filters;
pub mod optimal_parameters;
pub mod risk_appetite;
pub mod risk_config;
pub mod state;
pub mod volatility_manager;
