pub mod alpaca;
pub mod binance;
pub mod core;
pub mod mock;
pub mod repositories;

pub use event_bus::EventBus;
pub use repositories::{InMemoryPortfolioRepository, InMemoryTradeRepository};
pub mod event_bus;
pub mod persistence;
pub mod observability;
pub mod optimal_parameters_persistence;
pub mod simulation;
