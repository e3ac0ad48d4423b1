pub mod broker;
pub mod common;
pub mod execution;
pub mod market_data;
pub mod sector_provider;
pub mod websocket;

pub use broker::BinanceBroker;
pub use execution::BinanceExecutionService;
pub use market_data::{BinanceMarketDataService, BinanceMarketDataServiceBuilder};
pub use sector_provider::BinanceSectorProvider;
pub use websocket::BinanceWebSocketManager;
