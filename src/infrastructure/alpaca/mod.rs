pub mod broker;
pub mod common;
pub mod execution;
pub mod market_data;
pub mod trading_stream;
pub mod websocket;

pub use broker::AlpacaBroker;
pub use common::AlpacaBar;
pub use execution::AlpacaExecutionService;
pub use market_data::{
    AlpacaMarketDataService, AlpacaMarketDataServiceBuilder, AlpacaSectorProvider,
};
pub use trading_stream::AlpacaTradingStream;
pub use websocket::AlpacaWebSocketManager;
