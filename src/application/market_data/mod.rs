// Market data processing modules
pub mod candle_aggregator;
pub mod signal_generator;
pub mod spread_cache;
pub mod statistical_features; // NEW: Advanced statistical features
pub mod timeframe_aggregator;
