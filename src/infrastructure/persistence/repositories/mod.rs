pub mod optimization_history_repository;
pub mod order_candle_repository;
pub mod performance_snapshot_repository;
pub mod reoptimization_trigger_repository;
pub mod risk_state_repository;
pub mod strategy_repository;

pub use optimization_history_repository::SqliteOptimizationHistoryRepository;
pub use order_candle_repository::{SqliteCandleRepository, SqliteOrderRepository};
pub use performance_snapshot_repository::SqlitePerformanceSnapshotRepository;
pub use reoptimization_trigger_repository::SqliteReoptimizationTriggerRepository;
pub use risk_state_repository::SqliteRiskStateRepository;
pub use strategy_repository::SqliteStrategyRepository;
