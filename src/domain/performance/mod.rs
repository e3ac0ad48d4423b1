// Performance tracking domain
pub mod calculator;
pub mod metrics;
pub mod monte_carlo;
pub mod performance_evaluator;
pub mod performance_snapshot;
