mod statistical_momentum;
mod zscore_mean_reversion;

pub use statistical_momentum::StatisticalMomentumStrategy;
pub use zscore_mean_reversion::ZScoreMeanReversionStrategy;

// Re-export traits for convenience
pub use super::traits::{AnalysisContext, Signal, TradingStrategy};
