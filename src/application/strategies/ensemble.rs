use super::traits::{AnalysisContext, Signal, TradingStrategy};
use std::sync::Arc;

/// Ensemble Strategy
///
/// Combines multiple trading strategies and requires consensus for signals.
/// - Analyzes using all child strategies
/// - Only generates signal if voting threshold is met
/// - Confidence is averaged from agreeing strategies
#[derive(Clone)]
pub struct EnsembleStrategy {
    strategies: Vec<Arc<dyn TradingStrategy>>,
    voting_threshold: f64, // 0.0 to 1.0 - percentage of strategies that must agree
}

impl EnsembleStrategy {
    pub fn new(strategies: Vec<Arc<dyn TradingStrategy>>, voting_threshold: f64) -> Self {
        Self {
            strategies,
            voting_threshold: voting_threshold.clamp(0.0, 1.0),
        }
    }

    /// Create an ensemble with majority voting (>50% must agree)
    pub fn majority(strategies: Vec<Arc<dyn TradingStrategy>>) -> Self {
        Self::new(strategies, 0.5)
    }

    /// Create an ensemble requiring unanimous agreement
    pub fn unanimous(strategies: Vec<Arc<dyn TradingStrategy>>) -> Self {
        Self::new(strategies, 1.0)
    }

    /// Create a default ensemble with common strategies
    pub fn default_ensemble() -> Self {
        use super::{
            AdvancedTripleFilterConfig, AdvancedTripleFilterStrategy, DualSMAStrategy,
            MeanReversionStrategy,
        };

        let strategies: Vec<Arc<dyn TradingStrategy>> = vec![
            Arc::new(DualSMAStrategy::new(20, 60, 0.001)),
            Arc::new(AdvancedTripleFilterStrategy::new(
                AdvancedTripleFilterConfig {
                    fast_period: 20,
                    slow_period: 60,
                    sma_threshold: 0.001,
                    trend_sma_period: 50,
                    rsi_threshold: 75.0,
                    signal_confirmation_bars: 1,
                    macd_requires_rising: true,
                    trend_tolerance_pct: 0.0,
                    macd_min_threshold: 0.0,
                    adx_threshold: 25.0,
                },
            )),
            Arc::new(MeanReversionStrategy::new(20, 50.0)),
        ];

        Self::majority(strategies)
    }
}

impl TradingStrategy for EnsembleStrategy {
    fn analyze(&self, ctx: &AnalysisContext) -> Option<Signal> {
        if self.strategies.is_empty() {
            return None;
        }

        let mut buy_votes = 0;
        let mut sell_votes = 0;
        let mut buy_confidence_sum = 0.0;
        let mut sell_confidence_sum = 0.0;
        let mut buy_reasons = Vec::new();
        let mut sell_reasons = Vec::new();

        for strategy in &self.strategies {
            if let Some(signal) = strategy.analyze(ctx) {
                match signal.side {
                    crate::domain::trading::types::OrderSide::Buy => {
                        buy_votes += 1;
                        buy_confidence_sum += signal.confidence;
                        buy_reasons.push(format!("{}: {}", strategy.name(), signal.reason));
                    }
                    crate::domain::trading::types::OrderSide::Sell => {
                        sell_votes += 1;
                        sell_confidence_sum += signal.confidence;
                        sell_reasons.push(format!("{}: {}", strategy.name(), signal.reason));
                    }
                }
            }
        }

        let total_strategies = self.strategies.len();
        let required_votes = (total_strategies as f64 * self.voting_threshold).ceil() as usize;

        // Check for buy consensus
        if buy_votes >= required_votes && buy_votes > 0 {
            let avg_confidence = buy_confidence_sum / buy_votes as f64;
            return Some(
                Signal::buy(format!(
                    "Ensemble ({}/{} agree): {}",
                    buy_votes,
                    total_strategies,
                    buy_reasons.join("; ")
                ))
                .with_confidence(avg_confidence),
            );
        }

        // Check for sell consensus
        if sell_votes >= required_votes && sell_votes > 0 {
            let avg_confidence = sell_confidence_sum / sell_votes as f64;
            return Some(
                Signal::sell(format!(
                    "Ensemble ({}/{} agree): {}",
                    sell_votes,
                    total_strategies,
                    sell_reasons.join("; ")
                ))
                .with_confidence(avg_confidence),
            );
        }

        None
    }

    fn name(&self) -> &str {
        "Ensemble"
    }
}

// Implement Debug manually since Arc<dyn TradingStrategy> doesn't impl Debug
impl std::fmt::Debug for EnsembleStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnsembleStrategy")
            .field("num_strategies", &self.strategies.len())
            .field("voting_threshold", &self.voting_threshold)
            .finish()
    }
}
