use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};

/// Risk profile classification based on appetite score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskProfile {
    /// Conservative approach: Capital preservation (scores 1-3)
    Conservative,
    /// Balanced approach: Moderate risk/return (scores 4-7)
    Balanced,
    /// Aggressive approach: High risk/return (scores 8-10)
    Aggressive,
}

/// Value object representing user's risk appetite on a scale of 1-10
///
/// This domain object encapsulates the risk tolerance and provides
/// calculated trading parameters based on the risk profile.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RiskAppetite {
    score: u8,
}

impl RiskAppetite {
    /// Creates a new RiskAppetite with validation
    ///
    /// # Arguments
    /// * `score` - Risk appetite score between 1 and 10 (inclusive)
    ///
    /// # Returns
    /// * `Ok(RiskAppetite)` if score is valid
    /// * `Err` if score is outside valid range
    pub fn new(score: u8) -> Result<Self> {
        if !(1..=9).contains(&score) {
            bail!(
                "Risk appetite score must be between 1 and 9, got: {}",
                score
            );
        }
        Ok(Self { score })
    }

    /// Returns the raw score value
    pub fn score(&self) -> u8 {
        self.score
    }

    /// Classifies the risk appetite into a profile
    pub fn profile(&self) -> RiskProfile {
        match self.score {
            1..=3 => RiskProfile::Conservative,
            4..=6 => RiskProfile::Balanced, // Center 5
            7..=9 => RiskProfile::Aggressive,
            _ => unreachable!("Score validated in constructor"),
        }
    }

    /// Calculates the risk per trade percentage based on appetite
    ///
    /// Returns a value between 0.02 (2%) for score 1 and 0.10 (10%) for score 10
    /// Uses continuous linear interpolation for smooth progression
    pub fn calculate_risk_per_trade_percent(&self) -> f64 {
        // Rescaled for extreme safety (0.5%) to extreme risk (20%)
        Self::interpolate(self.score, 1, 9, 0.005, 0.20)
    }

    /// Calculates the trailing stop ATR multiplier based on appetite
    ///
    /// Returns a value between 2.0 (tight stops) for score 1 and 5.0 (loose stops) for score 9
    /// Uses continuous linear interpolation for smooth progression
    pub fn calculate_trailing_stop_multiplier(&self) -> f64 {
        Self::interpolate(self.score, 1, 9, 1.5, 8.0)
    }

    /// Calculates the RSI threshold for buy signals based on appetite
    ///
    /// Returns a value between 30 (wait for oversold) for score 1
    /// and 75 (follow momentum) for score 9
    /// Uses continuous linear interpolation for smooth progression
    pub fn calculate_rsi_threshold(&self) -> f64 {
        // Conservative still gets a reasonable ceiling (55) vs Aggressive (85)
        Self::interpolate(self.score, 1, 9, 55.0, 85.0)
    }

    /// Calculates the maximum position size as percentage of portfolio
    ///
    /// Returns a value between 0.05 (5%) for score 1 and 0.30 (30%) for score 9
    /// Uses continuous linear interpolation for smooth progression
    pub fn calculate_max_position_size_pct(&self) -> f64 {
        Self::interpolate(self.score, 1, 9, 0.05, 1.00)
    }

    /// Calculate minimum profit-to-cost ratio threshold
    /// Conservative traders require higher profit margins
    /// Aggressive traders accept lower margins for more opportunities
    pub fn calculate_min_profit_ratio(&self) -> f64 {
        // Inverse relationship: higher risk appetite = lower profit requirement
        // Score 1 (conservative): 2.0 (strict but achievable)
        // Score 9 (aggressive): 0.5 (permissive)
        Self::interpolate(self.score, 1, 9, 2.0, 0.5)
    }

    /// Determine if MACD histogram must be rising for buy signals
    /// Only extreme conservative traders (score 1-2) require rising momentum
    /// Others accept positive momentum even if not rising
    pub fn requires_macd_rising(&self) -> bool {
        // Score <= 2: require rising (very conservative)
        // Score >= 3: just positive is OK
        self.score <= 2
    }

    /// Calculate trend filter tolerance percentage
    /// Conservative traders require strict trend alignment
    /// Aggressive traders allow more deviation from trend
    pub fn calculate_trend_tolerance_pct(&self) -> f64 {
        // Score 1 (conservative): 0% tolerance (price must be > trend_sma)
        // Score 9 (aggressive): 15% tolerance (price > trend_sma * 0.85)
        Self::interpolate(self.score, 1, 9, 0.0, 0.15)
    }

    /// Calculate minimum MACD histogram threshold for buy signals
    /// Conservative traders require clearly positive momentum
    /// Aggressive traders accept near-neutral or slightly negative
    pub fn calculate_macd_min_threshold(&self) -> f64 {
        // Score 1 (conservative): +0.02 (clearly positive)
        // Score 9 (aggressive): -0.05 (negative OK)
        Self::interpolate(self.score, 1, 9, 0.02, -0.05)
    }

    /// Calculate profit target multiplier (Risk/Reward expectation)
    /// Conservative traders target modest gains (1.5x ATR)
    /// Aggressive traders target larger swings (3.0x ATR)
    pub fn calculate_profit_target_multiplier(&self) -> f64 {
        // Score 1: 1.5x ATR
        // Score 9: 10.0x ATR
        Self::interpolate(self.score, 1, 9, 1.5, 10.0)
    }

    /// Calculate signal sensitivity factor for entry signal thresholds
    /// Conservative traders need MORE SENSITIVE signals (lower thresholds) to generate trades
    /// Aggressive traders can use standard thresholds
    ///
    /// Returns a multiplier applied to signal thresholds:
    /// - Score 1-3 (Conservative): 0.5 to 0.7 (50-70% of normal threshold = more sensitive)
    /// - Score 4-6 (Balanced): 0.7 to 0.9 (70-90% of normal threshold)
    /// - Score 7-9 (Aggressive): 0.9 to 1.0 (near-normal thresholds)
    pub fn calculate_signal_sensitivity_factor(&self) -> f64 {
        // Inverse relationship: lower risk = lower thresholds = more signals
        Self::interpolate(self.score, 1, 9, 0.5, 1.0)
    }

    /// Calculate Maximum Daily Loss Percentage
    /// Conservative: 1% (0.01)
    /// Aggressive: 5% (0.05)
    pub fn calculate_max_daily_loss_pct(&self) -> f64 {
        Self::interpolate(self.score, 1, 9, 0.01, 0.05)
    }

    /// Calculate Maximum Drawdown Percentage
    /// Conservative: 3% (0.03)
    /// Aggressive: 15% (0.15)
    pub fn calculate_max_drawdown_pct(&self) -> f64 {
        Self::interpolate(self.score, 1, 9, 0.03, 0.15)
    }

    /// Linear interpolation helper
    ///
    /// Maps a score within [score_min, score_max] to a value within [value_min, value_max]
    fn interpolate(score: u8, score_min: u8, score_max: u8, value_min: f64, value_max: f64) -> f64 {
        let score_range = (score_max - score_min) as f64;
        let score_offset = (score - score_min) as f64;
        let ratio = score_offset / score_range;
        value_min + ratio * (value_max - value_min)
    }
}
