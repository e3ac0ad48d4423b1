use crate::domain::market::timeframe::Timeframe;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Represents an aggregated candle for a specific timeframe
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeframeCandle {
    pub symbol: String,
    pub timeframe: Timeframe,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: f64,
    /// Start timestamp of this timeframe period (in milliseconds)
    pub timestamp: i64,
    /// Number of 1-minute candles aggregated into this candle
    pub candle_count: usize,
}

impl TimeframeCandle {
    /// Creates a new TimeframeCandle from the first base candle
    pub fn new(
        symbol: String,
        timeframe: Timeframe,
        open: Decimal,
        high: Decimal,
        low: Decimal,
        close: Decimal,
        volume: f64,
        timestamp: i64,
    ) -> Self {
        Self {
            symbol,
            timeframe,
            open,
            high,
            low,
            close,
            volume,
            timestamp,
            candle_count: 1,
        }
    }

    /// Updates this candle with data from another candle (aggregation)
    /// 
    /// # Arguments
    /// * `candle` - The candle to merge into this one
    /// 
    /// # Note
    /// - Open remains unchanged (first candle's open)
    /// - High becomes max of all highs
    /// - Low becomes min of all lows
    /// - Close becomes the latest close
    /// - Volume is summed
    pub fn update(&mut self, _open: Decimal, high: Decimal, low: Decimal, close: Decimal, volume: f64) {
        // Open stays the same (first candle)
        // High is the maximum
        if high > self.high {
            self.high = high;
        }
        // Low is the minimum
        if low < self.low {
            self.low = low;
        }
        // Close is the latest
        self.close = close;
        // Volume is summed
        self.volume += volume;
        // Increment count
        self.candle_count += 1;
    }

    /// Checks if this candle is complete (has received all expected sub-candles)
    /// 
    /// For example, a 5-minute candle should have 5 one-minute candles
    pub fn is_complete(&self) -> bool {
        self.candle_count >= self.timeframe.to_minutes()
    }

    /// Returns the end timestamp of this timeframe period
    pub fn end_timestamp(&self) -> i64 {
        self.timestamp + (self.timeframe.to_seconds() * 1000)
    }
}
