//! Indicators (L1, §4.4).
//!
//! Per-symbol rolling technical state, grounded in the teacher's
//! `AnalysisContext` fields (`rsi`, `fast_sma`/`slow_sma`, `macd_value`/
//! `macd_signal`/`macd_histogram`, `atr`) but recomputed from a plain
//! `Candle` stream instead of the teacher's full candle-aggregation
//! pipeline - this is the spec's lighter single-pass contract, not a
//! wrapper around `TradingStrategy`/`AnalysisContext`.
//!
//! RSI uses Wilder smoothing over `rsi_period` bars (teacher default: 14).
//! MACD's signal line is an SMA-of-MACD proxy by default (`signal_period`
//! samples of the MACD line); pass `strict_ema_signal: true` to run an
//! EMA-of-MACD signal line instead without changing the call shape - see
//! DESIGN.md's Open Question entry on this.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::VecDeque;

use crate::domain::trading::types::Candle;

/// Point-in-time read of a symbol's indicator state. `None` fields mean
/// "not enough history yet" - callers should treat that as neutral, not as
/// a bullish or bearish signal.
#[derive(Debug, Clone, Copy, Default)]
pub struct IndicatorSnapshot {
    pub rsi: Option<Decimal>,
    pub ema_fast: Option<Decimal>,
    pub ema_slow: Option<Decimal>,
    pub macd_line: Option<Decimal>,
    pub macd_signal: Option<Decimal>,
    pub macd_histogram: Option<Decimal>,
    pub atr_pct: Option<Decimal>,
    pub momentum_pct: Option<Decimal>,
    pub momentum_consistent: bool,
    pub vwap: Option<Decimal>,
    pub volume_spike: bool,
    pub bars_seen: usize,
}

impl IndicatorSnapshot {
    pub fn oversold(&self) -> bool {
        self.rsi.map(|r| r <= dec!(30)).unwrap_or(false)
    }

    pub fn overbought(&self) -> bool {
        self.rsi.map(|r| r >= dec!(70)).unwrap_or(false)
    }

    /// EMA9>EMA21 alignment, the teacher's `fast_sma > slow_sma` bullish
    /// check generalized to EMAs (§4.4 "bullish := ema9 > ema21").
    pub fn bullish_alignment(&self) -> bool {
        matches!((self.ema_fast, self.ema_slow), (Some(f), Some(s)) if f > s)
    }

    pub fn macd_bullish(&self) -> Option<bool> {
        match (self.macd_line, self.macd_signal) {
            (Some(line), Some(signal)) => Some(line > signal),
            _ => None,
        }
    }
}

/// Stateful, incrementally-updated indicator set for one symbol.
pub struct Indicators {
    rsi_period: usize,
    avg_gain: Option<Decimal>,
    avg_loss: Option<Decimal>,

    ema_fast_period: usize,
    ema_slow_period: usize,
    ema_fast: Option<Decimal>,
    ema_slow: Option<Decimal>,

    macd_fast: Option<Decimal>,
    macd_slow: Option<Decimal>,
    macd_signal_period: usize,
    macd_history: VecDeque<Decimal>,
    strict_ema_signal: bool,
    macd_signal_ema: Option<Decimal>,

    atr: Option<Decimal>,
    atr_period: usize,

    closes: VecDeque<Decimal>,
    momentum_lookback: usize,

    vwap_cum_pv: Decimal,
    vwap_cum_vol: Decimal,
    vwap_window: VecDeque<(Decimal, Decimal)>,
    vwap_max_bars: usize,

    avg_volume: Option<Decimal>,
    last_volume: Decimal,

    prev_close: Option<Decimal>,
    bars_seen: usize,
}

impl Indicators {
    pub fn new() -> Self {
        Self::with_params(14, 9, 21, 12, 26, 9, 14, 5, false)
    }

    #[allow(clippy::too_many_arguments)]
    pub fn with_params(
        rsi_period: usize,
        ema_fast_period: usize,
        ema_slow_period: usize,
        macd_fast_period: usize,
        macd_slow_period: usize,
        macd_signal_period: usize,
        atr_period: usize,
        momentum_lookback: usize,
        strict_ema_signal: bool,
    ) -> Self {
        let _ = (macd_fast_period, macd_slow_period); // periods folded into the EMA alpha below
        Self {
            rsi_period,
            avg_gain: None,
            avg_loss: None,
            ema_fast_period,
            ema_slow_period,
            ema_fast: None,
            ema_slow: None,
            macd_fast: None,
            macd_slow: None,
            macd_signal_period,
            macd_history: VecDeque::with_capacity(macd_signal_period),
            strict_ema_signal,
            macd_signal_ema: None,
            atr: None,
            atr_period,
            closes: VecDeque::with_capacity(momentum_lookback + 1),
            momentum_lookback,
            vwap_cum_pv: Decimal::ZERO,
            vwap_cum_vol: Decimal::ZERO,
            vwap_window: VecDeque::new(),
            vwap_max_bars: 24 * 12, // ~24h of 5-minute bars, approximating VWAP(24h)
            avg_volume: None,
            last_volume: Decimal::ZERO,
            prev_close: None,
            bars_seen: 0,
        }
    }

    fn ema_update(prev: Option<Decimal>, value: Decimal, period: usize) -> Decimal {
        let alpha = Decimal::TWO / (Decimal::from(period) + Decimal::ONE);
        match prev {
            Some(p) => p + alpha * (value - p),
            None => value,
        }
    }

    fn wilder_update(prev: Option<Decimal>, value: Decimal, period: usize) -> Decimal {
        match prev {
            Some(p) => (p * (Decimal::from(period) - Decimal::ONE) + value) / Decimal::from(period),
            None => value,
        }
    }

    /// Feed one new bar and update all rolling state. Call in chronological
    /// order; this is not idempotent against replayed/out-of-order bars.
    pub fn update(&mut self, bar: &Candle) {
        self.bars_seen += 1;
        let close = bar.close;

        if let Some(prev_close) = self.prev_close {
            let delta = close - prev_close;
            let (gain, loss) = if delta >= Decimal::ZERO { (delta, Decimal::ZERO) } else { (Decimal::ZERO, -delta) };
            self.avg_gain = Some(Self::wilder_update(self.avg_gain, gain, self.rsi_period));
            self.avg_loss = Some(Self::wilder_update(self.avg_loss, loss, self.rsi_period));

            let true_range = (bar.high - bar.low)
                .max((bar.high - prev_close).abs())
                .max((bar.low - prev_close).abs());
            self.atr = Some(Self::wilder_update(self.atr, true_range, self.atr_period));
        }

        self.ema_fast = Some(Self::ema_update(self.ema_fast, close, self.ema_fast_period));
        self.ema_slow = Some(Self::ema_update(self.ema_slow, close, self.ema_slow_period));
        self.macd_fast = Some(Self::ema_update(self.macd_fast, close, 12));
        self.macd_slow = Some(Self::ema_update(self.macd_slow, close, 26));

        if let (Some(fast), Some(slow)) = (self.macd_fast, self.macd_slow) {
            let macd_line = fast - slow;
            if self.strict_ema_signal {
                self.macd_signal_ema = Some(Self::ema_update(self.macd_signal_ema, macd_line, self.macd_signal_period));
            } else {
                self.macd_history.push_back(macd_line);
                if self.macd_history.len() > self.macd_signal_period {
                    self.macd_history.pop_front();
                }
            }
        }

        self.closes.push_back(close);
        if self.closes.len() > self.momentum_lookback + 1 {
            self.closes.pop_front();
        }

        self.vwap_window.push_back((close, bar.volume));
        self.vwap_cum_pv += close * bar.volume;
        self.vwap_cum_vol += bar.volume;
        if self.vwap_window.len() > self.vwap_max_bars {
            if let Some((old_price, old_vol)) = self.vwap_window.pop_front() {
                self.vwap_cum_pv -= old_price * old_vol;
                self.vwap_cum_vol -= old_vol;
            }
        }

        self.avg_volume = Some(Self::ema_update(self.avg_volume, bar.volume, 20));
        self.last_volume = bar.volume;

        self.prev_close = Some(close);
    }

    fn rsi(&self) -> Option<Decimal> {
        let (gain, loss) = (self.avg_gain?, self.avg_loss?);
        if loss == Decimal::ZERO {
            return Some(dec!(100));
        }
        let rs = gain / loss;
        Some(dec!(100) - (dec!(100) / (Decimal::ONE + rs)))
    }

    fn macd_signal(&self) -> Option<Decimal> {
        if self.strict_ema_signal {
            return self.macd_signal_ema;
        }
        if self.macd_history.is_empty() {
            return None;
        }
        let sum: Decimal = self.macd_history.iter().copied().sum();
        Some(sum / Decimal::from(self.macd_history.len()))
    }

    /// `(close_now - close_k_ago) / close_k_ago`, with "consistent" meaning
    /// every bar-over-bar step in the lookback window moved the same
    /// direction as the overall move (§4.4 "momentum with consistency
    /// check").
    fn momentum(&self) -> (Option<Decimal>, bool) {
        if self.closes.len() < self.momentum_lookback + 1 {
            return (None, false);
        }
        let oldest = self.closes.front().copied().unwrap();
        let newest = self.closes.back().copied().unwrap();
        if oldest == Decimal::ZERO {
            return (None, false);
        }
        let momentum_pct = (newest - oldest) / oldest;

        let overall_up = momentum_pct >= Decimal::ZERO;
        let mut consistent = true;
        let mut prev = oldest;
        for &close in self.closes.iter().skip(1) {
            let step_up = close >= prev;
            if step_up != overall_up {
                consistent = false;
                break;
            }
            prev = close;
        }
        (Some(momentum_pct), consistent)
    }

    pub fn snapshot(&self) -> IndicatorSnapshot {
        let (momentum_pct, momentum_consistent) = self.momentum();
        IndicatorSnapshot {
            rsi: self.rsi(),
            ema_fast: self.ema_fast,
            ema_slow: self.ema_slow,
            macd_line: match (self.macd_fast, self.macd_slow) {
                (Some(f), Some(s)) => Some(f - s),
                _ => None,
            },
            macd_signal: self.macd_signal(),
            macd_histogram: match (self.macd_fast, self.macd_slow, self.macd_signal()) {
                (Some(f), Some(s), Some(sig)) => Some((f - s) - sig),
                _ => None,
            },
            atr_pct: match (self.atr, self.prev_close) {
                (Some(atr), Some(price)) if price > Decimal::ZERO => Some(atr / price),
                _ => None,
            },
            momentum_pct,
            momentum_consistent,
            vwap: if self.vwap_cum_vol > Decimal::ZERO { Some(self.vwap_cum_pv / self.vwap_cum_vol) } else { None },
            volume_spike: match self.avg_volume {
                Some(avg) if avg > Decimal::ZERO => self.last_volume > avg * dec!(2),
                _ => false,
            },
            bars_seen: self.bars_seen,
        }
    }

    pub fn has_enough_data(&self) -> bool {
        self.bars_seen >= self.rsi_period
    }
}

impl Default for Indicators {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bar(close: Decimal, volume: Decimal) -> Candle {
        Candle {
            symbol: "TEST".to_string(),
            open: close,
            high: close + dec!(0.5),
            low: close - dec!(0.5),
            close,
            volume,
            timestamp: 0,
        }
    }

    #[test]
    fn rsi_is_100_when_no_losses_seen() {
        let mut ind = Indicators::new();
        let mut price = dec!(100);
        for _ in 0..20 {
            price += dec!(1);
            ind.update(&bar(price, dec!(10)));
        }
        let snap = ind.snapshot();
        assert_eq!(snap.rsi, Some(dec!(100)));
        assert!(snap.bars_seen >= 14);
    }

    #[test]
    fn ema_alignment_reflects_uptrend() {
        let mut ind = Indicators::new();
        let mut price = dec!(100);
        for _ in 0..30 {
            price += dec!(1);
            ind.update(&bar(price, dec!(10)));
        }
        let snap = ind.snapshot();
        assert!(snap.bullish_alignment());
    }

    #[test]
    fn momentum_consistency_detects_monotonic_run() {
        let mut ind = Indicators::with_params(14, 9, 21, 12, 26, 9, 14, 3, false);
        for price in [dec!(100), dec!(101), dec!(102), dec!(103)] {
            ind.update(&bar(price, dec!(1)));
        }
        let snap = ind.snapshot();
        assert!(snap.momentum_consistent);
        assert!(snap.momentum_pct.unwrap() > Decimal::ZERO);
    }

    #[test]
    fn momentum_inconsistent_on_choppy_series() {
        let mut ind = Indicators::with_params(14, 9, 21, 12, 26, 9, 14, 3, false);
        for price in [dec!(100), dec!(105), dec!(98), dec!(103)] {
            ind.update(&bar(price, dec!(1)));
        }
        let snap = ind.snapshot();
        assert!(!snap.momentum_consistent);
    }

    #[test]
    fn insufficient_history_yields_none_fields() {
        let mut ind = Indicators::new();
        ind.update(&bar(dec!(100), dec!(1)));
        let snap = ind.snapshot();
        assert!(snap.rsi.is_none());
        assert!(!ind.has_enough_data());
    }

    #[test]
    fn strict_ema_signal_mode_tracks_macd_line_with_lag() {
        let mut ind = Indicators::with_params(14, 9, 21, 12, 26, 9, 14, 5, true);
        let mut price = dec!(100);
        for _ in 0..40 {
            price += dec!(1);
            ind.update(&bar(price, dec!(10)));
        }
        let snap = ind.snapshot();
        assert!(snap.macd_signal.is_some());
        assert!(snap.macd_histogram.is_some());
    }
}
