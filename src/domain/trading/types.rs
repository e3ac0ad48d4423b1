use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderSide {
    Buy,
    Sell,
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderSide::Buy => write!(f, "BUY"),
            OrderSide::Sell => write!(f, "SELL"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    New,
    PartiallyFilled,
    Filled,
    DoneForDay,
    Canceled,
    Cancelled, // Alias for Canceled
    Replaced,
    PendingCancel,
    Stopped,
    Rejected,
    Suspended,
    PendingNew,
    Calculated,
    Expired,
    Accepted,
    PendingReplace,
    Pending, // Added to match usage
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Candle {
    pub symbol: String,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
    pub timestamp: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum MarketEvent {
    Quote {
        symbol: String,
        price: Decimal,
        quantity: Decimal,
        timestamp: i64,
    },
    Candle(Candle),
    SymbolSubscription {
        symbol: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderType {
    Market,
    Limit,
    Stop,
    StopLimit,
}

impl fmt::Display for OrderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderType::Market => write!(f, "MARKET"),
            OrderType::Limit => write!(f, "LIMIT"),
            OrderType::Stop => write!(f, "STOP"),
            OrderType::StopLimit => write!(f, "STOP_LIMIT"),
        }
    }
}

#[allow(dead_code)]
#[derive(Debug, Clone)]
pub struct TradeProposal {
    pub symbol: String,
    pub side: OrderSide,
    pub price: Decimal,
    pub quantity: Decimal,
    pub order_type: OrderType,
    pub reason: String,
    pub timestamp: i64,
    pub stop_loss: Option<Decimal>,
    pub take_profit: Option<Decimal>,
}

#[allow(dead_code)]
#[derive(Debug, Clone)]
pub struct Order {
    pub id: String,
    pub symbol: String,
    pub side: OrderSide,
    pub price: Decimal,
    pub quantity: Decimal,
    pub order_type: OrderType,
    pub status: OrderStatus,
    pub timestamp: i64,
}

/// Represents a completed trade with profit/loss information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trade {
    pub id: String,
    pub symbol: String,
    pub side: OrderSide,
    pub entry_price: Decimal,
    pub exit_price: Option<Decimal>,
    pub quantity: Decimal,
    pub pnl: Decimal, // Realized profit/loss
    pub entry_timestamp: i64,
    pub exit_timestamp: Option<i64>,
}

impl Trade {
    /// Create a new trade from an opening order
    pub fn from_order(order: &Order) -> Self {
        Self {
            id: order.id.clone(),
            symbol: order.symbol.clone(),
            side: order.side,
            entry_price: order.price,
            exit_price: None,
            quantity: order.quantity,
            pnl: Decimal::ZERO,
            entry_timestamp: order.timestamp,
            exit_timestamp: None,
        }
    }

    /// Close the trade and calculate P&L
    pub fn close(&mut self, exit_price: Decimal, exit_timestamp: i64) {
        self.exit_price = Some(exit_price);
        self.exit_timestamp = Some(exit_timestamp);

        // Calculate P&L: (exit - entry) * quantity for buy, (entry - exit) * quantity for sell
        self.pnl = match self.side {
            OrderSide::Buy => (exit_price - self.entry_price) * self.quantity,
            OrderSide::Sell => (self.entry_price - exit_price) * self.quantity,
        };
    }
}

/// Lifecycle state of a position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PositionLifecycle {
    /// Position has been opened
    Opened,
    /// Position is active and being monitored
    Active,
    /// Position has been closed
    Closed,
}

/// Technical indicators for a symbol
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FeatureSet {
    pub last_price: Option<Decimal>,
    pub rsi: Option<Decimal>,
    pub macd_line: Option<Decimal>,
    pub macd_signal: Option<Decimal>,
    pub macd_hist: Option<Decimal>,
    pub sma_20: Option<Decimal>,
    pub sma_50: Option<Decimal>,
    pub sma_200: Option<Decimal>,
    pub bb_upper: Option<Decimal>,
    pub bb_middle: Option<Decimal>,
    pub bb_lower: Option<Decimal>,
    pub atr: Option<Decimal>,
    pub ema_fast: Option<Decimal>,
    pub ema_slow: Option<Decimal>,
    pub adx: Option<Decimal>,
    pub bb_width: Option<Decimal>,
    pub bb_position: Option<Decimal>,
    pub atr_pct: Option<Decimal>,

    // Advanced Statistical Features (Phase 2)
    pub hurst_exponent: Option<Decimal>,
    pub skewness: Option<Decimal>,
    pub momentum_normalized: Option<Decimal>,
    pub realized_volatility: Option<Decimal>,
    // Microstructure Features (Phase 2)
    pub ofi: Option<Decimal>,
    pub cumulative_delta: Option<Decimal>,
    pub spread_bps: Option<Decimal>,
    /// The timeframe these indicators were calculated on
    pub timeframe: Option<crate::domain::market::timeframe::Timeframe>,
}

/// Immutable per-profile configuration for the multi-profile scheduler.
///
/// A profile scopes a strategy class over a symbol universe split into
/// bullish/bearish camps, each with its own exit thresholds. Only the MAIN
/// profile is permitted to issue the EOD flatten (see `ProfileRole`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    pub role: ProfileRole,
    pub capital_fraction: Decimal,
    pub take_profit_pct: Decimal,
    pub stop_loss_pct: Decimal,
    pub trailing_pct: Decimal,
    pub bullish_symbols: Vec<String>,
    pub bearish_symbols: Vec<String>,
    pub vix_threshold: Decimal,
    pub vix_hysteresis: Decimal,
    pub strategy_class: crate::domain::market::strategy_config::StrategyMode,
    pub min_hold: i64,
    pub max_hold: i64,
}

/// Distinguishes the one profile allowed to drive end-of-day flatten logic
/// from satellite profiles that only manage their own symbol slice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProfileRole {
    Main,
    Satellite,
}

impl Profile {
    pub fn all_symbols(&self) -> Vec<String> {
        self.bullish_symbols
            .iter()
            .chain(self.bearish_symbols.iter())
            .cloned()
            .collect()
    }
}

/// Trailing take-profit state machine for a single crypto symbol.
///
/// Activates once price reaches `entry*(1+activation_pct)`; from then on,
/// tracks the running high and exits when price falls back below
/// `high_water*(1-trail_pct)`, or immediately at `entry*(1+cap_pct)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrailingTpState {
    pub entry: Decimal,
    pub high_water: Decimal,
    pub activation_price: Decimal,
    pub active: bool,
    pub activated_at: Option<i64>,
}

impl TrailingTpState {
    pub fn new(entry: Decimal, activation_pct: Decimal) -> Self {
        Self {
            entry,
            high_water: entry,
            activation_price: entry * (Decimal::ONE + activation_pct),
            active: false,
            activated_at: None,
        }
    }

    /// Feed a new price; returns `Some(exit_price)` if a trailing exit fires.
    pub fn on_price_update(
        &mut self,
        price: Decimal,
        trail_pct: Decimal,
        cap_pct: Decimal,
        now: i64,
    ) -> Option<Decimal> {
        if price >= self.entry * (Decimal::ONE + cap_pct) {
            return Some(price);
        }

        if !self.active {
            if price >= self.activation_price {
                self.active = true;
                self.activated_at = Some(now);
                self.high_water = price;
            }
            return None;
        }

        if price > self.high_water {
            self.high_water = price;
        }

        let trail_stop = self.high_water * (Decimal::ONE - trail_pct);
        if price <= trail_stop {
            return Some(price);
        }
        None
    }
}

/// Partial-exit ladder state: a monotonically non-decreasing level counter
/// with level→threshold and level→fraction tables supplied by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct PartialExitState {
    pub level: u8,
}

impl PartialExitState {
    pub const MAX_LEVEL: u8 = 2;

    /// Given current gain_pct and the ladder thresholds (ascending), returns
    /// the fraction of the remaining position to sell if a new level was
    /// crossed, advancing `level` in place.
    pub fn evaluate(&mut self, gain_pct: Decimal, thresholds: &[(Decimal, Decimal)]) -> Option<Decimal> {
        for (idx, (threshold, fraction)) in thresholds.iter().enumerate() {
            let candidate_level = (idx + 1) as u8;
            if candidate_level <= self.level {
                continue;
            }
            if gain_pct >= *threshold {
                self.level = candidate_level.min(Self::MAX_LEVEL);
                return Some(*fraction);
            }
        }
        None
    }
}

/// Rolling win/loss record per symbol, used to weight grid-order sizing and
/// strategy confidence.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default)]
pub struct PerformanceStats {
    pub wins: u32,
    pub losses: u32,
    pub total_pnl_pct: Decimal,
    pub last_trade_time: Option<i64>,
}

impl PerformanceStats {
    pub fn win_rate(&self) -> Decimal {
        let total = self.wins + self.losses;
        if total == 0 {
            return Decimal::new(5, 1); // 0.5 - no data, assume neutral
        }
        Decimal::from(self.wins) / Decimal::from(total)
    }

    pub fn record(&mut self, pnl_pct: Decimal, now: i64) {
        if pnl_pct >= Decimal::ZERO {
            self.wins += 1;
        } else {
            self.losses += 1;
        }
        self.total_pnl_pct += pnl_pct;
        self.last_trade_time = Some(now);
    }
}

/// Rolling 24h volatility snapshot for a crypto ticker.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct VolatilityStats {
    pub daily_vol: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub updated: i64,
}

impl VolatilityStats {
    pub fn from_ticker(high24: Decimal, low24: Decimal, price: Decimal, now: i64) -> Self {
        let daily_vol = if price > Decimal::ZERO {
            (high24 - low24) / price
        } else {
            Decimal::ZERO
        };
        Self {
            daily_vol,
            high: high24,
            low: low24,
            updated: now,
        }
    }
}

// ===== Symbol Normalization =====

/// Supported quote currencies for crypto pairs, ordered by priority (longest first to prefer USDT over USD)
const CRYPTO_QUOTE_CURRENCIES: &[&str] = &[
    "USDT", "USDC", "BUSD", "TUSD", // Stablecoins (4 chars)
    "USD", "EUR", "GBP", "BTC", "ETH", // Traditional (3 chars)
];

/// Normalizes a crypto symbol from Alpaca format to application format.
///
/// Alpaca returns crypto symbols without slashes (e.g., "BTCUSD", "ETHUSDT"),
/// but the application uses slash-separated format (e.g., "BTC/USD", "ETH/USDT").
///
/// # Arguments
/// * `symbol` - The symbol to normalize (e.g., "BTCUSD", "ETHUSDT", "BTC/USD")
///
/// # Returns
/// * `Ok(String)` - The normalized symbol in "BASE/QUOTE" format
/// * `Err(String)` - Error message if the symbol cannot be normalized
///
/// # Examples
/// ```
/// use rustrade::domain::trading::types::normalize_crypto_symbol;
///
/// assert_eq!(normalize_crypto_symbol("BTCUSD").unwrap(), "BTC/USD");
/// assert_eq!(normalize_crypto_symbol("BTCUSDT").unwrap(), "BTC/USDT");
/// assert_eq!(normalize_crypto_symbol("ETHEUR").unwrap(), "ETH/EUR");
/// assert_eq!(normalize_crypto_symbol("BTC/USD").unwrap(), "BTC/USD"); // Already normalized
/// ```
pub fn normalize_crypto_symbol(symbol: &str) -> Result<String, String> {
    // Already normalized
    if symbol.contains('/') {
        return Ok(symbol.to_string());
    }

    // Empty check
    if symbol.is_empty() {
        return Err("Cannot normalize empty symbol".to_string());
    }

    // Try to match known quote currencies (longest first to prefer USDT over USD)
    for quote in CRYPTO_QUOTE_CURRENCIES {
        if symbol.ends_with(quote) && symbol.len() > quote.len() {
            let base = &symbol[..symbol.len() - quote.len()];
            // Validate base currency is not empty and looks reasonable (ASCII uppercase)
            if !base.is_empty() && base.chars().all(|c| c.is_ascii_uppercase()) {
                return Ok(format!("{}/{}", base, quote));
            }
        }
    }

    Err(format!(
        "Cannot normalize crypto symbol: '{}' - no recognized quote currency",
        symbol
    ))
}

/// Denormalizes a crypto symbol from application format back to Alpaca format.
///
/// This is the reverse of `normalize_crypto_symbol`, used when making API calls to Alpaca
/// that require symbols without slashes (e.g., snapshot API, historical bars API).
///
/// # Arguments
/// * `symbol` - The symbol to denormalize (e.g., "BTC/USD", "ETH/USDT")
///
/// # Returns
/// * `String` - The denormalized symbol in "BASEQUOTE" format (e.g., "BTCUSD", "ETHUSDT")
///
/// # Examples
/// ```
/// use rustrade::domain::trading::types::denormalize_crypto_symbol;
///
/// assert_eq!(denormalize_crypto_symbol("BTC/USD"), "BTCUSD");
/// assert_eq!(denormalize_crypto_symbol("ETH/USDT"), "ETHUSDT");
/// assert_eq!(denormalize_crypto_symbol("BTCUSD"), "BTCUSD"); // Already denormalized
/// ```
pub fn denormalize_crypto_symbol(symbol: &str) -> String {
    // Remove the slash if present
    symbol.replace('/', "")
}
