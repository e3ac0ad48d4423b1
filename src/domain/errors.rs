use thiserror::Error;
use rust_decimal::Decimal;

/// Errors related to trading operations and portfolio management
#[derive(Debug, Error)]
pub enum TradingError {
    #[error("Insufficient funds: need ${need}, available ${available}")]
    InsufficientFunds { need: Decimal, available: Decimal },
    
    #[error("Position not found: {symbol}")]
    PositionNotFound { symbol: String },
    
    #[error("Invalid order: {reason}")]
    InvalidOrder { reason: String },
    
    #[error("Order execution failed: {reason}")]
    ExecutionFailed { reason: String },
}

/// Errors related to risk management violations
#[derive(Debug, Error)]
pub enum RiskViolation {
    #[error("Position size limit exceeded for {symbol}: {current_pct:.2}% > {max_pct:.2}%")]
    PositionSizeLimit {
        symbol: String,
        current_pct: f64,
        max_pct: f64,
    },
    
    #[error("Daily loss limit breached: {loss_pct:.2}% > {limit_pct:.2}%")]
    DailyLossLimit { loss_pct: f64, limit_pct: f64 },
    
    #[error("Maximum drawdown exceeded: {drawdown_pct:.2}% > {max_pct:.2}%")]
    MaxDrawdown { drawdown_pct: f64, max_pct: f64 },
    
    #[error("Sector exposure limit for {sector}: {current_pct:.2}% > {max_pct:.2}%")]
    SectorExposureLimit {
        sector: String,
        current_pct: f64,
        max_pct: f64,
    },
    
    #[error("PDT protection: {day_trades} day trades with equity ${equity} < $25,000")]
    PdtProtection { day_trades: u64, equity: Decimal },
    
    #[error("Consecutive loss limit reached: {count} losses")]
    ConsecutiveLossLimit { count: usize },
}

/// Errors related to market data and connectivity
#[derive(Debug, Error)]
pub enum MarketDataError {
    #[error("Connection lost: {reason}")]
    ConnectionLost { reason: String },
    
    #[error("Invalid market data for {symbol}: {reason}")]
    InvalidData { symbol: String, reason: String },
    
    #[error("Service timeout after {duration_ms}ms")]
    Timeout { duration_ms: u64 },
    
    #[error("Rate limit exceeded: retry after {retry_after_secs}s")]
    RateLimitExceeded { retry_after_secs: u64 },
}

/// Errors related to portfolio state management
#[derive(Debug, Error)]
pub enum PortfolioError {
    #[error("Portfolio snapshot is stale: age {age_ms}ms > limit {limit_ms}ms")]
    StaleSnapshot { age_ms: u64, limit_ms: u64 },
    
    #[error("Version conflict: expected v{expected}, got v{actual}")]
    VersionConflict { expected: u64, actual: u64 },
    
    #[error("Exposure reservation failed for {symbol}: {reason}")]
    ReservationFailed { symbol: String, reason: String },
    
    #[error("Failed to refresh portfolio state: {reason}")]
    RefreshFailed { reason: String },
}

/// Closed classification of broker adapter failures.
///
/// Every adapter (equity or crypto) maps its transport/exchange-specific
/// failures onto one of these kinds so the risk and execution layers can
/// reason about retries and halts without knowing which broker is behind
/// the trait object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrokerErrorKind {
    Network,
    Auth,
    RateLimit,
    InsufficientFunds,
    Validation,
    NotFound,
    Conflict,
    Timeout,
    Internal,
}

/// Broker-adapter error with a closed `kind` and a free-form `detail` string
/// carrying whatever the underlying HTTP/WS client reported.
#[derive(Debug, Error)]
#[error("broker error [{kind:?}]: {detail}")]
pub struct BrokerError {
    pub kind: BrokerErrorKind,
    pub detail: String,
}

impl BrokerError {
    pub fn new(kind: BrokerErrorKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
        }
    }

    /// Whether the caller may retry the same request unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind,
            BrokerErrorKind::Network | BrokerErrorKind::RateLimit | BrokerErrorKind::Timeout
        )
    }
}
