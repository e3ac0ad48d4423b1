pub mod buying_power_validator;
pub mod circuit_breaker_validator;
pub mod correlation_filter;
pub mod pdt_validator;
pub mod position_size_validator;
pub mod sector_exposure_validator;
pub mod sentiment_validator;
pub mod validator_trait;

pub use validator_trait::{RiskValidator, ValidationContext, ValidationResult};
