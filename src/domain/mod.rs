// Market analysis domain
pub mod market;

// Optimization domain
pub mod optimization;

// Performance tracking domain
pub mod performance;

// Port interfaces
pub mod ports;

// Repository traits
pub mod repositories;

// Risk management domain
pub mod risk;

// Core trading domain
pub mod trading;

// Domain-specific error types
pub mod errors;

// Internal event bus payloads
pub mod events;

// Market sentiment
pub mod sentiment;

// News listener domain (rule matching, sentiment tagging)
pub mod listener;
