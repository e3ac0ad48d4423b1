pub mod pending_orders_tracker;
pub mod risk_state_manager;
pub use pending_orders_tracker::PendingOrdersTracker;
pub use risk_state_manager::RiskStateManager;
