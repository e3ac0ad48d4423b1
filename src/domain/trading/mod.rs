// Core trading domain entities and value objects
pub mod fee_model;
pub mod fees; // Keeping legacy fees for now if needed, but intended to replace
pub mod portfolio;
pub mod position_book;
pub mod types;
