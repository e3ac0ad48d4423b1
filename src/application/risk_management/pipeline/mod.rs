pub mod validation_pipeline;
pub use validation_pipeline::RiskValidationPipeline;
