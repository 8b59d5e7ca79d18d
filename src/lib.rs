pub mod cli;
pub mod logger;
pub mod quilt_pipeline;
