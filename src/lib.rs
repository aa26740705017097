pub mod config;
pub mod constants;
pub mod domain;
pub mod error;
pub mod observability;
pub mod pipeline;
pub mod types;

// Layered boundaries for application and infrastructure
pub mod app;
pub mod infra;

pub use app::AnalyzeUseCase;
pub use config::Config;
pub use error::{CmaError, Result};
pub use pipeline::{CmaPipeline, CmaReport};
