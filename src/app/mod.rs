pub mod ports;
pub mod analyze_use_case;

pub use analyze_use_case::AnalyzeUseCase;
