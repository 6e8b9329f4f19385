//! Data models and error types

pub mod errors;
pub mod types;

pub use errors::{AppError, AppResult, ErrorCode};
pub use types::{
    AccountRecord, AnalyzerResult, BlockRange, DataSourceTag, DimensionSources, RiskLevel,
    RiskTag, ScoreMode, ScoreResult, TokenHolder,
};
