//! RusterScore Library
//!
//! Multi-source token risk scoring engine producing an explainable 0-100
//! composite from three independent heuristic dimensions:
//! - Unique-EOA activity (40) - distinct funded accounts are hard to fake
//! - Holder concentration (30) - sell-pressure / whale-control risk
//! - Contract permissions (30) - rug-pull surface (mint, tax, upgrade, pause)
//!
//! Data comes from either a fast indexed API or a deep on-chain scan, with
//! per-dimension fallback, TTL caching and bounded retry.

pub mod api;
pub mod config;
pub mod core;
pub mod models;
pub mod providers;
pub mod utils;

pub use config::ScorerConfig;
pub use core::scorer::TokenScorer;
pub use models::errors::{AppError, AppResult, ErrorCode};
pub use models::types::{
    AnalyzerResult, DataSourceTag, RiskLevel, RiskTag, ScoreMode, ScoreResult,
};
pub use providers::{ChainScanner, IndexedClient, RpcProvider, SourceAdapter};
pub use utils::cache::{CacheStats, ScoreCache};
