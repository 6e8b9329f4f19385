//! Configuration module for the scoring engine
//! Handles all configurable parameters; adapters are constructed once from
//! this config at process start and injected by reference (no module-level
//! client singletons).

use std::time::Duration;

use crate::utils::constants::{
    DEFAULT_ACTIVITY_FALLBACK_BLOCKS, DEFAULT_CACHE_TTL_SECS, DEFAULT_HOLDER_FALLBACK_BLOCKS,
    DEFAULT_LOG_BATCH_BLOCKS, DEFAULT_MAX_RETRIES, DEFAULT_RETRY_BASE_MS,
};

/// Configuration for the scoring engine
#[derive(Debug, Clone)]
pub struct ScorerConfig {
    /// Primary JSON-RPC URL (deep path + permission analysis)
    pub rpc_url: String,

    /// Optional public fallback RPC URL
    pub rpc_fallback_url: Option<String>,

    /// Indexed provider base URL (fast path)
    pub indexer_base_url: String,

    /// Indexed provider API key; fast mode is unavailable without it
    pub indexer_api_key: Option<String>,

    /// TTL for cached provider fetches
    pub cache_ttl_secs: u64,

    /// Retry count for retryable fetch errors (3 = 4 total attempts)
    pub max_retries: u32,

    /// Base retry delay (delay = base * attempt number + jitter)
    pub retry_base_delay: Duration,

    /// eth_getLogs batch size in blocks
    pub log_batch_blocks: u64,

    /// Blocks back from head for deep-mode holder scans
    pub holder_fallback_blocks: u64,

    /// Blocks back from head for deep-mode activity scans
    pub activity_fallback_blocks: u64,

    /// Per-analyzer timeout; a dimension that exceeds it reports a degraded
    /// result instead of stalling the aggregation
    pub analyzer_timeout: Duration,
}

impl Default for ScorerConfig {
    fn default() -> Self {
        Self {
            rpc_url: std::env::var("SCORE_RPC_URL")
                .unwrap_or_else(|_| "https://rpc.example.org/v1/YOUR_API_KEY".to_string()),
            rpc_fallback_url: std::env::var("SCORE_RPC_FALLBACK_URL").ok(),
            indexer_base_url: std::env::var("SCORE_INDEXER_URL")
                .unwrap_or_else(|_| "https://api.blockvision.org/v2/monad".to_string()),
            indexer_api_key: std::env::var("SCORE_INDEXER_API_KEY")
                .ok()
                .filter(|k| !k.is_empty() && k != "YOUR_API_KEY"),
            cache_ttl_secs: env_u64("SCORE_CACHE_TTL_SECS", DEFAULT_CACHE_TTL_SECS),
            max_retries: env_u64("SCORE_MAX_RETRIES", DEFAULT_MAX_RETRIES as u64) as u32,
            retry_base_delay: Duration::from_millis(env_u64(
                "SCORE_RETRY_BASE_MS",
                DEFAULT_RETRY_BASE_MS,
            )),
            log_batch_blocks: env_u64("SCORE_LOG_BATCH_BLOCKS", DEFAULT_LOG_BATCH_BLOCKS),
            holder_fallback_blocks: env_u64(
                "SCORE_HOLDER_FALLBACK_BLOCKS",
                DEFAULT_HOLDER_FALLBACK_BLOCKS,
            ),
            activity_fallback_blocks: env_u64(
                "SCORE_ACTIVITY_FALLBACK_BLOCKS",
                DEFAULT_ACTIVITY_FALLBACK_BLOCKS,
            ),
            analyzer_timeout: Duration::from_secs(env_u64("SCORE_ANALYZER_TIMEOUT_SECS", 60)),
        }
    }
}

impl ScorerConfig {
    /// Fast mode is possible only with an indexer key configured
    pub fn fast_mode_available(&self) -> bool {
        self.indexer_api_key.is_some()
    }
}

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
