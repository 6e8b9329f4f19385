//! Total Scorer - Mode Selection & Aggregation
//!
//! Orchestrates the three dimension analyzers and assembles the composite
//! 0-100 result:
//! - EOA activity    (40) - fast or deep
//! - Holder spread   (30) - fast or deep
//! - Permissions     (30) - always deep (indexers expose no permission data)
//!
//! Mode selection: auto resolves to fast when an indexed provider is
//! configured, deep otherwise. A structured provider failure mid-request
//! falls that one dimension back to a deep scan over a recent block range;
//! rate limits retry the fast path instead of falling back.
//!
//! The three analyzers have no data dependency on one another and run as
//! concurrent tasks, each under its own timeout, joined before aggregation.
//! A dimension that fails or times out degrades to a zero-score result;
//! score_token itself only fails on invalid input or when every data source
//! is unavailable at once.

use alloy_primitives::Address;
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::ScorerConfig;
use crate::core::eoa::EoaActivityAnalyzer;
use crate::core::holders::HolderAnalyzer;
use crate::core::permission::PermissionAnalyzer;
use crate::models::errors::{AppError, AppResult};
use crate::models::types::{
    AnalyzerResult, BlockRange, DataSourceTag, ScoreMode, ScoreResult,
};
use crate::providers::{ChainScanner, IndexedClient, RpcProvider, SourceAdapter};
use crate::utils::cache::ScoreCache;
use crate::utils::constants::{EOA_MAX_SCORE, HOLDER_MAX_SCORE};
use crate::utils::retry::with_retry;

/// The composite token scorer. Construct once at process start and share;
/// adapters and the cache are injected here, never reached through globals.
pub struct TokenScorer {
    config: ScorerConfig,
    cache: Arc<ScoreCache>,
    indexed: Option<Arc<IndexedClient>>,
    scanner: Arc<ChainScanner>,
    eoa: EoaActivityAnalyzer,
    holders: HolderAnalyzer,
    permission: PermissionAnalyzer,
}

impl TokenScorer {
    /// Build the scorer and its adapters from config
    pub fn new(config: ScorerConfig) -> AppResult<Self> {
        let cache = Arc::new(ScoreCache::with_ttl(config.cache_ttl_secs));

        let rpc = Arc::new(RpcProvider::new(
            config.rpc_url.clone(),
            config.rpc_fallback_url.clone(),
        )?);
        info!("✅ RPC provider initialized ({})", rpc.masked_url());

        let scanner = Arc::new(ChainScanner::new(
            rpc,
            cache.clone(),
            config.log_batch_blocks,
        ));

        let indexed = match &config.indexer_api_key {
            Some(key) => match IndexedClient::new(config.indexer_base_url.clone(), key) {
                Ok(client) => {
                    info!("✅ Indexed provider configured, fast mode available");
                    Some(Arc::new(client))
                }
                Err(e) => {
                    warn!("⚠️ Indexed provider init failed: {}", e);
                    None
                }
            },
            None => {
                info!("ℹ️ No indexer API key configured, deep mode only");
                None
            }
        };

        Ok(Self {
            eoa: EoaActivityAnalyzer::new(cache.clone(), config.cache_ttl_secs),
            holders: HolderAnalyzer::new(cache.clone(), scanner.clone(), config.cache_ttl_secs),
            permission: PermissionAnalyzer::new(scanner.clone()),
            cache,
            indexed,
            scanner,
            config,
        })
    }

    /// Shared cache handle (stats endpoint, sweep task)
    pub fn cache(&self) -> Arc<ScoreCache> {
        self.cache.clone()
    }

    pub fn fast_mode_available(&self) -> bool {
        self.indexed.is_some()
    }

    /// Resolve auto to a concrete mode
    pub fn resolve_mode(&self, requested: ScoreMode) -> ScoreMode {
        match requested {
            ScoreMode::Auto => {
                if self.indexed.is_some() {
                    ScoreMode::Fast
                } else {
                    ScoreMode::Deep
                }
            }
            explicit => explicit,
        }
    }

    // ============================================
    // ENTRY POINT
    // ============================================

    /// Score a token. Fails only on a malformed address or when every data
    /// source is simultaneously unavailable; all other trouble degrades to
    /// per-dimension zero scores with embedded notes.
    pub async fn score_token(
        &self,
        token_address: &str,
        mode: ScoreMode,
        time_window_hours: u32,
        limit: usize,
    ) -> AppResult<ScoreResult> {
        let token = validate_address(token_address)?;
        let resolved = self.resolve_mode(mode);

        info!(
            "🚀 Scoring {} (mode: {} -> {}, window: {}h, limit: {})",
            token,
            mode.as_str(),
            resolved.as_str(),
            time_window_hours,
            limit
        );

        // One head read shared by both deep ranges so the dimensions agree
        // on "now"
        let head = if resolved == ScoreMode::Deep {
            self.fetch_head().await
        } else {
            None
        };

        let (eoa, holder, permission) = tokio::join!(
            self.timeboxed(
                EOA_MAX_SCORE,
                "eoa",
                self.score_eoa_dimension(&token, resolved, head, time_window_hours, limit),
            ),
            self.timeboxed(
                HOLDER_MAX_SCORE,
                "holder",
                self.score_holder_dimension(&token, resolved, head),
            ),
            self.timeboxed(
                crate::utils::constants::PERMISSION_MAX_SCORE,
                "permission",
                self.permission.analyze(&token),
            ),
        );

        if eoa.data_source == DataSourceTag::Error
            && holder.data_source == DataSourceTag::Error
            && permission.data_source == DataSourceTag::Error
        {
            return Err(AppError::source_unavailable(
                "All data sources failed for every dimension",
            ));
        }

        let block_range = head.map(|h| BlockRange {
            from_block: h.saturating_sub(self.config.holder_fallback_blocks),
            to_block: h,
        });

        let result = ScoreResult::assemble(token, resolved, block_range, eoa, holder, permission);

        info!(
            "🏁 Total score {:.2}/100 ({}) tags: {:?}",
            result.total_score,
            result.risk_level.as_str(),
            result.risk_tags.iter().map(|t| t.as_str()).collect::<Vec<_>>()
        );

        Ok(result)
    }

    // ============================================
    // DIMENSION RUNNERS
    // ============================================

    /// EOA dimension with retry + fast->deep fallback
    async fn score_eoa_dimension(
        &self,
        token: &str,
        mode: ScoreMode,
        head: Option<u64>,
        time_window_hours: u32,
        limit: usize,
    ) -> AnalyzerResult {
        let adapter = match self
            .adapter_for(mode, head, self.config.activity_fallback_blocks)
            .await
        {
            Ok(adapter) => adapter,
            Err(e) => return AnalyzerResult::degraded(EOA_MAX_SCORE, e.to_string()),
        };

        let attempt = with_retry(self.config.max_retries, self.config.retry_base_delay, || {
            self.eoa.analyze(&adapter, token, time_window_hours, limit)
        })
        .await;

        match attempt {
            Ok(result) => result,
            Err(e) if e.triggers_fallback() && matches!(adapter, SourceAdapter::Fast(_)) => {
                warn!(
                    "🔄 Fast provider failed for EOA dimension ({}), falling back to deep scan",
                    e.code_str()
                );
                self.deep_retry_eoa(token, time_window_hours, limit).await
            }
            Err(e) => {
                warn!("⚠️ EOA dimension failed: {}", e);
                AnalyzerResult::degraded(EOA_MAX_SCORE, e.to_string())
            }
        }
    }

    async fn deep_retry_eoa(
        &self,
        token: &str,
        time_window_hours: u32,
        limit: usize,
    ) -> AnalyzerResult {
        let adapter = match self
            .deep_adapter(None, self.config.activity_fallback_blocks)
            .await
        {
            Ok(adapter) => adapter,
            Err(e) => return AnalyzerResult::degraded(EOA_MAX_SCORE, e.to_string()),
        };

        match with_retry(self.config.max_retries, self.config.retry_base_delay, || {
            self.eoa.analyze(&adapter, token, time_window_hours, limit)
        })
        .await
        {
            Ok(result) => result,
            Err(e) => AnalyzerResult::degraded(
                EOA_MAX_SCORE,
                format!("Fast and deep sources both failed: {}", e),
            ),
        }
    }

    /// Holder dimension with retry + fast->deep fallback
    async fn score_holder_dimension(
        &self,
        token: &str,
        mode: ScoreMode,
        head: Option<u64>,
    ) -> AnalyzerResult {
        let adapter = match self
            .adapter_for(mode, head, self.config.holder_fallback_blocks)
            .await
        {
            Ok(adapter) => adapter,
            Err(e) => return AnalyzerResult::degraded(HOLDER_MAX_SCORE, e.to_string()),
        };

        let attempt = with_retry(self.config.max_retries, self.config.retry_base_delay, || {
            self.holders.analyze(&adapter, token)
        })
        .await;

        match attempt {
            Ok(result) => result,
            Err(e) if e.triggers_fallback() && matches!(adapter, SourceAdapter::Fast(_)) => {
                warn!(
                    "🔄 Fast provider failed for holder dimension ({}), falling back to deep scan",
                    e.code_str()
                );
                self.deep_retry_holders(token).await
            }
            Err(e) => {
                warn!("⚠️ Holder dimension failed: {}", e);
                AnalyzerResult::degraded(HOLDER_MAX_SCORE, e.to_string())
            }
        }
    }

    async fn deep_retry_holders(&self, token: &str) -> AnalyzerResult {
        let adapter = match self
            .deep_adapter(None, self.config.holder_fallback_blocks)
            .await
        {
            Ok(adapter) => adapter,
            Err(e) => return AnalyzerResult::degraded(HOLDER_MAX_SCORE, e.to_string()),
        };

        match with_retry(self.config.max_retries, self.config.retry_base_delay, || {
            self.holders.analyze(&adapter, token)
        })
        .await
        {
            Ok(result) => result,
            Err(e) => AnalyzerResult::degraded(
                HOLDER_MAX_SCORE,
                format!("Fast and deep sources both failed: {}", e),
            ),
        }
    }

    // ============================================
    // ADAPTER RESOLUTION
    // ============================================

    async fn adapter_for(
        &self,
        mode: ScoreMode,
        head: Option<u64>,
        blocks_back: u64,
    ) -> AppResult<SourceAdapter> {
        match mode {
            ScoreMode::Fast => self
                .indexed
                .clone()
                .map(SourceAdapter::Fast)
                .ok_or_else(|| {
                    AppError::source_unavailable("Fast mode requested but no indexer configured")
                }),
            _ => self.deep_adapter(head, blocks_back).await,
        }
    }

    /// Deep adapter over the most recent `blocks_back` blocks
    async fn deep_adapter(&self, head: Option<u64>, blocks_back: u64) -> AppResult<SourceAdapter> {
        let to_block = match head {
            Some(h) => h,
            None => {
                with_retry(self.config.max_retries, self.config.retry_base_delay, || {
                    self.scanner.latest_block()
                })
                .await?
            }
        };

        Ok(SourceAdapter::Deep {
            scanner: self.scanner.clone(),
            range: BlockRange {
                from_block: to_block.saturating_sub(blocks_back),
                to_block,
            },
        })
    }

    async fn fetch_head(&self) -> Option<u64> {
        match with_retry(self.config.max_retries, self.config.retry_base_delay, || {
            self.scanner.latest_block()
        })
        .await
        {
            Ok(head) => Some(head),
            Err(e) => {
                warn!("⚠️ Could not read chain head: {}", e);
                None
            }
        }
    }

    /// One slow dimension must not stall the others: every analyzer runs
    /// under its own timeout and degrades instead of blocking the join
    async fn timeboxed(
        &self,
        max_score: f64,
        name: &str,
        fut: impl std::future::Future<Output = AnalyzerResult>,
    ) -> AnalyzerResult {
        match tokio::time::timeout(self.config.analyzer_timeout, fut).await {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    "⏱️ {} analyzer timed out after {:?}",
                    name, self.config.analyzer_timeout
                );
                AnalyzerResult::degraded(
                    max_score,
                    format!("Timed out after {:?}", self.config.analyzer_timeout),
                )
            }
        }
    }
}

/// Validate and normalize a token address (lowercased, 0x-prefixed)
pub fn validate_address(token_address: &str) -> AppResult<String> {
    let trimmed = token_address.trim();
    trimmed
        .parse::<Address>()
        .map_err(|_| AppError::invalid_address(format!("Invalid token address: {}", trimmed)))?;
    Ok(trimmed.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_address() {
        let ok = validate_address("0xdAC17F958D2ee523a2206206994597C13D831ec7").unwrap();
        assert_eq!(ok, "0xdac17f958d2ee523a2206206994597c13d831ec7");

        assert!(validate_address("not-an-address").is_err());
        assert!(validate_address("0x1234").is_err());
        assert!(validate_address("").is_err());

        let err = validate_address("0xzz").unwrap_err();
        assert_eq!(err.code, crate::models::errors::ErrorCode::InvalidTokenAddress);
    }

    #[test]
    fn test_mode_resolution_without_indexer() {
        let config = ScorerConfig {
            indexer_api_key: None,
            ..ScorerConfig::default()
        };
        let scorer = TokenScorer::new(config).unwrap();

        assert!(!scorer.fast_mode_available());
        assert_eq!(scorer.resolve_mode(ScoreMode::Auto), ScoreMode::Deep);
        // Explicit requests are honored as-is
        assert_eq!(scorer.resolve_mode(ScoreMode::Fast), ScoreMode::Fast);
        assert_eq!(scorer.resolve_mode(ScoreMode::Deep), ScoreMode::Deep);
    }

    #[test]
    fn test_mode_resolution_with_indexer() {
        let config = ScorerConfig {
            indexer_api_key: Some("test_key".to_string()),
            ..ScorerConfig::default()
        };
        let scorer = TokenScorer::new(config).unwrap();

        assert!(scorer.fast_mode_available());
        assert_eq!(scorer.resolve_mode(ScoreMode::Auto), ScoreMode::Fast);
    }

    #[tokio::test]
    async fn test_invalid_address_fails_fast() {
        let config = ScorerConfig {
            indexer_api_key: None,
            ..ScorerConfig::default()
        };
        let scorer = TokenScorer::new(config).unwrap();

        let err = scorer
            .score_token("definitely-not-an-address", ScoreMode::Auto, 1, 100)
            .await
            .unwrap_err();
        assert_eq!(err.code, crate::models::errors::ErrorCode::InvalidTokenAddress);
    }

    #[tokio::test]
    async fn test_explicit_fast_without_indexer_degrades() {
        // Explicit fast mode with no indexer: both fast dimensions degrade,
        // and since the RPC URL is unreachable too the whole call reports
        // every source unavailable
        let config = ScorerConfig {
            indexer_api_key: None,
            rpc_url: "http://127.0.0.1:1".to_string(),
            rpc_fallback_url: None,
            max_retries: 0,
            retry_base_delay: std::time::Duration::from_millis(1),
            analyzer_timeout: std::time::Duration::from_secs(5),
            ..ScorerConfig::default()
        };
        let scorer = TokenScorer::new(config).unwrap();

        let outcome = scorer
            .score_token(
                "0xdAC17F958D2ee523a2206206994597C13D831ec7",
                ScoreMode::Fast,
                1,
                100,
            )
            .await;
        assert!(outcome.is_err());
        assert_eq!(
            outcome.unwrap_err().code,
            crate::models::errors::ErrorCode::SourceUnavailable
        );
    }
}
