//! Data source adapters: fast indexed provider and deep chain scanner
//!
//! Both backends answer the same two questions - "who holds this token" and
//! "who has been interacting with it" - behind one tagged-variant adapter.
//! Analyzers hold a `SourceAdapter` and never branch on provider identity;
//! the mode selector decides which variant is active and swaps it on
//! fallback.

pub mod indexed;
pub mod rpc;
pub mod scan;

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::models::errors::AppResult;
use crate::models::types::{AccountRecord, BlockRange, DataSourceTag, TokenHolder};

pub use indexed::IndexedClient;
pub use rpc::RpcProvider;
pub use scan::{ChainScanner, Probe};

/// One page of token holders.
/// `total` is the provider-reported holder count; None when unknown
/// (indexers routinely return only the top page).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HolderPage {
    pub holders: Vec<TokenHolder>,
    pub total: Option<u64>,
}

/// One page of interaction records with an opaque continuation cursor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityPage {
    pub records: Vec<AccountRecord>,
    pub next_cursor: Option<String>,
}

/// The active data source for one analyzer invocation
#[derive(Clone)]
pub enum SourceAdapter {
    /// Indexed REST provider: few calls, labeled addresses, may omit totals
    Fast(Arc<IndexedClient>),
    /// Chain scan over a resolved block range
    Deep {
        scanner: Arc<ChainScanner>,
        range: BlockRange,
    },
}

impl SourceAdapter {
    /// Tag recorded in the dimension result
    pub fn kind(&self) -> DataSourceTag {
        match self {
            SourceAdapter::Fast(_) => DataSourceTag::Fast,
            SourceAdapter::Deep { .. } => DataSourceTag::Deep,
        }
    }

    /// Block range backing a deep adapter (None for fast)
    pub fn block_range(&self) -> Option<BlockRange> {
        match self {
            SourceAdapter::Fast(_) => None,
            SourceAdapter::Deep { range, .. } => Some(*range),
        }
    }

    /// Fetch up to `page_size` top holders
    pub async fn fetch_holders(
        &self,
        token_address: &str,
        page_size: u32,
    ) -> AppResult<HolderPage> {
        match self {
            SourceAdapter::Fast(client) => {
                client.get_token_holders(token_address, 1, page_size).await
            }
            SourceAdapter::Deep { scanner, range } => {
                scanner
                    .holders_from_range(token_address, range.from_block, range.to_block, page_size)
                    .await
            }
        }
    }

    /// Fetch one page of activity records. The deep scan has no pagination;
    /// it returns the whole range as a single page with no cursor.
    pub async fn fetch_activity(
        &self,
        token_address: &str,
        cursor: Option<&str>,
        page_size: u32,
    ) -> AppResult<ActivityPage> {
        match self {
            SourceAdapter::Fast(client) => {
                client
                    .get_account_transactions(token_address, cursor, page_size)
                    .await
            }
            SourceAdapter::Deep { scanner, range } => {
                let records = scanner
                    .activity_from_range(token_address, range.from_block, range.to_block)
                    .await?;
                Ok(ActivityPage {
                    records,
                    next_cursor: None,
                })
            }
        }
    }

    /// Accumulate activity records up to `limit` (paginated for fast mode,
    /// range-bounded for deep mode)
    pub async fn collect_activity(
        &self,
        token_address: &str,
        limit: usize,
    ) -> AppResult<Vec<AccountRecord>> {
        match self {
            SourceAdapter::Fast(client) => client.recent_activity(token_address, limit).await,
            SourceAdapter::Deep { scanner, range } => {
                scanner
                    .activity_from_range(token_address, range.from_block, range.to_block)
                    .await
            }
        }
    }
}
