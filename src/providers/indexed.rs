//! Indexed Provider Client (fast path)
//!
//! REST client for an indexer in the Blockvision/Nansen mold:
//! 1. Token Holders API - holder list with balances, optional ownership
//!    percentages, and is-contract labels
//! 2. Account Transactions API - cursor-paginated interaction records with
//!    per-address contract labels and timestamps
//!
//! The indexer answers in one or two calls what a chain scan needs thousands
//! of RPC requests for, at the cost of occasionally omitting fields (total
//! holder count, ownership percentage). Omissions surface as explicit
//! sentinels, never as silent zeros.
//!
//! Error split (three distinct signals, per-call):
//! - HTTP 429                -> RateLimited (retry eligible)
//! - transport failure       -> NetworkFailure/NetworkTimeout (retry eligible)
//! - non-zero provider code  -> ProviderError (triggers fast->deep fallback)

use reqwest::header::{HeaderMap, HeaderValue};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info};

use crate::models::errors::{AppError, AppResult};
use crate::models::types::{AccountRecord, TokenHolder};
use crate::providers::{ActivityPage, HolderPage};
use crate::utils::constants::{
    DEFAULT_RPC_TIMEOUT_SECS, MAX_PAGE_SIZE, UNKNOWN_PERCENTAGE, USER_AGENT,
};

// ============================================
// WIRE TYPES
// ============================================

/// Provider response envelope: non-zero `code` is an application error
#[derive(Debug, Deserialize)]
struct ApiEnvelope {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    result: Option<serde_json::Value>,
}

/// One holder entry from the Token Holders API
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HolderItem {
    #[serde(default)]
    holder: Option<String>,
    #[serde(default)]
    account_address: Option<String>,
    /// Formatted amount as a decimal string (e.g. "154230580.018")
    #[serde(default)]
    amount: Option<String>,
    /// Ownership percentage as a string; absent when the indexer has not
    /// computed supply shares for this token
    #[serde(default)]
    percentage: Option<String>,
    #[serde(default)]
    is_contract: bool,
}

#[derive(Debug, Deserialize)]
struct HoldersResult {
    #[serde(default)]
    total: Option<u64>,
    #[serde(default)]
    data: Vec<HolderItem>,
}

/// Contract label attached to either side of a transaction
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AddressInfo {
    #[serde(default)]
    is_contract: bool,
}

/// One entry from the Account Transactions API
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TxItem {
    #[serde(default)]
    hash: String,
    #[serde(default)]
    block_number: u64,
    /// Epoch milliseconds
    #[serde(default)]
    timestamp: i64,
    #[serde(default)]
    from: String,
    #[serde(default)]
    to: String,
    #[serde(default)]
    from_address: Option<AddressInfo>,
    #[serde(default)]
    to_address: Option<AddressInfo>,
    #[serde(default)]
    method_name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TransactionsResult {
    #[serde(default)]
    data: Vec<TxItem>,
    #[serde(default)]
    next_page_cursor: Option<String>,
}

// ============================================
// CLIENT
// ============================================

/// Indexed provider REST client
pub struct IndexedClient {
    client: reqwest::Client,
    base_url: String,
}

impl IndexedClient {
    /// Create a new client. The API key is baked into default headers.
    pub fn new(base_url: String, api_key: &str) -> AppResult<Self> {
        if api_key.is_empty() {
            return Err(AppError::missing_api_key("INDEXER_API_KEY"));
        }

        let mut headers = HeaderMap::new();
        headers.insert("Content-Type", HeaderValue::from_static("application/json"));
        headers.insert("Accept", HeaderValue::from_static("application/json"));
        headers.insert(
            "x-api-key",
            HeaderValue::from_str(api_key)
                .map_err(|_| AppError::missing_api_key("INDEXER_API_KEY"))?,
        );
        headers.insert(
            reqwest::header::USER_AGENT,
            HeaderValue::from_static(USER_AGENT),
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(DEFAULT_RPC_TIMEOUT_SECS))
            .gzip(true)
            .build()
            .map_err(|e| AppError::network(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client, base_url })
    }

    /// Normalize an address for query parameters (lowercase, 0x-prefixed)
    fn normalize_address(address: &str) -> String {
        let addr = address.trim().to_lowercase();
        if addr.starts_with("0x") {
            addr
        } else {
            format!("0x{}", addr)
        }
    }

    /// Send a GET request and unwrap the provider envelope
    async fn request(
        &self,
        endpoint: &str,
        params: &[(&str, String)],
    ) -> AppResult<serde_json::Value> {
        let url = format!("{}/{}", self.base_url, endpoint);
        debug!("🔍 Indexer GET {} {:?}", endpoint, params);

        let response = self.client.get(&url).query(params).send().await?;

        let status = response.status();
        if status == 429 {
            return Err(AppError::rate_limited());
        }
        if !status.is_success() {
            return Err(AppError::network(format!("HTTP error: {}", status)));
        }

        let envelope: ApiEnvelope = response.json().await?;

        if envelope.code != 0 {
            return Err(AppError::provider(
                envelope.code,
                envelope.message.unwrap_or_else(|| "Unknown error".to_string()),
            ));
        }

        envelope
            .result
            .ok_or_else(|| AppError::provider(0, "Empty result payload"))
    }

    // ============================================
    // TOKEN HOLDERS API
    // ============================================

    /// Fetch one page of token holders.
    /// Percentage and total count are optional in the provider schema; absent
    /// percentages come back as the UNKNOWN_PERCENTAGE sentinel.
    pub async fn get_token_holders(
        &self,
        token_address: &str,
        page_index: u32,
        page_size: u32,
    ) -> AppResult<HolderPage> {
        let params = [
            ("contractAddress", Self::normalize_address(token_address)),
            ("pageIndex", page_index.max(1).to_string()),
            ("pageSize", page_size.clamp(1, MAX_PAGE_SIZE).to_string()),
        ];

        let result = self.request("token/holders", &params).await?;
        let parsed: HoldersResult = serde_json::from_value(result)?;

        let holders = parsed
            .data
            .into_iter()
            .enumerate()
            .map(|(idx, item)| {
                let rank = (page_index.max(1) - 1) * page_size + idx as u32 + 1;
                parse_holder_item(item, rank)
            })
            .collect::<Vec<_>>();

        info!(
            "📊 Indexer: {} holders (total reported: {:?})",
            holders.len(),
            parsed.total
        );

        Ok(HolderPage {
            holders,
            total: parsed.total,
        })
    }

    // ============================================
    // ACCOUNT TRANSACTIONS API
    // ============================================

    /// Fetch one page of interaction records for the token contract
    pub async fn get_account_transactions(
        &self,
        token_address: &str,
        cursor: Option<&str>,
        page_size: u32,
    ) -> AppResult<ActivityPage> {
        let mut params = vec![
            ("address", Self::normalize_address(token_address)),
            ("limit", page_size.clamp(1, MAX_PAGE_SIZE).to_string()),
        ];
        if let Some(cursor) = cursor {
            params.push(("cursor", cursor.to_string()));
        }

        let result = self.request("account/transactions", &params).await?;
        let parsed: TransactionsResult = serde_json::from_value(result)?;

        let records = parsed.data.into_iter().map(parse_tx_item).collect();

        // Empty cursor string means "no more pages"
        let next_cursor = parsed.next_page_cursor.filter(|c| !c.is_empty());

        Ok(ActivityPage {
            records,
            next_cursor,
        })
    }

    /// Accumulate recent activity records up to `limit`.
    ///
    /// Termination: empty page OR no further cursor OR accumulated count
    /// reached the limit - first condition met wins. Pages are issued
    /// strictly in cursor order.
    pub async fn recent_activity(
        &self,
        token_address: &str,
        limit: usize,
    ) -> AppResult<Vec<AccountRecord>> {
        let mut records: Vec<AccountRecord> = Vec::new();
        let mut cursor: Option<String> = None;

        while records.len() < limit {
            let remaining = (limit - records.len()).min(MAX_PAGE_SIZE as usize) as u32;
            let page = self
                .get_account_transactions(token_address, cursor.as_deref(), remaining)
                .await?;

            if page.records.is_empty() {
                break;
            }
            records.extend(page.records);

            match page.next_cursor {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        records.truncate(limit);
        info!("📊 Indexer: accumulated {} activity records", records.len());
        Ok(records)
    }
}

// ============================================
// PARSING
// ============================================

fn parse_holder_item(item: HolderItem, rank: u32) -> TokenHolder {
    let address = item
        .holder
        .or(item.account_address)
        .unwrap_or_default()
        .to_lowercase();

    let amount_str = item.amount.unwrap_or_else(|| "0".to_string());
    let balance_formatted = amount_str.parse::<f64>().unwrap_or(0.0);

    // Absent or unparseable percentage = explicit unknown, never zero
    let percentage = item
        .percentage
        .and_then(|p| p.parse::<f64>().ok())
        .unwrap_or(UNKNOWN_PERCENTAGE);

    TokenHolder {
        address,
        balance: amount_str,
        balance_formatted,
        percentage,
        rank,
        is_contract: item.is_contract,
    }
}

fn parse_tx_item(item: TxItem) -> AccountRecord {
    AccountRecord {
        tx_hash: item.hash,
        block_number: item.block_number,
        timestamp: item.timestamp,
        from_address: item.from.to_lowercase(),
        to_address: item.to.to_lowercase(),
        from_is_contract: item.from_address.unwrap_or_default().is_contract,
        to_is_contract: item.to_address.unwrap_or_default().is_contract,
        method_name: item.method_name.filter(|m| !m.is_empty()),
    }
}
