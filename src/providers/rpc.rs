//! JSON-RPC Client Module
//!
//! Raw JSON-RPC over HTTP for the deep scoring path:
//! 1. eth_getLogs for Transfer event scans (bounded block ranges)
//! 2. eth_getCode for contract/EOA classification
//! 3. eth_getStorageAt for EIP-1967 proxy slots
//! 4. eth_call for owner()/totalSupply()/decimals() probes
//!
//! Error classification happens HERE, once: HTTP 429 and provider throttle
//! codes become RateLimited, node error objects become RpcError (or
//! RpcRangeTooLarge for oversized eth_getLogs ranges), transport failures
//! become NetworkFailure/NetworkTimeout. Callers never parse error strings.
//!
//! Retry policy lives in utils/retry.rs; every method here is one attempt.

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_ENCODING, USER_AGENT};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

use crate::models::errors::{AppError, AppResult};
use crate::utils::constants::{DEFAULT_RPC_TIMEOUT_SECS, USER_AGENT as USER_AGENT_CONST};

/// JSON-RPC provider with a primary and an optional fallback endpoint
#[derive(Clone)]
pub struct RpcProvider {
    /// Primary RPC URL
    primary_url: String,
    /// Fallback RPC URL (public node), tried on transport failures only
    fallback_url: Option<String>,
    /// HTTP client with custom headers (gzip enabled)
    client: reqwest::Client,
}

impl RpcProvider {
    /// Create a new RPC provider
    pub fn new(primary_url: String, fallback_url: Option<String>) -> AppResult<Self> {
        let client = Self::build_client()?;
        Ok(Self {
            primary_url,
            fallback_url,
            client,
        })
    }

    /// Build HTTP client with gzip compression for large log responses
    fn build_client() -> AppResult<reqwest::Client> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_CONST));
        headers.insert("Content-Type", HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT_ENCODING, HeaderValue::from_static("gzip"));

        reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(DEFAULT_RPC_TIMEOUT_SECS))
            .gzip(true)
            .build()
            .map_err(|e| AppError::network(format!("Failed to build HTTP client: {}", e)))
    }

    /// Execute a JSON-RPC call. Primary endpoint first; the fallback is only
    /// consulted on transport failures (a node error object is authoritative).
    pub async fn call<T: for<'de> Deserialize<'de>>(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> AppResult<T> {
        let payload = serde_json::json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": 1
        });

        match self.execute_call::<T>(&self.primary_url, &payload).await {
            Ok(result) => Ok(result),
            Err(e) if e.is_retryable() && !e.is_rate_limit() => {
                if let Some(ref fallback) = self.fallback_url {
                    warn!("⚠️ Primary RPC failed ({}), trying fallback", e.code_str());
                    self.execute_call::<T>(fallback, &payload).await
                } else {
                    Err(e)
                }
            }
            Err(e) => Err(e),
        }
    }

    /// Execute single RPC call against one endpoint
    async fn execute_call<T: for<'de> Deserialize<'de>>(
        &self,
        url: &str,
        payload: &serde_json::Value,
    ) -> AppResult<T> {
        debug!("📡 RPC {} -> {}", payload["method"], mask_url(url));

        let response = self.client.post(url).json(payload).send().await?;

        let status = response.status();
        if status == 429 {
            return Err(AppError::rate_limited());
        }
        if !status.is_success() {
            return Err(AppError::network(format!("HTTP error: {}", status)));
        }

        let json: RpcResponse<T> = response
            .json()
            .await
            .map_err(|e| AppError::network(format!("Failed to read response: {}", e)))?;

        if let Some(error) = json.error {
            return Err(error.into_app_error());
        }

        json.result
            .ok_or_else(|| AppError::rpc(0, "No result in response"))
    }

    // ============================================
    // CHAIN READS
    // ============================================

    /// Current block height
    pub async fn block_number(&self) -> AppResult<u64> {
        let hex: String = self.call("eth_blockNumber", serde_json::json!([])).await?;
        parse_hex_u64(&hex)
    }

    /// Deployed bytecode at an address ("0x" for EOAs)
    pub async fn get_code(&self, address: &str) -> AppResult<String> {
        self.call("eth_getCode", serde_json::json!([address, "latest"]))
            .await
    }

    /// Raw 32-byte storage slot
    pub async fn get_storage_at(&self, address: &str, slot: &str) -> AppResult<String> {
        self.call("eth_getStorageAt", serde_json::json!([address, slot, "latest"]))
            .await
    }

    /// eth_call against a contract with pre-encoded calldata
    pub async fn eth_call(&self, to: &str, data: &str) -> AppResult<String> {
        self.call(
            "eth_call",
            serde_json::json!([{ "to": to, "data": data }, "latest"]),
        )
        .await
    }

    /// Event logs for one address + topic over a block range
    pub async fn get_logs(
        &self,
        address: &str,
        topic0: &str,
        from_block: u64,
        to_block: u64,
    ) -> AppResult<Vec<LogEntry>> {
        self.call(
            "eth_getLogs",
            serde_json::json!([{
                "address": address,
                "topics": [topic0],
                "fromBlock": to_hex_quantity(from_block),
                "toBlock": to_hex_quantity(to_block),
            }]),
        )
        .await
    }

    /// Get RPC URL (masked for logging)
    pub fn masked_url(&self) -> String {
        mask_url(&self.primary_url)
    }
}

/// JSON-RPC response structure
#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    #[allow(dead_code)]
    jsonrpc: Option<String>,
    result: Option<T>,
    error: Option<RpcErrorObject>,
}

/// JSON-RPC error object
#[derive(Debug, Clone, Deserialize)]
pub struct RpcErrorObject {
    pub code: i64,
    pub message: String,
}

impl RpcErrorObject {
    /// Throttle signal (code -32005 or a rate-limit message)
    pub fn is_rate_limit(&self) -> bool {
        self.code == -32005 || self.message.to_lowercase().contains("rate limit")
    }

    /// Oversized eth_getLogs range; phrasing varies per node implementation
    pub fn is_range_too_large(&self) -> bool {
        let msg = self.message.to_lowercase();
        (msg.contains("range") && (msg.contains("too large") || msg.contains("too wide")))
            || msg.contains("exceed maximum block range")
            || msg.contains("query returned more than")
    }

    /// execution revert / missing function (legitimate absence, not failure)
    pub fn is_execution_reverted(&self) -> bool {
        self.code == 3 || self.message.to_lowercase().contains("revert")
    }

    fn into_app_error(self) -> AppError {
        if self.is_rate_limit() {
            AppError::rate_limited()
        } else if self.is_range_too_large() {
            AppError::new(
                crate::models::errors::ErrorCode::RpcRangeTooLarge,
                format!("RPC rejected range: {}", self.message),
            )
        } else if self.is_execution_reverted() {
            AppError::new(
                crate::models::errors::ErrorCode::RpcExecutionReverted,
                self.message,
            )
        } else {
            AppError::rpc(self.code, self.message)
        }
    }
}

/// One eth_getLogs entry (only the fields the scanner consumes)
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub address: String,
    pub topics: Vec<String>,
    pub data: String,
    pub block_number: String,
    pub transaction_hash: String,
}

impl LogEntry {
    pub fn block_number_u64(&self) -> u64 {
        parse_hex_u64(&self.block_number).unwrap_or(0)
    }
}

// ============================================
// HEX HELPERS
// ============================================

/// Parse a 0x-prefixed hex quantity
pub fn parse_hex_u64(hex: &str) -> AppResult<u64> {
    let trimmed = hex.trim_start_matches("0x");
    u64::from_str_radix(trimmed, 16)
        .map_err(|e| AppError::rpc(0, format!("Invalid hex quantity '{}': {}", hex, e)))
}

/// Format a block number as a 0x-prefixed hex quantity
pub fn to_hex_quantity(value: u64) -> String {
    format!("0x{:x}", value)
}

fn mask_url(url: &str) -> String {
    // API keys ride in the URL path; never log them
    if let Some(idx) = url.rfind('/') {
        if idx > 8 && url.len() - idx > 16 {
            return format!("{}/***HIDDEN***", &url[..idx]);
        }
    }
    url.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_parsing() {
        assert_eq!(parse_hex_u64("0x10").unwrap(), 16);
        assert_eq!(parse_hex_u64("0x0").unwrap(), 0);
        assert_eq!(parse_hex_u64("1a").unwrap(), 26);
        assert!(parse_hex_u64("0xzz").is_err());
    }

    #[test]
    fn test_hex_quantity_roundtrip() {
        assert_eq!(to_hex_quantity(0), "0x0");
        assert_eq!(to_hex_quantity(50_000), "0xc350");
        assert_eq!(parse_hex_u64(&to_hex_quantity(123_456)).unwrap(), 123_456);
    }

    #[test]
    fn test_rpc_error_classification() {
        let rate_limit = RpcErrorObject {
            code: -32005,
            message: "Rate limit exceeded".to_string(),
        };
        assert!(rate_limit.is_rate_limit());

        let range = RpcErrorObject {
            code: -32602,
            message: "block range too large".to_string(),
        };
        assert!(range.is_range_too_large());
        assert!(!range.is_rate_limit());

        let revert = RpcErrorObject {
            code: 3,
            message: "execution reverted".to_string(),
        };
        assert!(revert.is_execution_reverted());
    }

    #[test]
    fn test_error_object_conversion() {
        let err = RpcErrorObject {
            code: -32005,
            message: "rate limit".to_string(),
        }
        .into_app_error();
        assert!(err.is_rate_limit());

        let err = RpcErrorObject {
            code: -32602,
            message: "query exceed maximum block range".to_string(),
        }
        .into_app_error();
        assert_eq!(
            err.code,
            crate::models::errors::ErrorCode::RpcRangeTooLarge
        );
    }

    #[test]
    fn test_url_masking() {
        let masked = mask_url("https://node.example.org/v1/abcdef0123456789abcdef");
        assert!(masked.ends_with("***HIDDEN***"));
        assert!(!masked.contains("abcdef0123456789"));
    }

    #[test]
    fn test_log_entry_parsing() {
        let json = r#"{
            "address": "0x3bd359c1119da7da1d913d1c4d2b7c461115433a",
            "topics": [
                "0xddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef",
                "0x000000000000000000000000a0b86991c6218b36c1d19d4a2e9eb0ce3606eb48",
                "0x000000000000000000000000dac17f958d2ee523a2206206994597c13d831ec7"
            ],
            "data": "0x00000000000000000000000000000000000000000000000000000000000003e8",
            "blockNumber": "0x1b4",
            "transactionHash": "0xabc123"
        }"#;

        let entry: LogEntry = serde_json::from_str(json).unwrap();
        assert_eq!(entry.block_number_u64(), 436);
        assert_eq!(entry.topics.len(), 3);
    }
}
