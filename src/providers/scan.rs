//! Chain Scanner Module (deep path)
//!
//! Exhaustive on-chain data acquisition when no indexer is available (or the
//! indexer failed):
//! 1. Transfer-event scan over bounded block batches (default 1000 blocks);
//!    an oversized-range rejection halves the batch and retries once, then
//!    skips the sub-range and records it as a gap - never a fatal error
//! 2. Holder set derived by replaying transfer values into a balance map
//! 3. Contract/EOA classification via eth_getCode, cached per address
//!    (the classification is immutable for a given address)
//! 4. Permission probes: tri-state owner() call, dangerous-selector bytecode
//!    scan, EIP-1967 proxy slots
//!
//! Deep-mode ownership percentages use the sum of observed replayed balances
//! as the supply basis. Holders outside the scanned range are invisible, so
//! concentration is under-estimated; metrics carry supply_basis so consumers
//! can label the figure.

use alloy_primitives::U256;
use futures_util::stream::{self, StreamExt};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::models::errors::{AppResult, ErrorCode};
use crate::models::types::{AccountRecord, BlockRange, TokenHolder};
use crate::providers::rpc::{LogEntry, RpcProvider};
use crate::providers::HolderPage;
use crate::utils::cache::{cache_key, ScoreCache};
use crate::utils::constants::{
    is_zero_address, CLASSIFICATION_TTL_SECS, MIN_LOG_BATCH_BLOCKS, SELECTOR_DECIMALS,
    SELECTOR_OWNER, SELECTOR_TOTAL_SUPPLY, TRANSFER_EVENT_TOPIC,
};

/// Decoded ERC-20 Transfer event
#[derive(Debug, Clone)]
pub struct TransferEvent {
    pub tx_hash: String,
    pub block_number: u64,
    pub from: String,
    pub to: String,
    pub value: U256,
}

/// Result of a batched log scan: decoded events plus any skipped sub-ranges
#[derive(Debug)]
pub struct ScanOutcome {
    pub events: Vec<TransferEvent>,
    /// Sub-ranges the RPC refused even after halving (logged, not fatal)
    pub gaps: Vec<BlockRange>,
}

/// Tri-state outcome of a feature probe (e.g. owner()).
/// Absent means the function genuinely does not exist - informative.
/// Failed means the chain could not be asked - NOT evidence of anything.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Probe<T> {
    Present(T),
    Absent,
    Failed(ErrorCode),
}

/// Deep-path scanner over a raw RPC provider
pub struct ChainScanner {
    rpc: Arc<RpcProvider>,
    cache: Arc<ScoreCache>,
    /// eth_getLogs batch size in blocks
    batch_blocks: u64,
}

impl ChainScanner {
    pub fn new(rpc: Arc<RpcProvider>, cache: Arc<ScoreCache>, batch_blocks: u64) -> Self {
        Self {
            rpc,
            cache,
            batch_blocks: batch_blocks.max(MIN_LOG_BATCH_BLOCKS),
        }
    }

    pub fn rpc(&self) -> &RpcProvider {
        &self.rpc
    }

    /// Current chain head
    pub async fn latest_block(&self) -> AppResult<u64> {
        self.rpc.block_number().await
    }

    // ============================================
    // TRANSFER EVENT SCAN
    // ============================================

    /// Scan Transfer events for a token over [from_block, to_block].
    ///
    /// Batches of `batch_blocks`; a "range too large" rejection halves the
    /// failing batch and retries once. If the retry also fails (or the half
    /// would drop below MIN_LOG_BATCH_BLOCKS) the sub-range is skipped and
    /// recorded as a gap.
    pub async fn scan_transfers(
        &self,
        token_address: &str,
        from_block: u64,
        to_block: u64,
    ) -> AppResult<ScanOutcome> {
        let mut events = Vec::new();
        let mut gaps = Vec::new();
        let mut current = from_block;

        info!(
            "🔎 Scanning Transfer events {} -> {} (batch: {} blocks)",
            from_block, to_block, self.batch_blocks
        );

        while current <= to_block {
            let batch_end = (current + self.batch_blocks - 1).min(to_block);

            match self.fetch_batch(token_address, current, batch_end).await {
                Ok(mut batch) => {
                    events.append(&mut batch);
                    current = batch_end + 1;
                }
                Err(e) if e.code == ErrorCode::RpcRangeTooLarge => {
                    let half = (batch_end - current + 1) / 2;
                    if half < MIN_LOG_BATCH_BLOCKS {
                        warn!(
                            "⚠️ Range {} -> {} rejected and too small to halve, skipping (gap)",
                            current, batch_end
                        );
                        gaps.push(BlockRange {
                            from_block: current,
                            to_block: batch_end,
                        });
                        current = batch_end + 1;
                        continue;
                    }

                    let half_end = current + half - 1;
                    debug!("↩️ Halving rejected range, retrying {} -> {}", current, half_end);
                    match self.fetch_batch(token_address, current, half_end).await {
                        Ok(mut batch) => {
                            events.append(&mut batch);
                            current = half_end + 1;
                        }
                        Err(retry_err) => {
                            warn!(
                                "⚠️ Halved range {} -> {} still failed ({}), skipping (gap)",
                                current,
                                half_end,
                                retry_err.code_str()
                            );
                            gaps.push(BlockRange {
                                from_block: current,
                                to_block: half_end,
                            });
                            current = half_end + 1;
                        }
                    }
                }
                // Anything else (rate limit, network) bubbles up to the
                // retry layer wrapping this scan
                Err(e) => return Err(e),
            }
        }

        info!(
            "🔎 Scan complete: {} events, {} gap(s)",
            events.len(),
            gaps.len()
        );
        Ok(ScanOutcome { events, gaps })
    }

    async fn fetch_batch(
        &self,
        token_address: &str,
        from_block: u64,
        to_block: u64,
    ) -> AppResult<Vec<TransferEvent>> {
        let logs = self
            .rpc
            .get_logs(token_address, TRANSFER_EVENT_TOPIC, from_block, to_block)
            .await?;

        Ok(logs.iter().filter_map(decode_transfer_log).collect())
    }

    // ============================================
    // HOLDER DERIVATION
    // ============================================

    /// Derive the top holders for a block range by replaying transfer values.
    /// Returns at most `page_size` holders, ranked by balance descending,
    /// with percentages computed over the observed-balance sum.
    pub async fn holders_from_range(
        &self,
        token_address: &str,
        from_block: u64,
        to_block: u64,
        page_size: u32,
    ) -> AppResult<HolderPage> {
        let outcome = self
            .scan_transfers(token_address, from_block, to_block)
            .await?;

        let balances = replay_balances(&outcome.events);
        let total_observed: U256 = balances.values().copied().fold(U256::ZERO, |acc, b| acc + b);

        let mut sorted: Vec<(String, U256)> = balances.into_iter().collect();
        // Descending balance; address ascending as the deterministic tie-break
        sorted.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

        let total_holders = sorted.len() as u64;
        sorted.truncate(page_size as usize);

        let total_f64 = u256_to_f64(total_observed);

        let mut holders = Vec::with_capacity(sorted.len());
        for (idx, (address, balance)) in sorted.into_iter().enumerate() {
            let balance_f64 = u256_to_f64(balance);
            let percentage = if total_f64 > 0.0 {
                (balance_f64 / total_f64) * 100.0
            } else {
                0.0
            };

            let is_contract = self.is_contract(&address).await.unwrap_or(false);

            holders.push(TokenHolder {
                address,
                balance: balance.to_string(),
                balance_formatted: balance_f64,
                percentage,
                rank: idx as u32 + 1,
                is_contract,
            });
        }

        Ok(HolderPage {
            holders,
            total: Some(total_holders),
        })
    }

    /// Interaction records for a block range, with contract/EOA flags
    /// resolved through the cached bytecode check
    pub async fn activity_from_range(
        &self,
        token_address: &str,
        from_block: u64,
        to_block: u64,
    ) -> AppResult<Vec<AccountRecord>> {
        let outcome = self
            .scan_transfers(token_address, from_block, to_block)
            .await?;

        // Classify each unique participant once; the per-address result is
        // cached so repeat addresses cost nothing. Bounded concurrency keeps
        // the classification burst below node rate limits.
        let mut unique: Vec<String> = Vec::new();
        {
            let mut seen: std::collections::HashSet<&str> = std::collections::HashSet::new();
            for event in &outcome.events {
                for addr in [&event.from, &event.to] {
                    if !is_zero_address(addr) && seen.insert(addr) {
                        unique.push(addr.clone());
                    }
                }
            }
        }

        let classification: HashMap<String, bool> = stream::iter(unique.into_iter().map(|addr| {
            async move {
                let flag = self.is_contract(&addr).await.unwrap_or(false);
                (addr, flag)
            }
        }))
        .buffer_unordered(8)
        .collect()
        .await;

        let records = outcome
            .events
            .into_iter()
            .map(|event| AccountRecord {
                tx_hash: event.tx_hash,
                block_number: event.block_number,
                // Log entries carry no timestamps; deep-mode windows are
                // expressed in blocks, not record time
                timestamp: 0,
                from_is_contract: *classification.get(&event.from).unwrap_or(&false),
                to_is_contract: *classification.get(&event.to).unwrap_or(&false),
                from_address: event.from,
                to_address: event.to,
                method_name: None,
            })
            .collect();

        Ok(records)
    }

    // ============================================
    // CLASSIFICATION & PROBES
    // ============================================

    /// Bytecode-presence check: EOA = empty code. Cached because the
    /// classification never changes for a given address.
    pub async fn is_contract(&self, address: &str) -> AppResult<bool> {
        let key = cache_key("classify", address, &[]);
        let rpc = self.rpc.clone();
        let address = address.to_string();
        self.cache
            .with_cache(&key, CLASSIFICATION_TTL_SECS, || async move {
                let code = rpc.get_code(&address).await?;
                Ok(code.len() > 2 && code != "0x")
            })
            .await
    }

    /// Deployed bytecode, cached per address
    pub async fn bytecode(&self, address: &str) -> AppResult<String> {
        let key = cache_key("bytecode", address, &[]);
        let rpc = self.rpc.clone();
        let address = address.to_string();
        self.cache
            .with_cache(&key, CLASSIFICATION_TTL_SECS, || async move {
                rpc.get_code(&address).await
            })
            .await
    }

    /// Tri-state owner() probe. A revert or empty return means the function
    /// is absent; a transport/RPC failure is reported as Failed so callers
    /// never mistake an outage for a renounced owner. A zero-address return
    /// is Present (the function exists, ownership renounced).
    pub async fn probe_owner(&self, token_address: &str) -> Probe<String> {
        match self.rpc.eth_call(token_address, SELECTOR_OWNER).await {
            Ok(ret) => match topic_to_address(&ret) {
                Some(addr) => Probe::Present(addr),
                None => Probe::Absent,
            },
            Err(e) if e.code == ErrorCode::RpcExecutionReverted => Probe::Absent,
            Err(e) => {
                warn!("⚠️ owner() probe failed: {}", e);
                Probe::Failed(e.code)
            }
        }
    }

    /// Read an EIP-1967 slot as an address; None when the slot is zero
    pub async fn read_slot_address(
        &self,
        token_address: &str,
        slot: &str,
    ) -> AppResult<Option<String>> {
        let word = self.rpc.get_storage_at(token_address, slot).await?;
        Ok(decode_address_word(&word))
    }

    /// Human-readable total supply (totalSupply / 10^decimals).
    /// None when the contract does not expose totalSupply().
    pub async fn total_supply_human(&self, token_address: &str) -> AppResult<Option<f64>> {
        let supply_ret = match self.rpc.eth_call(token_address, SELECTOR_TOTAL_SUPPLY).await {
            Ok(ret) => ret,
            Err(e) if e.code == ErrorCode::RpcExecutionReverted => return Ok(None),
            Err(e) => return Err(e),
        };

        let supply = match parse_u256_word(&supply_ret) {
            Some(v) => v,
            None => return Ok(None),
        };

        // decimals() missing => assume the ERC-20 default of 18
        let decimals = match self.rpc.eth_call(token_address, SELECTOR_DECIMALS).await {
            Ok(ret) => parse_u256_word(&ret)
                .map(|v| v.min(U256::from(77u8)))
                .map(|v| v.to::<u64>() as u32)
                .unwrap_or(18),
            Err(_) => 18,
        };

        Ok(Some(u256_to_f64(supply) / 10f64.powi(decimals as i32)))
    }
}

// ============================================
// DECODING HELPERS
// ============================================

/// Decode a Transfer log: topics[1] = from, topics[2] = to, data = value
fn decode_transfer_log(log: &LogEntry) -> Option<TransferEvent> {
    if log.topics.len() < 3 {
        return None;
    }

    let from = topic_to_address(&log.topics[1])?;
    let to = topic_to_address(&log.topics[2])?;
    let value = parse_u256_word(&log.data).unwrap_or(U256::ZERO);

    Some(TransferEvent {
        tx_hash: log.transaction_hash.clone(),
        block_number: log.block_number_u64(),
        from,
        to,
        value,
    })
}

/// Extract the address from a 32-byte topic/word (last 20 bytes)
fn topic_to_address(topic: &str) -> Option<String> {
    let hex = topic.trim_start_matches("0x");
    if hex.len() < 40 {
        return None;
    }
    Some(format!("0x{}", hex[hex.len() - 40..].to_lowercase()))
}

/// Decode a returned 32-byte word as an address; None for zero/empty
fn decode_address_word(word: &str) -> Option<String> {
    let addr = topic_to_address(word)?;
    if is_zero_address(&addr) {
        None
    } else {
        Some(addr)
    }
}

/// Parse a 0x-hex 32-byte word into U256
fn parse_u256_word(word: &str) -> Option<U256> {
    let hex = word.trim_start_matches("0x");
    if hex.is_empty() {
        return None;
    }
    U256::from_str_radix(hex, 16).ok()
}

/// Lossy U256 -> f64 for percentage math
fn u256_to_f64(value: U256) -> f64 {
    value
        .to_string()
        .parse::<f64>()
        .unwrap_or(f64::MAX)
}

/// Replay transfer values into a balance map. The zero address denotes
/// mint/burn and never appears as a holder. Balances saturate at zero for
/// addresses whose inbound transfers predate the scanned range.
pub fn replay_balances(events: &[TransferEvent]) -> HashMap<String, U256> {
    let mut balances: HashMap<String, U256> = HashMap::new();

    for event in events {
        if !is_zero_address(&event.from) {
            let entry = balances.entry(event.from.clone()).or_insert(U256::ZERO);
            *entry = entry.saturating_sub(event.value);
        }
        if !is_zero_address(&event.to) {
            let entry = balances.entry(event.to.clone()).or_insert(U256::ZERO);
            *entry = entry.saturating_add(event.value);
        }
    }

    balances.retain(|_, balance| *balance > U256::ZERO);
    balances
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::constants::ZERO_ADDRESS;

    fn event(from: &str, to: &str, value: u64) -> TransferEvent {
        TransferEvent {
            tx_hash: "0xtx".to_string(),
            block_number: 1,
            from: from.to_string(),
            to: to.to_string(),
            value: U256::from(value),
        }
    }

    #[test]
    fn test_replay_balances_basic() {
        let events = vec![
            event(ZERO_ADDRESS, "0xaaa", 1000), // mint
            event("0xaaa", "0xbbb", 400),
            event("0xbbb", "0xccc", 100),
        ];

        let balances = replay_balances(&events);
        assert_eq!(balances["0xaaa"], U256::from(600u64));
        assert_eq!(balances["0xbbb"], U256::from(300u64));
        assert_eq!(balances["0xccc"], U256::from(100u64));
        // The zero address is mint/burn, never a holder
        assert!(!balances.contains_key(ZERO_ADDRESS));
    }

    #[test]
    fn test_replay_drops_zero_balances() {
        let events = vec![
            event(ZERO_ADDRESS, "0xaaa", 500),
            event("0xaaa", "0xbbb", 500), // 0xaaa sent everything away
        ];

        let balances = replay_balances(&events);
        assert!(!balances.contains_key("0xaaa"));
        assert_eq!(balances["0xbbb"], U256::from(500u64));
    }

    #[test]
    fn test_replay_saturates_on_partial_history() {
        // 0xaaa's inbound transfer happened before the scanned range:
        // the outbound leg alone must not underflow
        let events = vec![event("0xaaa", "0xbbb", 250)];

        let balances = replay_balances(&events);
        assert!(!balances.contains_key("0xaaa"));
        assert_eq!(balances["0xbbb"], U256::from(250u64));
    }

    #[test]
    fn test_topic_to_address() {
        let topic = "0x000000000000000000000000dAC17F958D2ee523a2206206994597C13D831ec7";
        assert_eq!(
            topic_to_address(topic).unwrap(),
            "0xdac17f958d2ee523a2206206994597c13d831ec7"
        );
        assert!(topic_to_address("0x1234").is_none());
    }

    #[test]
    fn test_decode_address_word_zero_is_none() {
        let zero_word = format!("0x{}", "0".repeat(64));
        assert_eq!(decode_address_word(&zero_word), None);
        assert_eq!(decode_address_word("0x"), None);
    }

    #[test]
    fn test_parse_u256_word() {
        assert_eq!(
            parse_u256_word("0x00000000000000000000000000000000000000000000000000000000000003e8"),
            Some(U256::from(1000u64))
        );
        assert_eq!(parse_u256_word("0x"), None);
    }

    #[test]
    fn test_u256_to_f64() {
        assert_eq!(u256_to_f64(U256::from(1_000_000u64)), 1_000_000.0);
        assert_eq!(u256_to_f64(U256::ZERO), 0.0);
    }

    #[test]
    fn test_decode_transfer_log() {
        let log = LogEntry {
            address: "0xtoken".to_string(),
            topics: vec![
                TRANSFER_EVENT_TOPIC.to_string(),
                "0x000000000000000000000000aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa".to_string(),
                "0x000000000000000000000000bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb".to_string(),
            ],
            data: "0x0000000000000000000000000000000000000000000000000000000000000064".to_string(),
            block_number: "0x10".to_string(),
            transaction_hash: "0xhash".to_string(),
        };

        let event = decode_transfer_log(&log).unwrap();
        assert_eq!(event.from, "0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa");
        assert_eq!(event.to, "0xbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb");
        assert_eq!(event.value, U256::from(100u64));
        assert_eq!(event.block_number, 16);

        // A log with missing topics is ignored, not an error
        let anonymous = LogEntry {
            topics: vec![TRANSFER_EVENT_TOPIC.to_string()],
            ..log
        };
        assert!(decode_transfer_log(&anonymous).is_none());
    }
}
