//! Unique-EOA Activity Analyzer (40 points)
//!
//! Counts unique externally-owned origin addresses interacting with the
//! token inside a time window. On high-TPS chains transaction volume is
//! cheap to fake but distinct funded EOAs are not, which is what makes this
//! the heaviest-weighted dimension. The classification is heuristic.
//!
//! - fast: indexer records carry per-address contract labels
//! - deep: transfer-event replay; contract/EOA resolved through the cached
//!   bytecode-presence check
//!
//! Score bands over normalized = unique_eoa_count / window_hours:
//!   normalized >= 300        -> 40 (low risk)
//!   50 <= normalized < 300   -> 20 + (normalized-50)/250*20 (medium risk)
//!   normalized < 50          -> normalized/50*20 (high risk)
//!
//! Zero records scores 0 with HIGH risk, not unknown: no activity is itself
//! a negative signal, distinct from "no data".

use serde_json::json;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{info, warn};

use crate::models::errors::AppResult;
use crate::models::types::{AccountRecord, AnalyzerResult, RiskLevel};
use crate::providers::SourceAdapter;
use crate::utils::cache::{cache_key, ScoreCache};
use crate::utils::constants::{is_zero_address, EOA_MAX_SCORE};

/// Unique-EOA activity analyzer
pub struct EoaActivityAnalyzer {
    cache: Arc<ScoreCache>,
    cache_ttl_secs: u64,
}

impl EoaActivityAnalyzer {
    pub fn new(cache: Arc<ScoreCache>, cache_ttl_secs: u64) -> Self {
        Self {
            cache,
            cache_ttl_secs,
        }
    }

    /// Analyze unique-EOA activity through the given adapter
    pub async fn analyze(
        &self,
        adapter: &SourceAdapter,
        token_address: &str,
        time_window_hours: u32,
        limit: usize,
    ) -> AppResult<AnalyzerResult> {
        let source = adapter.kind();
        let window_hours = time_window_hours.max(1);

        let range_params = adapter
            .block_range()
            .map(|r| vec![r.from_block.to_string(), r.to_block.to_string()])
            .unwrap_or_default();
        let limit_str = limit.to_string();
        let mut params: Vec<&str> = vec![source.as_str(), &limit_str];
        params.extend(range_params.iter().map(|s| s.as_str()));
        let key = cache_key("activity", token_address, &params);

        let records: Vec<AccountRecord> = self
            .cache
            .with_cache(&key, self.cache_ttl_secs, || {
                adapter.collect_activity(token_address, limit)
            })
            .await?;

        if records.is_empty() {
            // No activity is a negative signal in its own right
            warn!("⚠️ No activity records for {}", token_address);
            return Ok(AnalyzerResult::new(
                0.0,
                EOA_MAX_SCORE,
                RiskLevel::HighRisk,
                source,
                json!({
                    "unique_eoa_count": 0,
                    "total_addresses": 0,
                    "contract_addresses": 0,
                    "eoa_percentage": 0.0,
                    "records_analyzed": 0,
                    "time_window_hours": window_hours,
                }),
            )
            .with_note("No activity records found"));
        }

        let stats = ActivityStats::from_records(&records);
        let normalized = stats.unique_eoa_count as f64 / window_hours as f64;
        let score = calculate_score(normalized);
        let risk_level = risk_level(normalized);

        info!(
            "📊 EOA activity: {} unique EOAs / {}h ({:.1}/h) -> score {:.2}/{} ({})",
            stats.unique_eoa_count,
            window_hours,
            normalized,
            score,
            EOA_MAX_SCORE,
            risk_level.as_str()
        );

        let mut metrics = json!({
            "unique_eoa_count": stats.unique_eoa_count,
            "total_addresses": stats.total_addresses,
            "contract_addresses": stats.contract_addresses,
            "eoa_percentage": stats.eoa_percentage(),
            "records_analyzed": records.len(),
            "normalized_per_hour": (normalized * 100.0).round() / 100.0,
            "time_window_hours": window_hours,
            "activity_profile": stats.profile_json(),
        });
        if let Some(range) = adapter.block_range() {
            metrics["blocks_analyzed"] =
                json!(format!("{} - {}", range.from_block, range.to_block));
        }

        Ok(AnalyzerResult::new(
            score,
            EOA_MAX_SCORE,
            risk_level,
            source,
            metrics,
        ))
    }
}

/// Address-set statistics over one activity window
pub struct ActivityStats {
    /// Unique non-contract origin addresses (the scored quantity)
    pub unique_eoa_count: usize,
    /// Unique contract origin addresses
    pub contract_addresses: usize,
    /// Unique participants on either side, for context
    pub total_addresses: usize,
    /// Transactions per unique origin EOA
    per_eoa_tx: HashMap<String, usize>,
}

impl ActivityStats {
    /// Build the unique origin-address sets. The zero address denotes
    /// mint/burn and is excluded from every set on every path.
    pub fn from_records(records: &[AccountRecord]) -> Self {
        let mut eoa_origins: HashSet<&str> = HashSet::new();
        let mut contract_origins: HashSet<&str> = HashSet::new();
        let mut participants: HashSet<&str> = HashSet::new();
        let mut per_eoa_tx: HashMap<String, usize> = HashMap::new();

        for record in records {
            let from = record.from_address.as_str();
            let to = record.to_address.as_str();

            if !is_zero_address(from) {
                participants.insert(from);
                if record.from_is_eoa() {
                    eoa_origins.insert(from);
                    *per_eoa_tx.entry(record.from_address.clone()).or_insert(0) += 1;
                } else {
                    contract_origins.insert(from);
                }
            }
            if !is_zero_address(to) {
                participants.insert(to);
            }
        }

        Self {
            unique_eoa_count: eoa_origins.len(),
            contract_addresses: contract_origins.len(),
            total_addresses: participants.len(),
            per_eoa_tx,
        }
    }

    pub fn eoa_percentage(&self) -> f64 {
        if self.total_addresses == 0 {
            return 0.0;
        }
        let pct = self.unique_eoa_count as f64 / self.total_addresses as f64 * 100.0;
        (pct * 100.0).round() / 100.0
    }

    /// Wash-trading profile: many transactions from few EOAs reads very
    /// differently from one transaction each across many EOAs
    pub fn profile_json(&self) -> serde_json::Value {
        if self.per_eoa_tx.is_empty() {
            return json!({
                "avg_tx_per_eoa": 0.0,
                "high_frequency_eoa": 0,
                "single_tx_eoa": 0,
            });
        }

        let total_tx: usize = self.per_eoa_tx.values().sum();
        let count = self.per_eoa_tx.len();
        let high_freq = self.per_eoa_tx.values().filter(|&&n| n > 10).count();
        let single_tx = self.per_eoa_tx.values().filter(|&&n| n == 1).count();

        json!({
            "avg_tx_per_eoa": ((total_tx as f64 / count as f64) * 100.0).round() / 100.0,
            "high_frequency_eoa": high_freq,
            "single_tx_eoa": single_tx,
        })
    }
}

/// Activity score over the 1-hour-normalized unique EOA count
pub fn calculate_score(normalized: f64) -> f64 {
    if normalized >= 300.0 {
        40.0
    } else if normalized >= 50.0 {
        20.0 + (normalized - 50.0) / 250.0 * 20.0
    } else {
        (normalized / 50.0) * 20.0
    }
}

/// Risk bands on the normalized count
pub fn risk_level(normalized: f64) -> RiskLevel {
    if normalized >= 300.0 {
        RiskLevel::LowRisk
    } else if normalized >= 50.0 {
        RiskLevel::MediumRisk
    } else {
        RiskLevel::HighRisk
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::constants::ZERO_ADDRESS;

    fn record(from: &str, to: &str, from_is_contract: bool) -> AccountRecord {
        AccountRecord {
            tx_hash: "0xtx".to_string(),
            block_number: 1,
            timestamp: 1_700_000_000_000,
            from_address: from.to_string(),
            to_address: to.to_string(),
            from_is_contract,
            to_is_contract: false,
            method_name: None,
        }
    }

    #[test]
    fn test_score_bands() {
        // Scenario B: 500 unique EOAs in one hour -> full 40 points
        assert_eq!(calculate_score(500.0), 40.0);
        assert_eq!(calculate_score(300.0), 40.0);
        // Medium band midpoint: 175 -> 20 + 125/250*20 = 30
        assert!((calculate_score(175.0) - 30.0).abs() < 1e-9);
        // High band: 25 -> 10
        assert!((calculate_score(25.0) - 10.0).abs() < 1e-9);
        assert_eq!(calculate_score(0.0), 0.0);
    }

    #[test]
    fn test_score_continuity_at_band_edges() {
        // High-band formula at 50 equals the medium-band value at 50
        let high_side = (50.0_f64 / 50.0) * 20.0;
        assert!((high_side - calculate_score(50.0)).abs() < 1e-9);

        // Medium-band formula at 300 equals the low-band plateau
        let medium_side = 20.0 + (300.0_f64 - 50.0) / 250.0 * 20.0;
        assert!((medium_side - calculate_score(300.0)).abs() < 1e-9);
    }

    #[test]
    fn test_score_monotonic() {
        let mut prev = -1.0;
        for i in 0..=700 {
            let score = calculate_score(i as f64);
            assert!(
                score >= prev,
                "score decreased at normalized={} ({} < {})",
                i,
                score,
                prev
            );
            prev = score;
        }
    }

    #[test]
    fn test_risk_bands() {
        assert_eq!(risk_level(400.0), RiskLevel::LowRisk);
        assert_eq!(risk_level(300.0), RiskLevel::LowRisk);
        assert_eq!(risk_level(100.0), RiskLevel::MediumRisk);
        assert_eq!(risk_level(50.0), RiskLevel::MediumRisk);
        assert_eq!(risk_level(49.9), RiskLevel::HighRisk);
        assert_eq!(risk_level(0.0), RiskLevel::HighRisk);
    }

    #[test]
    fn test_stats_count_unique_eoa_origins() {
        let records = vec![
            record("0xaaa", "0xddd", false),
            record("0xaaa", "0xeee", false), // repeat origin, counted once
            record("0xbbb", "0xddd", false),
            record("0xccc", "0xddd", true), // contract origin
        ];

        let stats = ActivityStats::from_records(&records);
        assert_eq!(stats.unique_eoa_count, 2);
        assert_eq!(stats.contract_addresses, 1);
        // Participants: aaa, bbb, ccc, ddd, eee
        assert_eq!(stats.total_addresses, 5);
    }

    #[test]
    fn test_zero_address_excluded_everywhere() {
        let records = vec![
            record(ZERO_ADDRESS, "0xaaa", false), // mint
            record("0xaaa", ZERO_ADDRESS, false), // burn
        ];

        let stats = ActivityStats::from_records(&records);
        assert_eq!(stats.unique_eoa_count, 1);
        assert_eq!(stats.total_addresses, 1);
    }

    #[test]
    fn test_activity_profile() {
        let mut records = vec![record("0xsingle", "0xd", false)];
        for _ in 0..12 {
            records.push(record("0xbusy", "0xd", false));
        }

        let stats = ActivityStats::from_records(&records);
        let profile = stats.profile_json();
        assert_eq!(profile["high_frequency_eoa"], 1);
        assert_eq!(profile["single_tx_eoa"], 1);
    }

    #[test]
    fn test_eoa_percentage_zero_safe() {
        let stats = ActivityStats::from_records(&[]);
        assert_eq!(stats.eoa_percentage(), 0.0);
    }
}
