//! Holder Concentration Analyzer (30 points)
//!
//! Measures sell-pressure risk from the share of supply held by the ten
//! largest holders:
//! - fast: one indexer call returns the top holders, sometimes without
//!   ownership percentages (the indexer has not computed supply shares);
//!   in that case total supply is read once from chain and every holder's
//!   percentage is rebuilt in a single pass
//! - deep: holders derived from a transfer-event replay over a block range,
//!   percentages over the observed-balance sum
//!
//! Score bands (piecewise linear over top10 percentage p):
//!   p <= 20        -> 30
//!   20 < p <= 40   -> 30 - (p-20)*0.5
//!   40 < p <= 70   -> 20 - (p-40)*(10/30)
//!   p > 70         -> max(3, 10 - (p-70)*(7/30))

use serde_json::json;
use std::sync::Arc;
use tracing::{info, warn};

use crate::models::errors::AppResult;
use crate::models::types::{AnalyzerResult, RiskLevel, TokenHolder};
use crate::providers::{ChainScanner, HolderPage, SourceAdapter};
use crate::utils::cache::{cache_key, ScoreCache};
use crate::utils::constants::{HOLDER_MAX_SCORE, TOP_HOLDER_COUNT};

/// Holder concentration analyzer
pub struct HolderAnalyzer {
    cache: Arc<ScoreCache>,
    scanner: Arc<ChainScanner>,
    cache_ttl_secs: u64,
}

impl HolderAnalyzer {
    pub fn new(cache: Arc<ScoreCache>, scanner: Arc<ChainScanner>, cache_ttl_secs: u64) -> Self {
        Self {
            cache,
            scanner,
            cache_ttl_secs,
        }
    }

    /// Analyze holder concentration through the given adapter
    pub async fn analyze(
        &self,
        adapter: &SourceAdapter,
        token_address: &str,
    ) -> AppResult<AnalyzerResult> {
        let source = adapter.kind();

        // Cache key carries the source kind, page size and (for deep mode)
        // the scanned range - different parameters never share a slot
        let range_params = adapter
            .block_range()
            .map(|r| vec![r.from_block.to_string(), r.to_block.to_string()])
            .unwrap_or_default();
        let page_size_str = TOP_HOLDER_COUNT.to_string();
        let mut params: Vec<&str> = vec![source.as_str(), &page_size_str];
        params.extend(range_params.iter().map(|s| s.as_str()));
        let key = cache_key("holders", token_address, &params);

        let page: HolderPage = self
            .cache
            .with_cache(&key, self.cache_ttl_secs, || {
                adapter.fetch_holders(token_address, TOP_HOLDER_COUNT as u32)
            })
            .await?;

        if page.holders.is_empty() {
            // Partial data, not an exception: zero score, unknown level
            warn!("⚠️ No holders found for {}", token_address);
            return Ok(AnalyzerResult::new(
                0.0,
                HOLDER_MAX_SCORE,
                RiskLevel::Unknown,
                source,
                json!({
                    "total_holders": 0,
                    "top10_percentage": 0.0,
                    "top10_holders": [],
                }),
            )
            .with_note("No holders found"));
        }

        // Fast mode may mark percentages unknown; rebuild them once from an
        // on-chain total-supply read. The rebuilt list fully replaces the
        // fetched one - percentages are never adjusted in place.
        let (holders, supply_basis) = if page.holders[0].percentage_known() {
            let basis = match source {
                crate::models::types::DataSourceTag::Deep => "observed_balances",
                _ => "provider",
            };
            (page.holders, basis)
        } else {
            info!("ℹ️ Indexer returned no ownership percentages, reading total supply from chain");
            let supply = self
                .scanner
                .total_supply_human(token_address)
                .await
                .unwrap_or(None);
            (recompute_percentages(page.holders, supply), "total_supply")
        };

        let top10_percentage = top10_percentage(&holders);
        let score = calculate_score(top10_percentage);
        let risk_level = risk_level(top10_percentage);

        let contract_holder_count = holders.iter().filter(|h| h.is_contract).count();

        info!(
            "📊 Holder concentration: top10 {:.2}% -> score {:.2}/{} ({})",
            top10_percentage,
            score,
            HOLDER_MAX_SCORE,
            risk_level.as_str()
        );

        let metrics = json!({
            "total_holders": page.total,
            "top10_percentage": round2(top10_percentage),
            "contract_holder_count": contract_holder_count,
            "supply_basis": supply_basis,
            "top10_holders": format_top_holders(&holders),
        });

        Ok(AnalyzerResult::new(
            score,
            HOLDER_MAX_SCORE,
            risk_level,
            source,
            metrics,
        ))
    }
}

/// Rebuild every holder's percentage from a total-supply read.
/// Supply unavailable or zero => every percentage becomes 0.0 (never NaN or
/// negative). Returns a fresh list; the input is consumed.
pub fn recompute_percentages(holders: Vec<TokenHolder>, total_supply: Option<f64>) -> Vec<TokenHolder> {
    let supply = total_supply.unwrap_or(0.0);
    holders
        .into_iter()
        .map(|h| {
            let percentage = if supply > 0.0 {
                (h.balance_formatted / supply) * 100.0
            } else {
                0.0
            };
            TokenHolder { percentage, ..h }
        })
        .collect()
}

/// Sum of the top-10 percentages, clamped into [0, 100].
/// Holders arrive ranked; re-sort by formatted balance to stay correct for
/// unordered input.
pub fn top10_percentage(holders: &[TokenHolder]) -> f64 {
    let mut sorted: Vec<&TokenHolder> = holders.iter().collect();
    sorted.sort_by(|a, b| {
        b.balance_formatted
            .partial_cmp(&a.balance_formatted)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let sum: f64 = sorted
        .iter()
        .take(TOP_HOLDER_COUNT)
        .map(|h| h.percentage.max(0.0))
        .sum();
    sum.clamp(0.0, 100.0)
}

/// Piecewise-linear concentration score (3-30)
pub fn calculate_score(top10_percentage: f64) -> f64 {
    if top10_percentage <= 20.0 {
        30.0
    } else if top10_percentage <= 40.0 {
        30.0 - (top10_percentage - 20.0) * 0.5
    } else if top10_percentage <= 70.0 {
        20.0 - (top10_percentage - 40.0) * (10.0 / 30.0)
    } else {
        (10.0 - (top10_percentage - 70.0) * (7.0 / 30.0)).max(3.0)
    }
}

/// Risk bands on the top10 percentage
pub fn risk_level(top10_percentage: f64) -> RiskLevel {
    if top10_percentage <= 20.0 {
        RiskLevel::LowRisk
    } else if top10_percentage <= 40.0 {
        RiskLevel::MediumRisk
    } else if top10_percentage <= 60.0 {
        RiskLevel::HighRisk
    } else {
        RiskLevel::ExtremeRisk
    }
}

/// Frontend-shaped top-holder rows
fn format_top_holders(holders: &[TokenHolder]) -> Vec<serde_json::Value> {
    holders
        .iter()
        .take(TOP_HOLDER_COUNT)
        .enumerate()
        .map(|(idx, h)| {
            json!({
                "rank": idx + 1,
                "address": h.address,
                "address_short": shorten_address(&h.address),
                "balance": h.balance,
                "percentage": round2(h.percentage.max(0.0)),
                "is_contract": h.is_contract,
            })
        })
        .collect()
}

fn shorten_address(address: &str) -> String {
    if address.len() > 10 {
        format!("{}...{}", &address[..6], &address[address.len() - 4..])
    } else {
        address.to_string()
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::constants::UNKNOWN_PERCENTAGE;

    fn holder(address: &str, balance: f64, percentage: f64) -> TokenHolder {
        TokenHolder {
            address: address.to_string(),
            balance: format!("{}", balance),
            balance_formatted: balance,
            percentage,
            rank: 0,
            is_contract: false,
        }
    }

    #[test]
    fn test_score_bands() {
        // Distributed supply keeps the full 30 points
        assert_eq!(calculate_score(10.0), 30.0);
        assert_eq!(calculate_score(20.0), 30.0);
        // Linear decay 30 -> 20 over (20, 40]
        assert_eq!(calculate_score(30.0), 25.0);
        assert_eq!(calculate_score(40.0), 20.0);
        // Linear decay 20 -> 10 over (40, 70]
        assert!((calculate_score(55.0) - 15.0).abs() < 1e-9);
        assert!((calculate_score(70.0) - 10.0).abs() < 1e-9);
        // Floor at 3: one address holding 100% (Scenario A)
        assert_eq!(calculate_score(100.0), 3.0);
    }

    #[test]
    fn test_score_continuity_at_band_edges() {
        for p in [20.0, 40.0, 70.0] {
            let left = calculate_score(p);
            let right = calculate_score(p + 1e-9);
            assert!((left - right).abs() < 1e-6, "discontinuity at {}", p);
        }
    }

    #[test]
    fn test_risk_bands() {
        assert_eq!(risk_level(15.0), RiskLevel::LowRisk);
        assert_eq!(risk_level(20.0), RiskLevel::LowRisk);
        assert_eq!(risk_level(35.0), RiskLevel::MediumRisk);
        assert_eq!(risk_level(55.0), RiskLevel::HighRisk);
        assert_eq!(risk_level(61.0), RiskLevel::ExtremeRisk);
        assert_eq!(risk_level(100.0), RiskLevel::ExtremeRisk);
    }

    #[test]
    fn test_single_holder_owns_everything() {
        // Scenario A: 100% concentration -> score 3, extreme risk
        let holders = vec![holder("0xwhale", 1_000_000.0, 100.0)];
        let p = top10_percentage(&holders);
        assert_eq!(p, 100.0);
        assert_eq!(calculate_score(p), 3.0);
        assert_eq!(risk_level(p), RiskLevel::ExtremeRisk);
    }

    #[test]
    fn test_top10_only_counts_ten_largest() {
        let mut holders: Vec<TokenHolder> = (0..15)
            .map(|i| holder(&format!("0x{:02}", i), 100.0 - i as f64, 5.0))
            .collect();
        // Shuffle ordering to prove the function re-sorts
        holders.reverse();

        let p = top10_percentage(&holders);
        assert_eq!(p, 50.0);
    }

    #[test]
    fn test_top10_clamped_to_100() {
        // Provider rounding can push the sum past 100
        let holders: Vec<TokenHolder> = (0..10)
            .map(|i| holder(&format!("0x{:02}", i), 100.0, 10.5))
            .collect();
        assert_eq!(top10_percentage(&holders), 100.0);
    }

    #[test]
    fn test_recompute_replaces_unknown_percentages() {
        let holders = vec![
            holder("0xaaa", 600.0, UNKNOWN_PERCENTAGE),
            holder("0xbbb", 400.0, UNKNOWN_PERCENTAGE),
        ];

        let rebuilt = recompute_percentages(holders, Some(1000.0));
        assert!((rebuilt[0].percentage - 60.0).abs() < 1e-9);
        assert!((rebuilt[1].percentage - 40.0).abs() < 1e-9);
    }

    #[test]
    fn test_recompute_with_missing_supply_yields_zero() {
        // Supply 0 or unavailable: every percentage is 0, never NaN/negative
        let holders = vec![holder("0xaaa", 600.0, UNKNOWN_PERCENTAGE)];

        let rebuilt = recompute_percentages(holders.clone(), None);
        assert_eq!(rebuilt[0].percentage, 0.0);

        let rebuilt = recompute_percentages(holders, Some(0.0));
        assert_eq!(rebuilt[0].percentage, 0.0);
        assert!(rebuilt[0].percentage.is_finite());
    }

    #[test]
    fn test_shorten_address() {
        assert_eq!(
            shorten_address("0xdac17f958d2ee523a2206206994597c13d831ec7"),
            "0xdac1...1ec7"
        );
        assert_eq!(shorten_address("0xshort"), "0xshort");
    }
}
