//! Type definitions for RusterScore
//! All core data structures for token scoring

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::utils::constants::UNKNOWN_PERCENTAGE;

/// Risk level classification, shared by dimensions and the total score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    /// Healthy signal
    LowRisk,
    /// Proceed with caution
    MediumRisk,
    /// Likely problematic
    HighRisk,
    /// Almost certainly dangerous (whale control, rug surface)
    ExtremeRisk,
    /// Analyzer could not produce a signal (no data, fatal error)
    Unknown,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::LowRisk => "low_risk",
            RiskLevel::MediumRisk => "medium_risk",
            RiskLevel::HighRisk => "high_risk",
            RiskLevel::ExtremeRisk => "extreme_risk",
            RiskLevel::Unknown => "unknown",
        }
    }

    /// Human-facing label for dashboards
    pub fn label(&self) -> &'static str {
        match self {
            RiskLevel::LowRisk => "Low Risk",
            RiskLevel::MediumRisk => "Medium Risk",
            RiskLevel::HighRisk => "High Risk",
            RiskLevel::ExtremeRisk => "Extreme Risk",
            RiskLevel::Unknown => "Unknown",
        }
    }

    /// Color code for UI
    pub fn color_code(&self) -> &'static str {
        match self {
            RiskLevel::LowRisk => "#22c55e",     // Green
            RiskLevel::MediumRisk => "#eab308",  // Yellow
            RiskLevel::HighRisk => "#f97316",    // Orange
            RiskLevel::ExtremeRisk => "#ef4444", // Red
            RiskLevel::Unknown => "#6b7280",     // Gray
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            RiskLevel::LowRisk => "✅",
            RiskLevel::MediumRisk => "🟡",
            RiskLevel::HighRisk => "🟠",
            RiskLevel::ExtremeRisk => "🔴",
            RiskLevel::Unknown => "❓",
        }
    }
}

/// Which backend actually produced a dimension's data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSourceTag {
    /// Indexed provider (single/few REST calls, labeled addresses)
    Fast,
    /// Direct chain scan (event replay, bytecode/storage reads)
    Deep,
    /// All sources exhausted, degraded result
    Error,
}

impl DataSourceTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataSourceTag::Fast => "fast",
            DataSourceTag::Deep => "deep",
            DataSourceTag::Error => "error",
        }
    }
}

/// Requested scoring mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreMode {
    /// Fast if an indexed provider is configured, deep otherwise
    Auto,
    Fast,
    Deep,
}

impl Default for ScoreMode {
    fn default() -> Self {
        ScoreMode::Auto
    }
}

impl ScoreMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScoreMode::Auto => "auto",
            ScoreMode::Fast => "fast",
            ScoreMode::Deep => "deep",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Some(ScoreMode::Auto),
            "fast" => Some(ScoreMode::Fast),
            "deep" => Some(ScoreMode::Deep),
            _ => None,
        }
    }
}

// ============================================
// RISK TAGS
// ============================================

/// Badge-style tags derived from per-dimension risk levels.
/// Additive across dimensions, ordering fixed: activity, holder, permission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskTag {
    // Activity
    OrganicGrowth,
    ModerateActivity,
    LowActivity,
    // Holder distribution
    Distributed,
    Concentrated,
    WhaleControlled,
    ExtremeConcentration,
    // Contract permission
    SafeContract,
    LimitedRisk,
    RugRisk,
}

impl RiskTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskTag::OrganicGrowth => "ORGANIC_GROWTH",
            RiskTag::ModerateActivity => "MODERATE_ACTIVITY",
            RiskTag::LowActivity => "LOW_ACTIVITY",
            RiskTag::Distributed => "DISTRIBUTED",
            RiskTag::Concentrated => "CONCENTRATED",
            RiskTag::WhaleControlled => "WHALE_CONTROLLED",
            RiskTag::ExtremeConcentration => "EXTREME_CONCENTRATION",
            RiskTag::SafeContract => "SAFE_CONTRACT",
            RiskTag::LimitedRisk => "LIMITED_RISK",
            RiskTag::RugRisk => "RUG_RISK",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RiskTag::OrganicGrowth => "Organic Growth",
            RiskTag::ModerateActivity => "Moderate Activity",
            RiskTag::LowActivity => "Low Activity",
            RiskTag::Distributed => "Well Distributed",
            RiskTag::Concentrated => "Concentrated",
            RiskTag::WhaleControlled => "Whale Controlled",
            RiskTag::ExtremeConcentration => "Extreme Concentration",
            RiskTag::SafeContract => "Safe Contract",
            RiskTag::LimitedRisk => "Limited Risk",
            RiskTag::RugRisk => "Rug Risk",
        }
    }

    /// Badge type for frontend rendering
    pub fn tag_type(&self) -> &'static str {
        match self {
            RiskTag::OrganicGrowth | RiskTag::Distributed | RiskTag::SafeContract => "success",
            RiskTag::ModerateActivity | RiskTag::Concentrated | RiskTag::LimitedRisk => "warning",
            _ => "danger",
        }
    }

    /// Which dimension emitted this tag
    pub fn category(&self) -> &'static str {
        match self {
            RiskTag::OrganicGrowth | RiskTag::ModerateActivity | RiskTag::LowActivity => "activity",
            RiskTag::Distributed
            | RiskTag::Concentrated
            | RiskTag::WhaleControlled
            | RiskTag::ExtremeConcentration => "holder",
            _ => "permission",
        }
    }

    /// Tag for the activity dimension
    pub fn for_activity(level: RiskLevel) -> Option<RiskTag> {
        match level {
            RiskLevel::LowRisk => Some(RiskTag::OrganicGrowth),
            RiskLevel::MediumRisk => Some(RiskTag::ModerateActivity),
            RiskLevel::HighRisk => Some(RiskTag::LowActivity),
            _ => None,
        }
    }

    /// Tag for the holder dimension
    pub fn for_holder(level: RiskLevel) -> Option<RiskTag> {
        match level {
            RiskLevel::LowRisk => Some(RiskTag::Distributed),
            RiskLevel::MediumRisk => Some(RiskTag::Concentrated),
            RiskLevel::HighRisk => Some(RiskTag::WhaleControlled),
            RiskLevel::ExtremeRisk => Some(RiskTag::ExtremeConcentration),
            _ => None,
        }
    }

    /// Tag for the permission dimension
    pub fn for_permission(level: RiskLevel) -> Option<RiskTag> {
        match level {
            RiskLevel::LowRisk => Some(RiskTag::SafeContract),
            RiskLevel::MediumRisk => Some(RiskTag::LimitedRisk),
            RiskLevel::HighRisk => Some(RiskTag::RugRisk),
            _ => None,
        }
    }
}

// ============================================
// ADAPTER DATA
// ============================================

/// A token holder as reported by either backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenHolder {
    pub address: String,
    /// Raw balance as reported (decimal string, wei scale for deep mode)
    pub balance: String,
    /// Balance divided by token decimals
    pub balance_formatted: f64,
    /// Ownership percentage 0-100, or UNKNOWN_PERCENTAGE when the provider
    /// did not report one
    pub percentage: f64,
    pub rank: u32,
    pub is_contract: bool,
}

impl TokenHolder {
    pub fn is_eoa(&self) -> bool {
        !self.is_contract
    }

    pub fn percentage_known(&self) -> bool {
        self.percentage > UNKNOWN_PERCENTAGE
    }
}

/// One on-chain interaction with the token contract
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountRecord {
    pub tx_hash: String,
    pub block_number: u64,
    /// Epoch milliseconds
    pub timestamp: i64,
    pub from_address: String,
    pub to_address: String,
    pub from_is_contract: bool,
    pub to_is_contract: bool,
    pub method_name: Option<String>,
}

impl AccountRecord {
    pub fn from_is_eoa(&self) -> bool {
        !self.from_is_contract
    }

    pub fn to_is_eoa(&self) -> bool {
        !self.to_is_contract
    }
}

// ============================================
// RESULTS
// ============================================

/// One dimension's outcome. Built once at the end of the analyzer run and
/// never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzerResult {
    /// Score within [0, max_score], even on partial data
    pub score: f64,
    pub max_score: f64,
    pub risk_level: RiskLevel,
    pub data_source: DataSourceTag,
    /// Analyzer-specific metrics bag
    pub metrics: serde_json::Value,
    /// Present when the analyzer completed with degraded confidence
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl AnalyzerResult {
    /// Construct a result, clamping the score into [0, max_score]
    pub fn new(
        score: f64,
        max_score: f64,
        risk_level: RiskLevel,
        data_source: DataSourceTag,
        metrics: serde_json::Value,
    ) -> Self {
        Self {
            score: score.clamp(0.0, max_score),
            max_score,
            risk_level,
            data_source,
            metrics,
            note: None,
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    /// Zero-score result for a dimension whose sources all failed
    pub fn degraded(max_score: f64, note: impl Into<String>) -> Self {
        Self {
            score: 0.0,
            max_score,
            risk_level: RiskLevel::Unknown,
            data_source: DataSourceTag::Error,
            metrics: serde_json::json!({}),
            note: Some(note.into()),
        }
    }
}

/// Block range used by a deep-mode scan
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BlockRange {
    pub from_block: u64,
    pub to_block: u64,
}

/// Per-dimension data-source tags for the final result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DimensionSources {
    pub eoa: DataSourceTag,
    pub holder: DataSourceTag,
    pub permission: DataSourceTag,
}

/// The composite scoring result. Immutable after construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreResult {
    pub token_address: String,
    pub timestamp: DateTime<Utc>,
    pub mode: ScoreMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_range: Option<BlockRange>,
    pub data_sources: DimensionSources,
    pub eoa: AnalyzerResult,
    pub holder: AnalyzerResult,
    pub permission: AnalyzerResult,
    /// Always the literal sum of the three bounded sub-scores
    pub total_score: f64,
    pub risk_level: RiskLevel,
    pub risk_tags: Vec<RiskTag>,
}

impl ScoreResult {
    /// Assemble the final result from the three dimension outcomes.
    /// total_score is the exact sum; each term is already clamped.
    pub fn assemble(
        token_address: String,
        mode: ScoreMode,
        block_range: Option<BlockRange>,
        eoa: AnalyzerResult,
        holder: AnalyzerResult,
        permission: AnalyzerResult,
    ) -> Self {
        let total_score = eoa.score + holder.score + permission.score;
        let risk_level = Self::overall_risk_level(total_score);
        let risk_tags = Self::generate_tags(&eoa, &holder, &permission);

        Self {
            token_address,
            timestamp: Utc::now(),
            mode,
            block_range,
            data_sources: DimensionSources {
                eoa: eoa.data_source,
                holder: holder.data_source,
                permission: permission.data_source,
            },
            eoa,
            holder,
            permission,
            total_score,
            risk_level,
            risk_tags,
        }
    }

    /// Overall risk bands on the 0-100 total
    pub fn overall_risk_level(total_score: f64) -> RiskLevel {
        if total_score >= 80.0 {
            RiskLevel::LowRisk
        } else if total_score >= 60.0 {
            RiskLevel::MediumRisk
        } else if total_score >= 40.0 {
            RiskLevel::HighRisk
        } else {
            RiskLevel::ExtremeRisk
        }
    }

    /// Fixed-order tag generation: activity, holder, permission
    fn generate_tags(
        eoa: &AnalyzerResult,
        holder: &AnalyzerResult,
        permission: &AnalyzerResult,
    ) -> Vec<RiskTag> {
        let mut tags = Vec::with_capacity(3);
        if let Some(tag) = RiskTag::for_activity(eoa.risk_level) {
            tags.push(tag);
        }
        if let Some(tag) = RiskTag::for_holder(holder.risk_level) {
            tags.push(tag);
        }
        if let Some(tag) = RiskTag::for_permission(permission.risk_level) {
            tags.push(tag);
        }
        tags
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::constants::{EOA_MAX_SCORE, HOLDER_MAX_SCORE, PERMISSION_MAX_SCORE};

    fn result(score: f64, max: f64, level: RiskLevel) -> AnalyzerResult {
        AnalyzerResult::new(score, max, level, DataSourceTag::Fast, serde_json::json!({}))
    }

    #[test]
    fn test_score_clamping() {
        let r = result(55.0, EOA_MAX_SCORE, RiskLevel::LowRisk);
        assert_eq!(r.score, 40.0);
        let r = result(-3.0, HOLDER_MAX_SCORE, RiskLevel::Unknown);
        assert_eq!(r.score, 0.0);
    }

    #[test]
    fn test_total_is_exact_sum() {
        let score = ScoreResult::assemble(
            "0xtoken".to_string(),
            ScoreMode::Fast,
            None,
            result(32.5, EOA_MAX_SCORE, RiskLevel::MediumRisk),
            result(21.25, HOLDER_MAX_SCORE, RiskLevel::MediumRisk),
            result(15.0, PERMISSION_MAX_SCORE, RiskLevel::MediumRisk),
        );
        assert_eq!(score.total_score, 32.5 + 21.25 + 15.0);
        assert!(score.total_score >= 0.0 && score.total_score <= 100.0);
    }

    #[test]
    fn test_overall_risk_bands() {
        assert_eq!(ScoreResult::overall_risk_level(85.0), RiskLevel::LowRisk);
        assert_eq!(ScoreResult::overall_risk_level(80.0), RiskLevel::LowRisk);
        // Scenario E: 68 sits in the medium band [60, 80)
        assert_eq!(ScoreResult::overall_risk_level(68.0), RiskLevel::MediumRisk);
        assert_eq!(ScoreResult::overall_risk_level(60.0), RiskLevel::MediumRisk);
        assert_eq!(ScoreResult::overall_risk_level(59.9), RiskLevel::HighRisk);
        assert_eq!(ScoreResult::overall_risk_level(40.0), RiskLevel::HighRisk);
        assert_eq!(ScoreResult::overall_risk_level(39.9), RiskLevel::ExtremeRisk);
    }

    #[test]
    fn test_tag_generation_order() {
        let score = ScoreResult::assemble(
            "0xtoken".to_string(),
            ScoreMode::Deep,
            None,
            result(10.0, EOA_MAX_SCORE, RiskLevel::HighRisk),
            result(3.0, HOLDER_MAX_SCORE, RiskLevel::ExtremeRisk),
            result(28.0, PERMISSION_MAX_SCORE, RiskLevel::LowRisk),
        );
        assert_eq!(
            score.risk_tags,
            vec![
                RiskTag::LowActivity,
                RiskTag::ExtremeConcentration,
                RiskTag::SafeContract
            ]
        );
    }

    #[test]
    fn test_unknown_level_emits_no_tag() {
        let score = ScoreResult::assemble(
            "0xtoken".to_string(),
            ScoreMode::Fast,
            None,
            result(0.0, EOA_MAX_SCORE, RiskLevel::Unknown),
            result(0.0, HOLDER_MAX_SCORE, RiskLevel::Unknown),
            result(15.0, PERMISSION_MAX_SCORE, RiskLevel::MediumRisk),
        );
        assert_eq!(score.risk_tags, vec![RiskTag::LimitedRisk]);
    }

    #[test]
    fn test_risk_level_serialization() {
        let json = serde_json::to_string(&RiskLevel::ExtremeRisk).unwrap();
        assert_eq!(json, "\"extreme_risk\"");
        let json = serde_json::to_string(&DataSourceTag::Fast).unwrap();
        assert_eq!(json, "\"fast\"");
        let json = serde_json::to_string(&RiskTag::WhaleControlled).unwrap();
        assert_eq!(json, "\"WHALE_CONTROLLED\"");
    }

    #[test]
    fn test_unknown_percentage_sentinel() {
        let holder = TokenHolder {
            address: "0xabc".to_string(),
            balance: "1000".to_string(),
            balance_formatted: 1000.0,
            percentage: UNKNOWN_PERCENTAGE,
            rank: 1,
            is_contract: false,
        };
        assert!(!holder.percentage_known());
        assert!(holder.is_eoa());
    }
}
