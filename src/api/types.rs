//! API Request/Response Types
//!
//! The score response is shaped for direct frontend consumption: an
//! overview block for cards, badge-ready tag objects, and per-dimension
//! detail blocks with their metrics bags.

use serde::{Deserialize, Serialize};

use crate::models::types::{RiskTag, ScoreResult};
use crate::utils::cache::CacheStats;
use crate::utils::constants::{EOA_MAX_SCORE, HOLDER_MAX_SCORE, PERMISSION_MAX_SCORE};

/// API Response wrapper
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiError>,
    pub latency_ms: f64,
    pub timestamp: i64,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T, latency_ms: f64) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            latency_ms,
            timestamp: chrono::Utc::now().timestamp(),
        }
    }
}

impl ApiResponse<()> {
    pub fn error(error: ApiError, latency_ms: f64) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error),
            latency_ms,
            timestamp: chrono::Utc::now().timestamp(),
        }
    }
}

/// API Error
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            code: "BAD_REQUEST".to_string(),
            message: message.into(),
            details: None,
        }
    }

    pub fn from_app_error(err: &crate::models::errors::AppError) -> Self {
        Self {
            code: err.code_str().to_string(),
            message: err.message.clone(),
            details: None,
        }
    }
}

// ============================================
// Token Scoring
// ============================================

#[derive(Debug, Deserialize)]
pub struct ScoreRequest {
    pub token_address: String,
    /// "auto" | "fast" | "deep"
    #[serde(default = "default_mode")]
    pub mode: String,
    #[serde(default = "default_window_hours")]
    pub time_window_hours: u32,
    /// Max activity records analyzed (fast mode)
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_mode() -> String {
    "auto".to_string()
}
fn default_window_hours() -> u32 {
    1
}
fn default_limit() -> usize {
    1000
}

/// Frontend-facing score payload
#[derive(Debug, Serialize)]
pub struct ScoreData {
    pub token_address: String,
    pub timestamp: String,
    pub analysis_mode: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_range: Option<BlockRangeResponse>,
    pub data_sources: DataSourcesResponse,
    pub overview: OverviewResponse,
    pub risk_tags: Vec<RiskTagResponse>,
    pub scores: DimensionScoresResponse,
}

#[derive(Debug, Serialize)]
pub struct BlockRangeResponse {
    pub from: u64,
    pub to: u64,
}

#[derive(Debug, Serialize)]
pub struct DataSourcesResponse {
    pub eoa: String,
    pub holder: String,
    pub permission: String,
}

/// Card/header block
#[derive(Debug, Serialize)]
pub struct OverviewResponse {
    pub total_score: f64,
    pub max_score: u32,
    pub risk_level: String,
    pub risk_label: String,
    pub risk_color: String,
}

/// Badge block
#[derive(Debug, Serialize)]
pub struct RiskTagResponse {
    pub key: String,
    pub label: String,
    #[serde(rename = "type")]
    pub tag_type: String,
    pub category: String,
}

impl From<&RiskTag> for RiskTagResponse {
    fn from(tag: &RiskTag) -> Self {
        Self {
            key: tag.as_str().to_string(),
            label: tag.label().to_string(),
            tag_type: tag.tag_type().to_string(),
            category: tag.category().to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DimensionScoresResponse {
    pub eoa: DimensionResponse,
    pub holder: DimensionResponse,
    pub permission: DimensionResponse,
}

/// Detail block for one dimension
#[derive(Debug, Serialize)]
pub struct DimensionResponse {
    pub name: String,
    pub description: String,
    pub score: f64,
    pub max_score: f64,
    pub weight: String,
    pub risk_level: String,
    pub data_source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    pub metrics: serde_json::Value,
}

impl From<ScoreResult> for ScoreData {
    fn from(result: ScoreResult) -> Self {
        Self {
            token_address: result.token_address.clone(),
            timestamp: result.timestamp.to_rfc3339(),
            analysis_mode: result.mode.as_str().to_string(),
            block_range: result.block_range.map(|r| BlockRangeResponse {
                from: r.from_block,
                to: r.to_block,
            }),
            data_sources: DataSourcesResponse {
                eoa: result.data_sources.eoa.as_str().to_string(),
                holder: result.data_sources.holder.as_str().to_string(),
                permission: result.data_sources.permission.as_str().to_string(),
            },
            overview: OverviewResponse {
                total_score: result.total_score,
                max_score: 100,
                risk_level: result.risk_level.as_str().to_string(),
                risk_label: result.risk_level.label().to_string(),
                risk_color: result.risk_level.color_code().to_string(),
            },
            risk_tags: result.risk_tags.iter().map(RiskTagResponse::from).collect(),
            scores: DimensionScoresResponse {
                eoa: DimensionResponse {
                    name: "User Activity".to_string(),
                    description: "Unique EOA analysis to detect fake activity".to_string(),
                    score: result.eoa.score,
                    max_score: EOA_MAX_SCORE,
                    weight: "40%".to_string(),
                    risk_level: result.eoa.risk_level.as_str().to_string(),
                    data_source: result.eoa.data_source.as_str().to_string(),
                    note: result.eoa.note,
                    metrics: result.eoa.metrics,
                },
                holder: DimensionResponse {
                    name: "Holder Distribution".to_string(),
                    description: "Top holder concentration analysis".to_string(),
                    score: result.holder.score,
                    max_score: HOLDER_MAX_SCORE,
                    weight: "30%".to_string(),
                    risk_level: result.holder.risk_level.as_str().to_string(),
                    data_source: result.holder.data_source.as_str().to_string(),
                    note: result.holder.note,
                    metrics: result.holder.metrics,
                },
                permission: DimensionResponse {
                    name: "Contract Safety".to_string(),
                    description: "Contract permission and rug pull risk analysis".to_string(),
                    score: result.permission.score,
                    max_score: PERMISSION_MAX_SCORE,
                    weight: "30%".to_string(),
                    risk_level: result.permission.risk_level.as_str().to_string(),
                    data_source: result.permission.data_source.as_str().to_string(),
                    note: result.permission.note,
                    metrics: result.permission.metrics,
                },
            },
        }
    }
}

// ============================================
// Status / Health
// ============================================

#[derive(Debug, Serialize)]
pub struct StatusData {
    pub fast_mode_available: bool,
    pub recommended_mode: String,
    pub cache: CacheStats,
    pub uptime_seconds: u64,
}

#[derive(Debug, Serialize)]
pub struct HealthData {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::types::{
        AnalyzerResult, DataSourceTag, RiskLevel, ScoreMode,
    };

    #[test]
    fn test_score_request_defaults() {
        let req: ScoreRequest =
            serde_json::from_str(r#"{"token_address": "0xabc"}"#).unwrap();
        assert_eq!(req.mode, "auto");
        assert_eq!(req.time_window_hours, 1);
        assert_eq!(req.limit, 1000);
    }

    #[test]
    fn test_score_data_conversion() {
        let dim = |score: f64, max: f64| {
            AnalyzerResult::new(
                score,
                max,
                RiskLevel::MediumRisk,
                DataSourceTag::Fast,
                serde_json::json!({"k": 1}),
            )
        };
        let result = ScoreResult::assemble(
            "0xtoken".to_string(),
            ScoreMode::Fast,
            None,
            dim(30.0, EOA_MAX_SCORE),
            dim(20.0, HOLDER_MAX_SCORE),
            dim(18.0, PERMISSION_MAX_SCORE),
        );

        let data: ScoreData = result.into();
        assert_eq!(data.overview.total_score, 68.0);
        assert_eq!(data.overview.risk_level, "medium_risk");
        assert_eq!(data.scores.eoa.weight, "40%");
        assert_eq!(data.risk_tags.len(), 3);
        assert_eq!(data.risk_tags[0].key, "MODERATE_ACTIVITY");
    }
}
