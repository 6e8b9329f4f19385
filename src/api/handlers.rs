//! API Request Handlers

use axum::{
    extract::{Json, State},
    http::StatusCode,
};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};

use super::types::*;
use crate::core::scorer::TokenScorer;
use crate::models::types::ScoreMode;

/// Shared application state
pub struct AppState {
    pub scorer: Arc<TokenScorer>,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(scorer: Arc<TokenScorer>) -> Self {
        // Background task: sweep expired cache entries every 60 seconds
        let cache = scorer.cache();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(std::time::Duration::from_secs(60));
            loop {
                interval.tick().await;
                cache.cleanup_expired();
            }
        });

        Self {
            scorer,
            start_time: Instant::now(),
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

// ============================================
// Health Check
// ============================================

pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<ApiResponse<HealthData>> {
    let start = Instant::now();

    let data = HealthData {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.uptime_seconds(),
    };

    Json(ApiResponse::success(
        data,
        start.elapsed().as_secs_f64() * 1000.0,
    ))
}

// ============================================
// Status
// ============================================

pub async fn get_status(State(state): State<Arc<AppState>>) -> Json<ApiResponse<StatusData>> {
    let start = Instant::now();

    let fast = state.scorer.fast_mode_available();
    let data = StatusData {
        fast_mode_available: fast,
        recommended_mode: if fast { "fast" } else { "deep" }.to_string(),
        cache: state.scorer.cache().stats(),
        uptime_seconds: state.uptime_seconds(),
    };

    Json(ApiResponse::success(
        data,
        start.elapsed().as_secs_f64() * 1000.0,
    ))
}

// ============================================
// Token Scoring
// ============================================

pub async fn score_token(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ScoreRequest>,
) -> Result<Json<ApiResponse<ScoreData>>, (StatusCode, Json<ApiResponse<()>>)> {
    let start = Instant::now();

    let mode = ScoreMode::parse(&req.mode).ok_or_else(|| {
        (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::error(
                ApiError::bad_request(format!(
                    "Invalid mode '{}' (expected auto, fast or deep)",
                    req.mode
                )),
                start.elapsed().as_secs_f64() * 1000.0,
            )),
        )
    })?;

    info!(
        "📥 Score request: {} (mode: {})",
        req.token_address, req.mode
    );

    match state
        .scorer
        .score_token(&req.token_address, mode, req.time_window_hours, req.limit)
        .await
    {
        Ok(result) => Ok(Json(ApiResponse::success(
            result.into(),
            start.elapsed().as_secs_f64() * 1000.0,
        ))),
        Err(e) => {
            error!("❌ Scoring failed for {}: {}", req.token_address, e);
            let status =
                StatusCode::from_u16(e.code.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            Err((
                status,
                Json(ApiResponse::error(
                    ApiError::from_app_error(&e),
                    start.elapsed().as_secs_f64() * 1000.0,
                )),
            ))
        }
    }
}
