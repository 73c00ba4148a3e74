//! Workbench endpoints: hashing, nonce preview, single-block mining

use super::ApiError;
use crate::app_state::AppState;
use crate::miner::CancelToken;
use crate::workbench::{mine_single, preview_fingerprint, SingleBlock};
use axum::{
    extract::{Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct HashQuery {
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct PreviewQuery {
    #[serde(default)]
    pub data: String,
    pub nonce: u64,
}

#[derive(Debug, Deserialize)]
pub struct MineSingleRequest {
    #[serde(default)]
    pub data: String,
    pub speed_multiplier: Option<u64>,
}

/// GET /health
async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok", "version": env!("CARGO_PKG_VERSION") }))
}

/// GET /hash?text=
async fn hash_text(
    State(state): State<Arc<AppState>>,
    Query(q): Query<HashQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let fingerprint = state.miner.digest(&q.text)?;
    Ok(Json(json!({ "text": q.text, "fingerprint": fingerprint })))
}

/// GET /block/preview?data=&nonce=
async fn preview(
    State(state): State<Arc<AppState>>,
    Query(q): Query<PreviewQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let fingerprint = preview_fingerprint(&state.miner, &q.data, q.nonce)?;
    let meets = state.single.pattern.is_met_by(&fingerprint);
    Ok(Json(json!({
        "data": q.data,
        "nonce": q.nonce,
        "fingerprint": fingerprint,
        "meets_difficulty": meets,
    })))
}

/// POST /block/mine
async fn mine(
    State(state): State<Arc<AppState>>,
    Json(req): Json<MineSingleRequest>,
) -> Result<Json<SingleBlock>, ApiError> {
    let speed = req
        .speed_multiplier
        .unwrap_or(state.config.single.default_speed_multiplier);
    // One workbench search at a time; a new one replaces the old
    let cancel = CancelToken::new();
    if let Some(previous) = state.single_search.lock().replace(cancel.clone()) {
        previous.cancel();
    }
    let result = mine_single(
        &state.single,
        &req.data,
        speed,
        &state.miner,
        state.clock.as_ref(),
        Some(&cancel),
    )
    .await;
    {
        let mut slot = state.single_search.lock();
        if slot.as_ref().is_some_and(|current| current.same_as(&cancel)) {
            *slot = None;
        }
    }
    Ok(Json(result?))
}

/// DELETE /block/mine
async fn cancel_mine(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let cancelled = match state.single_search.lock().take() {
        Some(cancel) => {
            cancel.cancel();
            true
        }
        None => false,
    };
    Json(json!({ "cancelled": cancelled }))
}

pub fn workbench_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/hash", get(hash_text))
        .route("/block/preview", get(preview))
        .route("/block/mine", post(mine).delete(cancel_mine))
        .with_state(state)
}
