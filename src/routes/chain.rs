//! User chain endpoints

use super::ApiError;
use crate::app_state::AppState;
use crate::chain::{Block, ChainIssue, ChainSnapshot};
use crate::digest::sha256_hex;
use axum::{
    extract::{Path, State},
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct EditRequest {
    pub data: String,
}

#[derive(Debug, Serialize)]
pub struct EditResponse {
    pub index: usize,
    pub invalidated: usize,
}

#[derive(Debug, Serialize)]
pub struct CancelResponse {
    pub index: usize,
    /// false when no search was running on the block
    pub cancelled: bool,
}

#[derive(Debug, Serialize)]
pub struct VerifyResponse {
    pub valid: bool,
    pub issues: Vec<ChainIssue>,
}

/// GET /chain
async fn get_chain(State(state): State<Arc<AppState>>) -> Json<ChainSnapshot> {
    Json(state.chain.snapshot())
}

/// POST /chain/blocks
async fn append_block(State(state): State<Arc<AppState>>) -> Json<Block> {
    Json(state.chain.append())
}

/// PUT /chain/blocks/:index
async fn edit_block(
    State(state): State<Arc<AppState>>,
    Path(index): Path<usize>,
    Json(req): Json<EditRequest>,
) -> Result<Json<EditResponse>, ApiError> {
    let invalidated = state.chain.edit_data(index, req.data)?;
    Ok(Json(EditResponse { index, invalidated }))
}

/// POST /chain/blocks/:index/mine
async fn mine_block(
    State(state): State<Arc<AppState>>,
    Path(index): Path<usize>,
) -> Result<Json<Block>, ApiError> {
    let block = state
        .chain
        .mine_block(index, &state.miner, state.clock.as_ref())
        .await?;
    Ok(Json(block))
}

/// DELETE /chain/blocks/:index/mine
async fn cancel_mining(
    State(state): State<Arc<AppState>>,
    Path(index): Path<usize>,
) -> Result<Json<CancelResponse>, ApiError> {
    let cancelled = state.chain.cancel_mining(index)?;
    Ok(Json(CancelResponse { index, cancelled }))
}

/// GET /chain/verify
async fn verify_chain(State(state): State<Arc<AppState>>) -> Json<VerifyResponse> {
    let issues = state.chain.with(|chain| chain.verify(sha256_hex));
    Json(VerifyResponse {
        valid: issues.is_empty(),
        issues,
    })
}

pub fn chain_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/chain", get(get_chain))
        .route("/chain/blocks", post(append_block))
        .route("/chain/blocks/:index", put(edit_block))
        .route(
            "/chain/blocks/:index/mine",
            post(mine_block).delete(cancel_mining),
        )
        .route("/chain/verify", get(verify_chain))
        .with_state(state)
}
