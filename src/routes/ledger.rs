//! Participant ledger and transfer endpoints

use super::chain::{CancelResponse, EditRequest, EditResponse};
use super::ApiError;
use crate::app_state::AppState;
use crate::chain::Block;
use crate::ledger::{LedgerSnapshot, Participant};
use crate::transfer::{Balances, Transfer};
use axum::{
    extract::{Path, State},
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct TransferRequest {
    /// `"A -> B: 10"`
    pub transfer: String,
}

#[derive(Debug, Serialize)]
pub struct TransferResponse {
    pub transfer: Transfer,
    pub balances: Balances,
    pub pool: Vec<Transfer>,
}

fn participant(raw: &str) -> Result<Participant, ApiError> {
    Ok(raw.parse::<Participant>()?)
}

/// GET /ledgers
async fn get_ledgers(State(state): State<Arc<AppState>>) -> Json<LedgerSnapshot> {
    Json(state.ledger.snapshot())
}

/// POST /ledgers/:participant/blocks
async fn append_block(
    State(state): State<Arc<AppState>>,
    Path(who): Path<String>,
) -> Result<Json<Block>, ApiError> {
    Ok(Json(state.ledger.append(participant(&who)?)?))
}

/// PUT /ledgers/:participant/blocks/:index
async fn edit_block(
    State(state): State<Arc<AppState>>,
    Path((who, index)): Path<(String, usize)>,
    Json(req): Json<EditRequest>,
) -> Result<Json<EditResponse>, ApiError> {
    let invalidated = state.ledger.edit_data(participant(&who)?, index, req.data)?;
    Ok(Json(EditResponse { index, invalidated }))
}

/// POST /ledgers/:participant/blocks/:index/mine
async fn mine_block(
    State(state): State<Arc<AppState>>,
    Path((who, index)): Path<(String, usize)>,
) -> Result<Json<Block>, ApiError> {
    let block = state
        .ledger
        .mine_block(participant(&who)?, index, &state.miner, state.clock.as_ref())
        .await?;
    Ok(Json(block))
}

/// DELETE /ledgers/:participant/blocks/:index/mine
async fn cancel_mining(
    State(state): State<Arc<AppState>>,
    Path((who, index)): Path<(String, usize)>,
) -> Result<Json<CancelResponse>, ApiError> {
    let cancelled = state.ledger.cancel_mining(participant(&who)?, index)?;
    Ok(Json(CancelResponse { index, cancelled }))
}

/// POST /ledgers/:participant/record
/// Appends a block holding every queued transfer
async fn record_pool(
    State(state): State<Arc<AppState>>,
    Path(who): Path<String>,
) -> Result<Json<Block>, ApiError> {
    Ok(Json(state.ledger.record_pool(participant(&who)?)?))
}

/// POST /transfers
async fn submit_transfer(
    State(state): State<Arc<AppState>>,
    Json(req): Json<TransferRequest>,
) -> Result<Json<TransferResponse>, ApiError> {
    let transfer = state.ledger.submit_transfer(&req.transfer)?;
    Ok(Json(TransferResponse {
        transfer,
        balances: state.ledger.balances(),
        pool: state.ledger.pool(),
    }))
}

pub fn ledger_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/ledgers", get(get_ledgers))
        .route("/ledgers/:participant/blocks", post(append_block))
        .route("/ledgers/:participant/blocks/:index", put(edit_block))
        .route(
            "/ledgers/:participant/blocks/:index/mine",
            post(mine_block).delete(cancel_mining),
        )
        .route("/ledgers/:participant/record", post(record_pool))
        .route("/transfers", post(submit_transfer))
        .with_state(state)
}
