//! HTTP surface of the lab
//!
//! - `workbench` - health, raw hashing, single-block preview and mining
//! - `chain` - the user chain
//! - `ledger` - participant ledgers and transfers
//! - `crypto` - ECDSA key generation, signing, verification
//! - `events` - WebSocket stream of lab events
//!
//! Errors are returned as `{"error": {"code": .., "message": ..}}`.

pub mod chain;
pub mod crypto;
pub mod events;
pub mod ledger;
pub mod workbench;

use crate::app_state::AppState;
use crate::errors::{ChainError, DigestError, LedgerError, MiningError, SignatureError, TransferError};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

/// Full application router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(workbench::workbench_router(state.clone()))
        .merge(chain::chain_router(state.clone()))
        .merge(ledger::ledger_router(state.clone()))
        .merge(crypto::crypto_router())
        .merge(events::events_router(state))
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
}

/// Error response body with a stable code for clients
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(code = self.code, "{}", self.message);
        }
        let body = serde_json::json!({
            "error": { "code": self.code, "message": self.message }
        });
        (self.status, Json(body)).into_response()
    }
}

impl From<DigestError> for ApiError {
    fn from(e: DigestError) -> Self {
        ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "digest_failed", e.to_string())
    }
}

impl From<MiningError> for ApiError {
    fn from(e: MiningError) -> Self {
        let (status, code) = match &e {
            MiningError::MalformedPattern { .. } => (StatusCode::BAD_REQUEST, "malformed_pattern"),
            MiningError::ZeroBatchSize
            | MiningError::BatchTooLarge { .. }
            | MiningError::ZeroSpeedMultiplier => {
                (StatusCode::BAD_REQUEST, "bad_parameter")
            }
            MiningError::Cancelled { .. } => (StatusCode::CONFLICT, "cancelled"),
            MiningError::NonceExhausted | MiningError::Digest { .. } => {
                (StatusCode::INTERNAL_SERVER_ERROR, "mining_failed")
            }
        };
        ApiError::new(status, code, e.to_string())
    }
}

impl From<ChainError> for ApiError {
    fn from(e: ChainError) -> Self {
        match e {
            ChainError::IndexOutOfRange { .. } => {
                ApiError::new(StatusCode::NOT_FOUND, "no_such_block", e.to_string())
            }
            ChainError::StalePredecessor { .. } => {
                ApiError::new(StatusCode::CONFLICT, "stale_predecessor", e.to_string())
            }
            ChainError::Superseded { .. } => {
                ApiError::new(StatusCode::CONFLICT, "superseded", e.to_string())
            }
            ChainError::Mining(m) => m.into(),
        }
    }
}

impl From<TransferError> for ApiError {
    fn from(e: TransferError) -> Self {
        let code = match e {
            TransferError::InsufficientBalance { .. } => "insufficient_balance",
            _ => "bad_transfer",
        };
        ApiError::new(StatusCode::BAD_REQUEST, code, e.to_string())
    }
}

impl From<LedgerError> for ApiError {
    fn from(e: LedgerError) -> Self {
        match e {
            LedgerError::UnknownParticipant(_) => {
                ApiError::new(StatusCode::NOT_FOUND, "unknown_participant", e.to_string())
            }
            LedgerError::EmptyPool => ApiError::new(StatusCode::CONFLICT, "empty_pool", e.to_string()),
            LedgerError::Chain(c) => c.into(),
            LedgerError::Transfer(t) => t.into(),
            LedgerError::Mining(m) => m.into(),
        }
    }
}

impl From<SignatureError> for ApiError {
    fn from(e: SignatureError) -> Self {
        ApiError::new(StatusCode::BAD_REQUEST, "bad_signature_input", e.to_string())
    }
}
