//! ECDSA demo endpoints

use super::ApiError;
use crate::signature::{generate_keypair, sign_message, verify_message, KeyPair};
use axum::{routing::post, Json, Router};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct SignRequest {
    pub private_key: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct SignResponse {
    pub signature: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    pub public_key: String,
    pub message: String,
    pub signature: String,
}

#[derive(Debug, Serialize)]
pub struct VerifyResponse {
    pub valid: bool,
}

/// POST /keys
async fn new_keys() -> Json<KeyPair> {
    Json(generate_keypair())
}

/// POST /sign
async fn sign(Json(req): Json<SignRequest>) -> Result<Json<SignResponse>, ApiError> {
    let signature = sign_message(&req.private_key, &req.message)?;
    Ok(Json(SignResponse { signature }))
}

/// POST /verify
async fn verify(Json(req): Json<VerifyRequest>) -> Result<Json<VerifyResponse>, ApiError> {
    let valid = verify_message(&req.public_key, &req.message, &req.signature)?;
    Ok(Json(VerifyResponse { valid }))
}

pub fn crypto_router() -> Router {
    Router::new()
        .route("/keys", post(new_keys))
        .route("/sign", post(sign))
        .route("/verify", post(verify))
}
