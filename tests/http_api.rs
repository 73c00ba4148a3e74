//! Router tests driven with `tower::ServiceExt::oneshot`

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use hashchain_lab::app_state::AppState;
use hashchain_lab::clock::FixedClock;
use hashchain_lab::config::LabConfig;
use hashchain_lab::digest::sha256_hex;
use hashchain_lab::events::LabEvent;
use hashchain_lab::pow::DifficultyPattern;
use hashchain_lab::routes::create_router;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

async fn app() -> Router {
    create_router(state("0").await)
}

/// Lab with cheap chain and ledger mining and the given workbench pattern
async fn state(single_pattern: &str) -> Arc<AppState> {
    let mut config = LabConfig::default();
    let easy = DifficultyPattern::new("0").unwrap();
    config.single.pattern = DifficultyPattern::new(single_pattern).unwrap();
    config.chain.pattern = easy.clone();
    config.chain.batch_size = 64;
    config.ledger.pattern = easy.clone();
    config.ledger.batch_size = 64;
    config.ledger.genesis_pattern = easy;
    config.miner.threads = Some(2);
    AppState::with_clock(config, Arc::new(FixedClock("t".into())))
        .await
        .unwrap()
}

async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(b) => builder
            .header("content-type", "application/json")
            .body(Body::from(b.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

#[tokio::test]
async fn health_and_hash() {
    let app = app().await;
    let (status, body) = call(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let (status, body) = call(&app, "GET", "/hash?text=abc", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["fingerprint"], sha256_hex("abc"));

    let (_, body) = call(&app, "GET", "/block/preview?data=hi&nonce=3", None).await;
    assert_eq!(body["fingerprint"], sha256_hex("hi3"));
}

#[tokio::test]
async fn single_block_mining() {
    let app = app().await;
    let (status, body) = call(
        &app,
        "POST",
        "/block/mine",
        Some(json!({ "data": "hello", "speed_multiplier": 2 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["batch_size"], 2000);
    assert!(body["fingerprint"].as_str().unwrap().starts_with('0'));

    let (status, body) = call(
        &app,
        "POST",
        "/block/mine",
        Some(json!({ "data": "hello", "speed_multiplier": 0 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "bad_parameter");
}

#[tokio::test]
async fn workbench_search_can_be_cancelled() {
    // Never satisfiable, so the search runs until cancelled
    let state = state(&"0".repeat(64)).await;
    let app = create_router(state.clone());
    let (_, body) = call(&app, "DELETE", "/block/mine", None).await;
    assert_eq!(body["cancelled"], false);

    let mut rx = state.bus().subscribe();
    let search = {
        let app = app.clone();
        tokio::spawn(async move {
            call(&app, "POST", "/block/mine", Some(json!({ "data": "hello" }))).await
        })
    };
    loop {
        if let Ok(env) = rx.recv().await {
            if matches!(env.event, LabEvent::MiningStarted { .. }) {
                break;
            }
        }
    }
    let (_, body) = call(&app, "DELETE", "/block/mine", None).await;
    assert_eq!(body["cancelled"], true);

    let (status, body) = search.await.unwrap();
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "cancelled");
}

#[tokio::test]
async fn user_chain_lifecycle() {
    let app = app().await;
    call(&app, "POST", "/chain/blocks", None).await;
    call(&app, "POST", "/chain/blocks", None).await;

    let (status, body) = call(&app, "POST", "/chain/blocks/1/mine", None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "stale_predecessor");

    let (status, _) = call(&app, "PUT", "/chain/blocks/0", Some(json!({ "data": "hello" }))).await;
    assert_eq!(status, StatusCode::OK);
    let (status, b0) = call(&app, "POST", "/chain/blocks/0/mine", None).await;
    assert_eq!(status, StatusCode::OK);
    let (_, b1) = call(&app, "POST", "/chain/blocks/1/mine", None).await;
    assert_eq!(b1["previous_fingerprint"], b0["fingerprint"]);

    let (_, verify) = call(&app, "GET", "/chain/verify", None).await;
    assert_eq!(verify["valid"], true);

    let (_, edit) = call(&app, "PUT", "/chain/blocks/0", Some(json!({ "data": "x" }))).await;
    assert_eq!(edit["invalidated"], 2);
    let (_, verify) = call(&app, "GET", "/chain/verify", None).await;
    assert_eq!(verify["valid"], false);

    let (status, _) = call(&app, "POST", "/chain/blocks/9/mine", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn cancel_endpoints_report_idle_blocks() {
    let app = app().await;
    call(&app, "POST", "/chain/blocks", None).await;

    let (status, body) = call(&app, "DELETE", "/chain/blocks/0/mine", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "index": 0, "cancelled": false }));
    let (_, chain) = call(&app, "GET", "/chain", None).await;
    assert_eq!(chain["blocks"][0]["state"], "empty");
    assert_eq!(chain["blocks"][0]["timestamp"], "");

    let (status, _) = call(&app, "DELETE", "/chain/blocks/5/mine", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = call(&app, "DELETE", "/ledgers/A/blocks/0/mine", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["cancelled"], false);
    let (_, ledgers) = call(&app, "GET", "/ledgers", None).await;
    assert!(!ledgers["chains"]["A"]["blocks"][0]["fingerprint"]
        .as_str()
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn ledgers_and_transfers() {
    let app = app().await;
    let (_, ledgers) = call(&app, "GET", "/ledgers", None).await;
    assert_eq!(ledgers["chains"]["A"]["blocks"].as_array().unwrap().len(), 1);
    assert_eq!(ledgers["balances"]["B"], 100);

    let (status, body) = call(&app, "POST", "/transfers", Some(json!({ "transfer": "A -> B: 25" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["balances"]["A"], 75);

    let (status, body) = call(&app, "POST", "/transfers", Some(json!({ "transfer": "C -> C: 1" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "bad_transfer");

    let (status, block) = call(&app, "POST", "/ledgers/b/record", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(block["data"], "A -> B: 25");
    let (status, mined) = call(&app, "POST", "/ledgers/B/blocks/1/mine", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(mined["fingerprint"].as_str().unwrap().starts_with('0'));

    let (status, _) = call(&app, "POST", "/ledgers/D/blocks", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn sign_and_verify_roundtrip_over_http() {
    let app = app().await;
    let (_, keys) = call(&app, "POST", "/keys", None).await;
    let (status, signed) = call(
        &app,
        "POST",
        "/sign",
        Some(json!({ "private_key": keys["private_key"], "message": "hello" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, verdict) = call(
        &app,
        "POST",
        "/verify",
        Some(json!({
            "public_key": keys["public_key"],
            "message": "hello",
            "signature": signed["signature"],
        })),
    )
    .await;
    assert_eq!(verdict["valid"], true);

    let (status, _) = call(
        &app,
        "POST",
        "/sign",
        Some(json!({ "private_key": keys["private_key"], "message": "" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
