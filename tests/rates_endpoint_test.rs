use axum::http::StatusCode;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use tower::util::ServiceExt;
use vault_fees::api;
use vault_fees::config::Config;
use vault_fees::{MemoryFeeStore, Settler};

fn setup_app() -> axum::Router {
    let mut env = HashMap::new();
    env.insert("DATABASE_PATH".to_string(), "unused.db".to_string());
    let config = Config::from_env_map(env).unwrap();
    let settler = Settler::from_config(Arc::new(MemoryFeeStore::new()), &config);
    api::create_router(api::AppState::new(settler))
}

async fn post(app: &axum::Router, uri: &str, body: serde_json::Value) -> (StatusCode, serde_json::Value) {
    let req = axum::http::Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(axum::body::Body::from(body.to_string()))
        .unwrap();

    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null))
}

#[tokio::test]
async fn test_rate_conversion_round_trips_within_one_unit() {
    let app = setup_app();

    let (status, json) = post(&app, "/v1/rates/to-scaled", json!({"annualRate": "0.05"})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["annualRate"], "50000000000000000");
    assert_eq!(json["annualRateDecimal"], "0.05");
    let scaled = json["scaledPerSecondRate"].as_str().unwrap().to_string();

    let (status, json) = post(
        &app,
        "/v1/rates/from-scaled",
        json!({"scaledPerSecondRate": scaled}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let back: u128 = json["annualRate"].as_str().unwrap().parse().unwrap();
    assert!(back.abs_diff(50_000_000_000_000_000) <= 1);
}

#[tokio::test]
async fn test_rate_conversion_errors() {
    let app = setup_app();

    let (status, _) = post(&app, "/v1/rates/to-scaled", json!({"annualRate": "1.5"})).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) = post(&app, "/v1/rates/to-scaled", json!({"annualRate": "two percent"})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = post(
        &app,
        "/v1/rates/from-scaled",
        json!({"scaledPerSecondRate": "999"}),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_entrance_and_exit_quotes() {
    let app = setup_app();

    let (status, json) = post(
        &app,
        "/v1/fees/entrance",
        json!({"rate": "0.01", "sharesBought": "1010000"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["feeShares"], "10000");
    assert_eq!(json["netShares"], "1000000");

    let (status, json) = post(
        &app,
        "/v1/fees/exit",
        json!({"rateBps": "25", "sharesRedeemed": "1000000"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["feeShares"], "2500");
    assert_eq!(json["netShares"], "997500");

    let (status, _) = post(
        &app,
        "/v1/fees/exit",
        json!({"rateBps": "10001", "sharesRedeemed": "1000000"}),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_health_and_ready() {
    let app = setup_app();

    let req = axum::http::Request::builder()
        .uri("/ready")
        .body(axum::body::Body::empty())
        .unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(json["status"], "ready");
    assert_eq!(json["precisionDigits"], 27);
}
