//! Try-on charge boundary integration tests.

mod common;

use axum::http::StatusCode;
use common::{TestHarness, SERVICE_API_KEY};
use fitroom_core::JobId;
use serde_json::json;

fn charge_body(harness: &TestHarness) -> serde_json::Value {
    json!({
        "userId": harness.user_id.to_string(),
        "jobId": JobId::generate().to_string(),
    })
}

#[tokio::test]
async fn charge_debits_one_credit() {
    let harness = TestHarness::new();
    harness.open_account().await;

    let response = harness
        .server
        .post("/v1/credits/charge")
        .add_header("x-api-key", SERVICE_API_KEY)
        .json(&charge_body(&harness))
        .await;
    response.assert_status_ok();

    let body: serde_json::Value = response.json();
    assert_eq!(body["charged"], 1);
    assert_eq!(body["balance"], 4);

    let entries = harness.ledger_entries().await;
    assert_eq!(entries[0]["reason"], "TRY_ON_CHARGE");
    assert_eq!(entries[0]["delta"], -1);
    assert!(entries[0]["jobId"].is_string());
}

#[tokio::test]
async fn charge_rejected_when_balance_empty() {
    let harness = TestHarness::new();
    harness.open_account().await;

    // Drain the welcome bonus.
    for _ in 0..5 {
        harness
            .server
            .post("/v1/credits/charge")
            .add_header("x-api-key", SERVICE_API_KEY)
            .json(&charge_body(&harness))
            .await
            .assert_status_ok();
    }
    assert_eq!(harness.balance().await, 0);

    let response = harness
        .server
        .post("/v1/credits/charge")
        .add_header("x-api-key", SERVICE_API_KEY)
        .json(&charge_body(&harness))
        .await;
    response.assert_status(StatusCode::PAYMENT_REQUIRED);

    let body: serde_json::Value = response.json();
    assert_eq!(body["error"]["code"], "insufficient_credits");
    assert_eq!(body["error"]["details"]["balance"], 0);

    // The rejected charge left no trace.
    assert_eq!(harness.balance().await, 0);
    assert_eq!(harness.ledger_entries().await.len(), 6);
}

#[tokio::test]
async fn charge_requires_service_api_key() {
    let harness = TestHarness::new();
    harness.open_account().await;

    let response = harness
        .server
        .post("/v1/credits/charge")
        .json(&charge_body(&harness))
        .await;
    response.assert_status(StatusCode::UNAUTHORIZED);

    let response = harness
        .server
        .post("/v1/credits/charge")
        .add_header("x-api-key", "wrong-key")
        .json(&charge_body(&harness))
        .await;
    response.assert_status(StatusCode::UNAUTHORIZED);

    assert_eq!(harness.balance().await, 5);
}

#[tokio::test]
async fn charge_for_unknown_user_is_not_found() {
    let harness = TestHarness::new();

    let response = harness
        .server
        .post("/v1/credits/charge")
        .add_header("x-api-key", SERVICE_API_KEY)
        .json(&charge_body(&harness))
        .await;
    response.assert_status(StatusCode::NOT_FOUND);
}
