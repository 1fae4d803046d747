//! Webhook endpoint tests: signature enforcement, dedup, payment lookup.

mod common;

use axum::http::StatusCode;
use common::{sign_with, TestHarness};
use fitroom_store::Store;
use serde_json::json;

async fn post_signed(harness: &TestHarness, raw: &str) -> axum_test::TestResponse {
    harness
        .server
        .post("/webhooks/stripe")
        .add_header("stripe-signature", harness.signature_for(raw))
        .text(raw.to_string())
        .await
}

#[tokio::test]
async fn missing_or_invalid_signature_is_rejected() {
    let harness = TestHarness::new();
    let body = json!({"id": "evt_1", "type": "checkout.session.completed"}).to_string();

    // No header at all.
    let response = harness
        .server
        .post("/webhooks/stripe")
        .text(body.clone())
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);

    // Signed with the wrong secret.
    let response = harness
        .server
        .post("/webhooks/stripe")
        .add_header("stripe-signature", sign_with("whsec_wrong", &body))
        .text(body.clone())
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let error: serde_json::Value = response.json();
    assert_eq!(error["error"]["code"], "bad_signature");
}

#[tokio::test]
async fn unparsable_json_is_rejected() {
    let harness = TestHarness::new();

    let response = post_signed(&harness, "this is not json").await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let error: serde_json::Value = response.json();
    assert_eq!(error["error"]["code"], "bad_request");
}

#[tokio::test]
async fn event_for_unknown_payment_is_acknowledged() {
    let harness = TestHarness::new();
    let body = json!({
        "id": "evt_orphan",
        "type": "checkout.session.completed",
        "data": { "object": { "id": "cs_never_seen", "status": "complete", "payment_status": "paid" } },
    })
    .to_string();

    // 200 so the provider stops redelivering; there is nothing to settle.
    let response = post_signed(&harness, &body).await;
    response.assert_status_ok();
    let received: serde_json::Value = response.json();
    assert_eq!(received["received"], true);
}

#[tokio::test]
async fn event_without_id_dedups_by_content_hash() {
    let harness = TestHarness::new();
    harness.open_account().await;
    harness.seed_pending_payment(Some("cs_hashdedup"));

    // No top-level event id; dedup must fall back to hashing the body.
    let body = json!({
        "type": "checkout.session.completed",
        "data": { "object": { "id": "cs_hashdedup", "status": "complete", "payment_status": "paid" } },
    })
    .to_string();

    post_signed(&harness, &body).await.assert_status_ok();
    assert_eq!(harness.balance().await, 15);

    // Byte-identical redelivery hashes to the same event id.
    post_signed(&harness, &body).await.assert_status_ok();
    assert_eq!(harness.balance().await, 15);
    assert_eq!(
        harness
            .ledger_entries()
            .await
            .iter()
            .filter(|e| e["reason"] == "PAYMENT_TOPUP")
            .count(),
        1
    );
}

#[tokio::test]
async fn metadata_payment_id_recovers_unindexed_payment() {
    let harness = TestHarness::new();
    harness.open_account().await;

    // The webhook raced checkout: the local row exists but no session id
    // was persisted yet, so the session index cannot resolve it.
    let payment = harness.seed_pending_payment(None);

    let body = json!({
        "id": "evt_meta",
        "type": "checkout.session.completed",
        "data": { "object": {
            "id": "cs_not_indexed",
            "status": "complete",
            "payment_status": "paid",
            "metadata": { "paymentId": payment.id.to_string() },
        } },
    })
    .to_string();

    post_signed(&harness, &body).await.assert_status_ok();
    assert_eq!(harness.balance().await, 15);

    let settled = harness.store.get_payment(&payment.id).unwrap().unwrap();
    assert_eq!(settled.status, fitroom_core::PaymentStatus::Paid);
    assert!(settled.paid_at.is_some());
}

#[tokio::test]
async fn event_without_session_reference_is_acknowledged() {
    let harness = TestHarness::new();

    let body = json!({
        "id": "evt_no_object",
        "type": "charge.refunded",
        "data": { "object": { "amount": 500 } },
    })
    .to_string();

    post_signed(&harness, &body).await.assert_status_ok();
}
