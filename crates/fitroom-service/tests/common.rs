//! Shared test harness.

#![allow(dead_code)] // each test binary uses a subset of the helpers

use std::sync::Arc;

use axum_test::TestServer;
use tempfile::TempDir;

use fitroom_core::{Payment, PaymentPackage, PaymentProvider, PaymentStatus, UserId};
use fitroom_service::crypto::hmac_sha256_hex;
use fitroom_service::{create_router, AppState, ServiceConfig};
use fitroom_store::{RocksStore, Store};

/// Webhook signing secret used across the test suite.
pub const WEBHOOK_SECRET: &str = "whsec_test_secret";

/// Service API key used across the test suite.
pub const SERVICE_API_KEY: &str = "svc_test_key";

pub struct TestHarness {
    pub server: TestServer,
    pub store: Arc<RocksStore>,
    pub user_id: UserId,
    _temp: TempDir,
}

impl TestHarness {
    /// Harness with an unroutable gateway; tests that never reach Stripe.
    pub fn new() -> Self {
        Self::with_stripe_base("http://127.0.0.1:1")
    }

    /// Harness pointing the Stripe gateway at a stub server.
    pub fn with_stripe_base(base_url: &str) -> Self {
        let temp = TempDir::new().expect("failed to create temp directory");
        let store = Arc::new(RocksStore::open(temp.path()).expect("failed to open store"));

        for package in PaymentPackage::default_catalog() {
            store.put_package(&package).expect("failed to seed package");
        }

        let config = ServiceConfig {
            data_dir: temp.path().to_string_lossy().into_owned(),
            service_api_key: Some(SERVICE_API_KEY.into()),
            stripe_base_url: base_url.trim_end_matches('/').into(),
            stripe_secret_key: Some("sk_test_harness".into()),
            stripe_webhook_secret: Some(WEBHOOK_SECRET.into()),
            ..ServiceConfig::default()
        };

        let state = AppState::new(Arc::clone(&store) as Arc<dyn Store>, config);
        let server = TestServer::new(create_router(state)).expect("failed to create test server");

        Self {
            server,
            store,
            user_id: UserId::generate(),
            _temp: temp,
        }
    }

    pub fn auth_header(&self) -> String {
        format!("Bearer {}", self.user_id)
    }

    /// A valid `Stripe-Signature` header for a body, timestamped now.
    pub fn signature_for(&self, body: &str) -> String {
        sign_with(WEBHOOK_SECRET, body)
    }

    /// Provision the harness user's account (welcome bonus included).
    pub async fn open_account(&self) {
        self.server
            .post("/v1/accounts")
            .add_header("authorization", self.auth_header())
            .await
            .assert_status_ok();
    }

    pub async fn balance(&self) -> i64 {
        let response = self
            .server
            .get("/v1/billing/balance")
            .add_header("authorization", self.auth_header())
            .await;
        response.assert_status_ok();
        response.json::<serde_json::Value>()["balance"]
            .as_i64()
            .expect("balance field")
    }

    pub async fn ledger_entries(&self) -> Vec<serde_json::Value> {
        let response = self
            .server
            .get("/v1/billing/ledger")
            .add_header("authorization", self.auth_header())
            .await;
        response.assert_status_ok();
        response.json::<serde_json::Value>()["entries"]
            .as_array()
            .expect("entries field")
            .clone()
    }

    /// Insert a pending payment for the harness user directly into the
    /// store, as the checkout orchestrator would have left it.
    pub fn seed_pending_payment(&self, session_id: Option<&str>) -> Payment {
        let package = self
            .store
            .get_package("starter")
            .expect("store read")
            .expect("starter package");

        let mut payment = Payment::new(self.user_id, &package, PaymentProvider::Stripe);
        if let Some(session_id) = session_id {
            payment.provider_session_id = Some(session_id.into());
            payment.status = PaymentStatus::Pending;
        }
        self.store.put_payment(&payment).expect("store write");
        payment
    }
}

/// A valid signature header for a body under an arbitrary secret.
pub fn sign_with(secret: &str, body: &str) -> String {
    let timestamp = chrono::Utc::now().timestamp();
    let signature = hmac_sha256_hex(secret, &format!("{timestamp}.{body}"));
    format!("t={timestamp},v1={signature}")
}
