//! Settlement engine and ledger behavior, exercised against a real store.

use std::sync::Arc;

use tempfile::TempDir;

use fitroom_core::{
    CreditAccount, JobId, LedgerReason, Payment, PaymentPackage, PaymentProvider, PaymentStatus,
    UserId,
};
use fitroom_service::billing::{CreditLedger, SettlementEngine, WebhookOutcome, WebhookProcessor};
use fitroom_service::crypto::hmac_sha256_hex;
use fitroom_service::WebhookVerifier;
use fitroom_store::{RocksStore, Store};

struct Fixture {
    store: Arc<RocksStore>,
    ledger: CreditLedger,
    settlement: SettlementEngine,
    user_id: UserId,
    _temp: TempDir,
}

impl Fixture {
    fn new() -> Self {
        let temp = TempDir::new().unwrap();
        let store = Arc::new(RocksStore::open(temp.path()).unwrap());
        for package in PaymentPackage::default_catalog() {
            store.put_package(&package).unwrap();
        }

        let user_id = UserId::generate();
        store.put_account(&CreditAccount::new(user_id)).unwrap();

        let dyn_store: Arc<dyn Store> = Arc::clone(&store) as Arc<dyn Store>;
        let ledger = CreditLedger::new(Arc::clone(&dyn_store));
        let settlement = SettlementEngine::new(dyn_store, ledger.clone());

        Self {
            store,
            ledger,
            settlement,
            user_id,
            _temp: temp,
        }
    }

    fn pending_payment(&self, session_id: &str) -> Payment {
        let package = self.store.get_package("starter").unwrap().unwrap();
        let mut payment = Payment::new(self.user_id, &package, PaymentProvider::Stripe);
        payment.provider_session_id = Some(session_id.into());
        payment.status = PaymentStatus::Pending;
        self.store.put_payment(&payment).unwrap();
        payment
    }

    fn balance(&self) -> i64 {
        self.store
            .get_account(&self.user_id)
            .unwrap()
            .unwrap()
            .balance
    }

    fn topup_entries(&self) -> usize {
        self.store
            .list_ledger_by_user(&self.user_id, 100, 0)
            .unwrap()
            .iter()
            .filter(|e| e.reason == LedgerReason::PaymentTopup)
            .count()
    }
}

#[tokio::test]
async fn repeated_paid_reports_credit_exactly_once() {
    let fx = Fixture::new();
    let payment = fx.pending_payment("cs_settle_1");

    for _ in 0..3 {
        let settled = fx
            .settlement
            .apply_provider_status(payment.id, PaymentStatus::Paid, r#"{"payment_status":"paid"}"#)
            .await
            .unwrap();
        assert_eq!(settled.status, PaymentStatus::Paid);
    }

    // Starter grants 10 credits on a zero balance: exactly one topup entry.
    assert_eq!(fx.balance(), 10);
    assert_eq!(fx.topup_entries(), 1);

    let entries = fx.store.list_ledger_by_user(&fx.user_id, 10, 0).unwrap();
    assert_eq!(entries[0].delta, 10);
    assert_eq!(entries[0].balance_after, 10);
    assert_eq!(entries[0].payment_id, Some(payment.id));

    let stored = fx.store.get_payment(&payment.id).unwrap().unwrap();
    assert!(stored.paid_at.is_some());
}

#[tokio::test]
async fn open_payments_follow_reported_status() {
    let fx = Fixture::new();
    let payment = fx.pending_payment("cs_settle_2");

    let settled = fx
        .settlement
        .apply_provider_status(payment.id, PaymentStatus::Failed, r#"{"payment_status":"failed"}"#)
        .await
        .unwrap();
    assert_eq!(settled.status, PaymentStatus::Failed);

    // A later non-terminal report cannot reopen it, but its payload is kept.
    let settled = fx
        .settlement
        .apply_provider_status(payment.id, PaymentStatus::Pending, r#"{"late":true}"#)
        .await
        .unwrap();
    assert_eq!(settled.status, PaymentStatus::Failed);

    let stored = fx.store.get_payment(&payment.id).unwrap().unwrap();
    assert_eq!(stored.status, PaymentStatus::Failed);
    assert_eq!(stored.provider_payload.as_deref(), Some(r#"{"late":true}"#));
}

#[tokio::test]
async fn terminal_non_paid_resists_even_paid_reports() {
    let fx = Fixture::new();
    let payment = fx.pending_payment("cs_settle_3");

    fx.settlement
        .apply_provider_status(payment.id, PaymentStatus::Expired, "{}")
        .await
        .unwrap();

    let settled = fx
        .settlement
        .apply_provider_status(payment.id, PaymentStatus::Paid, "{}")
        .await
        .unwrap();

    assert_eq!(settled.status, PaymentStatus::Expired);
    assert_eq!(fx.balance(), 0);
    assert_eq!(fx.topup_entries(), 0);
}

#[tokio::test]
async fn unknown_payment_is_not_found() {
    let fx = Fixture::new();
    let missing = fitroom_core::PaymentId::generate();

    let err = fx
        .settlement
        .apply_provider_status(missing, PaymentStatus::Paid, "{}")
        .await
        .unwrap_err();
    assert!(matches!(err, fitroom_core::BillingError::NotFound(_)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_adjusts_lose_no_updates() {
    let fx = Fixture::new();

    let mut handles = Vec::new();
    for _ in 0..20 {
        let ledger = fx.ledger.clone();
        let user_id = fx.user_id;
        handles.push(tokio::spawn(async move {
            ledger
                .adjust(user_id, 1, LedgerReason::PaymentTopup, None, None)
                .await
                .unwrap()
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    assert_eq!(fx.balance(), 20);

    // Every intermediate balance_after is consistent with its position.
    let mut entries = fx.store.list_ledger_by_user(&fx.user_id, 100, 0).unwrap();
    entries.reverse(); // oldest first
    for (index, entry) in entries.iter().enumerate() {
        assert_eq!(entry.balance_after, i64::try_from(index).unwrap() + 1);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_debits_never_go_negative() {
    let fx = Fixture::new();
    fx.ledger
        .adjust(fx.user_id, 1, LedgerReason::PaymentTopup, None, None)
        .await
        .unwrap();

    // Two racing single-credit charges against a balance of one.
    let mut handles = Vec::new();
    for _ in 0..2 {
        let ledger = fx.ledger.clone();
        let user_id = fx.user_id;
        handles.push(tokio::spawn(async move {
            ledger
                .adjust(
                    user_id,
                    -1,
                    LedgerReason::TryOnCharge,
                    None,
                    Some(JobId::generate()),
                )
                .await
        }));
    }

    let mut successes = 0;
    let mut rejections = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(balance) => {
                assert_eq!(balance, 0);
                successes += 1;
            }
            Err(fitroom_core::BillingError::InsufficientCredits { balance, required }) => {
                assert_eq!(balance, 0);
                assert_eq!(required, 1);
                rejections += 1;
            }
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    assert_eq!(successes, 1);
    assert_eq!(rejections, 1);
    assert_eq!(fx.balance(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_duplicate_delivery_settles_once() {
    let fx = Fixture::new();
    let payment = fx.pending_payment("cs_race");

    let secret = "whsec_race_secret";
    let verifier = WebhookVerifier::new(Some(secret), 300).unwrap();
    let processor = WebhookProcessor::new(
        Arc::clone(&fx.store) as Arc<dyn Store>,
        fx.settlement.clone(),
        verifier,
    );

    let body = serde_json::json!({
        "id": "evt_race",
        "type": "checkout.session.completed",
        "data": { "object": { "id": "cs_race", "status": "complete", "payment_status": "paid" } },
    })
    .to_string();
    let timestamp = chrono::Utc::now().timestamp();
    let header = format!(
        "t={timestamp},v1={}",
        hmac_sha256_hex(secret, &format!("{timestamp}.{body}"))
    );

    let (first, second) = tokio::join!(
        processor.process(&header, &body),
        processor.process(&header, &body)
    );
    let outcomes = [first.unwrap(), second.unwrap()];

    let settled = outcomes
        .iter()
        .filter(|o| matches!(o, WebhookOutcome::Settled(PaymentStatus::Paid)))
        .count();
    let duplicates = outcomes
        .iter()
        .filter(|o| matches!(o, WebhookOutcome::Duplicate))
        .count();
    assert_eq!(settled, 1);
    assert_eq!(duplicates, 1);

    assert_eq!(fx.balance(), 10);
    assert_eq!(fx.topup_entries(), 1);

    let stored = fx.store.get_payment(&payment.id).unwrap().unwrap();
    assert_eq!(stored.status, PaymentStatus::Paid);
}
