//! The webhook processing pipeline.

use std::sync::Arc;

use sha2::{Digest, Sha256};

use fitroom_core::{
    map_webhook_status, BillingError, Payment, PaymentProvider, PaymentStatus, WebhookEvent,
};
use fitroom_store::Store;

use super::settlement::SettlementEngine;
use crate::webhook_verifier::WebhookVerifier;

/// How a webhook delivery was handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebhookOutcome {
    /// The event reached settlement; the payment now has this status.
    Settled(PaymentStatus),
    /// The event was already processed. No state was touched.
    Duplicate,
    /// The event did not reference a known payment. Recorded and skipped.
    Ignored,
}

/// Runs deliveries through verify → parse → dedup → locate → map → settle.
///
/// Each event is processed in isolation: a failure settling one delivery
/// surfaces on that request alone and redelivery picks it up again.
#[derive(Clone)]
pub struct WebhookProcessor {
    store: Arc<dyn Store>,
    settlement: SettlementEngine,
    verifier: WebhookVerifier,
}

impl WebhookProcessor {
    /// Create a processor.
    #[must_use]
    pub fn new(store: Arc<dyn Store>, settlement: SettlementEngine, verifier: WebhookVerifier) -> Self {
        Self {
            store,
            settlement,
            verifier,
        }
    }

    /// Process one Stripe delivery.
    ///
    /// The raw body must be the exact bytes as received; the signature
    /// covers them verbatim.
    ///
    /// # Errors
    ///
    /// - `BadSignature` when the signature does not verify. Nothing is read
    ///   or written.
    /// - `Validation` when the body is not valid JSON.
    /// - Storage errors from the dedup or settlement writes.
    pub async fn process(
        &self,
        signature_header: &str,
        raw_body: &str,
    ) -> Result<WebhookOutcome, BillingError> {
        if !self.verifier.verify(signature_header, raw_body) {
            return Err(BillingError::BadSignature);
        }

        let payload: serde_json::Value = serde_json::from_str(raw_body)
            .map_err(|_| BillingError::Validation("webhook payload is not valid JSON".into()))?;

        let event_id = resolve_event_id(&payload, raw_body);
        let event = WebhookEvent::new(PaymentProvider::Stripe, event_id.clone(), raw_body);
        if !self.store.record_webhook_event(&event)? {
            tracing::info!(event_id = %event_id, "Duplicate webhook delivery skipped");
            return Ok(WebhookOutcome::Duplicate);
        }

        let event_object = payload
            .pointer("/data/object")
            .cloned()
            .unwrap_or(serde_json::Value::Null);

        let Some(payment) = self.locate_payment(&event_object)? else {
            tracing::warn!(event_id = %event_id, "Webhook does not reference a known payment");
            return Ok(WebhookOutcome::Ignored);
        };

        let event_type = text(&payload, "type").unwrap_or_default();
        let status = map_webhook_status(
            &event_type,
            text(&event_object, "status").as_deref(),
            text(&event_object, "payment_status").as_deref(),
        );

        let settled = self
            .settlement
            .apply_provider_status(payment.id, status, raw_body)
            .await?;

        tracing::info!(
            event_id = %event_id,
            event_type = %event_type,
            payment_id = %settled.id,
            status = %settled.status,
            "Webhook settled"
        );

        Ok(WebhookOutcome::Settled(settled.status))
    }

    /// Find the payment a delivery refers to: by session id first, then by
    /// the `paymentId` the checkout embedded in the session metadata.
    fn locate_payment(
        &self,
        event_object: &serde_json::Value,
    ) -> Result<Option<Payment>, BillingError> {
        let Some(session_id) = text(event_object, "id") else {
            return Ok(None);
        };

        if let Some(payment) = self
            .store
            .find_payment_by_session(PaymentProvider::Stripe, &session_id)?
        {
            return Ok(Some(payment));
        }

        let metadata_payment_id = event_object
            .pointer("/metadata/paymentId")
            .and_then(serde_json::Value::as_str)
            .and_then(|s| s.parse().ok());

        match metadata_payment_id {
            Some(payment_id) => Ok(self.store.get_payment(&payment_id)?),
            None => Ok(None),
        }
    }
}

/// The provider's event id, or a content hash so id-less payloads still
/// deduplicate deterministically.
fn resolve_event_id(payload: &serde_json::Value, raw_body: &str) -> String {
    if let Some(id) = text(payload, "id") {
        return id;
    }
    hex::encode(Sha256::digest(raw_body.as_bytes()))
}

fn text(value: &serde_json::Value, field: &str) -> Option<String> {
    value
        .get(field)
        .and_then(serde_json::Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
}
