//! The checkout orchestrator.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use fitroom_core::{BillingError, Payment, PaymentId, PaymentProvider, PaymentStatus, UserId};
use fitroom_store::Store;

use super::settlement::SettlementEngine;
use crate::gateway::{CheckoutParams, PaymentGateway};

/// Client request to start a checkout.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    /// Code of the package to purchase.
    pub package_code: String,
    /// Where the provider redirects after a successful payment.
    pub success_url: String,
    /// Where the provider redirects after cancellation.
    pub cancel_url: String,
    /// The client platform starting the checkout (ios/android/web).
    pub platform: String,
}

impl CheckoutRequest {
    fn validate(&self) -> Result<(), BillingError> {
        for (field, value) in [
            ("packageCode", &self.package_code),
            ("successUrl", &self.success_url),
            ("cancelUrl", &self.cancel_url),
            ("platform", &self.platform),
        ] {
            if value.trim().is_empty() {
                return Err(BillingError::Validation(format!("{field} is required")));
            }
        }
        Ok(())
    }
}

/// What the client needs to continue a freshly created checkout.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutReceipt {
    /// The local payment id, used for status polling.
    pub payment_id: PaymentId,
    /// Provider tag.
    pub provider: PaymentProvider,
    /// Hosted checkout URL to redirect to.
    pub redirect_url: String,
    /// When the session expires.
    pub expires_at: DateTime<Utc>,
}

/// A payment as reported to its owner.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentView {
    /// The payment id.
    pub payment_id: PaymentId,
    /// Provider tag.
    pub provider: PaymentProvider,
    /// Provider-assigned session id, if any.
    pub provider_session_id: Option<String>,
    /// Current status.
    pub status: PaymentStatus,
    /// Amount in minor units.
    pub amount_minor: i64,
    /// Currency code.
    pub currency: String,
    /// Credits the payment grants when settled.
    pub credits: i64,
    /// Hosted checkout URL, if still relevant.
    pub redirect_url: Option<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Creates payments and services status polls.
#[derive(Clone)]
pub struct CheckoutOrchestrator {
    store: Arc<dyn Store>,
    gateway: Arc<dyn PaymentGateway>,
    settlement: SettlementEngine,
}

impl CheckoutOrchestrator {
    /// Create an orchestrator.
    #[must_use]
    pub fn new(
        store: Arc<dyn Store>,
        gateway: Arc<dyn PaymentGateway>,
        settlement: SettlementEngine,
    ) -> Self {
        Self {
            store,
            gateway,
            settlement,
        }
    }

    /// Create a payment and its hosted checkout session.
    ///
    /// The payment row is saved in `Created` before the gateway call so a
    /// webhook arriving mid-call can already resolve it through the session
    /// metadata. Once the gateway responds, the session id, redirect URL and
    /// payload are persisted and a `Created` mapping is promoted to
    /// `Pending`.
    ///
    /// # Errors
    ///
    /// - `Validation` for blank request fields.
    /// - `NotFound` for an unknown user or a missing/inactive package.
    /// - `ExternalService` when the gateway call fails; the payment stays
    ///   in `Created` and is never retried internally.
    pub async fn create_checkout(
        &self,
        user_id: UserId,
        request: CheckoutRequest,
    ) -> Result<CheckoutReceipt, BillingError> {
        request.validate()?;

        self.store
            .get_account(&user_id)?
            .ok_or_else(|| BillingError::NotFound("credit account not found".into()))?;

        let package = self
            .store
            .get_package(&request.package_code)?
            .filter(|p| p.active)
            .ok_or_else(|| BillingError::NotFound("payment package not found".into()))?;

        let mut payment = Payment::new(user_id, &package, PaymentProvider::Stripe);
        self.store.put_payment(&payment)?;

        let params = CheckoutParams {
            success_url: request.success_url,
            cancel_url: request.cancel_url,
        };
        let session = self
            .gateway
            .create_checkout_session(&payment, &package, &params)
            .await?;

        payment.provider_session_id = Some(session.session_id);
        payment.redirect_url = Some(session.redirect_url.clone());
        payment.provider_payload = Some(session.raw_payload);
        payment.status = if session.status == PaymentStatus::Created {
            PaymentStatus::Pending
        } else {
            session.status
        };
        payment.updated_at = Utc::now();
        self.store.put_payment(&payment)?;

        tracing::info!(
            payment_id = %payment.id,
            user_id = %user_id,
            package = %package.code,
            status = %payment.status,
            "Checkout created"
        );

        Ok(CheckoutReceipt {
            payment_id: payment.id,
            provider: payment.provider,
            redirect_url: session.redirect_url,
            expires_at: session.expires_at,
        })
    }

    /// Report a payment's status to its owner, refreshing from the gateway
    /// when the outcome is still open.
    ///
    /// This is the pull-based fallback for clients returning to the app
    /// before any webhook lands: a non-terminal payment with a session id is
    /// queried at the gateway (before any lock is taken) and the result runs
    /// through the same settlement funnel the webhook path uses.
    ///
    /// # Errors
    ///
    /// - `NotFound` when the payment does not exist or belongs to another
    ///   user.
    /// - `ExternalService` when the gateway query fails.
    pub async fn payment_status(
        &self,
        user_id: UserId,
        payment_id: PaymentId,
    ) -> Result<PaymentView, BillingError> {
        let payment = self.owned_payment(user_id, payment_id)?;

        if !payment.status.is_terminal() {
            if let Some(session_id) = &payment.provider_session_id {
                let result = self.gateway.session_status(session_id).await?;
                self.settlement
                    .apply_provider_status(payment.id, result.status, &result.raw_payload)
                    .await?;
            }
        }

        let refreshed = self.owned_payment(user_id, payment_id)?;
        self.view(refreshed)
    }

    fn owned_payment(&self, user_id: UserId, payment_id: PaymentId) -> Result<Payment, BillingError> {
        self.store
            .get_payment(&payment_id)?
            .filter(|p| p.user_id == user_id)
            .ok_or_else(|| BillingError::NotFound("payment not found".into()))
    }

    fn view(&self, payment: Payment) -> Result<PaymentView, BillingError> {
        let package = self
            .store
            .get_package(&payment.package_code)?
            .ok_or_else(|| BillingError::NotFound("payment package not found".into()))?;

        Ok(PaymentView {
            payment_id: payment.id,
            provider: payment.provider,
            provider_session_id: payment.provider_session_id,
            status: payment.status,
            amount_minor: payment.amount_minor,
            currency: payment.currency,
            credits: package.credits,
            redirect_url: payment.redirect_url,
            created_at: payment.created_at,
            updated_at: payment.updated_at,
        })
    }
}
