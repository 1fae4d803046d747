//! The settlement engine.

use std::sync::Arc;

use chrono::Utc;

use fitroom_core::{BillingError, LedgerReason, Payment, PaymentId, PaymentStatus};
use fitroom_store::Store;

use super::ledger::CreditLedger;

/// Applies a reported payment outcome to durable state.
///
/// Every provider-reported status, whether pushed by webhook or pulled by a
/// client poll, funnels through
/// [`apply_provider_status`](Self::apply_provider_status), so the two
/// delivery paths can never disagree on transition rules.
#[derive(Clone)]
pub struct SettlementEngine {
    store: Arc<dyn Store>,
    ledger: CreditLedger,
}

impl SettlementEngine {
    /// Create a settlement engine.
    #[must_use]
    pub fn new(store: Arc<dyn Store>, ledger: CreditLedger) -> Self {
        Self { store, ledger }
    }

    /// Apply a provider-reported status to a payment.
    ///
    /// Runs under the payment-row lock for its full duration. A webhook
    /// racing a concurrent poll for the same payment serializes here: the
    /// second caller observes the settled row and takes the idempotent
    /// short-circuit, so at most one topup entry ever exists per payment.
    ///
    /// The raw payload is stored regardless of outcome. A `Paid` report
    /// flips the status durably first and then credits the ledger; any other
    /// report only overwrites a non-terminal status, so a late or
    /// out-of-order event can never resurrect a settled payment.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` when the payment (or, on first settlement, its
    /// package) does not exist.
    pub async fn apply_provider_status(
        &self,
        payment_id: PaymentId,
        reported: PaymentStatus,
        raw_payload: &str,
    ) -> Result<Payment, BillingError> {
        let _row = self.store.locks().lock_payment(payment_id).await;

        let mut payment = self
            .store
            .get_payment(&payment_id)?
            .ok_or_else(|| BillingError::NotFound("payment not found".into()))?;

        if payment.status == PaymentStatus::Paid {
            return Ok(payment);
        }

        // The payload is stored regardless of outcome, for audit.
        payment.provider_payload = Some(raw_payload.to_string());
        payment.updated_at = Utc::now();

        if payment.status.is_terminal() {
            // Failed/Expired/Canceled are just as final as Paid: a late or
            // out-of-order event never reclassifies a settled payment. Only
            // its payload is kept.
            self.store.put_payment(&payment)?;
            return Ok(payment);
        }

        if reported == PaymentStatus::Paid {
            payment.status = PaymentStatus::Paid;
            payment.paid_at = Some(Utc::now());
            self.store.put_payment(&payment)?;

            // Credit issuance happens strictly after the status flip is
            // durable; the payment lock held here makes the pair one
            // logical transaction.
            let package = self
                .store
                .get_package(&payment.package_code)?
                .ok_or_else(|| BillingError::NotFound("payment package not found".into()))?;

            let balance = self
                .ledger
                .adjust(
                    payment.user_id,
                    package.credits,
                    LedgerReason::PaymentTopup,
                    Some(payment.id),
                    None,
                )
                .await?;

            tracing::info!(
                payment_id = %payment.id,
                user_id = %payment.user_id,
                credits = %package.credits,
                balance = %balance,
                "Payment settled as paid"
            );

            return Ok(payment);
        }

        payment.status = reported;
        self.store.put_payment(&payment)?;

        tracing::info!(
            payment_id = %payment.id,
            status = %reported,
            "Payment status updated"
        );

        Ok(payment)
    }
}
