//! The credit ledger service.

use std::sync::Arc;

use chrono::Utc;

use fitroom_core::{
    BillingError, CreditAccount, JobId, LedgerEntry, LedgerReason, PaymentId, UserId,
    WELCOME_CREDITS,
};
use fitroom_store::Store;

/// Concurrency-safe balance mutation over the append-only ledger.
///
/// This primitive is shared: payment settlement credits through it and the
/// try-on charge boundary debits through it, with distinct reasons. All
/// mutation happens under the user's balance-row lock, so concurrent callers
/// for the same user serialize and no update is lost.
#[derive(Clone)]
pub struct CreditLedger {
    store: Arc<dyn Store>,
}

impl CreditLedger {
    /// Create a ledger service over a store.
    #[must_use]
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Apply a signed delta to a user's balance and append the audit entry.
    ///
    /// Holds the balance-row lock for the full read-compute-write-append
    /// sequence. The new balance and the entry land in one atomic store
    /// write; the guard releases on every exit path.
    ///
    /// # Errors
    ///
    /// - `NotFound` when the user has no account.
    /// - `InsufficientCredits` when the delta would take the balance
    ///   below zero; nothing is written.
    pub async fn adjust(
        &self,
        user_id: UserId,
        delta: i64,
        reason: LedgerReason,
        payment_id: Option<PaymentId>,
        job_id: Option<JobId>,
    ) -> Result<i64, BillingError> {
        let _row = self.store.locks().lock_user(user_id).await;

        let mut account = self
            .store
            .get_account(&user_id)?
            .ok_or_else(|| BillingError::NotFound("credit account not found".into()))?;

        let candidate = account.balance + delta;
        if candidate < 0 {
            return Err(BillingError::InsufficientCredits {
                balance: account.balance,
                required: delta.abs(),
            });
        }

        account.balance = candidate;
        account.updated_at = Utc::now();

        let entry = LedgerEntry::new(user_id, delta, candidate, reason, payment_id, job_id);
        self.store.apply_ledger_entry(&account, &entry)?;

        tracing::info!(
            user_id = %user_id,
            delta = %delta,
            reason = ?reason,
            balance = %candidate,
            "Ledger entry applied"
        );

        Ok(candidate)
    }

    /// Create the user's account if absent, granting the welcome bonus once.
    ///
    /// Re-provisioning an existing account is a no-op returning its current
    /// state, so the grant can never be issued twice.
    pub async fn open_account(&self, user_id: UserId) -> Result<CreditAccount, BillingError> {
        let _row = self.store.locks().lock_user(user_id).await;

        if let Some(existing) = self.store.get_account(&user_id)? {
            return Ok(existing);
        }

        let mut account = CreditAccount::new(user_id);
        account.balance = WELCOME_CREDITS;

        let entry = LedgerEntry::new(
            user_id,
            WELCOME_CREDITS,
            WELCOME_CREDITS,
            LedgerReason::WelcomeBonus,
            None,
            None,
        );
        self.store.apply_ledger_entry(&account, &entry)?;

        tracing::info!(user_id = %user_id, credits = %WELCOME_CREDITS, "Account opened with welcome bonus");

        Ok(account)
    }

    /// Read a user's current balance.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` when the user has no account.
    pub fn balance(&self, user_id: UserId) -> Result<i64, BillingError> {
        self.store
            .get_account(&user_id)?
            .map(|account| account.balance)
            .ok_or_else(|| BillingError::NotFound("credit account not found".into()))
    }

    /// List a user's ledger entries, newest first.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` when the user has no account.
    pub fn history(
        &self,
        user_id: UserId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<LedgerEntry>, BillingError> {
        self.store
            .get_account(&user_id)?
            .ok_or_else(|| BillingError::NotFound("credit account not found".into()))?;

        Ok(self.store.list_ledger_by_user(&user_id, limit, offset)?)
    }
}
