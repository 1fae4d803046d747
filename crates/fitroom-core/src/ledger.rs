//! Credit ledger types.
//!
//! The ledger is an append-only sequence of signed deltas. Every balance
//! change produces exactly one `LedgerEntry` carrying the balance after the
//! change, so the row sequence replays to the current balance for audit.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{JobId, LedgerEntryId, PaymentId, UserId};

/// Credits granted once when an account is provisioned.
pub const WELCOME_CREDITS: i64 = 5;

/// The durable balance row for one user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreditAccount {
    /// The user this balance belongs to.
    pub user_id: UserId,

    /// Current credit balance. Never negative.
    pub balance: i64,

    /// When the account was created.
    pub created_at: DateTime<Utc>,

    /// When the balance was last changed.
    pub updated_at: DateTime<Utc>,
}

impl CreditAccount {
    /// Create a new account with zero balance.
    #[must_use]
    pub fn new(user_id: UserId) -> Self {
        let now = Utc::now();
        Self {
            user_id,
            balance: 0,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Why a ledger entry exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LedgerReason {
    /// One-time grant at account provisioning.
    WelcomeBonus,

    /// Credits from a settled payment.
    PaymentTopup,

    /// Debit for one try-on render job.
    TryOnCharge,
}

impl std::fmt::Display for LedgerReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::WelcomeBonus => "WELCOME_BONUS",
            Self::PaymentTopup => "PAYMENT_TOPUP",
            Self::TryOnCharge => "TRY_ON_CHARGE",
        };
        write!(f, "{name}")
    }
}

/// One append-only ledger row. Never mutated or deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Entry id (ULID, time-ordered).
    pub id: LedgerEntryId,

    /// The user whose balance changed.
    pub user_id: UserId,

    /// Signed credit delta. Positive = grant, negative = charge.
    pub delta: i64,

    /// Balance after applying the delta.
    pub balance_after: i64,

    /// Why the balance changed.
    pub reason: LedgerReason,

    /// The payment that caused this entry, for topups.
    pub payment_id: Option<PaymentId>,

    /// The try-on job that caused this entry, for charges.
    pub job_id: Option<JobId>,

    /// When the entry was appended.
    pub created_at: DateTime<Utc>,
}

impl LedgerEntry {
    /// Create a new ledger entry.
    #[must_use]
    pub fn new(
        user_id: UserId,
        delta: i64,
        balance_after: i64,
        reason: LedgerReason,
        payment_id: Option<PaymentId>,
        job_id: Option<JobId>,
    ) -> Self {
        Self {
            id: LedgerEntryId::generate(),
            user_id,
            delta,
            balance_after,
            reason,
            payment_id,
            job_id,
            created_at: Utc::now(),
        }
    }
}
