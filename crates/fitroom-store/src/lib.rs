//! `RocksDB` storage layer for fitroom billing.
//!
//! This crate provides durable storage for credit accounts, the package
//! catalog, payments, the append-only ledger, and webhook dedup records.
//!
//! # Architecture
//!
//! The storage uses the following column families:
//!
//! - `accounts`: balance rows, keyed by `user_id`
//! - `packages`: package catalog, keyed by code
//! - `payments`: payments, keyed by `payment_id`
//! - `payments_by_session`: index from provider session id to payment id
//! - `ledger`: ledger entries, keyed by `entry_id` (ULID)
//! - `ledger_by_user`: index for listing a user's entries in time order
//! - `webhook_events`: dedup records, keyed by `provider:event_id`
//!
//! The [`Store`] trait is the capability interface the billing services
//! program against; [`RocksStore`] is the production implementation. Row
//! locking lives beside the store in [`RowLocks`] so the settlement and
//! ledger critical sections span multiple store calls under one guard.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod keys;
pub mod locks;
pub mod rocks;
pub mod schema;

pub use error::{Result, StoreError};
pub use locks::{RowGuard, RowLocks};
pub use rocks::RocksStore;

use fitroom_core::{
    CreditAccount, LedgerEntry, Payment, PaymentId, PaymentPackage, PaymentProvider, UserId,
    WebhookEvent,
};

/// The storage trait defining all database operations.
///
/// This abstracts the storage engine away from the billing services; any
/// durable store that can write a balance row and a ledger entry atomically
/// can implement it.
pub trait Store: Send + Sync {
    // =========================================================================
    // Account Operations
    // =========================================================================

    /// Insert or update a credit account row.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn put_account(&self, account: &CreditAccount) -> Result<()>;

    /// Get a credit account by user ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_account(&self, user_id: &UserId) -> Result<Option<CreditAccount>>;

    // =========================================================================
    // Package Catalog
    // =========================================================================

    /// Insert or update a payment package.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn put_package(&self, package: &PaymentPackage) -> Result<()>;

    /// Get a package by code, active or not.
    ///
    /// Settlement uses this so a deactivated package still settles payments
    /// that already reference it.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_package(&self, code: &str) -> Result<Option<PaymentPackage>>;

    /// List active packages, cheapest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_active_packages(&self) -> Result<Vec<PaymentPackage>>;

    // =========================================================================
    // Payments
    // =========================================================================

    /// Insert or update a payment, maintaining the session index.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn put_payment(&self, payment: &Payment) -> Result<()>;

    /// Get a payment by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_payment(&self, payment_id: &PaymentId) -> Result<Option<Payment>>;

    /// Find a payment by its provider session id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn find_payment_by_session(
        &self,
        provider: PaymentProvider,
        session_id: &str,
    ) -> Result<Option<Payment>>;

    // =========================================================================
    // Ledger
    // =========================================================================

    /// Persist a balance update and its ledger entry atomically.
    ///
    /// The account row, the entry, and the per-user index land in a single
    /// write batch: either the balance and its audit row both exist, or
    /// neither does.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn apply_ledger_entry(&self, account: &CreditAccount, entry: &LedgerEntry) -> Result<()>;

    /// List ledger entries for a user, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_ledger_by_user(
        &self,
        user_id: &UserId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<LedgerEntry>>;

    // =========================================================================
    // Webhook Deduplication
    // =========================================================================

    /// Record a webhook event if it has not been seen before.
    ///
    /// Returns `true` if the event was newly recorded, `false` for a
    /// duplicate. Check and insert are atomic: of two concurrent deliveries
    /// of the same event, exactly one caller sees `true`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn record_webhook_event(&self, event: &WebhookEvent) -> Result<bool>;

    // =========================================================================
    // Row Locks
    // =========================================================================

    /// The row-lock registry scoped to this store's rows.
    fn locks(&self) -> &RowLocks;
}
