//! Database schema definitions and column families.
//!
//! This module defines the column families used in `RocksDB` storage.

/// Column family names for the `RocksDB` database.
pub mod cf {
    /// Credit account rows, keyed by `user_id`.
    pub const ACCOUNTS: &str = "accounts";

    /// Payment packages, keyed by package code.
    pub const PACKAGES: &str = "packages";

    /// Payments, keyed by `payment_id`.
    pub const PAYMENTS: &str = "payments";

    /// Index: payment by provider session, keyed by `provider:session_id`.
    /// Value is the payment id (16 bytes).
    pub const PAYMENTS_BY_SESSION: &str = "payments_by_session";

    /// Ledger entries, keyed by `entry_id` (ULID).
    pub const LEDGER: &str = "ledger";

    /// Index: ledger entries by user, keyed by `user_id || entry_id`.
    /// Value is empty (index only).
    pub const LEDGER_BY_USER: &str = "ledger_by_user";

    /// Webhook dedup records, keyed by `provider:event_id`.
    pub const WEBHOOK_EVENTS: &str = "webhook_events";
}

/// Returns all column family names for database initialization.
#[must_use]
pub fn all_column_families() -> Vec<&'static str> {
    vec![
        cf::ACCOUNTS,
        cf::PACKAGES,
        cf::PAYMENTS,
        cf::PAYMENTS_BY_SESSION,
        cf::LEDGER,
        cf::LEDGER_BY_USER,
        cf::WEBHOOK_EVENTS,
    ]
}
