//! Key encoding utilities for `RocksDB`.

use fitroom_core::{LedgerEntryId, PaymentId, PaymentProvider, UserId};

/// Create an account key from a user ID.
#[must_use]
pub fn account_key(user_id: &UserId) -> Vec<u8> {
    user_id.as_bytes().to_vec()
}

/// Create a package key from a package code.
#[must_use]
pub fn package_key(code: &str) -> Vec<u8> {
    code.as_bytes().to_vec()
}

/// Create a payment key from a payment ID.
#[must_use]
pub fn payment_key(payment_id: &PaymentId) -> Vec<u8> {
    payment_id.as_bytes().to_vec()
}

/// Create a session-index key from a provider and its session id.
#[must_use]
pub fn session_key(provider: PaymentProvider, session_id: &str) -> Vec<u8> {
    format!("{provider}:{session_id}").into_bytes()
}

/// Create a ledger entry key from an entry ID.
#[must_use]
pub fn ledger_key(entry_id: &LedgerEntryId) -> Vec<u8> {
    entry_id.to_bytes().to_vec()
}

/// Create a user-ledger index key.
///
/// Format: `user_id (16 bytes) || entry_id (16 bytes)`
///
/// Entry ids are ULIDs, so a forward scan under the user prefix yields the
/// user's entries in chronological order.
#[must_use]
pub fn user_ledger_key(user_id: &UserId, entry_id: &LedgerEntryId) -> Vec<u8> {
    let mut key = Vec::with_capacity(32);
    key.extend_from_slice(user_id.as_bytes());
    key.extend_from_slice(&entry_id.to_bytes());
    key
}

/// Create a prefix for iterating all ledger entries for a user.
#[must_use]
pub fn user_ledger_prefix(user_id: &UserId) -> Vec<u8> {
    user_id.as_bytes().to_vec()
}

/// Extract the entry ID from a user-ledger index key.
///
/// # Panics
///
/// Panics if the key is not at least 32 bytes.
#[must_use]
pub fn extract_entry_id_from_user_key(key: &[u8]) -> LedgerEntryId {
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&key[16..32]);
    LedgerEntryId::from_bytes(bytes)
}

/// Create a webhook dedup key from a provider and event id.
#[must_use]
pub fn webhook_event_key(provider: PaymentProvider, event_id: &str) -> Vec<u8> {
    format!("{provider}:{event_id}").into_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn account_key_length() {
        let user_id = UserId::generate();
        assert_eq!(account_key(&user_id).len(), 16);
    }

    #[test]
    fn user_ledger_key_format() {
        let user_id = UserId::generate();
        let entry_id = LedgerEntryId::generate();
        let key = user_ledger_key(&user_id, &entry_id);

        assert_eq!(key.len(), 32);
        assert_eq!(&key[..16], user_id.as_bytes());
        assert_eq!(&key[16..], entry_id.to_bytes());
    }

    #[test]
    fn extract_entry_id_roundtrip() {
        let user_id = UserId::generate();
        let entry_id = LedgerEntryId::generate();
        let key = user_ledger_key(&user_id, &entry_id);

        assert_eq!(extract_entry_id_from_user_key(&key), entry_id);
    }

    #[test]
    fn session_key_includes_provider() {
        let key = session_key(PaymentProvider::Stripe, "cs_test_1");
        assert_eq!(key, b"STRIPE:cs_test_1".to_vec());
    }
}
