//! `RocksDB` storage implementation.

use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

use rocksdb::{
    BoundColumnFamily, ColumnFamilyDescriptor, DBWithThreadMode, Direction, IteratorMode,
    MultiThreaded, Options, WriteBatch,
};

use fitroom_core::{
    CreditAccount, LedgerEntry, Payment, PaymentId, PaymentPackage, PaymentProvider, UserId,
    WebhookEvent,
};

use crate::error::{Result, StoreError};
use crate::keys;
use crate::locks::RowLocks;
use crate::schema::{all_column_families, cf};
use crate::Store;

/// RocksDB-backed storage implementation.
pub struct RocksStore {
    db: Arc<DBWithThreadMode<MultiThreaded>>,
    locks: RowLocks,
    // RocksDB has no unique constraints, so the dedup check+insert pair is
    // serialized here.
    webhook_guard: Mutex<()>,
}

impl RocksStore {
    /// Open or create a `RocksDB` database at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or created.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_descriptors: Vec<_> = all_column_families()
            .into_iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()))
            .collect();

        let db = DBWithThreadMode::open_cf_descriptors(&opts, path, cf_descriptors)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(Self {
            db: Arc::new(db),
            locks: RowLocks::new(),
            webhook_guard: Mutex::new(()),
        })
    }

    /// Get a column family handle.
    fn cf(&self, name: &str) -> Result<Arc<BoundColumnFamily<'_>>> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| StoreError::Database(format!("column family not found: {name}")))
    }

    /// Serialize a value using CBOR.
    fn serialize<T: serde::Serialize>(value: &T) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        ciborium::into_writer(value, &mut buf)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        Ok(buf)
    }

    /// Deserialize a value from CBOR.
    fn deserialize<T: serde::de::DeserializeOwned>(data: &[u8]) -> Result<T> {
        ciborium::from_reader(data).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    fn get_cf_value<T: serde::de::DeserializeOwned>(
        &self,
        cf_name: &str,
        key: &[u8],
    ) -> Result<Option<T>> {
        let cf = self.cf(cf_name)?;
        self.db
            .get_cf(&cf, key)
            .map_err(|e| StoreError::Database(e.to_string()))?
            .map(|data| Self::deserialize(&data))
            .transpose()
    }
}

impl Store for RocksStore {
    fn put_account(&self, account: &CreditAccount) -> Result<()> {
        let cf = self.cf(cf::ACCOUNTS)?;
        let key = keys::account_key(&account.user_id);
        let value = Self::serialize(account)?;

        self.db
            .put_cf(&cf, key, value)
            .map_err(|e| StoreError::Database(e.to_string()))
    }

    fn get_account(&self, user_id: &UserId) -> Result<Option<CreditAccount>> {
        self.get_cf_value(cf::ACCOUNTS, &keys::account_key(user_id))
    }

    fn put_package(&self, package: &PaymentPackage) -> Result<()> {
        let cf = self.cf(cf::PACKAGES)?;
        let key = keys::package_key(&package.code);
        let value = Self::serialize(package)?;

        self.db
            .put_cf(&cf, key, value)
            .map_err(|e| StoreError::Database(e.to_string()))
    }

    fn get_package(&self, code: &str) -> Result<Option<PaymentPackage>> {
        self.get_cf_value(cf::PACKAGES, &keys::package_key(code))
    }

    fn list_active_packages(&self) -> Result<Vec<PaymentPackage>> {
        let cf = self.cf(cf::PACKAGES)?;

        let mut packages: Vec<PaymentPackage> = Vec::new();
        for item in self.db.iterator_cf(&cf, IteratorMode::Start) {
            let (_, value) = item.map_err(|e| StoreError::Database(e.to_string()))?;
            let package: PaymentPackage = Self::deserialize(&value)?;
            if package.active {
                packages.push(package);
            }
        }

        packages.sort_by_key(|p| p.amount_minor);
        Ok(packages)
    }

    fn put_payment(&self, payment: &Payment) -> Result<()> {
        let cf_payments = self.cf(cf::PAYMENTS)?;
        let value = Self::serialize(payment)?;

        let mut batch = WriteBatch::default();
        batch.put_cf(&cf_payments, keys::payment_key(&payment.id), &value);

        if let Some(session_id) = &payment.provider_session_id {
            let cf_index = self.cf(cf::PAYMENTS_BY_SESSION)?;
            batch.put_cf(
                &cf_index,
                keys::session_key(payment.provider, session_id),
                payment.id.as_bytes(),
            );
        }

        self.db
            .write(batch)
            .map_err(|e| StoreError::Database(e.to_string()))
    }

    fn get_payment(&self, payment_id: &PaymentId) -> Result<Option<Payment>> {
        self.get_cf_value(cf::PAYMENTS, &keys::payment_key(payment_id))
    }

    fn find_payment_by_session(
        &self,
        provider: PaymentProvider,
        session_id: &str,
    ) -> Result<Option<Payment>> {
        let cf_index = self.cf(cf::PAYMENTS_BY_SESSION)?;

        let Some(id_bytes) = self
            .db
            .get_cf(&cf_index, keys::session_key(provider, session_id))
            .map_err(|e| StoreError::Database(e.to_string()))?
        else {
            return Ok(None);
        };

        let bytes: [u8; 16] = id_bytes
            .as_slice()
            .try_into()
            .map_err(|_| StoreError::Serialization("malformed session index value".into()))?;
        let payment_id = PaymentId::from_uuid(uuid::Uuid::from_bytes(bytes));

        self.get_payment(&payment_id)
    }

    fn apply_ledger_entry(&self, account: &CreditAccount, entry: &LedgerEntry) -> Result<()> {
        let cf_accounts = self.cf(cf::ACCOUNTS)?;
        let cf_ledger = self.cf(cf::LEDGER)?;
        let cf_by_user = self.cf(cf::LEDGER_BY_USER)?;

        let account_value = Self::serialize(account)?;
        let entry_value = Self::serialize(entry)?;

        let mut batch = WriteBatch::default();
        batch.put_cf(&cf_accounts, keys::account_key(&account.user_id), &account_value);
        batch.put_cf(&cf_ledger, keys::ledger_key(&entry.id), &entry_value);
        batch.put_cf(
            &cf_by_user,
            keys::user_ledger_key(&entry.user_id, &entry.id),
            [],
        );

        self.db
            .write(batch)
            .map_err(|e| StoreError::Database(e.to_string()))
    }

    fn list_ledger_by_user(
        &self,
        user_id: &UserId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<LedgerEntry>> {
        let cf_by_user = self.cf(cf::LEDGER_BY_USER)?;
        let prefix = keys::user_ledger_prefix(user_id);

        // ULID keys scan oldest-first; collect then reverse for newest-first.
        let mut entry_ids = Vec::new();
        let iter = self
            .db
            .iterator_cf(&cf_by_user, IteratorMode::From(&prefix, Direction::Forward));
        for item in iter {
            let (key, _) = item.map_err(|e| StoreError::Database(e.to_string()))?;
            if !key.starts_with(&prefix) {
                break;
            }
            entry_ids.push(keys::extract_entry_id_from_user_key(&key));
        }
        entry_ids.reverse();

        let mut entries = Vec::new();
        for entry_id in entry_ids.into_iter().skip(offset).take(limit) {
            if let Some(entry) =
                self.get_cf_value::<LedgerEntry>(cf::LEDGER, &keys::ledger_key(&entry_id))?
            {
                entries.push(entry);
            }
        }
        Ok(entries)
    }

    fn record_webhook_event(&self, event: &WebhookEvent) -> Result<bool> {
        let _guard = self
            .webhook_guard
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let cf = self.cf(cf::WEBHOOK_EVENTS)?;
        let key = keys::webhook_event_key(event.provider, &event.provider_event_id);

        let existing = self
            .db
            .get_cf(&cf, &key)
            .map_err(|e| StoreError::Database(e.to_string()))?;
        if existing.is_some() {
            tracing::debug!(
                provider = %event.provider,
                event_id = %event.provider_event_id,
                "Webhook event already recorded"
            );
            return Ok(false);
        }

        let value = Self::serialize(event)?;
        self.db
            .put_cf(&cf, key, value)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(true)
    }

    fn locks(&self) -> &RowLocks {
        &self.locks
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fitroom_core::{LedgerReason, PaymentStatus};
    use tempfile::TempDir;

    fn open_store() -> (RocksStore, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = RocksStore::open(dir.path()).unwrap();
        (store, dir)
    }

    fn starter_package() -> PaymentPackage {
        PaymentPackage {
            code: "starter".into(),
            title: "Starter".into(),
            credits: 10,
            amount_minor: 500,
            currency: "USD".into(),
            active: true,
        }
    }

    #[test]
    fn account_roundtrip() {
        let (store, _dir) = open_store();
        let account = CreditAccount::new(UserId::generate());

        store.put_account(&account).unwrap();
        let loaded = store.get_account(&account.user_id).unwrap().unwrap();
        assert_eq!(loaded.balance, 0);
        assert_eq!(loaded.user_id, account.user_id);
    }

    #[test]
    fn missing_account_is_none() {
        let (store, _dir) = open_store();
        assert!(store.get_account(&UserId::generate()).unwrap().is_none());
    }

    #[test]
    fn active_packages_sorted_by_amount() {
        let (store, _dir) = open_store();
        for package in PaymentPackage::default_catalog() {
            store.put_package(&package).unwrap();
        }
        let mut inactive = starter_package();
        inactive.code = "legacy".into();
        inactive.active = false;
        store.put_package(&inactive).unwrap();

        let listed = store.list_active_packages().unwrap();
        assert_eq!(listed.len(), 3);
        let amounts: Vec<i64> = listed.iter().map(|p| p.amount_minor).collect();
        assert_eq!(amounts, vec![500, 1200, 2500]);
        assert!(listed.iter().all(|p| p.active));
    }

    #[test]
    fn inactive_package_still_fetchable_by_code() {
        let (store, _dir) = open_store();
        let mut package = starter_package();
        package.active = false;
        store.put_package(&package).unwrap();

        assert!(store.get_package("starter").unwrap().is_some());
    }

    #[test]
    fn payment_session_index() {
        let (store, _dir) = open_store();
        let mut payment = Payment::new(
            UserId::generate(),
            &starter_package(),
            PaymentProvider::Stripe,
        );
        store.put_payment(&payment).unwrap();

        // No session yet, no index entry.
        assert!(store
            .find_payment_by_session(PaymentProvider::Stripe, "cs_test_1")
            .unwrap()
            .is_none());

        payment.provider_session_id = Some("cs_test_1".into());
        payment.status = PaymentStatus::Pending;
        store.put_payment(&payment).unwrap();

        let found = store
            .find_payment_by_session(PaymentProvider::Stripe, "cs_test_1")
            .unwrap()
            .unwrap();
        assert_eq!(found.id, payment.id);
        assert_eq!(found.status, PaymentStatus::Pending);
    }

    #[test]
    fn ledger_entries_listed_newest_first() {
        let (store, _dir) = open_store();
        let user_id = UserId::generate();
        let mut account = CreditAccount::new(user_id);

        for (delta, balance) in [(5_i64, 5_i64), (10, 15), (-1, 14)] {
            account.balance = balance;
            let reason = if delta < 0 {
                LedgerReason::TryOnCharge
            } else {
                LedgerReason::PaymentTopup
            };
            let entry = LedgerEntry::new(user_id, delta, balance, reason, None, None);
            store.apply_ledger_entry(&account, &entry).unwrap();
        }

        let entries = store.list_ledger_by_user(&user_id, 10, 0).unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].delta, -1);
        assert_eq!(entries[0].balance_after, 14);
        assert_eq!(entries[2].delta, 5);

        // Balance row reflects the last applied entry.
        let loaded = store.get_account(&user_id).unwrap().unwrap();
        assert_eq!(loaded.balance, 14);

        // Pagination.
        let page = store.list_ledger_by_user(&user_id, 1, 1).unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].delta, 10);
    }

    #[test]
    fn ledger_index_is_per_user() {
        let (store, _dir) = open_store();
        let user_a = UserId::generate();
        let user_b = UserId::generate();

        let mut account = CreditAccount::new(user_a);
        account.balance = 5;
        let entry = LedgerEntry::new(user_a, 5, 5, LedgerReason::WelcomeBonus, None, None);
        store.apply_ledger_entry(&account, &entry).unwrap();

        assert_eq!(store.list_ledger_by_user(&user_a, 10, 0).unwrap().len(), 1);
        assert!(store.list_ledger_by_user(&user_b, 10, 0).unwrap().is_empty());
    }

    #[test]
    fn webhook_event_dedup() {
        let (store, _dir) = open_store();
        let event = WebhookEvent::new(PaymentProvider::Stripe, "evt_1".into(), "{}");

        assert!(store.record_webhook_event(&event).unwrap());

        let duplicate = WebhookEvent::new(PaymentProvider::Stripe, "evt_1".into(), "{}");
        assert!(!store.record_webhook_event(&duplicate).unwrap());

        let other = WebhookEvent::new(PaymentProvider::Stripe, "evt_2".into(), "{}");
        assert!(store.record_webhook_event(&other).unwrap());
    }
}
