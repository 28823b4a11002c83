//! Pool-owning store facade.
//!
//! [`LicenseStore`] checks a connection out of the pool per operation and
//! delegates to [`LicenseRepo`]. Methods are synchronous; async callers run
//! them on the blocking thread pool.

use chrono::{DateTime, Utc};

use crate::connection::{ConnectionPool, PooledConnection};
use crate::errors::Result;
use crate::license::{LicenseDraft, LicenseRecord, Verdict};
use crate::repository::LicenseRepo;

/// Durable license record store shared by the session handlers and the
/// control plane.
pub struct LicenseStore {
    pool: ConnectionPool,
}

impl LicenseStore {
    /// Create a store over an existing pool. Migrations must already have
    /// run on the underlying database.
    pub fn new(pool: ConnectionPool) -> Self {
        Self { pool }
    }

    fn conn(&self) -> Result<PooledConnection> {
        Ok(self.pool.get()?)
    }

    /// Insert a new record.
    pub fn create(&self, draft: &LicenseDraft) -> Result<LicenseRecord> {
        LicenseRepo::insert(&*self.conn()?, draft)
    }

    /// List all records.
    pub fn list(&self) -> Result<Vec<LicenseRecord>> {
        LicenseRepo::list(&*self.conn()?)
    }

    /// Point lookup by identity.
    pub fn get_by_id(&self, id: i64) -> Result<Option<LicenseRecord>> {
        LicenseRepo::get_by_id(&*self.conn()?, id)
    }

    /// Point lookup by key, unscoped.
    pub fn get_by_key(&self, key: &str) -> Result<Option<LicenseRecord>> {
        LicenseRepo::get_by_key(&*self.conn()?, key)
    }

    /// Replace all mutable fields of an existing record.
    pub fn update(&self, id: i64, draft: &LicenseDraft) -> Result<LicenseRecord> {
        LicenseRepo::update(&*self.conn()?, id, draft)
    }

    /// Delete a record by identity.
    pub fn delete(&self, id: i64) -> Result<()> {
        LicenseRepo::delete(&*self.conn()?, id)
    }

    /// Check an (app name, key) pair at `now`.
    pub fn verify(&self, app_name: &str, key: &str, now: DateTime<Utc>) -> Result<Verdict> {
        let record = LicenseRepo::find_for_app(&*self.conn()?, app_name, key)?;
        Ok(Verdict::for_record(record.as_ref(), now))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::{ConnectionConfig, new_in_memory};
    use crate::migrations::run_migrations;
    use chrono::Duration;

    fn open_store() -> LicenseStore {
        let pool = new_in_memory(&ConnectionConfig::default()).unwrap();
        {
            let conn = pool.get().unwrap();
            let _ = run_migrations(&conn).unwrap();
        }
        LicenseStore::new(pool)
    }

    fn draft(key: &str, app_name: &str, days: i64, unlimited: bool) -> LicenseDraft {
        LicenseDraft {
            key: key.into(),
            app_name: app_name.into(),
            expires_at: Utc::now() + Duration::days(days),
            unlimited,
        }
    }

    #[test]
    fn verify_unknown_key_is_not_found() {
        let store = open_store();
        let verdict = store.verify("AppX", "badkey", Utc::now()).unwrap();
        assert_eq!(verdict, Verdict::NotFound);
    }

    #[test]
    fn verify_mismatched_app_is_not_found() {
        let store = open_store();
        let _ = store.create(&draft("key1", "AppY", 30, false)).unwrap();
        let verdict = store.verify("AppX", "key1", Utc::now()).unwrap();
        assert_eq!(verdict, Verdict::NotFound);
    }

    #[test]
    fn verify_current_key_is_valid() {
        let store = open_store();
        let _ = store.create(&draft("key1", "AppX", 30, false)).unwrap();
        let verdict = store.verify("AppX", "key1", Utc::now()).unwrap();
        assert_eq!(verdict, Verdict::Valid);
    }

    #[test]
    fn verify_expired_key_is_expired() {
        let store = open_store();
        let _ = store.create(&draft("key1", "AppX", -1, false)).unwrap();
        let verdict = store.verify("AppX", "key1", Utc::now()).unwrap();
        assert_eq!(verdict, Verdict::Expired);
    }

    #[test]
    fn verify_expired_unlimited_key_is_valid() {
        let store = open_store();
        let _ = store.create(&draft("key1", "AppX", -1, true)).unwrap();
        let verdict = store.verify("AppX", "key1", Utc::now()).unwrap();
        assert_eq!(verdict, Verdict::Valid);
    }

    #[test]
    fn verify_after_delete_is_not_found() {
        let store = open_store();
        let created = store.create(&draft("key1", "AppX", 30, false)).unwrap();
        assert_eq!(
            store.verify("AppX", "key1", Utc::now()).unwrap(),
            Verdict::Valid
        );

        store.delete(created.id).unwrap();
        assert_eq!(
            store.verify("AppX", "key1", Utc::now()).unwrap(),
            Verdict::NotFound
        );
    }

    #[test]
    fn crud_roundtrip() {
        let store = open_store();
        let created = store.create(&draft("key1", "AppX", 30, false)).unwrap();
        assert_eq!(store.list().unwrap().len(), 1);

        let updated = store
            .update(created.id, &draft("key1", "AppX", -5, false))
            .unwrap();
        assert_eq!(
            store.verify("AppX", "key1", Utc::now()).unwrap(),
            Verdict::Expired
        );
        assert_eq!(updated.id, created.id);

        store.delete(created.id).unwrap();
        assert!(store.list().unwrap().is_empty());
    }
}
