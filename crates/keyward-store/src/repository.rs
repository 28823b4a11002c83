//! License repository — stateless, every method takes `&Connection`.

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};

use crate::errors::{Result, StoreError};
use crate::license::{LicenseDraft, LicenseRecord};

const COLUMNS: &str = "id, key, app_name, expires_at, unlimited";

/// License repository.
pub struct LicenseRepo;

impl LicenseRepo {
    /// Insert a new record and return it with its assigned identity.
    pub fn insert(conn: &Connection, draft: &LicenseDraft) -> Result<LicenseRecord> {
        let _ = conn.execute(
            "INSERT INTO licenses (key, app_name, expires_at, unlimited) VALUES (?1, ?2, ?3, ?4)",
            params![
                draft.key,
                draft.app_name,
                encode_instant(draft.expires_at),
                draft.unlimited
            ],
        )?;
        Ok(draft.clone().into_record(conn.last_insert_rowid()))
    }

    /// Point lookup by identity.
    pub fn get_by_id(conn: &Connection, id: i64) -> Result<Option<LicenseRecord>> {
        let row = conn
            .query_row(
                &format!("SELECT {COLUMNS} FROM licenses WHERE id = ?1"),
                params![id],
                Self::map_row,
            )
            .optional()?;
        Ok(row)
    }

    /// Point lookup by key, unscoped.
    pub fn get_by_key(conn: &Connection, key: &str) -> Result<Option<LicenseRecord>> {
        let row = conn
            .query_row(
                &format!("SELECT {COLUMNS} FROM licenses WHERE key = ?1"),
                params![key],
                Self::map_row,
            )
            .optional()?;
        Ok(row)
    }

    /// Point lookup by key, scoped to one application.
    pub fn find_for_app(
        conn: &Connection,
        app_name: &str,
        key: &str,
    ) -> Result<Option<LicenseRecord>> {
        let row = conn
            .query_row(
                &format!("SELECT {COLUMNS} FROM licenses WHERE key = ?1 AND app_name = ?2"),
                params![key, app_name],
                Self::map_row,
            )
            .optional()?;
        Ok(row)
    }

    /// List all records in insertion order.
    pub fn list(conn: &Connection) -> Result<Vec<LicenseRecord>> {
        let mut stmt = conn.prepare(&format!("SELECT {COLUMNS} FROM licenses ORDER BY id"))?;
        let rows = stmt
            .query_map([], Self::map_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// Replace all mutable fields of an existing record.
    pub fn update(conn: &Connection, id: i64, draft: &LicenseDraft) -> Result<LicenseRecord> {
        let changed = conn.execute(
            "UPDATE licenses SET key = ?1, app_name = ?2, expires_at = ?3, unlimited = ?4 WHERE id = ?5",
            params![
                draft.key,
                draft.app_name,
                encode_instant(draft.expires_at),
                draft.unlimited,
                id
            ],
        )?;
        if changed == 0 {
            return Err(StoreError::LicenseNotFound(id));
        }
        Ok(draft.clone().into_record(id))
    }

    /// Delete a record by identity.
    pub fn delete(conn: &Connection, id: i64) -> Result<()> {
        let changed = conn.execute("DELETE FROM licenses WHERE id = ?1", params![id])?;
        if changed == 0 {
            return Err(StoreError::LicenseNotFound(id));
        }
        Ok(())
    }

    fn map_row(row: &Row<'_>) -> rusqlite::Result<LicenseRecord> {
        let expires_raw: String = row.get(3)?;
        let expires_at = DateTime::parse_from_rfc3339(&expires_raw)
            .map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(
                    3,
                    rusqlite::types::Type::Text,
                    Box::new(e),
                )
            })?
            .with_timezone(&Utc);
        Ok(LicenseRecord {
            id: row.get(0)?,
            key: row.get(1)?,
            app_name: row.get(2)?,
            expires_at,
            unlimited: row.get(4)?,
        })
    }
}

impl LicenseDraft {
    fn into_record(self, id: i64) -> LicenseRecord {
        LicenseRecord {
            id,
            key: self.key,
            app_name: self.app_name,
            expires_at: self.expires_at,
            unlimited: self.unlimited,
        }
    }
}

fn encode_instant(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Millis, true)
}
