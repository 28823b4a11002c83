//! Error types for the license record store.
//!
//! [`StoreError`] is the single error type returned by all store operations,
//! small enough for exhaustive matching at the call sites that care
//! (currently only `LicenseNotFound`).

use thiserror::Error;

/// Errors that can occur during record store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// `SQLite` database error.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Connection pool error.
    #[error("connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    /// Schema migration failed.
    #[error("migration error: {message}")]
    Migration {
        /// Describes which migration failed and why.
        message: String,
    },

    /// No record with the given identity.
    #[error("license not found: {0}")]
    LicenseNotFound(i64),
}

/// Convenience alias for store results.
pub type Result<T> = std::result::Result<T, StoreError>;
