//! # keyward-store
//!
//! SQLite-backed license record store.
//!
//! - Connection pooling via `r2d2` with WAL and foreign-key pragmas
//! - Versioned embedded migrations, run once at startup
//! - [`LicenseRepo`]: stateless queries over a borrowed connection
//! - [`LicenseStore`]: pool-owning facade used by the server

#![deny(unsafe_code)]

pub mod connection;
pub mod errors;
pub mod license;
pub mod migrations;
pub mod repository;
pub mod store;

pub use connection::{ConnectionConfig, ConnectionPool, PooledConnection, new_file, new_in_memory};
pub use errors::{Result, StoreError};
pub use license::{LicenseDraft, LicenseRecord, Verdict};
pub use migrations::run_migrations;
pub use repository::LicenseRepo;
pub use store::LicenseStore;
