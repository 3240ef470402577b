//! # sqlx-sqlite-kv
//!
//! Key-value tables on top of SQLite.
//!
//! Every table shares one two-column layout, by default
//! `(key TEXT NOT NULL PRIMARY KEY, value TEXT)`. A [`KvStore`] owns a single
//! connection to the database file and a fixed set of such tables, and maps a
//! handful of verbs onto per-table prepared statements:
//!
//! - **`set`** / **`get`**: upsert and look up one key
//! - **`dump`** / **`dump_pairs`**: every row, as a map or as a sequence of pairs
//! - **`delete`**: rows by key and/or by value
//! - **`truncate`**: every row
//! - **`quote`**: SQLite's own string-literal quoting
//! - **`tables`** / **`stat`**: known tables and database file metadata
//!
//! Statements that find the file locked by another connection are retried;
//! see [`sqlx_sqlite_lock_retry`].

mod config;
mod error;
mod schema;
mod stat;
mod statements;
mod store;

pub use config::{KvStoreConfig, TableSchema};
pub use error::{Error, Result};
pub use stat::FileStat;
pub use statements::TableStatements;
pub use store::{KvStore, WriteQueryResult};

pub use sqlx_sqlite_lock_retry::{ConnectionConfig, LockRetryPolicy};
