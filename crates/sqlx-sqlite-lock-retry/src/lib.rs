//! # sqlx-sqlite-lock-retry
//!
//! A minimal wrapper around a single SQLx SQLite connection that keeps
//! re-running statements while another connection holds a lock on the file.
//!
//! ## Core Types
//!
//! - **[`RetryingConnection`]**: Owns one connection and retries every statement on `SQLITE_BUSY`
//! - **[`ConnectionConfig`]**: Connection settings (busy timeout, statement cache, retry policy)
//! - **[`LockRetryPolicy`]**: Bound and backoff for the retry loop
//! - **[`Error`]**: Error type for database operations
//!
//! ## Behavior
//!
//! - **Lock errors only**: `SQLITE_BUSY` ("database is locked") is retried, every other
//!   error is returned as is
//! - **No SQLite busy handler**: `busy_timeout` defaults to zero so contention reaches the
//!   retry loop immediately
//! - **Unbounded by default**: without a `max_attempts` bound a permanently locked file
//!   blocks the caller forever

mod config;
mod connection;
mod error;
mod lock;

// Re-export public types
pub use config::{ConnectionConfig, LockRetryPolicy};
pub use connection::RetryingConnection;
pub use error::{Error, Result};
pub use lock::is_lock_error;
