//! Error types for sqlx-sqlite-lock-retry

use thiserror::Error;

/// Errors that may occur when working with sqlx-sqlite-lock-retry
#[derive(Error, Debug)]
pub enum Error {
   /// Error from the sqlx library. Standard sqlx errors are converted to this variant
   #[error("Sqlx error: {0}")]
   Sqlx(#[from] sqlx::Error),

   /// The database stayed locked for every attempt allowed by the retry policy
   #[error("database is locked: gave up after {attempts} retries")]
   LockRetriesExhausted { attempts: u32 },

   /// SQLite's `quote()` stops at the first NUL, so such strings cannot be quoted faithfully
   #[error("cannot quote a string containing a NUL byte")]
   NulInQuotedString,
}

/// A type alias for Results with our Error type
pub type Result<T> = std::result::Result<T, Error>;
