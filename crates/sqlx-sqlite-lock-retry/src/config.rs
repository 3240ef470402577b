//! Configuration for retrying SQLite connections

use std::time::Duration;

use serde::Deserialize;

/// How statement execution reacts to `SQLITE_BUSY` ("database is locked").
///
/// The default retries forever without sleeping, yielding to the runtime
/// between attempts. A permanently locked file therefore never returns; set
/// `max_attempts` when that is not acceptable.
///
/// # Examples
///
/// ```
/// use sqlx_sqlite_lock_retry::LockRetryPolicy;
/// use std::time::Duration;
///
/// // Give up after 50 attempts, sleeping 10ms between them
/// let policy = LockRetryPolicy {
///     max_attempts: Some(50),
///     backoff: Duration::from_millis(10),
/// };
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LockRetryPolicy {
   /// Maximum number of retries after the first failed attempt
   ///
   /// `None` retries until the lock clears.
   ///
   /// Default: `None`
   pub max_attempts: Option<u32>,

   /// Delay between attempts
   ///
   /// A zero backoff yields to the runtime instead of sleeping.
   ///
   /// Default: zero
   pub backoff: Duration,
}

impl Default for LockRetryPolicy {
   fn default() -> Self {
      Self {
         max_attempts: None,
         backoff: Duration::ZERO,
      }
   }
}

impl LockRetryPolicy {
   /// A policy that retries until the lock clears.
   pub fn unbounded() -> Self {
      Self::default()
   }

   /// A policy that gives up after `max_attempts` retries.
   pub fn bounded(max_attempts: u32, backoff: Duration) -> Self {
      Self {
         max_attempts: Some(max_attempts),
         backoff,
      }
   }
}

/// Configuration for a [`RetryingConnection`](crate::RetryingConnection)
///
/// # Examples
///
/// ```
/// use sqlx_sqlite_lock_retry::{ConnectionConfig, LockRetryPolicy};
/// use std::time::Duration;
///
/// // Use defaults
/// let config = ConnectionConfig::default();
///
/// // Override just the retry policy
/// let config = ConnectionConfig {
///     lock_retry: LockRetryPolicy::bounded(10, Duration::from_millis(5)),
///     ..Default::default()
/// };
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
   /// SQLite's internal busy handler timeout
   ///
   /// Kept at zero so lock contention surfaces immediately and is handled by
   /// [`LockRetryPolicy`] instead of blocking inside SQLite.
   ///
   /// Default: zero
   pub busy_timeout: Duration,

   /// Number of prepared statements kept in the connection's cache
   ///
   /// Statements evicted from the cache are transparently re-prepared on
   /// their next use.
   ///
   /// Default: 100
   pub statement_cache_capacity: usize,

   /// Create the database file when it does not exist
   ///
   /// Default: true
   pub create_if_missing: bool,

   /// Retry behavior for locked databases
   pub lock_retry: LockRetryPolicy,
}

impl Default for ConnectionConfig {
   fn default() -> Self {
      Self {
         busy_timeout: Duration::ZERO,
         statement_cache_capacity: 100,
         create_if_missing: true,
         lock_retry: LockRetryPolicy::default(),
      }
   }
}
