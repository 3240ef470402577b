//! Lock contention detection and the retry loop state

use tracing::{debug, trace, warn};

use crate::config::LockRetryPolicy;
use crate::{Error, Result};

/// Primary SQLite result code for `SQLITE_BUSY`.
const SQLITE_BUSY: i32 = 5;

/// Returns true when `err` means another connection holds a lock on the file.
///
/// SQLx reports extended result codes (e.g. `SQLITE_BUSY_SNAPSHOT` = 517), so
/// only the low byte is compared. The message check covers drivers that do not
/// expose a code.
pub fn is_lock_error(err: &sqlx::Error) -> bool {
   let Some(db_err) = err.as_database_error() else {
      return false;
   };

   let busy_code = db_err
      .code()
      .and_then(|code| code.parse::<i32>().ok())
      .is_some_and(|code| code & 0xff == SQLITE_BUSY);

   busy_code || db_err.message().to_ascii_lowercase().contains("database is locked")
}

/// Tracks retries for a single statement execution.
pub(crate) struct LockRetry<'p> {
   policy: &'p LockRetryPolicy,
   attempts: u32,
}

impl<'p> LockRetry<'p> {
   pub(crate) fn new(policy: &'p LockRetryPolicy) -> Self {
      Self {
         policy,
         attempts: 0,
      }
   }

   /// Record a lock failure and wait before the next attempt.
   ///
   /// Returns [`Error::LockRetriesExhausted`] once the policy's bound is hit.
   pub(crate) async fn wait(&mut self, sql: &str) -> Result<()> {
      if let Some(max) = self.policy.max_attempts
         && self.attempts >= max
      {
         warn!(attempts = self.attempts, sql, "giving up on locked database");
         return Err(Error::LockRetriesExhausted {
            attempts: self.attempts,
         });
      }

      self.attempts += 1;
      trace!(attempt = self.attempts, sql, "database is locked, retrying");

      if self.policy.backoff.is_zero() {
         tokio::task::yield_now().await;
      } else {
         tokio::time::sleep(self.policy.backoff).await;
      }

      Ok(())
   }

   /// Log how long the statement was held up, if at all.
   pub(crate) fn finish(&self, sql: &str) {
      if self.attempts > 0 {
         debug!(attempts = self.attempts, sql, "lock cleared");
      }
   }
}
