//! A single SQLite connection whose statements retry while the database is locked

use std::path::{Path, PathBuf};

use sqlx::query::Query;
use sqlx::sqlite::{
   SqliteArguments, SqliteConnectOptions, SqliteConnection, SqliteQueryResult, SqliteRow,
};
use sqlx::{Connection, Row, Sqlite};
use tracing::debug;

use crate::config::ConnectionConfig;
use crate::lock::{LockRetry, is_lock_error};
use crate::{Error, Result};

/// Returns SQLite's own quoting of its single argument.
const QUOTE_SQL: &str = "SELECT quote(?1)";

/// SQLite connection that owns exactly one handle to a database file.
///
/// ## Retry behavior
///
/// Every statement run through [`execute`](Self::execute),
/// [`fetch_all`](Self::fetch_all), [`fetch_optional`](Self::fetch_optional)
/// or [`quote`](Self::quote) is re-run when SQLite reports `SQLITE_BUSY`.
/// Any other error is returned immediately. How long to keep trying is
/// controlled by [`LockRetryPolicy`](crate::LockRetryPolicy).
///
/// ## Arguments
///
/// Statements take positional text arguments (`?1`, `?2`, ...). `None` binds
/// SQL `NULL`.
#[derive(Debug)]
pub struct RetryingConnection {
   conn: SqliteConnection,

   /// Path to database file
   path: PathBuf,

   config: ConnectionConfig,
}

impl RetryingConnection {
   /// Open a connection to the database at `path`.
   ///
   /// The file is created when missing unless
   /// [`ConnectionConfig::create_if_missing`] is false.
   pub async fn connect(
      path: impl AsRef<Path>,
      custom_config: Option<ConnectionConfig>,
   ) -> Result<Self> {
      let path = path.as_ref().to_path_buf();
      let config = custom_config.unwrap_or_default();

      let options = SqliteConnectOptions::new()
         .filename(&path)
         .create_if_missing(config.create_if_missing)
         .busy_timeout(config.busy_timeout)
         .statement_cache_capacity(config.statement_cache_capacity);

      let conn = SqliteConnection::connect_with(&options).await?;
      debug!(path = %path.display(), "connected to database");

      Ok(Self { conn, path, config })
   }

   /// Path of the database file this connection was opened on.
   pub fn path(&self) -> &Path {
      &self.path
   }

   /// Configuration the connection was opened with.
   pub fn config(&self) -> &ConnectionConfig {
      &self.config
   }

   /// Compile `sql` against the current schema.
   ///
   /// Fails if the statement is invalid, e.g. it names a missing table or
   /// column. The statement is not run and is not retried on lock errors.
   pub async fn prepare(&mut self, sql: &str) -> Result<()> {
      sqlx::Executor::prepare(&mut self.conn, sql).await?;
      Ok(())
   }

   /// Run a statement that returns no rows (INSERT/UPDATE/DELETE/DDL).
   pub async fn execute<'q>(
      &mut self,
      sql: &'q str,
      args: &[Option<&'q str>],
   ) -> Result<SqliteQueryResult> {
      let mut retry = LockRetry::new(&self.config.lock_retry);

      loop {
         match bind_args(sqlx::query(sql), args)
            .execute(&mut self.conn)
            .await
         {
            Ok(result) => {
               retry.finish(sql);
               return Ok(result);
            }
            Err(err) if is_lock_error(&err) => retry.wait(sql).await?,
            Err(err) => return Err(err.into()),
         }
      }
   }

   /// Run a query and return every row.
   pub async fn fetch_all<'q>(
      &mut self,
      sql: &'q str,
      args: &[Option<&'q str>],
   ) -> Result<Vec<SqliteRow>> {
      let mut retry = LockRetry::new(&self.config.lock_retry);

      loop {
         match bind_args(sqlx::query(sql), args)
            .fetch_all(&mut self.conn)
            .await
         {
            Ok(rows) => {
               retry.finish(sql);
               return Ok(rows);
            }
            Err(err) if is_lock_error(&err) => retry.wait(sql).await?,
            Err(err) => return Err(err.into()),
         }
      }
   }

   /// Run a query and return its first row, if any.
   pub async fn fetch_optional<'q>(
      &mut self,
      sql: &'q str,
      args: &[Option<&'q str>],
   ) -> Result<Option<SqliteRow>> {
      let mut retry = LockRetry::new(&self.config.lock_retry);

      loop {
         match bind_args(sqlx::query(sql), args)
            .fetch_optional(&mut self.conn)
            .await
         {
            Ok(row) => {
               retry.finish(sql);
               return Ok(row);
            }
            Err(err) if is_lock_error(&err) => retry.wait(sql).await?,
            Err(err) => return Err(err.into()),
         }
      }
   }

   /// Quote `value` as a SQL string literal using SQLite's `quote()` function.
   ///
   /// ```text
   /// it's  ->  'it''s'
   /// ```
   ///
   /// Strings containing a NUL byte are rejected with
   /// [`Error::NulInQuotedString`], since SQLite would silently cut them short.
   pub async fn quote(&mut self, value: &str) -> Result<String> {
      if value.contains('\0') {
         return Err(Error::NulInQuotedString);
      }

      let row = self
         .fetch_optional(QUOTE_SQL, &[Some(value)])
         .await?
         .ok_or(Error::Sqlx(sqlx::Error::RowNotFound))?;

      Ok(row.try_get(0)?)
   }

   /// Close the connection, flushing any pending work.
   pub async fn close(self) -> Result<()> {
      debug!(path = %self.path.display(), "closing database connection");
      self.conn.close().await?;
      Ok(())
   }
}

/// Bind positional text arguments, `None` as NULL.
fn bind_args<'q>(
   mut query: Query<'q, Sqlite, SqliteArguments<'q>>,
   args: &[Option<&'q str>],
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
   for arg in args {
      query = query.bind(*arg);
   }
   query
}
