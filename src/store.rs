use std::fs::File;
use std::path::Path;

use indexmap::{IndexMap, IndexSet};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;
use sqlx_sqlite_lock_retry::RetryingConnection;
use tracing::debug;

use crate::config::{KvStoreConfig, TableSchema};
use crate::schema;
use crate::stat::FileStat;
use crate::statements::TableStatements;
use crate::{Error, Result};

/// Result returned from write operations (e.g. `set`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteQueryResult {
   /// The number of rows affected by the write operation.
   pub rows_affected: u64,
   /// The last inserted row ID (SQLite ROWID).
   pub last_insert_id: i64,
}

/// Key-value access to a set of identically shaped tables in one SQLite file.
///
/// ## Tables
///
/// The store knows a fixed set of tables, decided when it is opened:
/// - [`KvStore::open`] uses whatever tables already exist in the file
/// - [`KvStore::create`] creates the named tables (if missing) and uses exactly those
///
/// Every operation takes a table name. Names the store does not know are not an
/// error: writes return `None` and reads return nothing.
///
/// ## Locking
///
/// Statements that hit a lock held by another connection are retried according
/// to [`LockRetryPolicy`](sqlx_sqlite_lock_retry::LockRetryPolicy). By default
/// there is no limit, so a file that never unlocks blocks the caller forever.
///
/// ## Usage Pattern
///
/// ```no_run
/// use sqlx_sqlite_kv::KvStore;
///
/// # async fn demo() -> sqlx_sqlite_kv::Result<()> {
/// let mut store = KvStore::create("app.db", ["settings"], None).await?;
///
/// store.set("settings", "theme", "dark").await?;
/// assert_eq!(store.get("settings", "theme").await?.as_deref(), Some("dark"));
///
/// for (key, value) in store.dump("settings").await? {
///     println!("{key} = {value:?}");
/// }
///
/// store.close().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct KvStore {
   conn: RetryingConnection,

   /// Read-only handle on the database file, used for `stat()`
   file: File,

   /// Statement set of every known table, in discovery/creation order
   statements: IndexMap<String, TableStatements>,

   schema: TableSchema,
}

impl KvStore {
   /// Open the database at `path` and use the tables it already contains.
   ///
   /// The file is created (empty, with no tables) when it does not exist.
   /// Fails if an existing table lacks the configured key/value columns.
   pub async fn open(path: impl AsRef<Path>, config: Option<KvStoreConfig>) -> Result<Self> {
      let config = config.unwrap_or_default();
      let mut conn = RetryingConnection::connect(path, Some(config.connection)).await?;

      let tables = schema::list_tables(&mut conn).await?;
      debug!(tables = ?tables, "discovered existing tables");

      Self::with_tables(conn, tables, config.schema).await
   }

   /// Open the database at `path`, create each of `tables`, and use exactly those.
   ///
   /// Tables that already exist are kept as they are. Duplicate names are
   /// ignored after their first occurrence. Fails with
   /// [`Error::InvalidColumnType`] if the schema's column types are not plain
   /// SQL type names.
   pub async fn create<I, S>(
      path: impl AsRef<Path>,
      tables: I,
      config: Option<KvStoreConfig>,
   ) -> Result<Self>
   where
      I: IntoIterator<Item = S>,
      S: Into<String>,
   {
      let config = config.unwrap_or_default();
      config.schema.validate()?;

      let names: Vec<String> = tables
         .into_iter()
         .map(Into::into)
         .collect::<IndexSet<String>>()
         .into_iter()
         .collect();

      let mut conn = RetryingConnection::connect(path, Some(config.connection)).await?;
      schema::create_tables(&mut conn, &names, &config.schema).await?;

      Self::with_tables(conn, names, config.schema).await
   }

   /// Open the stat handle and prepare statements for every table.
   async fn with_tables(
      mut conn: RetryingConnection,
      tables: Vec<String>,
      schema: TableSchema,
   ) -> Result<Self> {
      let file = File::open(conn.path())?;

      let mut statements = IndexMap::with_capacity(tables.len());
      for table in tables {
         let table_statements = TableStatements::new(&table, &schema);
         if let Err(source) = table_statements.prepare(&mut conn).await {
            return Err(Error::PrepareFailed { table, source });
         }
         debug!(table = %table, "prepared table statements");
         statements.insert(table, table_statements);
      }

      Ok(Self {
         conn,
         file,
         statements,
         schema,
      })
   }

   /// Insert `key`, replacing any existing value.
   ///
   /// `value` may be a `&str` or `None` to store NULL. Returns `None` if
   /// `table` is unknown.
   pub async fn set<'v>(
      &mut self,
      table: &str,
      key: &str,
      value: impl Into<Option<&'v str>>,
   ) -> Result<Option<WriteQueryResult>> {
      let Some(statements) = self.statements.get(table) else {
         return Ok(unknown_table(table, "set"));
      };

      let result = self
         .conn
         .execute(&statements.insert, &[Some(key), value.into()])
         .await?;

      Ok(Some(WriteQueryResult {
         rows_affected: result.rows_affected(),
         last_insert_id: result.last_insert_rowid(),
      }))
   }

   /// Value stored under `key`.
   ///
   /// Returns `None` if the key is missing, its value is NULL, or `table` is
   /// unknown. Values that are not valid UTF-8 are decoded lossily.
   pub async fn get(&mut self, table: &str, key: &str) -> Result<Option<String>> {
      let Some(statements) = self.statements.get(table) else {
         return Ok(unknown_table(table, "get"));
      };

      let row = self
         .conn
         .fetch_optional(&statements.select_key, &[Some(key)])
         .await?;

      match row {
         Some(row) => decode_text(&row, 0),
         None => Ok(None),
      }
   }

   /// Every row of `table` as a key → value map, in table scan order.
   ///
   /// Empty for an empty or unknown table. Keys and values that are not valid
   /// UTF-8 (e.g. BLOBs in a table found by [`open`](Self::open)) are decoded
   /// lossily rather than failing the whole dump.
   pub async fn dump(&mut self, table: &str) -> Result<IndexMap<String, Option<String>>> {
      Ok(self.dump_pairs(table).await?.into_iter().collect())
   }

   /// Every row of `table` as a sequence of `(key, value)` pairs, in table scan
   /// order.
   ///
   /// Empty for an empty or unknown table. Decodes like [`dump`](Self::dump).
   pub async fn dump_pairs(&mut self, table: &str) -> Result<Vec<(String, Option<String>)>> {
      let Some(statements) = self.statements.get(table) else {
         return Ok(unknown_table(table, "dump").unwrap_or_default());
      };

      let rows = self.conn.fetch_all(&statements.select_all, &[]).await?;
      rows.iter().map(decode_pair).collect()
   }

   /// Delete rows whose key is `key` and rows whose value is `val`.
   ///
   /// The two filters are independent: passing both deletes rows matching
   /// either one, not rows matching both. Passing neither deletes nothing.
   /// Returns the number of rows removed, or `None` if `table` is unknown.
   pub async fn delete(
      &mut self,
      table: &str,
      key: Option<&str>,
      val: Option<&str>,
   ) -> Result<Option<u64>> {
      let Some(statements) = self.statements.get(table) else {
         return Ok(unknown_table(table, "delete"));
      };

      let mut removed = 0;
      if let Some(key) = key {
         removed += self
            .conn
            .execute(&statements.delete_key, &[Some(key)])
            .await?
            .rows_affected();
      }
      if let Some(val) = val {
         removed += self
            .conn
            .execute(&statements.delete_val, &[Some(val)])
            .await?
            .rows_affected();
      }

      Ok(Some(removed))
   }

   /// Delete every row of `table`, keeping the table.
   ///
   /// Returns the number of rows removed, or `None` if `table` is unknown.
   pub async fn truncate(&mut self, table: &str) -> Result<Option<u64>> {
      let Some(statements) = self.statements.get(table) else {
         return Ok(unknown_table(table, "truncate"));
      };

      let result = self.conn.execute(&statements.truncate, &[]).await?;
      Ok(Some(result.rows_affected()))
   }

   /// Quote `value` as a SQL string literal, as SQLite's `quote()` does.
   ///
   /// Fails for strings containing a NUL byte, which SQLite cannot quote
   /// without truncating.
   pub async fn quote(&mut self, value: &str) -> Result<String> {
      Ok(self.conn.quote(value).await?)
   }

   /// Names of the tables this store operates on.
   pub fn tables(&self) -> Vec<&str> {
      self.statements.keys().map(String::as_str).collect()
   }

   /// Owned copy of [`tables`](Self::tables).
   pub fn table_names(&self) -> Vec<String> {
      self.statements.keys().cloned().collect()
   }

   /// Whether `table` is known to this store.
   pub fn has_table(&self, table: &str) -> bool {
      self.statements.contains_key(table)
   }

   /// Statement set prepared for `table`.
   pub fn statements(&self, table: &str) -> Option<&TableStatements> {
      self.statements.get(table)
   }

   /// Column layout shared by every table.
   pub fn schema(&self) -> &TableSchema {
      &self.schema
   }

   /// Path of the database file.
   pub fn path(&self) -> &Path {
      self.conn.path()
   }

   /// Current metadata of the database file.
   pub fn stat(&self) -> Result<FileStat> {
      Ok(FileStat::from(&self.file.metadata()?))
   }

   /// Close the database connection.
   pub async fn close(self) -> Result<()> {
      self.conn.close().await?;
      Ok(())
   }
}

fn unknown_table<T>(table: &str, operation: &str) -> Option<T> {
   debug!(table, operation, "ignoring operation on unknown table");
   None
}

fn decode_pair(row: &SqliteRow) -> Result<(String, Option<String>)> {
   let key = decode_text(row, 0)?.unwrap_or_default();
   let value = decode_text(row, 1)?;
   Ok((key, value))
}

/// Read a column as text, replacing invalid UTF-8 instead of failing.
///
/// Reads the raw bytes, so BLOBs and numbers stored in a TEXT column decode
/// too.
fn decode_text(row: &SqliteRow, index: usize) -> Result<Option<String>> {
   let Some(bytes) = row.try_get_unchecked::<Option<Vec<u8>>, _>(index)? else {
      return Ok(None);
   };

   match String::from_utf8(bytes) {
      Ok(text) => Ok(Some(text)),
      Err(err) => {
         debug!(column = index, "column is not valid UTF-8, decoding lossily");
         Ok(Some(String::from_utf8_lossy(err.as_bytes()).into_owned()))
      }
   }
}

#[cfg(test)]
mod tests {
   use super::*;
   use tempfile::TempDir;

   async fn create_test_store(tables: &[&str]) -> (KvStore, TempDir) {
      let temp_dir = TempDir::new().expect("Failed to create temp directory");
      let db_path = temp_dir.path().join("test.db");
      let store = KvStore::create(&db_path, tables.iter().copied(), None)
         .await
         .expect("Failed to create test store");

      (store, temp_dir)
   }

   #[tokio::test]
   async fn test_set_returns_write_result() {
      let (mut store, _temp) = create_test_store(&["t"]).await;

      let result = store.set("t", "a", "1").await.unwrap().unwrap();
      assert_eq!((result.rows_affected, result.last_insert_id), (1, 1));

      let result = store.set("t", "b", None).await.unwrap().unwrap();
      assert_eq!(
         result,
         WriteQueryResult {
            rows_affected: 1,
            last_insert_id: 2,
         }
      );
   }

   #[tokio::test]
   async fn test_unknown_table_is_a_no_op() {
      let (mut store, _temp) = create_test_store(&["t"]).await;

      assert!(store.set("nope", "a", "1").await.unwrap().is_none());
      assert!(store.get("nope", "a").await.unwrap().is_none());
      assert!(store.dump("nope").await.unwrap().is_empty());
      assert!(store.dump_pairs("nope").await.unwrap().is_empty());
      assert!(store.delete("nope", Some("a"), None).await.unwrap().is_none());
      assert!(store.truncate("nope").await.unwrap().is_none());
      assert!(store.statements("nope").is_none());
   }

   #[tokio::test]
   async fn test_duplicate_table_names_collapse() {
      let (store, _temp) = create_test_store(&["a", "b", "a"]).await;

      assert_eq!(store.tables(), vec!["a", "b"]);
      assert!(store.has_table("a"));
      assert!(!store.has_table("c"));
   }

   #[tokio::test]
   async fn test_get_null_value() {
      let (mut store, _temp) = create_test_store(&["t"]).await;

      store.set("t", "k", None).await.unwrap();
      assert_eq!(store.get("t", "k").await.unwrap(), None);
      assert_eq!(store.dump("t").await.unwrap().get("k"), Some(&None));
   }

   #[tokio::test]
   async fn test_create_rejects_injected_column_type() {
      let temp_dir = TempDir::new().unwrap();
      let config = KvStoreConfig {
         schema: TableSchema {
            value_type: "TEXT); DROP TABLE t; --".into(),
            ..Default::default()
         },
         ..Default::default()
      };

      let err = KvStore::create(temp_dir.path().join("test.db"), ["t"], Some(config))
         .await
         .unwrap_err();

      assert!(matches!(err, Error::InvalidColumnType { .. }));
   }

   #[tokio::test]
   async fn test_close() {
      let (mut store, _temp) = create_test_store(&["t"]).await;
      store.set("t", "k", "v").await.unwrap();

      store.close().await.expect("close should succeed");
   }
}
