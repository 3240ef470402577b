//! Configuration for key-value stores

use serde::Deserialize;
use sqlx_sqlite_lock_retry::ConnectionConfig;

use crate::{Error, Result};

/// Column layout shared by every table in a store.
///
/// Each table has a unique, non-null key column used as the primary key and a
/// nullable value column.
///
/// # Examples
///
/// ```
/// use sqlx_sqlite_kv::TableSchema;
///
/// let schema = TableSchema::default();
/// assert_eq!(
///     schema.column_definitions(),
///     r#""key" TEXT NOT NULL PRIMARY KEY, "value" TEXT"#
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TableSchema {
   /// Name of the primary key column
   ///
   /// Default: `key`
   pub key_column: String,

   /// Declared type of the key column
   ///
   /// Written into `CREATE TABLE` as is, so it must be a SQL type name with
   /// at most one numeric argument list, e.g. `TEXT` or `VARCHAR(255)`.
   ///
   /// Default: `TEXT`
   pub key_type: String,

   /// Name of the value column
   ///
   /// Default: `value`
   pub value_column: String,

   /// Declared type of the value column
   ///
   /// Same rules as `key_type`.
   ///
   /// Default: `TEXT`
   pub value_type: String,
}

impl Default for TableSchema {
   fn default() -> Self {
      Self {
         key_column: "key".to_string(),
         key_type: "TEXT".to_string(),
         value_column: "value".to_string(),
         value_type: "TEXT".to_string(),
      }
   }
}

impl TableSchema {
   /// Check that both declared types are plain SQL type names.
   pub fn validate(&self) -> Result<()> {
      validate_column_type(&self.key_type)?;
      validate_column_type(&self.value_type)
   }

   /// Column list used in `CREATE TABLE`.
   ///
   /// Column names are quoted. Types are not, see [`validate`](Self::validate).
   pub fn column_definitions(&self) -> String {
      format!(
         "{} {} NOT NULL PRIMARY KEY, {} {}",
         quote_identifier(&self.key_column),
         self.key_type,
         quote_identifier(&self.value_column),
         self.value_type,
      )
   }
}

/// Configuration for a [`KvStore`](crate::KvStore)
///
/// # Examples
///
/// ```
/// use sqlx_sqlite_kv::{ConnectionConfig, KvStoreConfig, LockRetryPolicy};
/// use std::time::Duration;
///
/// // Use defaults
/// let config = KvStoreConfig::default();
///
/// // Stop retrying a locked database after one second
/// let config = KvStoreConfig {
///     connection: ConnectionConfig {
///         lock_retry: LockRetryPolicy::bounded(100, Duration::from_millis(10)),
///         ..Default::default()
///     },
///     ..Default::default()
/// };
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct KvStoreConfig {
   /// Column layout of every table
   pub schema: TableSchema,

   /// Settings for the underlying connection
   pub connection: ConnectionConfig,
}

/// Validates a declared column type such as `TEXT`, `NUMERIC` or
/// `DECIMAL(10, 2)`.
///
/// The name starts with an ASCII letter and holds letters, digits, `_` and
/// spaces. An optional trailing `( ... )` may hold only digits, signs, commas
/// and spaces.
pub(crate) fn validate_column_type(column_type: &str) -> Result<()> {
   let invalid = || Error::InvalidColumnType {
      column_type: column_type.to_string(),
   };

   let (name, args) = match column_type.split_once('(') {
      Some((name, rest)) => (name, Some(rest.strip_suffix(')').ok_or_else(invalid)?)),
      None => (column_type, None),
   };

   let mut chars = name.chars();
   match chars.next() {
      Some(first) if first.is_ascii_alphabetic() => {}
      _ => return Err(invalid()),
   }

   for ch in chars {
      if !ch.is_ascii_alphanumeric() && ch != '_' && ch != ' ' {
         return Err(invalid());
      }
   }

   if let Some(args) = args {
      if args.trim().is_empty() {
         return Err(invalid());
      }
      for ch in args.chars() {
         if !ch.is_ascii_digit() && !matches!(ch, ',' | ' ' | '+' | '-') {
            return Err(invalid());
         }
      }
   }

   Ok(())
}

/// Quotes a SQLite identifier to prevent SQL injection.
pub(crate) fn quote_identifier(name: &str) -> String {
   // Double any existing double quotes and wrap in double quotes
   format!("\"{}\"", name.replace('"', "\"\""))
}
