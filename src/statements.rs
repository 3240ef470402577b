//! Per-table SQL statements

use sqlx_sqlite_lock_retry::RetryingConnection;

use crate::config::{TableSchema, quote_identifier};

/// The statements a table needs, one per operation.
///
/// Built once per table when the store is opened. Each statement is prepared
/// up front so a table whose columns do not match the schema is rejected
/// before it is used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableStatements {
   /// `INSERT OR REPLACE` of a key/value pair (`?1`, `?2`)
   pub insert: String,
   /// Every row, in table scan order
   pub select_all: String,
   /// The value of one key (`?1`)
   pub select_key: String,
   /// Every row removed
   pub truncate: String,
   /// Rows removed by key (`?1`)
   pub delete_key: String,
   /// Rows removed by value (`?1`)
   pub delete_val: String,
}

impl TableStatements {
   pub fn new(table: &str, schema: &TableSchema) -> Self {
      let table = quote_identifier(table);
      let key = quote_identifier(&schema.key_column);
      let value = quote_identifier(&schema.value_column);

      Self {
         insert: format!("INSERT OR REPLACE INTO {table} ({key}, {value}) VALUES (?1, ?2)"),
         select_all: format!("SELECT {key}, {value} FROM {table}"),
         select_key: format!("SELECT {value} FROM {table} WHERE {key} = ?1"),
         truncate: format!("DELETE FROM {table}"),
         delete_key: format!("DELETE FROM {table} WHERE {key} = ?1"),
         delete_val: format!("DELETE FROM {table} WHERE {value} = ?1"),
      }
   }

   /// Every statement paired with its operation name.
   pub fn iter(&self) -> impl Iterator<Item = (&'static str, &str)> {
      [
         ("insert", self.insert.as_str()),
         ("select_all", self.select_all.as_str()),
         ("select_key", self.select_key.as_str()),
         ("truncate", self.truncate.as_str()),
         ("delete_key", self.delete_key.as_str()),
         ("delete_val", self.delete_val.as_str()),
      ]
      .into_iter()
   }

   /// Prepare every statement on `conn`.
   pub(crate) async fn prepare(
      &self,
      conn: &mut RetryingConnection,
   ) -> sqlx_sqlite_lock_retry::Result<()> {
      for (_, sql) in self.iter() {
         conn.prepare(sql).await?;
      }
      Ok(())
   }
}
