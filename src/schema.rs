//! Table creation and catalog introspection.

use sqlx::Row;
use sqlx_sqlite_lock_retry::RetryingConnection;
use tracing::debug;

use crate::config::{TableSchema, quote_identifier};

/// User tables in the database, excluding SQLite's internal `sqlite_*` tables.
const LIST_TABLES_SQL: &str = r#"
   SELECT name FROM sqlite_master
   WHERE type = 'table' AND name NOT LIKE 'sqlite\_%' ESCAPE '\'
   ORDER BY name
"#;

/// `CREATE TABLE` for one table with the store's schema.
///
/// Uses `IF NOT EXISTS`, so an existing table of the same name is left
/// untouched.
pub(crate) fn create_table_sql(table: &str, schema: &TableSchema) -> String {
   format!(
      "CREATE TABLE IF NOT EXISTS {} ({})",
      quote_identifier(table),
      schema.column_definitions()
   )
}

/// Create every table in `tables`.
pub(crate) async fn create_tables(
   conn: &mut RetryingConnection,
   tables: &[String],
   schema: &TableSchema,
) -> sqlx_sqlite_lock_retry::Result<()> {
   for table in tables {
      let sql = create_table_sql(table, schema);
      conn.execute(&sql, &[]).await?;
      debug!(table = %table, "created table");
   }
   Ok(())
}

/// Names of the tables that already exist in the database.
pub(crate) async fn list_tables(
   conn: &mut RetryingConnection,
) -> crate::Result<Vec<String>> {
   let rows = conn.fetch_all(LIST_TABLES_SQL, &[]).await?;

   let mut tables = Vec::with_capacity(rows.len());
   for row in rows {
      tables.push(row.try_get::<String, _>("name")?);
   }
   Ok(tables)
}
