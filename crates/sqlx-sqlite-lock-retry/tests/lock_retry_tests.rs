//! Integration tests for retrying statements against a locked database.
//!
//! A second, plain sqlx connection holds an exclusive transaction on the same
//! file to simulate a concurrent writer.

use std::path::Path;
use std::time::Duration;

use sqlx::Connection;
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection};
use sqlx_sqlite_lock_retry::{
   ConnectionConfig, Error, LockRetryPolicy, RetryingConnection, is_lock_error,
};

struct TestDb {
   conn: RetryingConnection,
   _temp_file: tempfile::NamedTempFile,
}

async fn setup_test_db(config: Option<ConnectionConfig>) -> TestDb {
   let _ = tracing_subscriber::fmt().with_test_writer().try_init();

   let temp_file = tempfile::NamedTempFile::new().unwrap();
   let mut conn = RetryingConnection::connect(temp_file.path(), config)
      .await
      .unwrap();

   conn
      .execute(
         "CREATE TABLE kv (key TEXT NOT NULL PRIMARY KEY, value TEXT)",
         &[],
      )
      .await
      .unwrap();

   TestDb {
      conn,
      _temp_file: temp_file,
   }
}

/// Open a second connection and take an exclusive lock on the file.
async fn hold_exclusive_lock(path: &Path) -> SqliteConnection {
   let options = SqliteConnectOptions::new().filename(path);
   let mut holder = SqliteConnection::connect_with(&options).await.unwrap();

   sqlx::query("BEGIN EXCLUSIVE")
      .execute(&mut holder)
      .await
      .unwrap();

   holder
}

#[tokio::test]
async fn test_write_waits_for_lock_to_clear() {
   let mut test_db = setup_test_db(None).await;
   let path = test_db.conn.path().to_path_buf();
   let mut holder = hold_exclusive_lock(&path).await;

   let writer = test_db.conn.execute(
      "INSERT INTO kv (key, value) VALUES (?1, ?2)",
      &[Some("a"), Some("1")],
   );

   let releaser = async {
      tokio::time::sleep(Duration::from_millis(100)).await;
      sqlx::query("COMMIT").execute(&mut holder).await.unwrap();
   };

   let (result, ()) = tokio::join!(writer, releaser);
   assert_eq!(result.unwrap().rows_affected(), 1);

   let rows = test_db
      .conn
      .fetch_all("SELECT key FROM kv", &[])
      .await
      .unwrap();
   assert_eq!(rows.len(), 1);
}

#[tokio::test]
async fn test_write_waits_with_backoff() {
   let config = ConnectionConfig {
      lock_retry: LockRetryPolicy {
         max_attempts: None,
         backoff: Duration::from_millis(5),
      },
      ..Default::default()
   };
   let mut test_db = setup_test_db(Some(config)).await;
   let path = test_db.conn.path().to_path_buf();
   let mut holder = hold_exclusive_lock(&path).await;

   let writer = test_db.conn.execute("DELETE FROM kv", &[]);
   let releaser = async {
      tokio::time::sleep(Duration::from_millis(50)).await;
      sqlx::query("ROLLBACK").execute(&mut holder).await.unwrap();
   };

   let (result, ()) = tokio::join!(writer, releaser);
   assert!(result.is_ok());
}

#[tokio::test]
async fn test_bounded_policy_gives_up_while_locked() {
   let config = ConnectionConfig {
      lock_retry: LockRetryPolicy::bounded(5, Duration::from_millis(1)),
      ..Default::default()
   };
   let mut test_db = setup_test_db(Some(config)).await;
   let path = test_db.conn.path().to_path_buf();
   let mut holder = hold_exclusive_lock(&path).await;

   let err = test_db
      .conn
      .execute(
         "INSERT INTO kv (key, value) VALUES (?1, ?2)",
         &[Some("a"), Some("1")],
      )
      .await
      .unwrap_err();

   assert!(matches!(err, Error::LockRetriesExhausted { attempts: 5 }));

   sqlx::query("ROLLBACK").execute(&mut holder).await.unwrap();

   // Lock released, the same connection works again
   test_db
      .conn
      .execute(
         "INSERT INTO kv (key, value) VALUES (?1, ?2)",
         &[Some("a"), Some("1")],
      )
      .await
      .unwrap();
}

#[tokio::test]
async fn test_busy_error_is_classified_as_lock_error() {
   let test_db = setup_test_db(None).await;
   let path = test_db.conn.path().to_path_buf();

   // Connect before the lock is taken so opening the file cannot fail
   let options = SqliteConnectOptions::new()
      .filename(&path)
      .busy_timeout(Duration::ZERO);
   let mut other = SqliteConnection::connect_with(&options).await.unwrap();

   let mut holder = hold_exclusive_lock(&path).await;

   let err = sqlx::query("INSERT INTO kv (key, value) VALUES ('b', '2')")
      .execute(&mut other)
      .await
      .unwrap_err();

   assert!(is_lock_error(&err));

   sqlx::query("ROLLBACK").execute(&mut holder).await.unwrap();
}
