/// Result type alias for key-value store operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for key-value store operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
   /// Error from SQLx operations.
   #[error(transparent)]
   Sqlx(#[from] sqlx::Error),

   /// Error from the underlying connection, including lock retry exhaustion.
   #[error(transparent)]
   Connection(#[from] sqlx_sqlite_lock_retry::Error),

   /// I/O error when opening or inspecting the database file.
   #[error("io error: {0}")]
   Io(#[from] std::io::Error),

   /// A configured column type is not a plain SQL type name.
   #[error("invalid column type '{column_type}': must be a SQL type name such as TEXT or VARCHAR(255)")]
   InvalidColumnType { column_type: String },

   /// A table could not be given its statement set.
   #[error("failed to prepare statements for table '{table}': {source}")]
   PrepareFailed {
      table: String,
      #[source]
      source: sqlx_sqlite_lock_retry::Error,
   },
}

impl Error {
   /// Extract a structured error code from the error type.
   ///
   /// This provides machine-readable error codes for error handling.
   pub fn error_code(&self) -> String {
      match self {
         Error::Sqlx(e) => sqlite_code(e).unwrap_or_else(|| "SQLX_ERROR".to_string()),
         Error::Connection(sqlx_sqlite_lock_retry::Error::Sqlx(e)) => {
            sqlite_code(e).unwrap_or_else(|| "SQLX_ERROR".to_string())
         }
         Error::Connection(sqlx_sqlite_lock_retry::Error::LockRetriesExhausted { .. }) => {
            "LOCK_RETRIES_EXHAUSTED".to_string()
         }
         Error::Connection(sqlx_sqlite_lock_retry::Error::NulInQuotedString) => {
            "NUL_IN_QUOTED_STRING".to_string()
         }
         Error::Io(_) => "IO_ERROR".to_string(),
         Error::PrepareFailed { .. } => "PREPARE_FAILED".to_string(),
         Error::InvalidColumnType { .. } => "INVALID_COLUMN_TYPE".to_string(),
      }
   }
}

fn sqlite_code(err: &sqlx::Error) -> Option<String> {
   err.as_database_error()
      .and_then(|db_err| db_err.code())
      .map(|code| format!("SQLITE_{}", code))
}

#[cfg(test)]
mod tests {
   use super::*;

   #[test]
   fn test_error_code_io() {
      let err = Error::Io(std::io::Error::new(std::io::ErrorKind::NotFound, "missing"));
      assert_eq!(err.error_code(), "IO_ERROR");
   }

   #[test]
   fn test_error_code_sqlx_non_database() {
      // RowNotFound is not a database error, so no SQLite code
      let err = Error::Sqlx(sqlx::Error::RowNotFound);
      assert_eq!(err.error_code(), "SQLX_ERROR");

      let err = Error::Connection(sqlx_sqlite_lock_retry::Error::Sqlx(
         sqlx::Error::RowNotFound,
      ));
      assert_eq!(err.error_code(), "SQLX_ERROR");
   }

   #[test]
   fn test_error_code_lock_retries_exhausted() {
      let err = Error::Connection(sqlx_sqlite_lock_retry::Error::LockRetriesExhausted {
         attempts: 3,
      });
      assert_eq!(err.error_code(), "LOCK_RETRIES_EXHAUSTED");
      assert!(err.to_string().contains("3 retries"));
   }

   #[test]
   fn test_error_code_nul_in_quoted_string() {
      let err = Error::Connection(sqlx_sqlite_lock_retry::Error::NulInQuotedString);
      assert_eq!(err.error_code(), "NUL_IN_QUOTED_STRING");
      assert!(err.to_string().contains("NUL"));
   }

   #[test]
   fn test_error_code_invalid_column_type() {
      let err = Error::InvalidColumnType {
         column_type: "TEXT; --".into(),
      };
      assert_eq!(err.error_code(), "INVALID_COLUMN_TYPE");
      assert!(err.to_string().contains("TEXT; --"));
   }

   #[test]
   fn test_error_code_prepare_failed() {
      let err = Error::PrepareFailed {
         table: "settings".into(),
         source: sqlx_sqlite_lock_retry::Error::Sqlx(sqlx::Error::RowNotFound),
      };
      assert_eq!(err.error_code(), "PREPARE_FAILED");
      assert!(err.to_string().contains("settings"));
   }
}
