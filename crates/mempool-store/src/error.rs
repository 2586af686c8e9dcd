//! Storage errors.

use std::fmt;
use std::path::PathBuf;

/// Error raised by store construction, schema management or writes.
#[derive(Debug)]
pub enum StoreError {
    /// Connection string uses a scheme no backend handles.
    UnsupportedScheme(String),
    /// Connection string is malformed (e.g. empty SQLite path).
    InvalidUrl(String),
    /// Filesystem error while preparing the SQLite location.
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Sqlite(rusqlite::Error),
    Postgres(postgres::Error),
    /// JSON payload could not be encoded or a stored payload could not be decoded.
    Json(serde_json::Error),
}

impl StoreError {
    /// True for errors that mean the configuration itself is wrong.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            StoreError::UnsupportedScheme(_) | StoreError::InvalidUrl(_)
        )
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::UnsupportedScheme(scheme) => {
                write!(f, "Unsupported db url scheme: {}", scheme)
            }
            StoreError::InvalidUrl(message) => write!(f, "Invalid db url: {}", message),
            StoreError::Io { path, source } => {
                write!(f, "Failed to prepare {}: {}", path.display(), source)
            }
            StoreError::Sqlite(e) => write!(f, "SQLite error: {}", e),
            StoreError::Postgres(e) => write!(f, "PostgreSQL error: {}", e),
            StoreError::Json(e) => write!(f, "JSON error: {}", e),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StoreError::Io { source, .. } => Some(source),
            StoreError::Sqlite(e) => Some(e),
            StoreError::Postgres(e) => Some(e),
            StoreError::Json(e) => Some(e),
            StoreError::UnsupportedScheme(_) | StoreError::InvalidUrl(_) => None,
        }
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        StoreError::Sqlite(e)
    }
}

impl From<postgres::Error> for StoreError {
    fn from(e: postgres::Error) -> Self {
        StoreError::Postgres(e)
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Json(e)
    }
}
