//! Storage error types for rdfsync-storage.
//!
//! [`StorageError`] covers every failure a store request can produce, and
//! [`StorageError::is_transient`] tells callers whether retrying the whole
//! unit of work is safe.

use std::time::Duration;

use thiserror::Error;

/// Errors produced by store transports and the connection pool.
#[derive(Debug, Error)]
pub enum StorageError {
    /// No pooled connection became free within the acquire timeout.
    #[error("connection pool exhausted: no connection available after {waited:?}")]
    PoolExhausted { waited: Duration },

    /// A single request exceeded the request timeout.
    #[error("store request timed out after {after:?}")]
    Timeout { after: Duration },

    /// The store could not be reached or answered with a server error.
    #[error("store unavailable: {reason}")]
    Unavailable { reason: String },

    /// The store refused the request (client error).
    #[error("store rejected request (status {status}): {reason}")]
    Rejected { status: u16, reason: String },

    /// A response or stored row could not be decoded into statements.
    #[error("malformed store data: {reason}")]
    Decode { reason: String },

    /// The transport does not implement the requested primitive.
    #[error("operation not supported by this store: {operation}")]
    Unsupported { operation: &'static str },

    /// SQLite backend error.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Schema migration failed.
    #[error("migration error: {0}")]
    Migration(String),

    /// JSON serialization or deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StorageError {
    /// Returns true if the failure is about reachability or load rather than
    /// the request itself, so that re-running the unit of work may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            StorageError::PoolExhausted { .. }
            | StorageError::Timeout { .. }
            | StorageError::Unavailable { .. } => true,
            StorageError::Sqlite(rusqlite::Error::SqliteFailure(err, _)) => matches!(
                err.code,
                rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked
            ),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(StorageError::PoolExhausted { waited: Duration::from_millis(5) }.is_transient());
        assert!(StorageError::Timeout { after: Duration::from_secs(1) }.is_transient());
        assert!(StorageError::Unavailable { reason: "down".into() }.is_transient());
        assert!(!StorageError::Rejected { status: 400, reason: "bad".into() }.is_transient());
        assert!(!StorageError::Unsupported { operation: "update" }.is_transient());

        let busy = rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_BUSY),
            None,
        );
        assert!(StorageError::Sqlite(busy).is_transient());
    }
}
