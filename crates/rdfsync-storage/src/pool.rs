//! Bounded connection pool in front of a [`TripleStore`].
//!
//! The pool caps the number of requests in flight against one endpoint.
//! Acquiring a [`PooledConnection`] waits for a free slot at most
//! `acquire_timeout` and then fails with [`StorageError::PoolExhausted`]
//! instead of hanging. The slot is released when the connection is dropped,
//! so an error or panic mid-operation always returns it to the pool.
//!
//! Every request issued through a pooled connection is bounded by
//! `request_timeout`; expiry surfaces as [`StorageError::Timeout`].

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use rdfsync_core::{Statement, StatementSet};

use crate::error::StorageError;
use crate::traits::{TriplePattern, TripleStore};

/// Pool sizing and timeout bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolConfig {
    /// Maximum concurrent requests against the store (at least 1).
    pub max_connections: usize,
    /// How long `acquire` waits for a free connection.
    pub acquire_timeout: Duration,
    /// Upper bound on a single store request.
    pub request_timeout: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        PoolConfig {
            max_connections: 8,
            acquire_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// A bounded pool of connections to one store.
pub struct ConnectionPool<S: ?Sized> {
    store: Arc<S>,
    permits: Arc<Semaphore>,
    config: PoolConfig,
}

impl<S: TripleStore> ConnectionPool<S> {
    /// Creates a pool that owns `store`.
    pub fn new(store: S, config: PoolConfig) -> Self {
        Self::from_arc(Arc::new(store), config)
    }
}

impl<S: TripleStore + ?Sized> ConnectionPool<S> {
    /// Creates a pool over a shared store (also accepts `Arc<dyn TripleStore>`).
    pub fn from_arc(store: Arc<S>, config: PoolConfig) -> Self {
        let max = config.max_connections.max(1);
        ConnectionPool {
            store,
            permits: Arc::new(Semaphore::new(max)),
            config: PoolConfig {
                max_connections: max,
                ..config
            },
        }
    }

    /// Waits for a free connection, up to the acquire timeout.
    pub async fn acquire(&self) -> Result<PooledConnection<S>, StorageError> {
        let started = Instant::now();
        let permit = Arc::clone(&self.permits).acquire_owned();
        match tokio::time::timeout(self.config.acquire_timeout, permit).await {
            Ok(Ok(permit)) => Ok(PooledConnection {
                store: Arc::clone(&self.store),
                request_timeout: self.config.request_timeout,
                _permit: permit,
            }),
            Ok(Err(_closed)) => Err(StorageError::Unavailable {
                reason: "connection pool is closed".to_string(),
            }),
            Err(_elapsed) => {
                let waited = started.elapsed();
                tracing::warn!(
                    max_connections = self.config.max_connections,
                    ?waited,
                    "connection pool exhausted"
                );
                Err(StorageError::PoolExhausted { waited })
            }
        }
    }

    /// Number of connections currently free.
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }

    /// Returns the pool's configuration.
    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Returns the underlying store.
    ///
    /// Bypasses the pool bound; intended for seeding and inspection.
    pub fn store(&self) -> &S {
        &self.store
    }
}

/// A connection checked out of a [`ConnectionPool`].
///
/// Exposes the store primitives, each bounded by the request timeout.
pub struct PooledConnection<S: ?Sized> {
    store: Arc<S>,
    request_timeout: Duration,
    _permit: OwnedSemaphorePermit,
}

impl<S: TripleStore + ?Sized> PooledConnection<S> {
    async fn timed<T>(
        &self,
        request: impl Future<Output = Result<T, StorageError>>,
    ) -> Result<T, StorageError> {
        match tokio::time::timeout(self.request_timeout, request).await {
            Ok(result) => result,
            Err(_elapsed) => Err(StorageError::Timeout {
                after: self.request_timeout,
            }),
        }
    }

    /// See [`TripleStore::select`].
    pub async fn select(&self, pattern: &TriplePattern) -> Result<Vec<Statement>, StorageError> {
        self.timed(self.store.select(pattern)).await
    }

    /// See [`TripleStore::ask`].
    pub async fn ask(&self, pattern: &TriplePattern) -> Result<bool, StorageError> {
        self.timed(self.store.ask(pattern)).await
    }

    /// See [`TripleStore::update`].
    pub async fn update(
        &self,
        delete: &StatementSet,
        insert: &StatementSet,
    ) -> Result<(), StorageError> {
        self.timed(self.store.update(delete, insert)).await
    }

    /// See [`TripleStore::delete`].
    pub async fn delete(&self, statements: &StatementSet) -> Result<(), StorageError> {
        self.timed(self.store.delete(statements)).await
    }

    /// See [`TripleStore::insert`].
    pub async fn insert(&self, statements: &StatementSet) -> Result<(), StorageError> {
        self.timed(self.store.insert(statements)).await
    }
}
