//! Store transport layer for rdfsync.
//!
//! Provides the [`TripleStore`] trait: the only primitives the engine may use
//! against a remote triple store (select, ask, combined update, delete,
//! insert). Three backends implement it, and a bounded [`ConnectionPool`]
//! mediates every request the engine makes.
//!
//! # Modules
//!
//! - [`error`]: StorageError enum with all failure modes
//! - [`traits`]: TripleStore trait and TriplePattern
//! - [`pool`]: bounded ConnectionPool with acquire and request timeouts
//! - [`memory`]: InMemoryStore implementation (with failure injection)
//! - [`schema`]: SQL migrations for the SQLite backend
//! - [`sqlite`]: SqliteStore implementation
//! - [`sparql`]: SPARQL 1.1 query/update encoding and result parsing
//! - [`http`]: SparqlHttpStore, a SPARQL-protocol client over HTTP

pub mod error;
pub mod http;
pub mod memory;
pub mod pool;
pub mod schema;
pub mod sparql;
pub mod sqlite;
pub mod traits;

// Re-export key types for ergonomic use.
pub use error::StorageError;
pub use http::SparqlHttpStore;
pub use memory::{InMemoryStore, StoreCall};
pub use pool::{ConnectionPool, PoolConfig, PooledConnection};
pub use sqlite::SqliteStore;
pub use traits::{TriplePattern, TripleStore};
