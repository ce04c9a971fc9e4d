//! Triple-store reconciliation engine.
//!
//! Buffers mutation intents, reconciles them against the statements stored
//! for each (subject, predicate) key, applies the minimal diff with
//! best-effort atomicity, and materializes bounded subgraphs into nested
//! documents.
//!
//! # Modules
//!
//! - [`error`]: EngineError taxonomy, PartialApplyError, FlushError, ConfigError
//! - [`config`]: EngineConfig and ApplyStrategy
//! - [`log`]: OperationLog, the pending-operation buffer
//! - [`reader`]: StoreReader queries (current objects, references, subgraphs)
//! - [`reconcile`]: per-key policy reconciliation into a Diff
//! - [`executor`]: combined and two-phase diff application with rollback
//! - [`materialize`]: subgraph shaping into Documents with cycle placeholders
//! - [`locks`]: per-subject critical sections for concurrent flushes
//! - [`session`]: the Session facade
//!
//! Consistency is best-effort: policies such as replace-if-different act on
//! a read observed moments before the write, and concurrent writers in
//! other processes are not isolated from each other.

pub mod config;
pub mod error;
pub mod executor;
pub mod locks;
pub mod log;
pub mod materialize;
pub mod reader;
pub mod reconcile;
pub mod session;

pub use config::{ApplyStrategy, EngineConfig};
pub use error::{ConfigError, EngineError, FlushError, PartialApplyError, RollbackOutcome};
pub use executor::{ApplyOutcome, Executor};
pub use log::OperationLog;
pub use materialize::{Subgraph, TraversalPolicy};
pub use reader::StoreReader;
pub use reconcile::Reconciliation;
pub use session::{FlushReport, Session};
