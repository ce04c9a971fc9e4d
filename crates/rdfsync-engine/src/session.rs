//! The facade exposed to the resource/model layer.
//!
//! A [`Session`] owns one operation log and a pool in front of one store.
//! `record_*` calls validate eagerly and buffer operations; [`Session::flush`]
//! drains them, reconciles them against the store, and applies the diff.
//! [`Session::load`] materializes an entity.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::Serialize;

use rdfsync_core::{Diff, Document, Iri, Literal, Operation, OperationId, ReconcilePolicy, Term};
use rdfsync_storage::{ConnectionPool, TripleStore};

use crate::config::{ApplyStrategy, EngineConfig};
use crate::error::{EngineError, FlushError};
use crate::executor::{ApplyOutcome, Executor};
use crate::locks::SubjectLocks;
use crate::log::OperationLog;
use crate::materialize::{self, TraversalPolicy};
use crate::reader::StoreReader;
use crate::reconcile;

/// The result of a successful flush.
#[derive(Debug, Clone, Serialize)]
pub struct FlushReport {
    /// Operations consumed, in recording order.
    pub operations: Vec<OperationId>,
    pub diff: Diff,
    pub applied: ApplyOutcome,
}

/// One unit of work against one store.
pub struct Session<S: TripleStore + ?Sized> {
    pool: ConnectionPool<S>,
    log: OperationLog,
    locks: SubjectLocks,
    strategy: ApplyStrategy,
    traversal: TraversalPolicy,
}

impl<S: TripleStore + ?Sized> Session<S> {
    /// Creates a session over `store` with pool bounds, apply strategy and
    /// traversal policy taken from `config`.
    pub fn new(store: Arc<S>, config: &EngineConfig) -> Self {
        Self::with_pool(ConnectionPool::from_arc(store, config.pool_config()), config)
    }

    /// Creates a session over an existing pool.
    pub fn with_pool(pool: ConnectionPool<S>, config: &EngineConfig) -> Self {
        Session {
            pool,
            log: OperationLog::new(),
            locks: SubjectLocks::new(),
            strategy: config.apply_strategy,
            traversal: config.traversal_policy(),
        }
    }

    pub fn pool(&self) -> &ConnectionPool<S> {
        &self.pool
    }

    pub fn strategy(&self) -> ApplyStrategy {
        self.strategy
    }

    /// Validates and buffers `op`.
    pub fn record(&self, op: Operation) -> Result<OperationId, EngineError> {
        op.validate()?;
        tracing::trace!(id = %op.id, kind = ?op.kind, subject = %op.subject, "recorded operation");
        Ok(self.log.record(op))
    }

    /// Buffers a save of `value` at (`id`, `predicate`).
    ///
    /// With a `datatype` the value is a typed literal and must be a valid
    /// lexical form for it; otherwise it is a plain string.
    pub fn record_save(
        &self,
        id: &str,
        predicate: &str,
        value: &str,
        datatype: Option<&str>,
        policy: ReconcilePolicy,
    ) -> Result<OperationId, EngineError> {
        let object = match datatype {
            Some(dt) => Term::typed(value, dt)?,
            None => Term::literal(value),
        };
        self.record_value(id, predicate, object, policy)
    }

    /// Buffers a save of a language-tagged string.
    pub fn record_save_lang(
        &self,
        id: &str,
        predicate: &str,
        value: &str,
        language: &str,
        policy: ReconcilePolicy,
    ) -> Result<OperationId, EngineError> {
        let object = Term::Literal(Literal::lang(value, language)?);
        self.record_value(id, predicate, object, policy)
    }

    /// Buffers a relationship from `id` to the resource `target`.
    pub fn record_link(
        &self,
        id: &str,
        predicate: &str,
        target: &str,
        policy: ReconcilePolicy,
    ) -> Result<OperationId, EngineError> {
        self.record_value(id, predicate, Term::iri(target)?, policy)
    }

    /// Buffers a save of an arbitrary term.
    pub fn record_value(
        &self,
        id: &str,
        predicate: &str,
        object: Term,
        policy: ReconcilePolicy,
    ) -> Result<OperationId, EngineError> {
        self.record(Operation::save(Iri::new(id)?, Iri::new(predicate)?, object, policy))
    }

    /// Buffers an `rdf:type` declaration.
    pub fn record_type(
        &self,
        id: &str,
        class: &str,
        policy: ReconcilePolicy,
    ) -> Result<OperationId, EngineError> {
        self.record(Operation::save_type(Iri::new(id)?, Iri::new(class)?, policy))
    }

    /// Buffers removal of every value at (`id`, `predicate`).
    ///
    /// Only [`ReconcilePolicy::DeleteKey`] is accepted.
    pub fn record_delete(
        &self,
        id: &str,
        predicate: &str,
        policy: ReconcilePolicy,
    ) -> Result<OperationId, EngineError> {
        let mut op = Operation::delete_attribute(Iri::new(id)?, Iri::new(predicate)?);
        op.policy = policy;
        self.record(op)
    }

    /// Buffers removal of the whole entity. Blocked at flush time while
    /// other subjects still reference it.
    pub fn record_delete_entity(&self, id: &str) -> Result<OperationId, EngineError> {
        self.record(Operation::delete_entity(Iri::new(id)?))
    }

    /// Copies of the operations awaiting flush.
    pub fn pending(&self) -> Vec<Operation> {
        self.log.pending()
    }

    /// Drains the operations named by `ids` (all when `None`), reconciles
    /// them, and applies the resulting diff.
    ///
    /// On failure the drained operations are handed back in the error. If
    /// the returned future is dropped before it completes, they go back to
    /// the log instead.
    pub async fn flush(&self, ids: Option<&[OperationId]>) -> Result<FlushReport, FlushError> {
        let batch = self.log.take(ids);
        tracing::debug!(
            operations = batch.operations().len(),
            remaining = self.log.len(),
            "drained batch"
        );
        let result = self.flush_batch(batch.operations()).await;
        let operations = batch.settle();
        match result {
            Ok((diff, applied)) => Ok(FlushReport {
                operations: operations.iter().map(|op| op.id).collect(),
                diff,
                applied,
            }),
            Err(err) => {
                tracing::warn!(error = %err, retryable = err.is_retryable(), "flush failed");
                Err(FlushError::new(err, operations))
            }
        }
    }

    async fn flush_batch(&self, batch: &[Operation]) -> Result<(Diff, ApplyOutcome), EngineError> {
        if batch.is_empty() {
            let applied = ApplyOutcome {
                strategy: self.strategy,
                retracted: 0,
                asserted: 0,
                touched_store: false,
            };
            return Ok((Diff::new(), applied));
        }

        let subjects: BTreeSet<Iri> = batch.iter().map(|op| op.subject.clone()).collect();
        let guard = self.locks.lock_all(&subjects).await;

        let result: Result<_, EngineError> = async {
            let reader = StoreReader::new(&self.pool);
            let reconciliation = reconcile::reconcile(&reader, batch).await?;
            if !reconciliation.conflicts.is_empty() {
                return Err(EngineError::ReferenceConflict {
                    subjects: reconciliation.conflicts,
                });
            }
            let applied = Executor::new(&self.pool, self.strategy)
                .apply(&reconciliation.diff)
                .await?;
            Ok((reconciliation.diff, applied))
        }
        .await;

        drop(guard);
        self.locks.prune();
        result
    }

    /// Materializes the entity `id`.
    ///
    /// Returns `Ok(None)` when the entity has no statements.
    pub async fn load(&self, id: &str, deep: bool) -> Result<Option<Document>, EngineError> {
        let root = Iri::new(id)?;
        let reader = StoreReader::new(&self.pool);
        materialize::materialize(&reader, &root, deep, &self.traversal).await
    }
}
