//! In-memory implementation of [`TripleStore`].
//!
//! [`InMemoryStore`] is a first-class backend for tests and ephemeral
//! sessions. It holds the statement set behind a `parking_lot::RwLock` and
//! applies combined updates atomically.
//!
//! For exercising failure paths it also supports injected failures per
//! primitive ([`InMemoryStore::fail_next`]), artificial latency, and a
//! counter of applied mutations.

use std::collections::{BTreeSet, HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};

use rdfsync_core::{Statement, StatementSet};

use crate::error::StorageError;
use crate::traits::{TriplePattern, TripleStore};

/// Identifies a store primitive for failure injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreCall {
    Select,
    Ask,
    Update,
    Delete,
    Insert,
}

/// In-memory triple store.
#[derive(Default)]
pub struct InMemoryStore {
    statements: RwLock<BTreeSet<Statement>>,
    failures: Mutex<HashMap<StoreCall, VecDeque<StorageError>>>,
    latency: Option<Duration>,
    mutations: AtomicU64,
}

impl InMemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store seeded with `statements`.
    pub fn with_statements(statements: impl IntoIterator<Item = Statement>) -> Self {
        let store = Self::new();
        store.insert_all(statements);
        store
    }

    /// Delays every request by `latency` before it touches the data.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Seeds statements directly, bypassing failure injection and the
    /// mutation counter.
    pub fn insert_all(&self, statements: impl IntoIterator<Item = Statement>) {
        self.statements.write().extend(statements);
    }

    /// Queues `error` to be returned by the next call of `call`.
    ///
    /// Multiple queued failures for the same primitive are returned in order.
    pub fn fail_next(&self, call: StoreCall, error: StorageError) {
        self.failures.lock().entry(call).or_default().push_back(error);
    }

    /// Number of write requests that changed at least one statement.
    pub fn mutation_count(&self) -> u64 {
        self.mutations.load(Ordering::SeqCst)
    }

    /// Returns a copy of every stored statement.
    pub fn snapshot(&self) -> StatementSet {
        self.statements.read().clone()
    }

    /// Returns true if `statement` is stored.
    pub fn contains(&self, statement: &Statement) -> bool {
        self.statements.read().contains(statement)
    }

    pub fn len(&self) -> usize {
        self.statements.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.read().is_empty()
    }

    async fn enter(&self, call: StoreCall) -> Result<(), StorageError> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        let injected = self
            .failures
            .lock()
            .get_mut(&call)
            .and_then(VecDeque::pop_front);
        match injected {
            Some(err) => {
                tracing::debug!(?call, error = %err, "injected store failure");
                Err(err)
            }
            None => Ok(()),
        }
    }

    fn record_mutation(&self, changed: bool) {
        if changed {
            self.mutations.fetch_add(1, Ordering::SeqCst);
        }
    }
}

#[async_trait]
impl TripleStore for InMemoryStore {
    async fn select(&self, pattern: &TriplePattern) -> Result<Vec<Statement>, StorageError> {
        self.enter(StoreCall::Select).await?;
        let statements = self.statements.read();
        Ok(statements.iter().filter(|st| pattern.matches(st)).cloned().collect())
    }

    async fn ask(&self, pattern: &TriplePattern) -> Result<bool, StorageError> {
        self.enter(StoreCall::Ask).await?;
        if let Some(statement) = pattern.as_statement() {
            return Ok(self.contains(&statement));
        }
        Ok(self.statements.read().iter().any(|st| pattern.matches(st)))
    }

    async fn update(
        &self,
        delete: &StatementSet,
        insert: &StatementSet,
    ) -> Result<(), StorageError> {
        self.enter(StoreCall::Update).await?;
        let mut statements = self.statements.write();
        let mut changed = false;
        for st in delete {
            changed |= statements.remove(st);
        }
        for st in insert {
            changed |= statements.insert(st.clone());
        }
        drop(statements);
        self.record_mutation(changed);
        Ok(())
    }

    async fn delete(&self, statements: &StatementSet) -> Result<(), StorageError> {
        self.enter(StoreCall::Delete).await?;
        let mut stored = self.statements.write();
        let mut changed = false;
        for st in statements {
            changed |= stored.remove(st);
        }
        drop(stored);
        self.record_mutation(changed);
        Ok(())
    }

    async fn insert(&self, statements: &StatementSet) -> Result<(), StorageError> {
        self.enter(StoreCall::Insert).await?;
        let mut stored = self.statements.write();
        let mut changed = false;
        for st in statements {
            changed |= stored.insert(st.clone());
        }
        drop(stored);
        self.record_mutation(changed);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rdfsync_core::{Iri, Term};

    fn st(s: &str, p: &str, o: &str) -> Statement {
        Statement::new(
            Iri::new(format!("http://example.org/{s}")).unwrap(),
            Iri::new(format!("http://example.org/{p}")).unwrap(),
            Term::literal(o),
        )
    }

    #[tokio::test]
    async fn test_combined_update() {
        let store = InMemoryStore::with_statements([st("e1", "name", "Alice")]);
        let delete = StatementSet::from([st("e1", "name", "Alice")]);
        let insert = StatementSet::from([st("e1", "name", "Bob")]);

        store.update(&delete, &insert).await.unwrap();

        assert_eq!(store.snapshot(), insert);
        assert_eq!(store.mutation_count(), 1);
    }

    #[tokio::test]
    async fn test_noop_writes_not_counted() {
        let store = InMemoryStore::with_statements([st("e1", "name", "Alice")]);
        store
            .insert(&StatementSet::from([st("e1", "name", "Alice")]))
            .await
            .unwrap();
        store
            .delete(&StatementSet::from([st("e1", "name", "Bob")]))
            .await
            .unwrap();
        assert_eq!(store.mutation_count(), 0);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_select_and_ask() {
        let store = InMemoryStore::with_statements([
            st("e1", "name", "Alice"),
            st("e1", "nick", "Al"),
            st("e2", "name", "Bob"),
        ]);
        let subject = Iri::new("http://example.org/e1").unwrap();
        assert_eq!(store.select(&TriplePattern::subject(&subject)).await.unwrap().len(), 2);

        let mut ground = TriplePattern::subject(&subject);
        ground.predicate = Some(Iri::new("http://example.org/name").unwrap());
        ground.object = Some(Term::literal("Alice"));
        assert!(store.ask(&ground).await.unwrap());
        ground.object = Some(Term::literal("Bob"));
        assert!(!store.ask(&ground).await.unwrap());
    }

    #[tokio::test]
    async fn test_injected_failures_are_consumed_in_order() {
        let store = InMemoryStore::new();
        store.fail_next(
            StoreCall::Insert,
            StorageError::Unavailable {
                reason: "one".into(),
            },
        );
        store.fail_next(
            StoreCall::Insert,
            StorageError::Rejected {
                status: 400,
                reason: "two".into(),
            },
        );

        let batch = StatementSet::from([st("e1", "name", "Alice")]);
        assert!(matches!(
            store.insert(&batch).await,
            Err(StorageError::Unavailable { .. })
        ));
        assert!(matches!(
            store.insert(&batch).await,
            Err(StorageError::Rejected { .. })
        ));
        // Other primitives are unaffected.
        assert!(store.select(&TriplePattern::any()).await.unwrap().is_empty());
        store.insert(&batch).await.unwrap();
        assert_eq!(store.len(), 1);
    }
}
