//! Read-side queries against the store.
//!
//! [`StoreReader`] checks out one pooled connection per call, so a failure
//! mid-query always returns the connection to the pool.

use std::collections::{BTreeSet, HashSet, VecDeque};

use rdfsync_core::{Iri, Statement, StatementSet, Term};
use rdfsync_storage::{ConnectionPool, StorageError, TriplePattern, TripleStore};

use crate::materialize::TraversalPolicy;

/// Queries the current state of keys, entities and subgraphs.
pub struct StoreReader<'a, S: TripleStore + ?Sized> {
    pool: &'a ConnectionPool<S>,
}

impl<'a, S: TripleStore + ?Sized> StoreReader<'a, S> {
    pub fn new(pool: &'a ConnectionPool<S>) -> Self {
        StoreReader { pool }
    }

    /// The stored object set at (`subject`, `predicate`); empty if none.
    pub async fn current_objects(
        &self,
        subject: &Iri,
        predicate: &Iri,
    ) -> Result<BTreeSet<Term>, StorageError> {
        let conn = self.pool.acquire().await?;
        let rows = conn.select(&TriplePattern::key(subject, predicate)).await?;
        Ok(rows.into_iter().map(|st| st.object).collect())
    }

    /// Returns true if `subject` has at least one statement.
    pub async fn exists(&self, subject: &Iri) -> Result<bool, StorageError> {
        let conn = self.pool.acquire().await?;
        conn.ask(&TriplePattern::subject(subject)).await
    }

    /// Returns true if `object` is the object of a statement about some
    /// other subject. Self-references do not count.
    pub async fn is_referenced(&self, object: &Iri) -> Result<bool, StorageError> {
        let conn = self.pool.acquire().await?;
        let pattern = TriplePattern::object(Term::Iri(object.clone()));
        if !conn.ask(&pattern).await? {
            return Ok(false);
        }
        let referrers = conn.select(&pattern).await?;
        Ok(referrers.iter().any(|st| st.subject != *object))
    }

    /// Every statement whose subject is `subject`.
    pub async fn outgoing(&self, subject: &Iri) -> Result<Vec<Statement>, StorageError> {
        let conn = self.pool.acquire().await?;
        conn.select(&TriplePattern::subject(subject)).await
    }

    /// Collects the statements reachable from `root` by following IRI
    /// objects.
    ///
    /// Each subject is added to `visited` before its statements are fetched
    /// and is never fetched twice, so traversal terminates on cycles and on
    /// subjects reachable through several paths. Subjects already in
    /// `visited` on entry are not fetched. Objects of predicates in
    /// `policy.skip_predicates` are not followed, and nothing deeper than
    /// `policy.max_depth` hops from the root is fetched.
    pub async fn subgraph(
        &self,
        root: &Iri,
        visited: &mut HashSet<Iri>,
        policy: &TraversalPolicy,
    ) -> Result<StatementSet, StorageError> {
        let mut statements = StatementSet::new();
        let mut queue = VecDeque::new();
        if visited.insert(root.clone()) {
            queue.push_back((root.clone(), 0usize));
        }

        while let Some((subject, depth)) = queue.pop_front() {
            let outgoing = self.outgoing(&subject).await?;
            let can_descend = policy.max_depth.map_or(true, |max| depth < max);
            for st in outgoing {
                if can_descend && policy.follows(&st.predicate) {
                    if let Term::Iri(next) = &st.object {
                        if visited.insert(next.clone()) {
                            queue.push_back((next.clone(), depth + 1));
                        }
                    }
                }
                statements.insert(st);
            }
        }

        tracing::debug!(
            root = %root,
            subjects = visited.len(),
            statements = statements.len(),
            "subgraph traversal finished"
        );
        Ok(statements)
    }
}
