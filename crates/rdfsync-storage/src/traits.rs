//! The [`TripleStore`] trait defining the transport contract.
//!
//! The engine never talks to a store through anything richer than these five
//! primitives: there is no compare-and-swap, no multi-request transaction,
//! and no referential integrity. Whatever atomicity a backend gives a single
//! `update` call is inherited as-is.
//!
//! All backends (InMemoryStore, SqliteStore, SparqlHttpStore) implement this
//! trait, so they are swappable without touching reconciliation logic.

use async_trait::async_trait;

use rdfsync_core::{Iri, Statement, StatementSet, Term};

use crate::error::StorageError;

/// A triple pattern with optional bound positions.
///
/// Unbound positions match anything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TriplePattern {
    pub subject: Option<Iri>,
    pub predicate: Option<Iri>,
    pub object: Option<Term>,
}

impl TriplePattern {
    /// Matches every statement.
    pub fn any() -> Self {
        Self::default()
    }

    /// Matches statements with the given subject.
    pub fn subject(subject: &Iri) -> Self {
        TriplePattern {
            subject: Some(subject.clone()),
            ..Self::default()
        }
    }

    /// Matches statements at the given (subject, predicate) key.
    pub fn key(subject: &Iri, predicate: &Iri) -> Self {
        TriplePattern {
            subject: Some(subject.clone()),
            predicate: Some(predicate.clone()),
            object: None,
        }
    }

    /// Matches statements whose object is the given term.
    pub fn object(object: Term) -> Self {
        TriplePattern {
            object: Some(object),
            ..Self::default()
        }
    }

    /// Returns true if every position is bound.
    pub fn is_ground(&self) -> bool {
        self.subject.is_some() && self.predicate.is_some() && self.object.is_some()
    }

    /// Returns the statement this pattern denotes when it is ground.
    pub fn as_statement(&self) -> Option<Statement> {
        match (&self.subject, &self.predicate, &self.object) {
            (Some(s), Some(p), Some(o)) => Some(Statement::new(s.clone(), p.clone(), o.clone())),
            _ => None,
        }
    }

    /// Tests a statement against the pattern.
    pub fn matches(&self, statement: &Statement) -> bool {
        self.subject.as_ref().map_or(true, |s| *s == statement.subject)
            && self.predicate.as_ref().map_or(true, |p| *p == statement.predicate)
            && self.object.as_ref().map_or(true, |o| *o == statement.object)
    }
}

/// The storage contract for a remote triple store.
///
/// Implementations must be shareable across tasks; the
/// [`ConnectionPool`](crate::pool::ConnectionPool) bounds how many requests
/// are in flight at once.
#[async_trait]
pub trait TripleStore: Send + Sync {
    /// Returns every stored statement matching `pattern`.
    async fn select(&self, pattern: &TriplePattern) -> Result<Vec<Statement>, StorageError>;

    /// Returns true if at least one stored statement matches `pattern`.
    async fn ask(&self, pattern: &TriplePattern) -> Result<bool, StorageError>;

    /// Retracts `delete` and asserts `insert` in a single request.
    ///
    /// Backends that cannot accept both halves in one request keep the
    /// default, which reports the primitive as unsupported.
    async fn update(
        &self,
        delete: &StatementSet,
        insert: &StatementSet,
    ) -> Result<(), StorageError> {
        let _ = (delete, insert);
        Err(StorageError::Unsupported {
            operation: "combined update",
        })
    }

    /// Retracts every statement in `statements`. Absent statements are ignored.
    async fn delete(&self, statements: &StatementSet) -> Result<(), StorageError>;

    /// Asserts every statement in `statements`. Present statements are ignored.
    async fn insert(&self, statements: &StatementSet) -> Result<(), StorageError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn iri(s: &str) -> Iri {
        Iri::new(s).unwrap()
    }

    #[test]
    fn test_pattern_matching() {
        let st = Statement::new(iri("http://e/1"), iri("http://p/name"), Term::literal("Alice"));
        assert!(TriplePattern::any().matches(&st));
        assert!(TriplePattern::subject(&iri("http://e/1")).matches(&st));
        assert!(TriplePattern::key(&iri("http://e/1"), &iri("http://p/name")).matches(&st));
        assert!(!TriplePattern::key(&iri("http://e/1"), &iri("http://p/age")).matches(&st));
        assert!(TriplePattern::object(Term::literal("Alice")).matches(&st));
        assert!(!TriplePattern::object(Term::literal("Bob")).matches(&st));
    }

    #[test]
    fn test_ground_pattern() {
        let mut pattern = TriplePattern::key(&iri("http://e/1"), &iri("http://p/name"));
        assert!(!pattern.is_ground());
        assert!(pattern.as_statement().is_none());
        pattern.object = Some(Term::literal("Alice"));
        assert!(pattern.is_ground());
        assert_eq!(pattern.as_statement().unwrap().subject.as_str(), "http://e/1");
    }
}
