//! Engine error taxonomy.
//!
//! [`EngineError`] separates failures by what the caller may do about them:
//! validation failures and reference conflicts are never retried
//! automatically, transient store failures are safe to retry as a whole
//! batch, and a partial apply carries enough detail to reconcile by hand.

use std::fmt;

use thiserror::Error;

use rdfsync_core::{CoreError, Iri, Operation, StatementSet};
use rdfsync_storage::StorageError;

/// Errors produced while reconciling, applying, or materializing.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A malformed operation; the batch never reached the store.
    #[error("validation failed: {0}")]
    Validation(#[from] CoreError),

    /// Entity deletion blocked because the subjects are still referenced.
    #[error("entity deletion blocked: {} still referenced", format_subjects(.subjects))]
    ReferenceConflict { subjects: Vec<Iri> },

    /// Network, timeout, or pool exhaustion. Retrying the batch is safe.
    #[error("transient store failure: {0}")]
    TransientStore(#[source] StorageError),

    /// The store failed in a way retrying will not fix.
    #[error("store failure: {0}")]
    Store(#[source] StorageError),

    /// A two-phase apply failed after its retraction succeeded.
    #[error(transparent)]
    PartialApply(#[from] PartialApplyError),
}

impl EngineError {
    /// Returns true if re-running the whole batch may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, EngineError::TransientStore(_))
    }
}

impl From<StorageError> for EngineError {
    fn from(err: StorageError) -> Self {
        if err.is_transient() {
            EngineError::TransientStore(err)
        } else {
            EngineError::Store(err)
        }
    }
}

fn format_subjects(subjects: &[Iri]) -> String {
    subjects
        .iter()
        .map(|s| format!("<{s}>"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Whether the compensating re-assertion after a failed second phase worked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RollbackOutcome {
    /// Every retracted statement was re-asserted.
    Restored,
    /// The re-assertion failed too; the retracted statements may be lost.
    Failed { reason: String },
}

impl fmt::Display for RollbackOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RollbackOutcome::Restored => f.write_str("rollback restored the retracted statements"),
            RollbackOutcome::Failed { reason } => write!(f, "rollback failed: {reason}"),
        }
    }
}

/// A two-phase apply whose assertion step failed after retraction.
#[derive(Debug, Error)]
#[error(
    "partial apply: {} retracted, {} assertions unconfirmed ({cause}); {rollback}",
    .retracted.len(),
    .unconfirmed.len()
)]
pub struct PartialApplyError {
    /// Statements removed by the first phase.
    pub retracted: StatementSet,
    /// Statements the second phase tried to assert.
    pub unconfirmed: StatementSet,
    /// The failure of the second phase.
    #[source]
    pub cause: StorageError,
    pub rollback: RollbackOutcome,
}

impl PartialApplyError {
    /// Statements whose presence in the store is unknown.
    ///
    /// An assertion that timed out may or may not have landed. The
    /// retracted statements are only in doubt when the rollback failed.
    pub fn uncertain(&self) -> StatementSet {
        let mut uncertain = self.unconfirmed.clone();
        if matches!(self.rollback, RollbackOutcome::Failed { .. }) {
            uncertain.extend(self.retracted.iter().cloned());
        }
        uncertain
    }

    /// Returns true if the store is back in its pre-apply state for the
    /// retracted statements.
    pub fn restored(&self) -> bool {
        self.rollback == RollbackOutcome::Restored
    }
}

/// A failed flush, handing back the operations it drained.
///
/// The log never silently loses operations: the caller may re-record
/// `operations` to retry once the cause is addressed.
#[derive(Debug, Error)]
#[error("flush of {} operation(s) failed: {source}", .operations.len())]
pub struct FlushError {
    #[source]
    pub source: EngineError,
    pub operations: Vec<Operation>,
}

impl FlushError {
    pub fn new(source: EngineError, operations: Vec<Operation>) -> Self {
        FlushError { source, operations }
    }

    /// See [`EngineError::is_retryable`].
    pub fn is_retryable(&self) -> bool {
        self.source.is_retryable()
    }
}

/// Invalid engine configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value '{value}' for {name}: {reason}")]
    InvalidValue {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("no store configured: set an endpoint or a database path")]
    NoStore,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rdfsync_core::{Statement, Term};
    use std::time::Duration;

    fn statement(name: &str) -> Statement {
        Statement::new(
            Iri::new("http://example.org/e1").unwrap(),
            Iri::new("http://example.org/name").unwrap(),
            Term::literal(name),
        )
    }

    #[test]
    fn test_storage_errors_route_by_transience() {
        let transient: EngineError = StorageError::Timeout {
            after: Duration::from_secs(1),
        }
        .into();
        assert!(transient.is_retryable());

        let permanent: EngineError = StorageError::Rejected {
            status: 400,
            reason: "syntax".into(),
        }
        .into();
        assert!(matches!(permanent, EngineError::Store(_)));
        assert!(!permanent.is_retryable());
    }

    #[test]
    fn test_conflict_message_lists_subjects() {
        let err = EngineError::ReferenceConflict {
            subjects: vec![Iri::new("http://example.org/e2").unwrap()],
        };
        assert_eq!(
            err.to_string(),
            "entity deletion blocked: <http://example.org/e2> still referenced"
        );
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_uncertain_statements() {
        let restored = PartialApplyError {
            retracted: StatementSet::from([statement("Alice")]),
            unconfirmed: StatementSet::from([statement("Bob")]),
            cause: StorageError::Timeout {
                after: Duration::from_secs(1),
            },
            rollback: RollbackOutcome::Restored,
        };
        assert!(restored.restored());
        assert_eq!(restored.uncertain(), StatementSet::from([statement("Bob")]));

        let failed = PartialApplyError {
            rollback: RollbackOutcome::Failed {
                reason: "down".into(),
            },
            ..restored
        };
        assert_eq!(failed.uncertain().len(), 2);
        // A partial apply is reported, never retried automatically.
        assert!(!EngineError::from(failed).is_retryable());
    }
}
