//! Core error types for rdfsync-core.
//!
//! Every variant describes a malformed value or operation. These are the
//! causes behind a validation failure: they are detected before any store
//! interaction and are never retried.

use thiserror::Error;

use crate::operation::{OperationKind, ReconcilePolicy};
use crate::statement::Key;

/// Validation errors produced by the rdfsync-core crate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// A string could not be parsed as an absolute IRI.
    #[error("invalid IRI '{iri}': {reason}")]
    InvalidIri { iri: String, reason: String },

    /// An operation was recorded without a subject.
    #[error("operation is missing its subject")]
    MissingSubject,

    /// An attribute-level operation was recorded without a predicate.
    #[error("{kind:?} operation on <{subject}> is missing its predicate")]
    MissingPredicate { kind: OperationKind, subject: String },

    /// A save operation was recorded without an object value.
    #[error("{kind:?} operation on {key} is missing its object")]
    MissingObject { kind: OperationKind, key: Key },

    /// A literal's lexical form is not valid for its declared datatype.
    #[error("literal \"{lexical}\" is not a valid <{datatype}>")]
    DatatypeMismatch { lexical: String, datatype: String },

    /// A language tag is malformed or combined with a non-string datatype.
    #[error("invalid language tag '{tag}': {reason}")]
    InvalidLanguageTag { tag: String, reason: String },

    /// The object of a SaveTyped operation must be an IRI naming a class.
    #[error("type declaration on <{subject}> must name a class IRI")]
    TypeNotIri { subject: String },

    /// An operation kind was paired with a policy it cannot use.
    #[error("{kind:?} cannot be reconciled with policy {policy:?}")]
    PolicyMismatch {
        kind: OperationKind,
        policy: ReconcilePolicy,
    },

    /// Two operations in one batch target the same key with different policies.
    #[error("conflicting policies for {key}: {first:?} and {second:?}")]
    ConflictingPolicies {
        key: Key,
        first: ReconcilePolicy,
        second: ReconcilePolicy,
    },
}
