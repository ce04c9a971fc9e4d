//! Buffered mutation intents.
//!
//! An [`Operation`] is created by the resource/model layer, sits in the
//! operation log until the next flush, and is consumed exactly once by the
//! reconciliation engine. Operations never deduplicate at record time:
//! several operations at one key together describe the intended final object
//! set for that key.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::CoreError;
use crate::statement::Key;
use crate::term::{Iri, Term};
use crate::vocab;

/// Identifier assigned to an operation when it is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OperationId(pub Uuid);

impl OperationId {
    /// Allocates a fresh random identifier.
    pub fn new() -> Self {
        OperationId(Uuid::new_v4())
    }
}

impl Default for OperationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for OperationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What an operation does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperationKind {
    /// Declares the subject's `rdf:type`.
    SaveTyped,
    /// Saves one value of an attribute or relationship.
    SaveAttribute,
    /// Removes an attribute or relationship (every value at the key).
    DeleteAttribute,
    /// Removes every statement whose subject is the entity.
    DeleteEntity,
}

impl OperationKind {
    /// Returns true for kinds that retract rather than assert.
    pub fn is_delete(self) -> bool {
        matches!(self, OperationKind::DeleteAttribute | OperationKind::DeleteEntity)
    }
}

/// How the intended object set at a key is reconciled with the stored one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReconcilePolicy {
    /// Retract every stored object, then assert the intended set.
    ReplaceAll,
    /// Replace only when the stored set differs from the intended set.
    ReplaceIfDifferent,
    /// Assert intended objects not already stored; never retract.
    AppendIfAbsent,
    /// Retract every stored object; assert nothing.
    DeleteKey,
}

/// A single buffered mutation intent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operation {
    pub id: OperationId,
    pub kind: OperationKind,
    pub policy: ReconcilePolicy,
    pub subject: Iri,
    /// Required for every kind except [`OperationKind::DeleteEntity`].
    pub predicate: Option<Iri>,
    /// Required for the save kinds; ignored by the delete kinds.
    pub object: Option<Term>,
}

impl Operation {
    /// Saves `object` at (`subject`, `predicate`).
    pub fn save(subject: Iri, predicate: Iri, object: Term, policy: ReconcilePolicy) -> Self {
        Operation {
            id: OperationId::new(),
            kind: OperationKind::SaveAttribute,
            policy,
            subject,
            predicate: Some(predicate),
            object: Some(object),
        }
    }

    /// Declares `class` as an `rdf:type` of `subject`.
    pub fn save_type(subject: Iri, class: Iri, policy: ReconcilePolicy) -> Self {
        Operation {
            id: OperationId::new(),
            kind: OperationKind::SaveTyped,
            policy,
            subject,
            predicate: Some(vocab::rdf_type()),
            object: Some(Term::Iri(class)),
        }
    }

    /// Removes every value at (`subject`, `predicate`).
    pub fn delete_attribute(subject: Iri, predicate: Iri) -> Self {
        Operation {
            id: OperationId::new(),
            kind: OperationKind::DeleteAttribute,
            policy: ReconcilePolicy::DeleteKey,
            subject,
            predicate: Some(predicate),
            object: None,
        }
    }

    /// Removes the whole entity named by `subject`.
    pub fn delete_entity(subject: Iri) -> Self {
        Operation {
            id: OperationId::new(),
            kind: OperationKind::DeleteEntity,
            policy: ReconcilePolicy::DeleteKey,
            subject,
            predicate: None,
            object: None,
        }
    }

    /// Returns the (subject, predicate) key, or `None` for entity removal.
    pub fn key(&self) -> Option<Key> {
        match self.kind {
            OperationKind::DeleteEntity => None,
            _ => self
                .predicate
                .as_ref()
                .map(|p| Key::new(self.subject.clone(), p.clone())),
        }
    }

    /// Checks that the operation is well formed.
    ///
    /// Called on every member of a batch before any store interaction.
    pub fn validate(&self) -> Result<(), CoreError> {
        let policy_ok = match self.kind {
            OperationKind::DeleteAttribute | OperationKind::DeleteEntity => {
                self.policy == ReconcilePolicy::DeleteKey
            }
            OperationKind::SaveTyped | OperationKind::SaveAttribute => {
                self.policy != ReconcilePolicy::DeleteKey
            }
        };
        if !policy_ok {
            return Err(CoreError::PolicyMismatch {
                kind: self.kind,
                policy: self.policy,
            });
        }

        if self.kind == OperationKind::DeleteEntity {
            return Ok(());
        }
        let Some(key) = self.key() else {
            return Err(CoreError::MissingPredicate {
                kind: self.kind,
                subject: self.subject.to_string(),
            });
        };

        match (self.kind, &self.object) {
            (OperationKind::DeleteAttribute, _) => Ok(()),
            (_, None) => Err(CoreError::MissingObject {
                kind: self.kind,
                key,
            }),
            (OperationKind::SaveTyped, Some(Term::Literal(_))) => Err(CoreError::TypeNotIri {
                subject: self.subject.to_string(),
            }),
            (_, Some(object)) => object.validate(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::term::Literal;
    use crate::vocab::xsd;

    fn iri(s: &str) -> Iri {
        Iri::new(s).unwrap()
    }

    #[test]
    fn test_constructors_validate() {
        let e1 = iri("http://example.org/e1");
        let name = iri("http://example.org/name");
        let ops = [
            Operation::save(
                e1.clone(),
                name.clone(),
                Term::literal("Alice"),
                ReconcilePolicy::ReplaceIfDifferent,
            ),
            Operation::save_type(
                e1.clone(),
                iri("http://example.org/Person"),
                ReconcilePolicy::AppendIfAbsent,
            ),
            Operation::delete_attribute(e1.clone(), name),
            Operation::delete_entity(e1),
        ];
        for op in &ops {
            assert!(op.validate().is_ok(), "{op:?}");
        }
        assert!(ops[3].key().is_none());
        assert_eq!(ops[1].predicate.as_ref().map(Iri::as_str), Some(vocab::rdf::TYPE));
    }

    #[test]
    fn test_policy_mismatch() {
        let mut op = Operation::delete_attribute(iri("http://e/1"), iri("http://p/x"));
        op.policy = ReconcilePolicy::ReplaceAll;
        assert!(matches!(op.validate(), Err(CoreError::PolicyMismatch { .. })));

        let op = Operation::save(
            iri("http://e/1"),
            iri("http://p/x"),
            Term::literal("v"),
            ReconcilePolicy::DeleteKey,
        );
        assert!(matches!(op.validate(), Err(CoreError::PolicyMismatch { .. })));
    }

    #[test]
    fn test_missing_parts() {
        let mut op = Operation::save(
            iri("http://e/1"),
            iri("http://p/x"),
            Term::literal("v"),
            ReconcilePolicy::ReplaceAll,
        );
        op.object = None;
        assert!(matches!(op.validate(), Err(CoreError::MissingObject { .. })));
        op.predicate = None;
        assert!(matches!(op.validate(), Err(CoreError::MissingPredicate { .. })));
    }

    #[test]
    fn test_datatype_mismatch_detected() {
        let bad = Literal {
            lexical: "tomorrow".into(),
            datatype: Some(iri(xsd::DATE)),
            language: None,
        };
        let op = Operation::save(
            iri("http://e/1"),
            iri("http://p/born"),
            Term::Literal(bad),
            ReconcilePolicy::ReplaceAll,
        );
        assert!(matches!(op.validate(), Err(CoreError::DatatypeMismatch { .. })));
    }

    #[test]
    fn test_type_must_be_iri() {
        let mut op = Operation::save_type(
            iri("http://e/1"),
            iri("http://c/Person"),
            ReconcilePolicy::ReplaceAll,
        );
        op.object = Some(Term::literal("Person"));
        assert!(matches!(op.validate(), Err(CoreError::TypeNotIri { .. })));
    }

    #[test]
    fn test_operation_ids_are_unique() {
        assert_ne!(OperationId::new(), OperationId::new());
    }
}
