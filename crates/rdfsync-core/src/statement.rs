//! The unit of storage: a subject-predicate-object [`Statement`].

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::term::{Iri, Term};

/// An ordered set of statements, the shape every store call exchanges.
pub type StatementSet = BTreeSet<Statement>;

/// A (subject, predicate, object) triple.
///
/// Immutable value type with structural equality. The literal datatype, when
/// present, lives inside the object term.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Statement {
    pub subject: Iri,
    pub predicate: Iri,
    pub object: Term,
}

impl Statement {
    /// Creates a statement.
    pub fn new(subject: Iri, predicate: Iri, object: impl Into<Term>) -> Self {
        Statement {
            subject,
            predicate,
            object: object.into(),
        }
    }

    /// Returns the (subject, predicate) key this statement belongs to.
    pub fn key(&self) -> Key {
        Key {
            subject: self.subject.clone(),
            predicate: self.predicate.clone(),
        }
    }

    /// Returns the declared datatype of a literal object.
    pub fn datatype(&self) -> Option<&Iri> {
        self.object.as_literal().and_then(|lit| lit.datatype.as_ref())
    }
}

/// N-Triples line without the trailing newline.
impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}> <{}> {} .", self.subject, self.predicate, self.object)
    }
}

/// A (subject, predicate) pair: the granularity at which reconciliation
/// policies apply.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Key {
    pub subject: Iri,
    pub predicate: Iri,
}

impl Key {
    /// Creates a key.
    pub fn new(subject: Iri, predicate: Iri) -> Self {
        Key { subject, predicate }
    }

    /// Builds the statement asserting `object` at this key.
    pub fn with_object(&self, object: Term) -> Statement {
        Statement {
            subject: self.subject.clone(),
            predicate: self.predicate.clone(),
            object,
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}> <{}>", self.subject, self.predicate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vocab::xsd;

    fn iri(s: &str) -> Iri {
        Iri::new(s).unwrap()
    }

    #[test]
    fn test_statement_display_is_ntriples() {
        let st = Statement::new(
            iri("http://example.org/e1"),
            iri("http://example.org/age"),
            Term::typed("30", xsd::INTEGER).unwrap(),
        );
        assert_eq!(
            st.to_string(),
            "<http://example.org/e1> <http://example.org/age> \"30\"^^<http://www.w3.org/2001/XMLSchema#integer> ."
        );
        assert_eq!(st.datatype().map(Iri::as_str), Some(xsd::INTEGER));
    }

    #[test]
    fn test_structural_equality() {
        let a = Statement::new(iri("http://e/1"), iri("http://p/name"), Term::literal("Alice"));
        let b =
            Key::new(iri("http://e/1"), iri("http://p/name")).with_object(Term::literal("Alice"));
        assert_eq!(a, b);
        assert_eq!(a.key(), b.key());

        let mut set = StatementSet::new();
        set.insert(a);
        assert!(!set.insert(b));
    }
}
