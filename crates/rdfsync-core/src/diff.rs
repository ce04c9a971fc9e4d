//! The change set produced by reconciliation.
//!
//! A [`Diff`] records, per key, which objects to retract and which to
//! assert. The per-key grouping exists for auditing and logging; the
//! executor only ever looks at the two flattened statement sets.

use std::collections::{BTreeMap, BTreeSet};

use serde::ser::SerializeSeq;
use serde::{Serialize, Serializer};

use crate::statement::{Key, Statement, StatementSet};
use crate::term::{Iri, Term};

/// Objects retracted from and asserted at a single key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct KeyChange {
    pub retract: BTreeSet<Term>,
    pub assert: BTreeSet<Term>,
}

impl KeyChange {
    /// Returns true if this change does nothing.
    pub fn is_empty(&self) -> bool {
        self.retract.is_empty() && self.assert.is_empty()
    }
}

/// A pair of statement sets to retract and to assert, grouped by key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diff {
    changes: BTreeMap<Key, KeyChange>,
}

impl Diff {
    /// Creates an empty diff.
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedules `statement` for retraction.
    pub fn retract(&mut self, statement: Statement) {
        let Statement {
            subject,
            predicate,
            object,
        } = statement;
        self.changes
            .entry(Key::new(subject, predicate))
            .or_default()
            .retract
            .insert(object);
    }

    /// Schedules `statement` for assertion.
    pub fn assert(&mut self, statement: Statement) {
        let Statement {
            subject,
            predicate,
            object,
        } = statement;
        self.changes
            .entry(Key::new(subject, predicate))
            .or_default()
            .assert
            .insert(object);
    }

    /// Schedules every object in `objects` for retraction at `key`.
    pub fn retract_all(&mut self, key: &Key, objects: impl IntoIterator<Item = Term>) {
        let objects: Vec<Term> = objects.into_iter().collect();
        if objects.is_empty() {
            return;
        }
        self.changes
            .entry(key.clone())
            .or_default()
            .retract
            .extend(objects);
    }

    /// Schedules every object in `objects` for assertion at `key`.
    pub fn assert_all(&mut self, key: &Key, objects: impl IntoIterator<Item = Term>) {
        let objects: Vec<Term> = objects.into_iter().collect();
        if objects.is_empty() {
            return;
        }
        self.changes
            .entry(key.clone())
            .or_default()
            .assert
            .extend(objects);
    }

    /// Drops every statement that is both retracted and asserted, then
    /// drops keys left with no change.
    ///
    /// Retractions are only ever computed from the stored state, so a
    /// statement in both sets is stored and intended: leaving it alone has
    /// the same outcome as deleting and re-inserting it. After this call the
    /// retract and assert sets are disjoint.
    pub fn normalize(&mut self) {
        for change in self.changes.values_mut() {
            let both: Vec<Term> = change
                .retract
                .intersection(&change.assert)
                .cloned()
                .collect();
            for term in &both {
                change.retract.remove(term);
                change.assert.remove(term);
            }
        }
        self.changes.retain(|_, change| !change.is_empty());
    }

    /// Returns true if applying this diff would not touch the store.
    pub fn is_empty(&self) -> bool {
        self.changes.values().all(KeyChange::is_empty)
    }

    /// Returns the change recorded at `key`.
    pub fn change(&self, key: &Key) -> Option<&KeyChange> {
        self.changes.get(key)
    }

    /// Iterates over per-key changes in key order.
    pub fn changes(&self) -> impl Iterator<Item = (&Key, &KeyChange)> {
        self.changes.iter()
    }

    /// Returns the flattened set of statements to retract.
    pub fn retractions(&self) -> StatementSet {
        self.changes
            .iter()
            .flat_map(|(key, change)| change.retract.iter().map(|o| key.with_object(o.clone())))
            .collect()
    }

    /// Returns the flattened set of statements to assert.
    pub fn assertions(&self) -> StatementSet {
        self.changes
            .iter()
            .flat_map(|(key, change)| change.assert.iter().map(|o| key.with_object(o.clone())))
            .collect()
    }

    /// Number of statements to retract.
    pub fn retract_count(&self) -> usize {
        self.changes.values().map(|c| c.retract.len()).sum()
    }

    /// Number of statements to assert.
    pub fn assert_count(&self) -> usize {
        self.changes.values().map(|c| c.assert.len()).sum()
    }
}

/// Serialized as a list of `{subject, predicate, retract, assert}` entries,
/// since JSON object keys cannot hold a [`Key`].
impl Serialize for Diff {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        struct Entry<'a> {
            subject: &'a Iri,
            predicate: &'a Iri,
            retract: &'a BTreeSet<Term>,
            assert: &'a BTreeSet<Term>,
        }

        let mut seq = serializer.serialize_seq(Some(self.changes.len()))?;
        for (key, change) in &self.changes {
            seq.serialize_element(&Entry {
                subject: &key.subject,
                predicate: &key.predicate,
                retract: &change.retract,
                assert: &change.assert,
            })?;
        }
        seq.end()
    }
}
