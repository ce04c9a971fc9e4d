//! Reconciliation: from a batch of operations to a minimal [`Diff`].
//!
//! Operations are grouped by (subject, predicate). The union of objects at a
//! key is the intended object set, and the key's policy decides how it is
//! reconciled with the stored set read through the [`StoreReader`].
//! Entity deletions are checked for inbound references first; a referenced
//! entity contributes no retractions and is reported as a conflict.
//! Saves on an entity deleted in the same batch recreate it: their keys are
//! reconciled against an empty stored set, whatever the policy.

use std::collections::{BTreeMap, BTreeSet};

use rdfsync_core::{CoreError, Diff, Iri, Key, Operation, OperationKind, ReconcilePolicy, Term};
use rdfsync_storage::TripleStore;

use crate::error::EngineError;
use crate::reader::StoreReader;

/// The result of reconciling one batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reconciliation {
    pub diff: Diff,
    /// Entities whose deletion is blocked by inbound references.
    pub conflicts: Vec<Iri>,
}

/// The intended state of one key within a batch.
#[derive(Debug)]
struct KeyIntent {
    policy: ReconcilePolicy,
    objects: BTreeSet<Term>,
}

/// Validates every operation and checks that no key mixes policies.
///
/// Runs before any store interaction; one invalid member fails the batch.
pub fn validate_batch(batch: &[Operation]) -> Result<(), CoreError> {
    let mut policies: BTreeMap<Key, ReconcilePolicy> = BTreeMap::new();
    for op in batch {
        op.validate()?;
        let Some(key) = op.key() else { continue };
        match policies.get(&key) {
            Some(&first) if first != op.policy => {
                return Err(CoreError::ConflictingPolicies {
                    key,
                    first,
                    second: op.policy,
                });
            }
            Some(_) => {}
            None => {
                policies.insert(key, op.policy);
            }
        }
    }
    Ok(())
}

/// Computes the retractions and assertions for one key.
///
/// Pure function of the policy, the stored set and the intended set.
pub fn reconcile_key(
    policy: ReconcilePolicy,
    current: &BTreeSet<Term>,
    intended: &BTreeSet<Term>,
) -> (BTreeSet<Term>, BTreeSet<Term>) {
    match policy {
        ReconcilePolicy::ReplaceAll => (current.clone(), intended.clone()),
        ReconcilePolicy::ReplaceIfDifferent if current == intended => {
            (BTreeSet::new(), BTreeSet::new())
        }
        ReconcilePolicy::ReplaceIfDifferent => (current.clone(), intended.clone()),
        ReconcilePolicy::AppendIfAbsent => {
            (BTreeSet::new(), intended.difference(current).cloned().collect())
        }
        ReconcilePolicy::DeleteKey => (current.clone(), BTreeSet::new()),
    }
}

/// Reconciles `batch` against the current store state.
///
/// Returns [`EngineError::Validation`] without touching the store if any
/// member is malformed.
pub async fn reconcile<S: TripleStore + ?Sized>(
    reader: &StoreReader<'_, S>,
    batch: &[Operation],
) -> Result<Reconciliation, EngineError> {
    validate_batch(batch)?;

    let mut intents: BTreeMap<Key, KeyIntent> = BTreeMap::new();
    let mut entities: BTreeSet<Iri> = BTreeSet::new();
    for op in batch {
        if op.kind == OperationKind::DeleteEntity {
            entities.insert(op.subject.clone());
            continue;
        }
        let Some(key) = op.key() else { continue };
        let intent = intents.entry(key).or_insert_with(|| KeyIntent {
            policy: op.policy,
            objects: BTreeSet::new(),
        });
        if !op.kind.is_delete() {
            if let Some(object) = &op.object {
                intent.objects.insert(object.clone().canonical());
            }
        }
    }

    let mut result = Reconciliation::default();

    for subject in &entities {
        if reader.is_referenced(subject).await? {
            tracing::debug!(subject = %subject, "entity still referenced; deletion blocked");
            result.conflicts.push(subject.clone());
            continue;
        }
        let outgoing = reader.outgoing(subject).await?;
        tracing::debug!(subject = %subject, statements = outgoing.len(), "entity deletion");
        for st in outgoing {
            result.diff.retract(st);
        }
    }

    for (key, intent) in &intents {
        // The entity's retractions already cover whatever is stored here.
        let current = if entities.contains(&key.subject) {
            BTreeSet::new()
        } else {
            reader
                .current_objects(&key.subject, &key.predicate)
                .await?
                .into_iter()
                .map(Term::canonical)
                .collect()
        };
        let (retract, assert) = reconcile_key(intent.policy, &current, &intent.objects);
        tracing::debug!(
            key = %key,
            policy = ?intent.policy,
            current = current.len(),
            intended = intent.objects.len(),
            retract = retract.len(),
            assert = assert.len(),
            "reconciled key"
        );
        result.diff.retract_all(key, retract);
        result.diff.assert_all(key, assert);
    }

    result.diff.normalize();
    tracing::info!(
        operations = batch.len(),
        keys = intents.len(),
        entities = entities.len(),
        retract = result.diff.retract_count(),
        assert = result.diff.assert_count(),
        conflicts = result.conflicts.len(),
        "batch reconciled"
    );
    Ok(result)
}
