//! Property tests: after a flush, every touched key holds exactly what its
//! policy promises.

use std::collections::BTreeSet;
use std::sync::Arc;

use proptest::prelude::*;

use rdfsync_core::{Iri, ReconcilePolicy, Statement, Term};
use rdfsync_engine::{ApplyStrategy, EngineConfig, Session, StoreReader};
use rdfsync_storage::InMemoryStore;

const SUBJECT: &str = "http://example.org/e1";
const PREDICATE: &str = "http://example.org/tag";

fn values() -> impl Strategy<Value = BTreeSet<String>> {
    prop::collection::btree_set("[a-f]", 0..5)
}

fn policy() -> impl Strategy<Value = ReconcilePolicy> {
    prop_oneof![
        Just(ReconcilePolicy::ReplaceAll),
        Just(ReconcilePolicy::ReplaceIfDifferent),
        Just(ReconcilePolicy::AppendIfAbsent),
    ]
}

fn strategy() -> impl Strategy<Value = ApplyStrategy> {
    prop_oneof![Just(ApplyStrategy::AtomicCombined), Just(ApplyStrategy::TwoPhase)]
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

fn seeded(current: &BTreeSet<String>) -> Arc<InMemoryStore> {
    let subject = Iri::new(SUBJECT).unwrap();
    let predicate = Iri::new(PREDICATE).unwrap();
    Arc::new(InMemoryStore::with_statements(current.iter().map(|v| {
        Statement::new(subject.clone(), predicate.clone(), Term::literal(v.as_str()))
    })))
}

fn terms(values: &BTreeSet<String>) -> BTreeSet<Term> {
    values.iter().map(|v| Term::literal(v.as_str())).collect()
}

async fn stored(session: &Session<InMemoryStore>) -> BTreeSet<Term> {
    StoreReader::new(session.pool())
        .current_objects(&Iri::new(SUBJECT).unwrap(), &Iri::new(PREDICATE).unwrap())
        .await
        .unwrap()
}

fn record_all(
    session: &Session<InMemoryStore>,
    intended: &BTreeSet<String>,
    policy: ReconcilePolicy,
) {
    for value in intended {
        session
            .record_save(SUBJECT, PREDICATE, value, None, policy)
            .unwrap();
    }
}

proptest! {
    #[test]
    fn flush_reaches_policy_target(
        current in values(),
        intended in values(),
        policy in policy(),
        apply in strategy(),
    ) {
        let rt = runtime();
        let store = seeded(&current);
        let config = EngineConfig { apply_strategy: apply, ..EngineConfig::default() };
        let session = Session::new(Arc::clone(&store), &config);

        record_all(&session, &intended, policy);
        let report = rt.block_on(session.flush(None)).unwrap();
        prop_assert!(report.diff.retractions().is_disjoint(&report.diff.assertions()));

        let after = rt.block_on(stored(&session));
        let expected = match policy {
            // An empty batch records nothing, so the key is left alone.
            _ if intended.is_empty() => terms(&current),
            ReconcilePolicy::ReplaceAll | ReconcilePolicy::ReplaceIfDifferent => terms(&intended),
            ReconcilePolicy::AppendIfAbsent => terms(&current.union(&intended).cloned().collect()),
            ReconcilePolicy::DeleteKey => BTreeSet::new(),
        };
        prop_assert_eq!(after, expected);
    }

    #[test]
    fn second_flush_is_a_noop(
        current in values(),
        intended in values(),
        policy in prop_oneof![
            Just(ReconcilePolicy::ReplaceIfDifferent),
            Just(ReconcilePolicy::AppendIfAbsent),
        ],
    ) {
        let rt = runtime();
        let store = seeded(&current);
        let session = Session::new(Arc::clone(&store), &EngineConfig::default());

        record_all(&session, &intended, policy);
        rt.block_on(session.flush(None)).unwrap();
        let mutations = store.mutation_count();
        let len = store.len();

        record_all(&session, &intended, policy);
        let report = rt.block_on(session.flush(None)).unwrap();
        prop_assert!(report.diff.is_empty());
        prop_assert_eq!(store.mutation_count(), mutations);
        prop_assert_eq!(store.len(), len);
    }

    #[test]
    fn delete_key_empties_the_key(current in values()) {
        let rt = runtime();
        let store = seeded(&current);
        let session = Session::new(Arc::clone(&store), &EngineConfig::default());

        session.record_delete(SUBJECT, PREDICATE, ReconcilePolicy::DeleteKey).unwrap();
        let report = rt.block_on(session.flush(None)).unwrap();
        prop_assert_eq!(report.diff.retract_count(), current.len());
        prop_assert!(store.is_empty());
    }
}
