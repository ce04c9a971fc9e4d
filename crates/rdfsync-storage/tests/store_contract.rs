//! Behaviour every local backend must share, run against both the in-memory
//! and the SQLite store.

use std::sync::Arc;
use std::time::Duration;

use rdfsync_core::{Iri, Statement, StatementSet, Term};
use rdfsync_storage::{
    ConnectionPool, InMemoryStore, PoolConfig, SqliteStore, StorageError, StoreCall, TriplePattern,
    TripleStore,
};

fn iri(s: &str) -> Iri {
    Iri::new(format!("http://example.org/{s}")).unwrap()
}

fn st(s: &str, p: &str, o: impl Into<Term>) -> Statement {
    Statement::new(iri(s), iri(p), o)
}

async fn check_contract(store: &dyn TripleStore) {
    let seed = StatementSet::from([
        st("e1", "name", Term::literal("Alice")),
        st("e1", "nick", Term::literal("Al")),
        st("e1", "knows", iri("e2")),
        st("e2", "name", Term::literal("Bob")),
    ]);
    store.insert(&seed).await.unwrap();

    // Set semantics: re-inserting is a no-op.
    store.insert(&seed).await.unwrap();
    assert_eq!(store.select(&TriplePattern::any()).await.unwrap().len(), 4);

    let e1 = store.select(&TriplePattern::subject(&iri("e1"))).await.unwrap();
    assert_eq!(e1.len(), 3);

    assert!(store
        .ask(&TriplePattern::object(Term::Iri(iri("e2"))))
        .await
        .unwrap());
    assert!(!store
        .ask(&TriplePattern::object(Term::Iri(iri("e1"))))
        .await
        .unwrap());

    // Deleting something absent is ignored.
    store
        .delete(&StatementSet::from([st("e9", "name", Term::literal("Nobody"))]))
        .await
        .unwrap();

    store
        .update(
            &StatementSet::from([st("e1", "name", Term::literal("Alice"))]),
            &StatementSet::from([st("e1", "name", Term::literal("Alicia"))]),
        )
        .await
        .unwrap();
    let names = store
        .select(&TriplePattern::key(&iri("e1"), &iri("name")))
        .await
        .unwrap();
    assert_eq!(names, vec![st("e1", "name", Term::literal("Alicia"))]);

    store
        .delete(&StatementSet::from([st("e1", "knows", iri("e2"))]))
        .await
        .unwrap();
    assert!(!store
        .ask(&TriplePattern::object(Term::Iri(iri("e2"))))
        .await
        .unwrap());
}

#[tokio::test]
async fn test_in_memory_contract() {
    check_contract(&InMemoryStore::new()).await;
}

#[tokio::test]
async fn test_sqlite_contract() {
    check_contract(&SqliteStore::in_memory().unwrap()).await;
}

#[tokio::test]
async fn test_sqlite_file_contract() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("contract.db");
    let store = SqliteStore::new(path.to_str().unwrap()).unwrap();
    check_contract(&store).await;
}

#[tokio::test]
async fn test_pool_over_trait_object() {
    let store: Arc<dyn TripleStore> = Arc::new(InMemoryStore::new());
    let pool = ConnectionPool::from_arc(store, PoolConfig::default());

    let conn = pool.acquire().await.unwrap();
    conn.insert(&StatementSet::from([st("e1", "name", Term::literal("Alice"))]))
        .await
        .unwrap();
    drop(conn);

    let conn = pool.acquire().await.unwrap();
    assert!(conn.ask(&TriplePattern::subject(&iri("e1"))).await.unwrap());
}

#[tokio::test]
async fn test_pool_bounds_concurrency() {
    let store = InMemoryStore::new().with_latency(Duration::from_millis(100));
    let pool = Arc::new(ConnectionPool::new(
        store,
        PoolConfig {
            max_connections: 2,
            acquire_timeout: Duration::from_millis(20),
            request_timeout: Duration::from_secs(1),
        },
    ));

    let mut handles = Vec::new();
    for _ in 0..4 {
        let pool = Arc::clone(&pool);
        handles.push(tokio::spawn(async move {
            let conn = pool.acquire().await?;
            conn.ask(&TriplePattern::any()).await
        }));
    }

    let mut exhausted = 0;
    let mut served = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => served += 1,
            Err(StorageError::PoolExhausted { .. }) => exhausted += 1,
            Err(other) => panic!("unexpected error: {other}"),
        }
    }
    assert_eq!(served, 2);
    assert_eq!(exhausted, 2);
    assert_eq!(pool.available(), 2);
}

#[tokio::test]
async fn test_failure_injection_through_pool() {
    let pool = ConnectionPool::new(InMemoryStore::new(), PoolConfig::default());
    pool.store().fail_next(
        StoreCall::Update,
        StorageError::Unavailable {
            reason: "maintenance".into(),
        },
    );

    let conn = pool.acquire().await.unwrap();
    let err = conn
        .update(&StatementSet::new(), &StatementSet::new())
        .await
        .unwrap_err();
    assert!(err.is_transient());
    assert_eq!(pool.store().mutation_count(), 0);
}
