//! SQLite implementation of [`TripleStore`].
//!
//! [`SqliteStore`] keeps one row per statement in a single `statements`
//! table. Every write runs in a transaction, so a combined update is atomic
//! on this backend. Absent datatype and language columns are stored as the
//! empty string so that the composite primary key gives set semantics.
//!
//! Each request runs on tokio's blocking pool, so callers awaiting it can
//! bound it with a timeout and runtime workers never block on SQLite.

use std::sync::Arc;

use parking_lot::Mutex;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row, Transaction};

use async_trait::async_trait;

use rdfsync_core::{Iri, Literal, Statement, StatementSet, Term};

use crate::error::StorageError;
use crate::traits::{TriplePattern, TripleStore};

const KIND_IRI: i64 = 0;
const KIND_LITERAL: i64 = 1;

/// SQLite-backed triple store.
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Opens (or creates) a database at `path`.
    pub fn new(path: &str) -> Result<Self, StorageError> {
        let conn = crate::schema::open_database(path)?;
        tracing::debug!(path, "opened sqlite statement store");
        Ok(SqliteStore {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Opens an in-memory database (for testing).
    pub fn in_memory() -> Result<Self, StorageError> {
        let conn = crate::schema::open_in_memory()?;
        Ok(SqliteStore {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Runs `work` against the connection on the blocking pool.
    async fn blocking<T, F>(&self, work: F) -> Result<T, StorageError>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<T, StorageError> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || work(&mut conn.lock()))
            .await
            .map_err(|e| StorageError::Unavailable {
                reason: format!("sqlite worker failed: {e}"),
            })?
    }

    /// Builds the WHERE clause and bind values for `pattern`.
    fn where_clause(pattern: &TriplePattern) -> (String, Vec<Value>) {
        let mut clauses = Vec::new();
        let mut values = Vec::new();
        if let Some(subject) = &pattern.subject {
            clauses.push("subject = ?");
            values.push(Value::Text(subject.as_str().to_string()));
        }
        if let Some(predicate) = &pattern.predicate {
            clauses.push("predicate = ?");
            values.push(Value::Text(predicate.as_str().to_string()));
        }
        if let Some(object) = &pattern.object {
            let (kind, value, datatype, language) = object_columns(object);
            clauses.push("object_kind = ? AND object = ? AND datatype = ? AND language = ?");
            values.push(Value::Integer(kind));
            values.push(Value::Text(value.to_string()));
            values.push(Value::Text(datatype.to_string()));
            values.push(Value::Text(language.to_string()));
        }
        if clauses.is_empty() {
            (String::new(), values)
        } else {
            (format!(" WHERE {}", clauses.join(" AND ")), values)
        }
    }

    fn delete_in(tx: &Transaction<'_>, statements: &StatementSet) -> Result<usize, StorageError> {
        let mut stmt = tx.prepare_cached(
            "DELETE FROM statements WHERE subject = ?1 AND predicate = ?2
             AND object_kind = ?3 AND object = ?4 AND datatype = ?5 AND language = ?6",
        )?;
        let mut changed = 0;
        for st in statements {
            let (kind, object, datatype, language) = object_columns(&st.object);
            changed += stmt.execute(params![
                st.subject.as_str(),
                st.predicate.as_str(),
                kind,
                object,
                datatype,
                language
            ])?;
        }
        Ok(changed)
    }

    fn insert_in(tx: &Transaction<'_>, statements: &StatementSet) -> Result<usize, StorageError> {
        let mut stmt = tx.prepare_cached(
            "INSERT OR IGNORE INTO statements
             (subject, predicate, object_kind, object, datatype, language)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )?;
        let mut changed = 0;
        for st in statements {
            let (kind, object, datatype, language) = object_columns(&st.object);
            changed += stmt.execute(params![
                st.subject.as_str(),
                st.predicate.as_str(),
                kind,
                object,
                datatype,
                language
            ])?;
        }
        Ok(changed)
    }
}

/// Splits an object term into its column values.
fn object_columns(object: &Term) -> (i64, &str, &str, &str) {
    match object {
        Term::Iri(iri) => (KIND_IRI, iri.as_str(), "", ""),
        Term::Literal(lit) => (
            KIND_LITERAL,
            lit.lexical.as_str(),
            lit.datatype.as_ref().map_or("", Iri::as_str),
            lit.language.as_deref().unwrap_or(""),
        ),
    }
}

/// Raw column values of one row, decoded outside the rusqlite callback.
struct RawRow {
    subject: String,
    predicate: String,
    kind: i64,
    object: String,
    datatype: String,
    language: String,
}

impl RawRow {
    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(RawRow {
            subject: row.get(0)?,
            predicate: row.get(1)?,
            kind: row.get(2)?,
            object: row.get(3)?,
            datatype: row.get(4)?,
            language: row.get(5)?,
        })
    }

    fn into_statement(self) -> Result<Statement, StorageError> {
        let decode = |reason: String| StorageError::Decode { reason };
        let subject = Iri::new(self.subject).map_err(|e| decode(e.to_string()))?;
        let predicate = Iri::new(self.predicate).map_err(|e| decode(e.to_string()))?;
        let object = match self.kind {
            KIND_IRI => Term::Iri(Iri::new(self.object).map_err(|e| decode(e.to_string()))?),
            KIND_LITERAL => {
                let datatype = if self.datatype.is_empty() {
                    None
                } else {
                    Some(Iri::new(self.datatype).map_err(|e| decode(e.to_string()))?)
                };
                let language = (!self.language.is_empty()).then_some(self.language);
                Term::Literal(
                    Literal {
                        lexical: self.object,
                        datatype,
                        language,
                    }
                    .canonical(),
                )
            }
            other => return Err(decode(format!("unknown object kind {other}"))),
        };
        Ok(Statement::new(subject, predicate, object))
    }
}

#[async_trait]
impl TripleStore for SqliteStore {
    async fn select(&self, pattern: &TriplePattern) -> Result<Vec<Statement>, StorageError> {
        let (clause, values) = Self::where_clause(pattern);
        let sql = format!(
            "SELECT subject, predicate, object_kind, object, datatype, language
             FROM statements{clause}
             ORDER BY subject, predicate, object_kind, object"
        );
        let rows = self
            .blocking(move |conn| {
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt
                    .query_map(params_from_iter(values), RawRow::read)?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await?;
        rows.into_iter().map(RawRow::into_statement).collect()
    }

    async fn ask(&self, pattern: &TriplePattern) -> Result<bool, StorageError> {
        let (clause, values) = Self::where_clause(pattern);
        let sql = format!("SELECT EXISTS(SELECT 1 FROM statements{clause})");
        self.blocking(move |conn| {
            let exists: bool = conn.query_row(&sql, params_from_iter(values), |row| row.get(0))?;
            Ok(exists)
        })
        .await
    }

    async fn update(
        &self,
        delete: &StatementSet,
        insert: &StatementSet,
    ) -> Result<(), StorageError> {
        let (delete, insert) = (delete.clone(), insert.clone());
        self.blocking(move |conn| {
            let tx = conn.transaction()?;
            let removed = Self::delete_in(&tx, &delete)?;
            let added = Self::insert_in(&tx, &insert)?;
            tx.commit()?;
            tracing::debug!(removed, added, "sqlite combined update committed");
            Ok(())
        })
        .await
    }

    async fn delete(&self, statements: &StatementSet) -> Result<(), StorageError> {
        let statements = statements.clone();
        self.blocking(move |conn| {
            let tx = conn.transaction()?;
            let removed = Self::delete_in(&tx, &statements)?;
            tx.commit()?;
            tracing::debug!(removed, "sqlite delete committed");
            Ok(())
        })
        .await
    }

    async fn insert(&self, statements: &StatementSet) -> Result<(), StorageError> {
        let statements = statements.clone();
        self.blocking(move |conn| {
            let tx = conn.transaction()?;
            let added = Self::insert_in(&tx, &statements)?;
            tx.commit()?;
            tracing::debug!(added, "sqlite insert committed");
            Ok(())
        })
        .await
    }
}
