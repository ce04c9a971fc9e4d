//! SPARQL 1.1 encoding for the HTTP transport.
//!
//! Builds query and update strings from patterns and statement sets, and
//! decodes `application/sparql-results+json` responses back into
//! statements. Terms are written in their N-Triples form, which is also
//! valid SPARQL syntax.

use std::collections::HashMap;
use std::fmt::Write as _;

use serde::Deserialize;

use rdfsync_core::{Iri, Literal, Statement, StatementSet, Term};

use crate::error::StorageError;
use crate::traits::TriplePattern;

const SUBJECT_VAR: &str = "s";
const PREDICATE_VAR: &str = "p";
const OBJECT_VAR: &str = "o";

/// Renders the triple pattern of a WHERE clause, using `?s ?p ?o` for
/// unbound positions.
fn pattern_triple(pattern: &TriplePattern) -> String {
    let subject = pattern
        .subject
        .as_ref()
        .map_or_else(|| format!("?{SUBJECT_VAR}"), |s| format!("<{s}>"));
    let predicate = pattern
        .predicate
        .as_ref()
        .map_or_else(|| format!("?{PREDICATE_VAR}"), |p| format!("<{p}>"));
    let object = pattern
        .object
        .as_ref()
        .map_or_else(|| format!("?{OBJECT_VAR}"), Term::to_string);
    format!("{subject} {predicate} {object}")
}

/// `SELECT` query returning one solution per statement matching `pattern`.
pub fn select_query(pattern: &TriplePattern) -> String {
    let mut vars = Vec::new();
    if pattern.subject.is_none() {
        vars.push(format!("?{SUBJECT_VAR}"));
    }
    if pattern.predicate.is_none() {
        vars.push(format!("?{PREDICATE_VAR}"));
    }
    if pattern.object.is_none() {
        vars.push(format!("?{OBJECT_VAR}"));
    }
    let projection = if vars.is_empty() {
        "*".to_string()
    } else {
        vars.join(" ")
    };
    format!("SELECT {projection} WHERE {{ {} }}", pattern_triple(pattern))
}

/// `ASK` query for `pattern`.
pub fn ask_query(pattern: &TriplePattern) -> String {
    format!("ASK {{ {} }}", pattern_triple(pattern))
}

fn data_block(keyword: &str, statements: &StatementSet) -> String {
    let mut out = format!("{keyword} {{\n");
    for st in statements {
        // Writing to a String cannot fail.
        let _ = writeln!(out, "  {st}");
    }
    out.push('}');
    out
}

/// `INSERT DATA` request for `statements`.
pub fn insert_data(statements: &StatementSet) -> String {
    data_block("INSERT DATA", statements)
}

/// `DELETE DATA` request for `statements`.
pub fn delete_data(statements: &StatementSet) -> String {
    data_block("DELETE DATA", statements)
}

/// One update request carrying both halves, `DELETE DATA` first.
///
/// Empty halves are omitted. Returns `None` when both are empty.
pub fn combined_update(delete: &StatementSet, insert: &StatementSet) -> Option<String> {
    let mut parts = Vec::new();
    if !delete.is_empty() {
        parts.push(delete_data(delete));
    }
    if !insert.is_empty() {
        parts.push(insert_data(insert));
    }
    if parts.is_empty() {
        None
    } else {
        Some(parts.join(" ;\n"))
    }
}

// ---------------------------------------------------------------------------
// Result parsing
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct SelectResponse {
    results: SelectResults,
}

#[derive(Debug, Deserialize)]
struct SelectResults {
    bindings: Vec<HashMap<String, BoundTerm>>,
}

#[derive(Debug, Deserialize)]
struct AskResponse {
    boolean: bool,
}

#[derive(Debug, Deserialize)]
struct BoundTerm {
    #[serde(rename = "type")]
    kind: String,
    value: String,
    #[serde(default)]
    datatype: Option<String>,
    #[serde(default, rename = "xml:lang", alias = "lang")]
    language: Option<String>,
}

fn decode_err(reason: impl Into<String>) -> StorageError {
    StorageError::Decode {
        reason: reason.into(),
    }
}

impl BoundTerm {
    /// Returns `Ok(None)` for blank nodes, which the engine cannot address.
    fn into_term(self) -> Result<Option<Term>, StorageError> {
        match self.kind.as_str() {
            "uri" => Iri::new(self.value)
                .map(|iri| Some(Term::Iri(iri)))
                .map_err(|e| decode_err(e.to_string())),
            "literal" | "typed-literal" => {
                let language = self.language.map(|tag| tag.to_ascii_lowercase());
                let datatype = self
                    .datatype
                    .map(|dt| Iri::new(dt).map_err(|e| decode_err(e.to_string())))
                    .transpose()?;
                let literal = Literal {
                    lexical: self.value,
                    datatype,
                    language,
                };
                Ok(Some(Term::Literal(literal.canonical())))
            }
            "bnode" => Ok(None),
            other => Err(decode_err(format!("unknown term type '{other}'"))),
        }
    }
}

fn bound_iri(
    fixed: &Option<Iri>,
    solution: &mut HashMap<String, BoundTerm>,
    var: &str,
) -> Result<Option<Iri>, StorageError> {
    if let Some(iri) = fixed {
        return Ok(Some(iri.clone()));
    }
    let term = solution
        .remove(var)
        .ok_or_else(|| decode_err(format!("solution is missing ?{var}")))?;
    match term.into_term()? {
        Some(Term::Iri(iri)) => Ok(Some(iri)),
        Some(Term::Literal(lit)) => Err(decode_err(format!("literal {lit} bound to ?{var}"))),
        None => Ok(None),
    }
}

/// Decodes a SELECT response produced by [`select_query`] for `pattern`.
///
/// Solutions binding a blank node are skipped.
pub fn parse_select(pattern: &TriplePattern, body: &str) -> Result<Vec<Statement>, StorageError> {
    let response: SelectResponse =
        serde_json::from_str(body).map_err(|e| decode_err(format!("invalid results JSON: {e}")))?;
    let mut statements = Vec::with_capacity(response.results.bindings.len());
    for mut solution in response.results.bindings {
        let subject = bound_iri(&pattern.subject, &mut solution, SUBJECT_VAR)?;
        let predicate = bound_iri(&pattern.predicate, &mut solution, PREDICATE_VAR)?;
        let object = match &pattern.object {
            Some(object) => Some(object.clone()),
            None => solution
                .remove(OBJECT_VAR)
                .ok_or_else(|| decode_err(format!("solution is missing ?{OBJECT_VAR}")))?
                .into_term()?,
        };
        match (subject, predicate, object) {
            (Some(s), Some(p), Some(o)) => statements.push(Statement::new(s, p, o)),
            _ => tracing::warn!("skipping solution with a blank node"),
        }
    }
    Ok(statements)
}

/// Decodes an ASK response.
pub fn parse_ask(body: &str) -> Result<bool, StorageError> {
    let response: AskResponse =
        serde_json::from_str(body).map_err(|e| decode_err(format!("invalid results JSON: {e}")))?;
    Ok(response.boolean)
}
