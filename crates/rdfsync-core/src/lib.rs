//! Value model for rdfsync.
//!
//! Everything the reconciliation engine reasons about is defined here as an
//! immutable value type: IRIs, RDF terms, statements, buffered mutation
//! intents, the diff produced by reconciliation, and the nested document
//! produced by materialization. This crate performs no I/O.
//!
//! # Modules
//!
//! - [`error`]: CoreError, the validation failure taxonomy
//! - [`term`]: Iri, Literal, Term
//! - [`datatype`]: lexical-form checks for common XSD datatypes
//! - [`vocab`]: rdf/xsd vocabulary constants
//! - [`statement`]: Statement, Key, StatementSet
//! - [`operation`]: Operation, OperationKind, ReconcilePolicy
//! - [`diff`]: Diff and per-key KeyChange
//! - [`document`]: Document and Field (materialized entities)

pub mod datatype;
pub mod diff;
pub mod document;
pub mod error;
pub mod operation;
pub mod statement;
pub mod term;
pub mod vocab;

// Re-export commonly used types
pub use diff::{Diff, KeyChange};
pub use document::{Document, Field};
pub use error::CoreError;
pub use operation::{Operation, OperationId, OperationKind, ReconcilePolicy};
pub use statement::{Key, Statement, StatementSet};
pub use term::{Iri, Literal, Term};
