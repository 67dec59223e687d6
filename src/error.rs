use thiserror::Error;

use crate::types::{Sort, StmtId};

/// Errors surfaced to callers of the analysis.
///
/// Violations of internal invariants (no applicable rule, a rule producing the
/// wrong number of states) are bugs and panic instead.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("symbol `{0}` is not registered")]
    SymbolNotFound(String),

    #[error("function symbol `{0}` is not registered")]
    FunctionNotFound(String),

    #[error("function `{name}` of theory `{theory}` clashes with an existing symbol")]
    FunctionNameClash { name: String, theory: String },

    #[error("storage bits must be in the range 0..=31, got {0}")]
    InvalidStorageBits(usize),

    #[error("symbol `{name}` has sort {existing}, cannot re-register it as {requested}")]
    SortMismatch {
        name: String,
        existing: Sort,
        requested: Sort,
    },

    #[error("method `{signature}` not found in class `{class}`")]
    MethodNotFound { class: String, signature: String },

    #[error("method body is empty")]
    EmptyBody,

    #[error("statement {stmt} jumps to {target}, outside the method body")]
    InvalidJumpTarget { stmt: StmtId, target: StmtId },

    #[error("statement {stmt} uses undeclared local `{name}`")]
    UndeclaredLocal { stmt: StmtId, name: String },

    #[error("statement {stmt} falls off the end of the method body")]
    MissingTerminator { stmt: StmtId },

    #[error("statement {stmt} returns a value inconsistent with the method return type")]
    ReturnMismatch { stmt: StmtId },
}

pub type Result<T> = std::result::Result<T, Error>;
