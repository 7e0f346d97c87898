//! Error types.
//!
//! None of these are recovered from inside the crate: every failure aborts
//! the current run.

use thiserror::Error;

use crate::types::{ClauseId, Lit};

/// The result of a manager, prover or solver operation.
pub type Result<T> = std::result::Result<T, BddError>;

#[derive(Debug, Error)]
pub enum BddError {
    /// A structural invariant does not hold, e.g. an implication the caller
    /// relied on turned out to be false.
    #[error("BDD invariant violated: {0}")]
    Invariant(String),

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error("literal {lit} is out of range (variables are 1..={max})")]
    LiteralOutOfRange { lit: Lit, max: u32 },

    #[error("proof step not supported by the {format} format: {step}")]
    Unsupported { format: &'static str, step: &'static str },

    #[error("clause {0} is not live in the proof")]
    UnknownClause(ClauseId),

    #[error("proof output failed")]
    Io(#[from] std::io::Error),
}

/// The resolver could not derive a target clause from its candidates.
///
/// This means the caller assembled an inconsistent rule set.
#[derive(Debug, Error)]
#[error("{comment}: cannot derive {target:?} from {candidates:?} ({reason})")]
pub struct ResolveError {
    pub target: Vec<Lit>,
    pub candidates: Vec<ClauseId>,
    pub comment: String,
    pub reason: &'static str,
}

/// Malformed external input (CNF text, variable orders).
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("line {line}: {message}")]
    Syntax { line: usize, message: String },

    #[error("variable order is not a permutation of 1..={n}: {message}")]
    Permutation { n: usize, message: String },

    #[error("cannot read input")]
    Io(#[from] std::io::Error),
}
