//! Errors for request translation.

use query_engine_dsl::dsl;
use thiserror::Error;

/// A request could not be translated.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// The request breaks a rule of the query language.
    #[error("invalid request: {0}")]
    Request(#[from] dsl::error::Error),
    /// The request is valid but has no representation on the document store.
    #[error("cannot translate {0}")]
    Untranslatable(String),
}

/// The host code misused a compiled request. This is a bug in the caller, not in the request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProgrammerError {
    #[error("step {index} requested but the request has {nb_queries} steps")]
    StepOutOfBounds { index: usize, nb_queries: usize },
}
