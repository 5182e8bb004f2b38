//! Errors raised while building a request.

use thiserror::Error;

/// A request could not be built.
///
/// Both variants carry enough context for a caller to report the offending part of the
/// request back to the client.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// The input is not shaped like the query language expects.
    #[error("cannot parse {context}: {reason}")]
    Parse { context: String, reason: String },
    /// The input is well formed but breaks a rule of the query language.
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },
}

impl Error {
    pub fn parse(context: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::Parse {
            context: context.into(),
            reason: reason.into(),
        }
    }

    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }
}
