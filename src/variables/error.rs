//! Errors raised while resolving a single template expression.
//!
//! Apart from `Internal`, every variant is recoverable: the resolver logs it and
//! leaves the offending `{{...}}` placeholder in the output untouched.

use thiserror::Error;

/// Errors that can occur during variable resolution
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VarError {
    /// Variable is not defined in any namespace
    #[error("undefined variable: {0}")]
    UndefinedVariable(String),

    /// Expression or function arguments are malformed
    #[error("invalid syntax: {0}")]
    InvalidSyntax(String),

    /// Time offset could not be parsed or applied
    #[error("invalid offset: {0}")]
    InvalidOffset(String),

    /// Process environment variable is not set
    #[error("environment variable not found: {0}")]
    EnvVarNotFound(String),

    /// `.env` file is missing, unreadable or lacks the key
    #[error("dotenv error: {0}")]
    DotenvError(String),

    /// No response has been registered under this request name
    #[error("no response registered for request '{0}'")]
    RequestNotFound(String),

    /// Captured response lacks the requested header
    #[error("header '{0}' not found in response")]
    HeaderNotFound(String),

    /// JSON path could not be located in the captured body
    #[error("JSON path error: {0}")]
    JsonPath(String),

    /// Prompt collaborator is missing or failed
    #[error("prompt error: {0}")]
    Prompt(String),

    /// Nested resolution went deeper than the recursion guard allows
    #[error("recursion limit exceeded while resolving '{0}'")]
    RecursionLimit(String),

    /// Defect inside the engine itself; the only variant that escapes `process`
    #[error("internal error: {0}")]
    Internal(String),
}

impl VarError {
    /// Whether the error should abort the whole resolution pass.
    pub fn is_fatal(&self) -> bool {
        matches!(self, VarError::Internal(_))
    }
}
