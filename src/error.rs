//! Error taxonomy for the knowledge-source workflow.
//!
//! Every failure a page session can observe falls into one of these
//! variants. None of them escape the page controller: [`crate::page`]
//! turns each into a notification and hands the value back to the caller.

use thiserror::Error;

/// Errors produced by binding, ingestion, and redirect operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KbError {
    /// Input rejected before any network call (empty URL, no file, busy modal).
    #[error("{0}")]
    Validation(String),

    /// The backend answered with a non-200 application code.
    #[error("backend rejected the request: {0}")]
    BackendRejected(String),

    /// Transport failure: unreachable host, broken connection, or a body
    /// that could not be decoded.
    #[error("network error: {0}")]
    Network(String),

    /// The index-lookup endpoint reported failure for the bound identifier.
    #[error("vector index `{index}` is not available: {reason}")]
    IndexInvalid {
        /// Identifier that failed validation.
        index: String,
        /// Backend message or transport failure text.
        reason: String,
    },

    /// A bind-and-reload was requested while the location already carries
    /// an index identifier.
    #[error("location already carries index `{0}`; refusing to redirect again")]
    AlreadyBound(String),
}

impl KbError {
    pub fn validation(message: impl Into<String>) -> Self {
        KbError::Validation(message.into())
    }

    /// Builds a [`KbError::BackendRejected`] from an optional server message.
    pub fn rejected(message: Option<String>) -> Self {
        KbError::BackendRejected(
            message
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| "unknown error".to_string()),
        )
    }
}

impl From<reqwest::Error> for KbError {
    fn from(err: reqwest::Error) -> Self {
        KbError::Network(err.to_string())
    }
}
