//! Convergence error types.

use std::time::Duration;

use ovhform_models::OfferQuery;
use thiserror::Error;

/// A failed call to the cloud API, message passed through verbatim.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Failed to call cloud API{}: {message}", .status.map(|s| format!(" ({})", s)).unwrap_or_default())]
pub struct RemoteError {
    /// HTTP status, `None` when the request never got a response
    pub status: Option<u16>,
    pub message: String,
}

impl RemoteError {
    pub fn new(status: u16, message: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            message: message.into(),
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self {
            status: None,
            message: message.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status == Some(404)
    }
}

/// Errors terminating a convergence run.
#[derive(Debug, Error)]
pub enum ConvergeError {
    #[error(transparent)]
    Remote(#[from] RemoteError),

    /// A named resource the operation requires could not be resolved.
    #[error("{kind} {name} not found")]
    NotFound { kind: &'static str, name: String },

    /// The requested state change cannot be performed.
    #[error("invalid transition: {0}")]
    InvalidTransition(String),

    #[error("Failed to find availability for cluster with parameters : {0}")]
    UnmatchedOffer(OfferQuery),

    #[error("timed out after {waited:?} waiting for {what}")]
    Timeout { what: String, waited: Duration },

    /// A field needed for the requested transition is missing or inconsistent.
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("Domain {0} unknown")]
    UnknownDomain(String),

    /// A 2xx response whose body does not have the expected shape.
    #[error("unexpected response from {path}: {source}")]
    MalformedResponse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

impl ConvergeError {
    pub fn not_found(kind: &'static str, name: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            name: name.into(),
        }
    }
}

/// Result type for convergence operations.
pub type Result<T> = std::result::Result<T, ConvergeError>;
