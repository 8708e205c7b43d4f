//! Error taxonomy for list screens.
//!
//! [`ApiError`] covers everything on the network path and is always caught at
//! the controller boundary. [`ValidationError`] is client-side and never
//! reaches the network. Stale responses are not errors at all and have no
//! variant here.

use thiserror::Error;

/// A failed request to the backend.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ApiError {
    /// The request could not complete (connection refused, timeout, ...).
    #[error("network error: {0}")]
    Network(String),

    /// A well-formed response reporting `success: false`.
    #[error("request rejected: {}", .message.as_deref().unwrap_or("no message"))]
    Rejected { message: Option<String> },

    /// A non-success HTTP status without an explicit success flag.
    #[error("HTTP {status}: {}", .message.as_deref().unwrap_or("no message"))]
    Status { status: u16, message: Option<String> },

    /// The response body did not match the expected shape.
    #[error("malformed response: {0}")]
    Decode(String),
}

impl ApiError {
    /// Rejection carrying the server's message, if any.
    pub fn rejected(message: Option<String>) -> Self {
        ApiError::Rejected { message }
    }

    /// The server-provided message, when the server said anything.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            ApiError::Rejected { message } | ApiError::Status { message, .. } => {
                message.as_deref().filter(|m| !m.trim().is_empty())
            }
            ApiError::Network(_) | ApiError::Decode(_) => None,
        }
    }

    /// Text to show the user: the server message when present, else `fallback`.
    pub fn user_message(&self, fallback: &str) -> String {
        self.server_message().unwrap_or(fallback).to_string()
    }

    /// Whether the request never produced a response.
    pub fn is_network(&self) -> bool {
        matches!(self, ApiError::Network(_))
    }
}

/// Client-side input problem, shown inline next to the offending field.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("unknown filter field '{0}'")]
    UnknownField(String),

    #[error("'{value}' is not a date (expected YYYY-MM-DD)")]
    InvalidDate { value: String },

    #[error("'{value}' is not one of: {}", .allowed.join(", "))]
    NotAllowed { value: String, allowed: Vec<String> },

    #[error("page size {0} is not offered")]
    PageSize(u32),

    #[error("page numbers start at 1")]
    Page,
}
