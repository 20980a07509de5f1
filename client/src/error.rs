//! Closed error taxonomy for every fallible client operation.
//!
//! ERROR HANDLING
//! ==============
//! Backend payloads are discriminated once, at the HTTP boundary, into one of
//! four kinds. UI-facing layers only ever see [`ClientError::user_message`],
//! never a raw transport or serde error.

#[cfg(test)]
#[path = "error_test.rs"]
mod error_test;

/// Generic message shown for anything that is not a structured API error.
pub const GENERIC_ERROR_MESSAGE: &str = "An error occurred";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Validation,
    Api,
    Network,
    AuthExpired,
}

/// Errors produced by client operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClientError {
    /// A client-side form or field check failed; nothing was sent.
    #[error("{field}: {message}")]
    Validation { field: String, message: String },

    /// The backend answered with a non-success status or an unreadable body.
    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    /// The request never completed.
    #[error("network error: {0}")]
    Network(String),

    /// The token is expired locally or was rejected by the backend.
    #[error("session expired")]
    AuthExpired,
}

impl ClientError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation { .. } => ErrorKind::Validation,
            Self::Api { .. } => ErrorKind::Api,
            Self::Network(_) => ErrorKind::Network,
            Self::AuthExpired => ErrorKind::AuthExpired,
        }
    }

    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Message safe to show in a data view: API errors keep the server's
    /// message, everything else collapses to [`GENERIC_ERROR_MESSAGE`].
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Api { message, .. } if !message.trim().is_empty() => message.clone(),
            Self::Validation { message, .. } => message.clone(),
            _ => GENERIC_ERROR_MESSAGE.to_owned(),
        }
    }

    /// True when the backend or local clock says the credentials are no good.
    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::AuthExpired | Self::Api { status: 401 | 403, .. })
    }

    pub(crate) fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation { field: field.into(), message: message.into() }
    }

    /// A 2xx response whose body did not match the expected schema.
    pub(crate) fn invalid_body(err: impl std::fmt::Display) -> Self {
        Self::Api { status: 200, message: format!("invalid response body: {err}") }
    }
}

/// Transport failures from [`ApiClient`](crate::ApiClient) requests.
impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            return Self::Api { status: status.as_u16(), message: err.to_string() };
        }
        if err.is_decode() {
            return Self::invalid_body(err);
        }
        Self::Network(err.to_string())
    }
}
