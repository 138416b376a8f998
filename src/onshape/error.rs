//! Error types for Onshape REST API calls.

use thiserror::Error;

/// Result type for Onshape API operations.
pub type OnshapeResult<T> = Result<T, OnshapeError>;

/// Longest response body kept in an [`OnshapeError::Http`] message.
const MAX_BODY_LEN: usize = 200;

/// Errors that can occur while talking to the Onshape API.
#[derive(Debug, Error)]
pub enum OnshapeError {
    /// The HTTP client could not be constructed.
    #[error("Failed to build HTTP client")]
    ClientBuild {
        /// Underlying reqwest error.
        #[source]
        source: reqwest::Error,
    },

    /// The configured base URL cannot be used to build request URLs.
    #[error("Invalid Onshape base URL: {url}")]
    InvalidBaseUrl {
        /// The offending URL.
        url: String,
    },

    /// The request could not be sent or the response could not be read.
    #[error("Request to {path} failed")]
    Request {
        /// API path that was requested.
        path: String,
        /// Underlying reqwest error.
        #[source]
        source: reqwest::Error,
    },

    /// The API answered with a non-success status code.
    #[error("HTTP {status} from {path}: {body}")]
    Http {
        /// HTTP status code.
        status: u16,
        /// API path that was requested.
        path: String,
        /// Start of the response body.
        body: String,
    },

    /// The response body was not the expected JSON shape.
    #[error("Unexpected response from {path}")]
    Decode {
        /// API path that was requested.
        path: String,
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },
}

impl OnshapeError {
    /// Creates an HTTP status error, truncating long bodies.
    pub fn http(status: u16, path: impl Into<String>, body: &str) -> Self {
        let body = match body.char_indices().nth(MAX_BODY_LEN) {
            Some((cut, _)) => format!("{}...", &body[..cut]),
            None => body.to_string(),
        };
        Self::Http {
            status,
            path: path.into(),
            body,
        }
    }

    /// Returns the HTTP status code, if this error carries one.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}
