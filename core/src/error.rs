//! Error types for the clinic API client.
//!
//! # Design
//! An expired access token that is recovered by a refresh never shows up
//! here; `AuthFailed` is what remains when the refresh is missing or
//! rejected. `NotFound` gets a dedicated variant because the dashboard
//! treats "no current patient" as an empty state rather than a failure. All
//! other non-2xx responses land in `Server` with the raw status and body so
//! the server's message can be surfaced to the user.

use thiserror::Error;

use crate::form::ValidationErrors;
use crate::session::StoreError;
use crate::transport::TransportError;

/// Errors returned by `PatientClient` parse methods and `ClinicApi` calls.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Input rejected by the client-side schema; no request was sent.
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationErrors),

    /// The server answered 401 and the session could not be refreshed.
    #[error("authentication failed (HTTP {status})")]
    AuthFailed { status: u16, body: String },

    /// The server returned 404.
    #[error("resource not found")]
    NotFound { body: String },

    /// The server returned a non-success status other than 401 and 404.
    #[error("HTTP {status}: {body}")]
    Server { status: u16, body: String },

    /// No response was received.
    #[error("network error: {0}")]
    Network(#[from] TransportError),

    /// The response body could not be deserialized into the expected type.
    #[error("deserialization failed: {0}")]
    Deserialization(String),

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// Tokens could not be written to the session store.
    #[error("session store: {0}")]
    Store(#[from] StoreError),
}

impl ApiError {
    /// Short message suitable for display.
    ///
    /// Reads the string field `key` from a JSON error body when the server
    /// supplied one, otherwise returns `fallback`. Validation failures yield
    /// their first field message.
    pub fn user_message(&self, key: &str, fallback: &str) -> String {
        match self {
            ApiError::Validation(errors) => errors
                .first_message()
                .map(str::to_string)
                .unwrap_or_else(|| fallback.to_string()),
            ApiError::AuthFailed { body, .. }
            | ApiError::NotFound { body }
            | ApiError::Server { body, .. } => {
                server_message(body, key).unwrap_or_else(|| fallback.to_string())
            }
            _ => fallback.to_string(),
        }
    }

    /// HTTP status of the failed response, when there was one.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::AuthFailed { status, .. } | ApiError::Server { status, .. } => Some(*status),
            ApiError::NotFound { .. } => Some(404),
            _ => None,
        }
    }
}

fn server_message(body: &str, key: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    value
        .get(key)
        .and_then(serde_json::Value::as_str)
        .filter(|message| !message.is_empty())
        .map(str::to_string)
}
