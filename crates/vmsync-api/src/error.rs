use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Top-level error type for the `vmsync-api` crate.
///
/// Covers every failure mode of the configuration API surface:
/// authentication, transport, envelope errors, and per-field validation
/// rejections. `vmsync-core` maps these into domain errors.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// Login failed (wrong credentials, account locked, etc.)
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    /// Session has expired (cookie expired or revoked).
    #[error("Session expired -- re-authentication required")]
    SessionExpired,

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// TLS handshake or certificate error.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── Configuration API ───────────────────────────────────────────
    /// Error reported through the `{meta: {rc, msg}}` envelope or a
    /// non-success HTTP status.
    #[error("Configuration API error: {message}")]
    Api {
        message: String,
        status: Option<u16>,
    },

    /// The server refused to persist an item because one or more of its
    /// fields failed validation.
    #[error("Item rejected by server: {}", summarize(.errors))]
    Validation { errors: Vec<FieldError> },

    /// No item exists at the requested path.
    #[error("Item not found: {path}")]
    NotFound { path: String },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },

    /// The envelope carried no payload where one was required.
    #[error("Empty response from {endpoint}")]
    EmptyResponse { endpoint: String },
}

/// A single field-level validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldError {
    pub property: String,
    pub message: String,
}

impl std::fmt::Display for FieldError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.property, self.message)
    }
}

fn summarize(errors: &[FieldError]) -> String {
    if errors.is_empty() {
        return "validation failed".into();
    }
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl Error {
    /// Returns `true` if this error indicates auth has expired
    /// and re-authentication might resolve it.
    pub fn is_auth_expired(&self) -> bool {
        matches!(self, Self::Authentication { .. } | Self::SessionExpired)
    }

    /// Returns `true` if this is a transient error worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::Api {
                status: Some(502..=504),
                ..
            } => true,
            _ => false,
        }
    }

    /// Returns `true` if this is a "not found" error.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound { .. } | Self::Api { status: Some(404), .. } => true,
            Self::Transport(e) => e.status() == Some(reqwest::StatusCode::NOT_FOUND),
            _ => false,
        }
    }

    /// Returns `true` if the server rejected an item's field values.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_message_lists_every_field() {
        let err = Error::Validation {
            errors: vec![
                FieldError {
                    property: "Name".into(),
                    message: "must not be empty".into(),
                },
                FieldError {
                    property: "Address".into(),
                    message: "invalid URI".into(),
                },
            ],
        };
        assert_eq!(
            err.to_string(),
            "Item rejected by server: Name: must not be empty; Address: invalid URI"
        );
        assert!(err.is_validation());
        assert!(!err.is_auth_expired());
    }

    #[test]
    fn gateway_errors_are_transient() {
        let err = Error::Api {
            message: "bad gateway".into(),
            status: Some(502),
        };
        assert!(err.is_transient());
        assert!(!err.is_not_found());
    }
}
