// ── Core error types ──
//
// User-facing errors from vmsync-core. These are NOT API-specific:
// consumers never see HTTP status codes or JSON parse failures directly.
// The `From<vmsync_api::Error>` impl translates transport-layer errors
// into domain-appropriate variants.

use thiserror::Error;
use vmsync_api::FieldError;

use crate::model::{EntityId, TaskState};
use crate::report::ReconcileReport;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot connect to management server at {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    #[error("Not connected to a management server")]
    NotConnected,

    #[error("Request timed out")]
    Timeout,

    // ── Data errors ──────────────────────────────────────────────────
    #[error("{kind} not found: {identifier}")]
    NotFound { kind: String, identifier: String },

    /// The server refused to save an item because of invalid field values.
    /// Reconciliation treats this as a per-record condition, not a failure.
    #[error("Invalid fields on {item}: {}", list_fields(.fields))]
    Validation {
        item: String,
        fields: Vec<FieldError>,
    },

    // ── Task errors ──────────────────────────────────────────────────
    #[error("Task {operation} failed: {message}")]
    TaskFailed { operation: String, message: String },

    #[error("Task {operation} did not finish in time (last state: {last_state})")]
    TaskTimedOut {
        operation: String,
        last_state: TaskState,
    },

    // ── Batch errors ─────────────────────────────────────────────────
    /// A systemic failure stopped a reconciliation batch. The report holds
    /// everything that completed before the abort.
    #[error("Batch aborted while updating {id}: {source}")]
    BatchAborted {
        id: EntityId,
        source: Box<CoreError>,
        report: Box<ReconcileReport>,
    },

    // ── API errors (wrapped, not exposed raw) ────────────────────────
    #[error("API error: {message}")]
    Api {
        message: String,
        /// HTTP status code (if applicable).
        status: Option<u16>,
    },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

fn list_fields(fields: &[FieldError]) -> String {
    fields
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl CoreError {
    /// Field-level rejection of a single item.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<vmsync_api::Error> for CoreError {
    fn from(err: vmsync_api::Error) -> Self {
        match err {
            vmsync_api::Error::Authentication { message } => {
                CoreError::AuthenticationFailed { message }
            }
            vmsync_api::Error::SessionExpired => CoreError::AuthenticationFailed {
                message: "Session expired -- re-authentication required".into(),
            },
            vmsync_api::Error::Transport(ref e) => {
                if e.is_timeout() {
                    CoreError::Timeout
                } else if e.is_connect() {
                    CoreError::ConnectionFailed {
                        url: e
                            .url()
                            .map_or_else(|| "<unknown>".into(), ToString::to_string),
                        reason: e.to_string(),
                    }
                } else {
                    CoreError::Api {
                        message: e.to_string(),
                        status: e.status().map(|s| s.as_u16()),
                    }
                }
            }
            vmsync_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            vmsync_api::Error::Tls(msg) => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("TLS error: {msg}"),
            },
            vmsync_api::Error::Api { message, status } => CoreError::Api { message, status },
            vmsync_api::Error::Validation { errors } => CoreError::Validation {
                item: "item".into(),
                fields: errors,
            },
            vmsync_api::Error::NotFound { path } => CoreError::NotFound {
                kind: "Item".into(),
                identifier: path,
            },
            vmsync_api::Error::Deserialization { message, body: _ } => {
                CoreError::Internal(format!("Deserialization error: {message}"))
            }
            vmsync_api::Error::EmptyResponse { endpoint } => {
                CoreError::Internal(format!("Empty response from {endpoint}"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_survives_translation() {
        let api = vmsync_api::Error::Validation {
            errors: vec![FieldError {
                property: "Name".into(),
                message: "too long".into(),
            }],
        };
        let core = CoreError::from(api);
        assert!(core.is_validation());
        assert_eq!(core.to_string(), "Invalid fields on item: Name: too long");
    }

    #[test]
    fn not_found_keeps_path() {
        let core = CoreError::from(vmsync_api::Error::NotFound {
            path: "/Camera[x]".into(),
        });
        assert!(core.is_not_found());
        assert_eq!(core.to_string(), "Item not found: /Camera[x]");
    }
}
