//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` variants into user-facing errors with
//! actionable help text, and each error into a process exit code.

use miette::Diagnostic;
use thiserror::Error;

use vmsync_config::ConfigError;
use vmsync_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
    /// The batch ran, but some items failed.
    pub const PARTIAL_FAILURE: i32 = 9;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not connect to management server at {url}")]
    #[diagnostic(
        code(vmsync::connection_failed),
        help(
            "Check that the server is running and reachable.\n\
             Reason: {reason}\n\
             Self-signed certificate? Try --insecure (-k) or set ca_cert in your profile."
        )
    )]
    ConnectionFailed { url: String, reason: String },

    // ── Authentication ───────────────────────────────────────────────
    #[error("Authentication failed: {message}")]
    #[diagnostic(
        code(vmsync::auth_failed),
        help(
            "Verify the username and password for profile '{profile}'.\n\
             Run: vmsync config set-password --profile {profile}"
        )
    )]
    AuthFailed { profile: String, message: String },

    #[error("No credentials configured for profile '{profile}'")]
    #[diagnostic(
        code(vmsync::no_credentials),
        help(
            "Configure credentials with: vmsync config init\n\
             Or set VMSYNC_USERNAME and VMSYNC_PASSWORD."
        )
    )]
    NoCredentials { profile: String },

    // ── Resolution ───────────────────────────────────────────────────
    #[error("{kind} '{identifier}' not found")]
    #[diagnostic(
        code(vmsync::not_found),
        help("Names are matched exactly. Export the {kind} list to see what exists.")
    )]
    NotFound { kind: String, identifier: String },

    // ── Server-side failures ─────────────────────────────────────────
    #[error("{message}")]
    #[diagnostic(code(vmsync::task_failed))]
    TaskFailed { message: String },

    #[error("{message}")]
    #[diagnostic(code(vmsync::api_error))]
    ApiError { message: String },

    #[error("Batch aborted at {id}: {reason}")]
    #[diagnostic(
        code(vmsync::batch_aborted),
        help(
            "Rows listed as updated above were applied; the rest were not.\n\
             Re-run with --on-error skip to continue past failures."
        )
    )]
    BatchAborted { id: String, reason: String },

    #[error("{failed} of {total} {what} failed")]
    #[diagnostic(
        code(vmsync::partial_failure),
        help("See the report above for the failed items. Use -v for details.")
    )]
    PartialFailure {
        what: String,
        failed: usize,
        total: usize,
    },

    // ── Timeout ──────────────────────────────────────────────────────
    #[error("{message}")]
    #[diagnostic(
        code(vmsync::timeout),
        help("Increase --timeout or the task timeouts in the [defaults] section.")
    )]
    Timeout { message: String },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(vmsync::validation))]
    Validation { field: String, reason: String },

    #[error("Could not read {path}")]
    #[diagnostic(
        code(vmsync::csv),
        help("The header row must match a file written by `vmsync export` for the same kind.")
    )]
    Csv {
        path: String,
        #[source]
        source: csv::Error,
    },

    #[error("Invalid inventory {path}")]
    #[diagnostic(
        code(vmsync::inventory),
        help("The inventory must be a JSON array of hardware units.")
    )]
    Inventory {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(vmsync::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Create one with: vmsync config init"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error("No management server configured")]
    #[diagnostic(
        code(vmsync::no_config),
        help(
            "Create a profile with: vmsync config init\n\
             Or pass --server. Config file expected at: {path}"
        )
    )]
    NoConfig { path: String },

    #[error(transparent)]
    #[diagnostic(code(vmsync::config))]
    Config(Box<ConfigError>),

    // ── Interactive ──────────────────────────────────────────────────
    #[error("Destructive operation '{action}' requires confirmation")]
    #[diagnostic(
        code(vmsync::confirmation_required),
        help("Use --yes (-y) to skip confirmation in non-interactive contexts.")
    )]
    NonInteractiveRequiresYes { action: String },

    // ── IO / Serialization ────────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    #[diagnostic(code(vmsync::json))]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    #[diagnostic(code(vmsync::yaml))]
    Yaml(#[from] serde_yaml::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::AuthFailed { .. } | Self::NoCredentials { .. } => exit_code::AUTH,
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::PartialFailure { .. } => exit_code::PARTIAL_FAILURE,
            Self::Validation { .. }
            | Self::Csv { .. }
            | Self::Inventory { .. }
            | Self::NonInteractiveRequiresYes { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }

    pub fn csv(path: &std::path::Path, source: csv::Error) -> Self {
        Self::Csv {
            path: path.display().to_string(),
            source,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ConnectionFailed { url, reason } => CliError::ConnectionFailed { url, reason },

            CoreError::AuthenticationFailed { message } => CliError::AuthFailed {
                profile: "current".into(),
                message,
            },

            CoreError::NotConnected => CliError::ConnectionFailed {
                url: "(not connected)".into(),
                reason: "the session is not logged in".into(),
            },

            err @ (CoreError::Timeout | CoreError::TaskTimedOut { .. }) => CliError::Timeout {
                message: err.to_string(),
            },

            CoreError::NotFound { kind, identifier } => CliError::NotFound { kind, identifier },

            err @ CoreError::TaskFailed { .. } => CliError::TaskFailed {
                message: err.to_string(),
            },

            CoreError::BatchAborted { id, source, .. } => CliError::BatchAborted {
                id: id.to_string(),
                reason: source.to_string(),
            },

            CoreError::Config { message } => CliError::Validation {
                field: "configuration".into(),
                reason: message,
            },

            err @ (CoreError::Validation { .. }
            | CoreError::Api { .. }
            | CoreError::Internal(_)) => CliError::ApiError {
                message: err.to_string(),
            },
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::NoCredentials { profile } => CliError::NoCredentials { profile },
            ConfigError::UnknownProfile { name } => CliError::ProfileNotFound {
                name,
                available: String::new(),
            },
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            other => CliError::Config(Box::new(other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use vmsync_core::TaskState;

    use super::*;

    #[test]
    fn core_errors_map_to_distinct_exit_codes() {
        let cases = [
            (
                CoreError::ConnectionFailed {
                    url: "https://vms".into(),
                    reason: "refused".into(),
                },
                exit_code::CONNECTION,
            ),
            (
                CoreError::AuthenticationFailed {
                    message: "bad password".into(),
                },
                exit_code::AUTH,
            ),
            (
                CoreError::NotFound {
                    kind: "Recording server".into(),
                    identifier: "R9".into(),
                },
                exit_code::NOT_FOUND,
            ),
            (
                CoreError::TaskTimedOut {
                    operation: "AddHardware".into(),
                    last_state: TaskState::InProgress,
                },
                exit_code::TIMEOUT,
            ),
            (CoreError::Internal("boom".into()), exit_code::GENERAL),
        ];
        for (core, code) in cases {
            assert_eq!(CliError::from(core).exit_code(), code);
        }
    }

    #[test]
    fn missing_credentials_are_an_auth_error() {
        let err = CliError::from(ConfigError::NoCredentials {
            profile: "site-a".into(),
        });
        assert_eq!(err.exit_code(), exit_code::AUTH);
        assert!(err.to_string().contains("site-a"));
    }
}
