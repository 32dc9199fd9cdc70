// ── Runtime connection configuration ──
//
// These types describe how to reach a management server and how hard to
// drive it. They carry credential data and engine tuning but never touch
// disk: the CLI builds them from profiles and flags and hands them in.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;
use url::Url;

use crate::poller::{ADD_HARDWARE_TIMEOUT, DEFAULT_POLL_INTERVAL, SHORT_TASK_TIMEOUT, TaskPoller};
use crate::reconcile::FailurePolicy;

/// How to authenticate with the management server.
#[derive(Debug, Clone)]
pub enum AuthCredentials {
    /// Basic user/password login, answered with a session cookie.
    Credentials {
        username: String,
        password: SecretString,
    },
}

/// TLS verification strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store (strict).
    #[default]
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(PathBuf),
    /// Skip verification (self-signed certs).
    DangerAcceptInvalid,
}

/// Configuration for connecting to one management server.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Server URL (e.g., `https://vms.example.com`).
    pub url: Url,
    pub auth: AuthCredentials,
    pub tls: TlsVerification,
    /// Per-request timeout.
    pub timeout: Duration,
}

/// Engine tuning shared by every batch operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineSettings {
    /// Maximum number of records or scopes processed at once.
    pub concurrency: usize,
    pub poll_interval: Duration,
    pub add_hardware_timeout: Duration,
    pub short_task_timeout: Duration,
    pub failure_policy: FailurePolicy,
}

pub const DEFAULT_CONCURRENCY: usize = 8;

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            poll_interval: DEFAULT_POLL_INTERVAL,
            add_hardware_timeout: ADD_HARDWARE_TIMEOUT,
            short_task_timeout: SHORT_TASK_TIMEOUT,
            failure_policy: FailurePolicy::default(),
        }
    }
}

impl EngineSettings {
    pub fn add_hardware_poller(&self) -> TaskPoller {
        TaskPoller::new(self.poll_interval, self.add_hardware_timeout)
    }

    pub fn short_task_poller(&self) -> TaskPoller {
        TaskPoller::new(self.poll_interval, self.short_task_timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_pollers_match_task_ceilings() {
        let settings = EngineSettings::default();
        assert_eq!(settings.add_hardware_poller(), TaskPoller::add_hardware());
        assert_eq!(settings.short_task_poller(), TaskPoller::short());
        assert_eq!(settings.failure_policy, FailurePolicy::Abort);
    }
}
