//! CLI configuration -- thin wrapper around `vmsync_config`.
//!
//! Adds resolution that respects `GlobalOpts` flag overrides
//! (--server, --username, --insecure, --timeout, --concurrency).

use vmsync_core::{ConnectionConfig, EngineSettings, FailurePolicy};

use crate::cli::{GlobalOpts, OnError};
use crate::error::CliError;

pub use vmsync_config::{Config, Profile, config_path, load_config_or_default, save_config};

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    global
        .profile
        .clone()
        .unwrap_or_else(|| config.default_profile_name().to_owned())
}

/// Merge the active profile with flag overrides.
///
/// Without a stored profile, `--server` alone is enough to build one;
/// credentials then come from the environment or the keyring.
fn effective_profile(
    global: &GlobalOpts,
    config: &Config,
    name: &str,
) -> Result<Profile, CliError> {
    let mut profile = match config.profiles.get(name) {
        Some(profile) => profile.clone(),
        None if global.server.is_some() => Profile::default(),
        None if global.profile.is_some() => {
            let mut names: Vec<&str> = config.profiles.keys().map(String::as_str).collect();
            names.sort_unstable();
            return Err(CliError::ProfileNotFound {
                name: name.to_owned(),
                available: if names.is_empty() {
                    "(none)".into()
                } else {
                    names.join(", ")
                },
            });
        }
        None => {
            return Err(CliError::NoConfig {
                path: config_path().display().to_string(),
            });
        }
    };

    if let Some(ref server) = global.server {
        profile.server.clone_from(server);
    }
    if let Some(ref username) = global.username {
        profile.username = Some(username.clone());
    }
    if global.insecure {
        profile.insecure = Some(true);
    }
    if let Some(timeout) = global.timeout {
        profile.timeout = Some(timeout);
    }
    Ok(profile)
}

/// Build the `ConnectionConfig` for this invocation.
pub fn resolve_connection(global: &GlobalOpts, config: &Config) -> Result<ConnectionConfig, CliError> {
    let name = active_profile_name(global, config);
    let profile = effective_profile(global, config, &name)?;
    Ok(vmsync_config::profile_to_connection_config(
        &profile,
        &name,
        &config.defaults,
    )?)
}

/// Engine tuning from the `[defaults]` section, with flag overrides.
pub fn engine_settings(
    global: &GlobalOpts,
    config: &Config,
    on_error: Option<OnError>,
) -> Result<EngineSettings, CliError> {
    let mut settings = config.defaults.engine_settings()?;
    if let Some(concurrency) = global.concurrency {
        if concurrency == 0 {
            return Err(CliError::Validation {
                field: "concurrency".into(),
                reason: "must be at least 1".into(),
            });
        }
        settings.concurrency = concurrency;
    }
    match on_error {
        Some(OnError::Abort) => settings.failure_policy = FailurePolicy::Abort,
        Some(OnError::Skip) => settings.failure_policy = FailurePolicy::Skip,
        None => {}
    }
    Ok(settings)
}
