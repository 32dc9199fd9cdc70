// ── Credential resolution ──
//
// Legacy inventories carry device credentials as an opaque encoded blob.
// A pluggable decoder turns the blob into `user:password` text; the
// resolver then splits it with a fixed policy. Decoding failures never
// abort a migration: the unit falls back to an empty credential.

use std::path::PathBuf;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::CoreError;

/// Username used when a decoded credential cannot be split.
pub const FALLBACK_USERNAME: &str = "root";
/// Password used when a decoded credential cannot be split.
pub const FALLBACK_PASSWORD: &str = "pass";

/// Device login credential.
#[derive(Debug, Clone)]
pub struct BasicCredential {
    pub username: String,
    pub password: SecretString,
}

impl BasicCredential {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: SecretString::from(password.into()),
        }
    }

    pub fn empty() -> Self {
        Self::new("", "")
    }

    pub fn is_empty(&self) -> bool {
        self.username.is_empty() && self.password.expose_secret().is_empty()
    }
}

// ── Decoders ────────────────────────────────────────────────────────

/// Turns an encoded credential blob into plaintext `user:password`.
#[async_trait]
pub trait CredentialDecoder: Send + Sync {
    async fn decode(&self, blob: &str) -> Result<String, CoreError>;
}

/// Blobs stored as hex-encoded UTF-8.
#[derive(Debug, Clone, Copy, Default)]
pub struct HexDecoder;

#[async_trait]
impl CredentialDecoder for HexDecoder {
    async fn decode(&self, blob: &str) -> Result<String, CoreError> {
        let bytes = hex::decode(blob.trim()).map_err(|e| CoreError::Config {
            message: format!("credential blob is not valid hex: {e}"),
        })?;
        String::from_utf8(bytes).map_err(|e| CoreError::Config {
            message: format!("decoded credential is not UTF-8: {e}"),
        })
    }
}

/// Delegates decoding to an external program.
///
/// The blob is passed as the final argument; the program's stdout, minus
/// the trailing newline, is the plaintext.
#[derive(Debug, Clone)]
pub struct CommandDecoder {
    program: PathBuf,
    args: Vec<String>,
}

impl CommandDecoder {
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }
}

#[async_trait]
impl CredentialDecoder for CommandDecoder {
    async fn decode(&self, blob: &str) -> Result<String, CoreError> {
        let output = Command::new(&self.program)
            .args(&self.args)
            .arg(blob)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| CoreError::Config {
                message: format!("failed to run {}: {e}", self.program.display()),
            })?;

        if !output.status.success() {
            return Err(CoreError::Config {
                message: format!(
                    "{} exited with {}: {}",
                    self.program.display(),
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            });
        }

        let text = String::from_utf8(output.stdout).map_err(|e| CoreError::Config {
            message: format!("decoder output is not UTF-8: {e}"),
        })?;
        Ok(text.trim_end_matches(['\r', '\n']).to_owned())
    }
}

// ── Resolver ────────────────────────────────────────────────────────

pub struct CredentialResolver {
    decoder: Box<dyn CredentialDecoder>,
}

impl CredentialResolver {
    pub fn new(decoder: Box<dyn CredentialDecoder>) -> Self {
        Self { decoder }
    }

    /// Decode and split a credential blob.
    ///
    /// An empty blob or a failed decode yields an empty credential.
    pub async fn decrypt(&self, blob: &str) -> BasicCredential {
        if blob.trim().is_empty() {
            return BasicCredential::empty();
        }
        match self.decoder.decode(blob).await {
            Ok(plain) => Self::split(&plain),
            Err(e) => {
                warn!(error = %e, "could not decode credential blob, using empty credential");
                BasicCredential::empty()
            }
        }
    }

    /// Split decoded text: `secret` means user and password are both
    /// `secret`, `user:password` splits once, and anything with more than
    /// one separator falls back to the vendor default login.
    pub fn split(plain: &str) -> BasicCredential {
        if plain.is_empty() {
            return BasicCredential::empty();
        }
        let parts: Vec<&str> = plain.split(':').collect();
        match parts.as_slice() {
            [single] => BasicCredential::new(*single, *single),
            [user, password] => BasicCredential::new(*user, *password),
            _ => {
                debug!(
                    separators = parts.len() - 1,
                    "ambiguous credential, using fallback login"
                );
                BasicCredential::new(FALLBACK_USERNAME, FALLBACK_PASSWORD)
            }
        }
    }
}

impl std::fmt::Debug for CredentialResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialResolver").finish_non_exhaustive()
    }
}
