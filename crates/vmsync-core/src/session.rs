// ── Session lifecycle ──
//
// One authenticated connection to a management server. Every batch
// operation runs against the `ConfigService` a connected session hands
// out; a session that never connected, failed, or was closed hands out
// nothing, so no work can start without a live login.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::{Mutex, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use vmsync_api::transport::{TlsMode, TransportConfig};
use vmsync_api::ConfigClient;

use crate::config::{AuthCredentials, ConnectionConfig, TlsVerification};
use crate::error::CoreError;
use crate::service::{ApiService, ConfigService};

// ── ConnectionState ──────────────────────────────────────────────

/// Connection state observable by consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Failed,
}

// ── Session ──────────────────────────────────────────────────────

/// Cheaply cloneable handle to one server connection.
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    config: ConnectionConfig,
    connection_state: watch::Sender<ConnectionState>,
    cancel: CancellationToken,
    client: Mutex<Option<Arc<ConfigClient>>>,
}

impl Session {
    /// Create a session from configuration. Does NOT connect.
    pub fn new(config: ConnectionConfig) -> Self {
        let (connection_state, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            inner: Arc::new(SessionInner {
                config,
                connection_state,
                cancel: CancellationToken::new(),
                client: Mutex::new(None),
            }),
        }
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.inner.config
    }

    /// Build the HTTP client and log in.
    pub async fn connect(&self) -> Result<(), CoreError> {
        self.inner.connection_state.send_replace(ConnectionState::Connecting);

        match self.login().await {
            Ok(client) => {
                *self.inner.client.lock().await = Some(Arc::new(client));
                self.inner.connection_state.send_replace(ConnectionState::Connected);
                info!(url = %self.inner.config.url, "connected to management server");
                Ok(())
            }
            Err(e) => {
                self.inner.connection_state.send_replace(ConnectionState::Failed);
                Err(e)
            }
        }
    }

    async fn login(&self) -> Result<ConfigClient, CoreError> {
        let config = &self.inner.config;
        let client = ConfigClient::new(config.url.clone(), &build_transport(config))?;

        match &config.auth {
            AuthCredentials::Credentials { username, password } => {
                client
                    .login(username, password)
                    .await
                    .map_err(|e| match CoreError::from(e) {
                        err @ (CoreError::AuthenticationFailed { .. }
                        | CoreError::ConnectionFailed { .. }) => err,
                        other => CoreError::ConnectionFailed {
                            url: config.url.to_string(),
                            reason: other.to_string(),
                        },
                    })?;
                debug!(%username, "session authentication successful");
            }
        }
        Ok(client)
    }

    /// Log out and drop the client. Logout failures are not fatal.
    pub async fn disconnect(&self) {
        self.inner.cancel.cancel();

        if let Some(client) = self.inner.client.lock().await.take() {
            if let Err(e) = client.logout().await {
                warn!(error = %e, "logout failed (non-fatal)");
            }
        }

        self.inner.connection_state.send_replace(ConnectionState::Disconnected);
        debug!("disconnected");
    }

    /// The configuration service of a connected session.
    pub async fn service(&self) -> Result<Arc<dyn ConfigService>, CoreError> {
        let connected = *self.inner.connection_state.borrow() == ConnectionState::Connected;
        if !connected {
            return Err(CoreError::NotConnected);
        }
        let client = self
            .inner
            .client
            .lock()
            .await
            .clone()
            .ok_or(CoreError::NotConnected)?;
        Ok(Arc::new(ApiService::new(client)))
    }

    /// Fires when the session is closed; long waits should stop on it.
    pub fn cancellation(&self) -> CancellationToken {
        self.inner.cancel.clone()
    }

    // ── One-shot convenience ─────────────────────────────────────

    /// Connect, run the closure, and always disconnect afterwards.
    pub async fn oneshot<F, Fut, T>(config: ConnectionConfig, f: F) -> Result<T, CoreError>
    where
        F: FnOnce(Session) -> Fut,
        Fut: Future<Output = Result<T, CoreError>>,
    {
        let session = Session::new(config);
        session.connect().await?;
        let result = f(session.clone()).await;
        session.disconnect().await;
        result
    }

    // ── State observation ────────────────────────────────────────

    /// Subscribe to connection state changes.
    pub fn connection_state(&self) -> watch::Receiver<ConnectionState> {
        self.inner.connection_state.subscribe()
    }
}

// ── Helpers ──────────────────────────────────────────────────────

fn build_transport(config: &ConnectionConfig) -> TransportConfig {
    TransportConfig {
        tls: tls_to_transport(&config.tls),
        timeout: config.timeout,
        cookie_jar: None,
    }
}

fn tls_to_transport(tls: &TlsVerification) -> TlsMode {
    match tls {
        TlsVerification::SystemDefaults => TlsMode::System,
        TlsVerification::CustomCa(path) => TlsMode::CustomCa(path.clone()),
        TlsVerification::DangerAcceptInvalid => TlsMode::DangerAcceptInvalid,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use secrecy::SecretString;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn config(url: &str) -> ConnectionConfig {
        ConnectionConfig {
            url: url.parse().unwrap(),
            auth: AuthCredentials::Credentials {
                username: "operator".into(),
                password: SecretString::from("pw".to_owned()),
            },
            tls: TlsVerification::SystemDefaults,
            timeout: Duration::from_secs(5),
        }
    }

    fn ok(data: serde_json::Value) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(json!({ "meta": { "rc": "ok" }, "data": data }))
    }

    #[tokio::test]
    async fn unconnected_session_refuses_work() {
        let session = Session::new(config("http://127.0.0.1:9"));
        assert!(matches!(session.service().await, Err(CoreError::NotConnected)));
        assert_eq!(*session.connection_state().borrow(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn rejected_login_fails_the_session() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/login"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let session = Session::new(config(&server.uri()));
        let err = session.connect().await.unwrap_err();
        assert!(matches!(err, CoreError::AuthenticationFailed { .. }), "{err}");
        assert_eq!(*session.connection_state().borrow(), ConnectionState::Failed);
        assert!(session.service().await.is_err());
    }

    #[tokio::test]
    async fn oneshot_logs_out_after_the_closure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/login"))
            .respond_with(ok(json!([])))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/items/children"))
            .respond_with(ok(json!([{
                "path": "/RecordingServerFolder/RecordingServer[r1]",
                "itemType": "RecordingServer",
                "displayName": "Recorder 1",
                "properties": [{ "key": "Id", "value": "r1" }]
            }])))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/logout"))
            .respond_with(ok(json!([])))
            .expect(1)
            .mount(&server)
            .await;

        let names = Session::oneshot(config(&server.uri()), |session| async move {
            let service = session.service().await?;
            let items = service.get_child_items("/RecordingServerFolder").await?;
            Ok(items.into_iter().map(|e| e.name).collect::<Vec<_>>())
        })
        .await
        .unwrap();

        assert_eq!(names, vec!["Recorder 1"]);
    }
}
