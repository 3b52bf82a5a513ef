//! Application shell: session lifecycle around the authentication flows.
//!
//! The shell owns the persisted session token, restores it on startup,
//! probes service health once, and demotes the session to unauthenticated
//! whenever the service stops honoring the token.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio_retry::Retry;
use tokio_retry::strategy::{ExponentialBackoff, jitter};
use tracing::{debug, info, warn};

use crate::config::{FactorPolicy, HealthProbeConfig, SessionStoreConfig};
use crate::models::{
    AuditEventType, AuditOutcome, AuthSuccess, FaceSample, FlowAuditEvent, SessionToken,
    SystemHealth, UserProfile,
};
use crate::services::orchestrator::AuthOrchestrator;
use crate::services::session::{ServiceError, SessionClient};

/// Errors raised by token persistence
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("session store I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Where the session token lives between runs
pub trait TokenStore: Send + Sync {
    /// Read the persisted token, `None` when absent.
    fn load(&self) -> Result<Option<String>, StoreError>;
    /// Persist a token, replacing any previous one.
    fn save(&self, token: &str) -> Result<(), StoreError>;
    /// Remove the persisted token. Removing nothing is not an error.
    fn clear(&self) -> Result<(), StoreError>;
}

/// Token store backed by a single file
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(config: &SessionStoreConfig) -> Self {
        Self {
            path: config.path.clone(),
        }
    }

    pub fn at(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> Result<Option<String>, StoreError> {
        match fs::read_to_string(&self.path) {
            Ok(contents) => {
                let token = contents.trim();
                if token.is_empty() {
                    Ok(None)
                } else {
                    Ok(Some(token.to_string()))
                }
            }
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn save(&self, token: &str) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, token)?;
        Ok(())
    }

    fn clear(&self) -> Result<(), StoreError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

/// In-memory token store for tests and demos. Clones share the same slot.
#[derive(Clone, Default)]
pub struct MemoryTokenStore {
    slot: Arc<Mutex<Option<String>>>,
}

impl MemoryTokenStore {
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            slot: Arc::new(Mutex::new(Some(token.into()))),
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> Result<Option<String>, StoreError> {
        Ok(self.slot.lock().unwrap().clone())
    }

    fn save(&self, token: &str) -> Result<(), StoreError> {
        *self.slot.lock().unwrap() = Some(token.to_string());
        Ok(())
    }

    fn clear(&self) -> Result<(), StoreError> {
        *self.slot.lock().unwrap() = None;
        Ok(())
    }
}

/// Whether a user is signed in, and who
#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    Unauthenticated,
    Authenticated { profile: UserProfile },
}

/// Errors surfaced by shell operations
#[derive(Debug, thiserror::Error)]
pub enum ShellError {
    /// A protected operation was called with no active session
    #[error("no active session")]
    NotAuthenticated,
    /// The service stopped honoring the session token; it has been evicted
    #[error("session expired")]
    SessionExpired,
    #[error(transparent)]
    Service(ServiceError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Top-level session owner for an interactive client
pub struct AppShell {
    client: SessionClient,
    store: Box<dyn TokenStore>,
    policy: FactorPolicy,
    health_probe: HealthProbeConfig,
    state: SessionState,
    token: Option<SessionToken>,
    health: Option<SystemHealth>,
}

impl AppShell {
    pub fn new(
        client: SessionClient,
        store: Box<dyn TokenStore>,
        policy: FactorPolicy,
        health_probe: HealthProbeConfig,
    ) -> Self {
        Self {
            client,
            store,
            policy,
            health_probe,
            state: SessionState::Unauthenticated,
            token: None,
            health: None,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self.state, SessionState::Authenticated { .. })
    }

    pub fn profile(&self) -> Option<&UserProfile> {
        match &self.state {
            SessionState::Authenticated { profile } => Some(profile),
            SessionState::Unauthenticated => None,
        }
    }

    /// The capability snapshot from the startup probe, if it succeeded.
    pub fn health(&self) -> Option<&SystemHealth> {
        self.health.as_ref()
    }

    /// Start a registration flow under this shell's factor policy.
    pub fn registration_flow(&self) -> AuthOrchestrator {
        AuthOrchestrator::registration(self.policy, self.client.clone())
    }

    /// Start a login flow under this shell's factor policy.
    pub fn login_flow(&self) -> AuthOrchestrator {
        AuthOrchestrator::login(self.policy, self.client.clone())
    }

    /// Restore any persisted session, then probe service health once.
    ///
    /// Neither step can fail the startup: an unusable token is evicted and
    /// an unreachable service just leaves the capability snapshot empty.
    pub async fn bootstrap(&mut self) {
        self.restore_session().await;
        self.probe_health().await;
    }

    async fn restore_session(&mut self) {
        let stored = match self.store.load() {
            Ok(stored) => stored,
            Err(err) => {
                warn!(error = %err, "failed to read persisted session token");
                None
            }
        };
        let Some(value) = stored else {
            debug!("no persisted session token");
            return;
        };
        let Some(token) = SessionToken::new(value) else {
            self.evict_token();
            return;
        };

        match self.client.get_user(&token).await {
            Ok(profile) => {
                FlowAuditEvent::new(AuditEventType::SessionRestored, AuditOutcome::Success)
                    .with_username(Some(profile.username.clone()))
                    .log();
                info!(username = %profile.username, "restored persisted session");
                self.token = Some(token);
                self.state = SessionState::Authenticated { profile };
            }
            Err(err) => {
                FlowAuditEvent::new(AuditEventType::SessionExpired, AuditOutcome::Failure)
                    .with_detail(Some(err.surface_message()))
                    .log();
                warn!(error = %err, "persisted session was not honored; evicting token");
                self.evict_token();
            }
        }
    }

    async fn probe_health(&mut self) {
        let strategy = ExponentialBackoff::from_millis(self.health_probe.initial_delay_ms)
            .max_delay(Duration::from_millis(self.health_probe.max_delay_ms))
            .map(jitter)
            .take(self.health_probe.retries);

        let client = self.client.clone();
        let result = Retry::spawn(strategy, || {
            let client = client.clone();
            async move { client.health().await }
        })
        .await;

        match result {
            Ok(health) => {
                info!(
                    algorithm = %health.crypto_algorithm,
                    pqc = health.pqc_available,
                    qrng_source = %health.qrng_source,
                    face_detection = health.face_detection_available,
                    "service capability snapshot"
                );
                self.health = Some(health);
            }
            Err(err) => {
                warn!(error = %err, "health probe failed; continuing without capabilities");
            }
        }
    }

    /// Adopt a successful flow outcome: persist the token and switch the
    /// session to authenticated.
    pub fn complete_authentication(&mut self, success: AuthSuccess) -> Result<(), ShellError> {
        self.store.save(success.token.as_str())?;
        FlowAuditEvent::new(AuditEventType::SessionEstablished, AuditOutcome::Success)
            .with_username(Some(success.profile.username.clone()))
            .log();
        self.token = Some(success.token);
        self.state = SessionState::Authenticated {
            profile: success.profile,
        };
        Ok(())
    }

    /// Drop the session locally. The service keeps no session state, so
    /// there is nothing to revoke remotely.
    pub fn logout(&mut self) {
        FlowAuditEvent::new(AuditEventType::SessionCleared, AuditOutcome::Success)
            .with_username(self.profile().map(|p| p.username.clone()))
            .log();
        self.evict_token();
    }

    /// Re-fetch the signed-in user's profile.
    pub async fn refresh_profile(&mut self) -> Result<UserProfile, ShellError> {
        let token = self.require_token()?;
        match self.client.get_user(&token).await {
            Ok(profile) => {
                self.state = SessionState::Authenticated {
                    profile: profile.clone(),
                };
                Ok(profile)
            }
            Err(err) => Err(self.handle_protected_failure(err)),
        }
    }

    /// Upload a replacement face image for the signed-in user.
    pub async fn update_face_biometric(&mut self, sample: &FaceSample) -> Result<(), ShellError> {
        let token = self.require_token()?;
        match self.client.update_biometrics(&token, sample).await {
            Ok(reply) => {
                info!(
                    message = reply.message.as_deref().unwrap_or("ok"),
                    "face biometric updated"
                );
                if let SessionState::Authenticated { profile } = &mut self.state {
                    profile.biometrics_registered.face = true;
                }
                Ok(())
            }
            Err(err) => Err(self.handle_protected_failure(err)),
        }
    }

    /// Permanently delete the signed-in user's account, then drop the session.
    pub async fn delete_account(&mut self) -> Result<(), ShellError> {
        let token = self.require_token()?;
        let username = self.profile().map(|p| p.username.clone());
        match self.client.delete_user(&token).await {
            Ok(_) => {
                FlowAuditEvent::new(AuditEventType::AccountDeleted, AuditOutcome::Success)
                    .with_username(username)
                    .log();
                self.evict_token();
                Ok(())
            }
            Err(err) => Err(self.handle_protected_failure(err)),
        }
    }

    fn require_token(&self) -> Result<SessionToken, ShellError> {
        self.token.clone().ok_or(ShellError::NotAuthenticated)
    }

    /// A 401 on a protected call means the token is dead: evict it and
    /// demote the session without any user-facing error ceremony.
    fn handle_protected_failure(&mut self, err: ServiceError) -> ShellError {
        if err.is_auth_rejection() {
            FlowAuditEvent::new(AuditEventType::SessionExpired, AuditOutcome::Failure)
                .with_username(self.profile().map(|p| p.username.clone()))
                .with_detail(Some(err.surface_message()))
                .log();
            info!("session no longer honored by the service; signing out");
            self.evict_token();
            ShellError::SessionExpired
        } else {
            ShellError::Service(err)
        }
    }

    fn evict_token(&mut self) {
        if let Err(err) = self.store.clear() {
            warn!(error = %err, "failed to clear persisted session token");
        }
        self.token = None;
        self.state = SessionState::Unauthenticated;
    }
}
