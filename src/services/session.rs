//! Typed HTTP client for the remote Authentication Service.
//!
//! Every endpoint speaks the same response envelope; this client normalizes
//! it into either a [`ServiceReply`] or a [`ServiceError`], so callers never
//! touch raw HTTP. Requests are sent exactly once: retry policy belongs to
//! callers that can judge what is safe to repeat.

use std::time::{Duration, Instant};

use prometheus::{CounterVec, HistogramVec, Opts, Registry};
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;
use uuid::Uuid;

use crate::config::ServiceConfig;
use crate::models::{
    AuthRequest, AuthSuccess, FaceSample, ResponseEnvelope, ServiceReply, SessionToken,
    SystemHealth, UserProfile,
};

/// Shown when the service rejects a request without an explanation
pub const GENERIC_FAILURE_MESSAGE: &str = "Authentication service request failed";

/// Errors surfaced by the session client
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// The client itself was misconfigured, e.g. an unparseable base URL
    #[error("invalid client configuration: {0}")]
    Config(String),
    /// The request never produced a response (DNS, connect, timeout)
    #[error("network error: {0}")]
    Transport(#[from] reqwest::Error),
    /// The service answered and said no
    #[error("{message}")]
    Rejected { status: u16, message: String },
    /// The service answered with something that is not a valid envelope
    #[error("malformed service response: {0}")]
    InvalidResponse(String),
}

impl ServiceError {
    /// Message suitable for showing to the user verbatim.
    pub fn surface_message(&self) -> String {
        match self {
            ServiceError::Rejected { message, .. } => message.clone(),
            _ => GENERIC_FAILURE_MESSAGE.to_string(),
        }
    }

    /// Whether the service refused the caller's credentials or token.
    pub fn is_auth_rejection(&self) -> bool {
        matches!(self, ServiceError::Rejected { status: 401, .. })
    }
}

/// Prometheus metrics for outbound service calls
#[derive(Clone)]
pub struct SessionMetrics {
    /// Requests by operation and outcome (success, rejected, transport_error,
    /// invalid_response)
    pub requests_total: CounterVec,
    /// Request latency by operation
    pub request_duration_seconds: HistogramVec,
}

impl SessionMetrics {
    /// Create metrics and register them with the provided registry
    pub fn new(registry: &Registry) -> Result<Self, prometheus::Error> {
        let requests_total = CounterVec::new(
            Opts::new(
                "auth_client_requests_total",
                "Total Authentication Service requests by operation and outcome",
            ),
            &["operation", "outcome"],
        )?;

        let request_duration_seconds = HistogramVec::new(
            prometheus::HistogramOpts::new(
                "auth_client_request_duration_seconds",
                "Authentication Service request duration in seconds by operation",
            )
            .buckets(vec![0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]),
            &["operation"],
        )?;

        registry.register(Box::new(requests_total.clone()))?;
        registry.register(Box::new(request_duration_seconds.clone()))?;

        Ok(Self {
            requests_total,
            request_duration_seconds,
        })
    }
}

/// HTTP client wrapper that owns the envelope protocol
#[derive(Clone)]
pub struct SessionClient {
    http: Client,
    base: Url,
    metrics: Option<SessionMetrics>,
}

impl SessionClient {
    /// Build a client from configuration, without metrics.
    pub fn new(config: &ServiceConfig) -> Result<Self, ServiceError> {
        Self::with_metrics(config, None)
    }

    /// Build a client that records per-operation metrics when provided.
    pub fn with_metrics(
        config: &ServiceConfig,
        metrics: Option<SessionMetrics>,
    ) -> Result<Self, ServiceError> {
        let base = config.normalized_base_url().map_err(ServiceError::Config)?;
        let http = Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_seconds))
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()
            .map_err(|e| ServiceError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            base,
            metrics,
        })
    }

    /// Fetch the service capability snapshot.
    pub async fn health(&self) -> Result<SystemHealth, ServiceError> {
        let reply = self
            .request(Method::GET, "health", None::<&()>, None, "health")
            .await?;
        SystemHealth::from_reply(&reply).map_err(|e| ServiceError::InvalidResponse(e.to_string()))
    }

    /// Create an account. A success always carries a profile and a token.
    pub async fn register(&self, request: &AuthRequest) -> Result<AuthSuccess, ServiceError> {
        let reply = self
            .request(Method::POST, "register", Some(request), None, "register")
            .await?;
        Self::auth_success(reply)
    }

    /// Authenticate an existing account.
    pub async fn login(&self, request: &AuthRequest) -> Result<AuthSuccess, ServiceError> {
        let reply = self
            .request(Method::POST, "login", Some(request), None, "login")
            .await?;
        Self::auth_success(reply)
    }

    /// Fetch the profile behind a session token.
    pub async fn get_user(&self, token: &SessionToken) -> Result<UserProfile, ServiceError> {
        let reply = self
            .request(Method::GET, "user", None::<&()>, Some(token), "get_user")
            .await?;
        reply
            .decode_data()
            .map_err(|e| ServiceError::InvalidResponse(e.to_string()))
    }

    /// Replace the stored face image for the authenticated user.
    pub async fn update_biometrics(
        &self,
        token: &SessionToken,
        face: &FaceSample,
    ) -> Result<ServiceReply, ServiceError> {
        let body = serde_json::json!({ "face_image": face.data_uri() });
        self.request(
            Method::POST,
            "update-biometrics",
            Some(&body),
            Some(token),
            "update_biometrics",
        )
        .await
    }

    /// Permanently delete the authenticated user's account.
    pub async fn delete_user(&self, token: &SessionToken) -> Result<ServiceReply, ServiceError> {
        self.request(
            Method::DELETE,
            "user/delete",
            None::<&()>,
            Some(token),
            "delete_user",
        )
        .await
    }

    /// Fetch the security metrics document. The payload shape is owned by the
    /// service, so it is passed through untyped.
    pub async fn security_metrics(&self) -> Result<Value, ServiceError> {
        let reply = self
            .request(
                Method::GET,
                "security/metrics",
                None::<&()>,
                None,
                "security_metrics",
            )
            .await?;
        Ok(reply.data)
    }

    /// Trigger a quantum crypto self-test on the service.
    pub async fn test_quantum(&self) -> Result<Value, ServiceError> {
        let reply = self
            .request(
                Method::POST,
                "security/test-quantum",
                None::<&()>,
                None,
                "test_quantum",
            )
            .await?;
        Ok(reply.data)
    }

    /// List all registered profiles. Requires an authenticated session.
    pub async fn admin_users(&self, token: &SessionToken) -> Result<Vec<UserProfile>, ServiceError> {
        #[derive(Deserialize)]
        struct AdminUserList {
            users: Vec<UserProfile>,
        }

        let reply = self
            .request(
                Method::GET,
                "admin/users",
                None::<&()>,
                Some(token),
                "admin_users",
            )
            .await?;
        let list: AdminUserList = reply
            .decode_data()
            .map_err(|e| ServiceError::InvalidResponse(e.to_string()))?;
        Ok(list.users)
    }

    fn endpoint(&self, path: &str) -> Result<Url, ServiceError> {
        self.base
            .join(path)
            .map_err(|e| ServiceError::Config(format!("invalid endpoint path '{path}': {e}")))
    }

    async fn request<T: serde::Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: Option<&T>,
        token: Option<&SessionToken>,
        operation: &'static str,
    ) -> Result<ServiceReply, ServiceError> {
        let url = self.endpoint(path)?;
        let request_id = Uuid::new_v4().to_string();
        let started = Instant::now();

        let mut builder = self
            .http
            .request(method, url)
            .header("X-Request-ID", &request_id);
        if let Some(token) = token {
            builder = builder.bearer_auth(token.as_str());
        }
        if let Some(body) = body {
            builder = builder.json(body);
        }

        self.dispatch(builder, operation, &request_id, started).await
    }

    async fn dispatch(
        &self,
        builder: RequestBuilder,
        operation: &'static str,
        request_id: &str,
        started: Instant,
    ) -> Result<ServiceReply, ServiceError> {
        let response = match builder.send().await {
            Ok(response) => response,
            Err(err) => {
                self.record(operation, "transport_error", started);
                warn!(
                    operation,
                    request_id,
                    error = %err,
                    "Authentication Service request failed to complete"
                );
                return Err(ServiceError::Transport(err));
            }
        };

        self.normalize(response, operation, request_id, started).await
    }

    async fn normalize(
        &self,
        response: Response,
        operation: &'static str,
        request_id: &str,
        started: Instant,
    ) -> Result<ServiceReply, ServiceError> {
        let status = response.status();
        let bytes = match response.bytes().await {
            Ok(bytes) => bytes,
            Err(err) => {
                self.record(operation, "transport_error", started);
                return Err(ServiceError::Transport(err));
            }
        };

        let envelope: ResponseEnvelope = match serde_json::from_slice(&bytes) {
            Ok(envelope) => envelope,
            Err(err) if status.is_success() => {
                self.record(operation, "invalid_response", started);
                return Err(ServiceError::InvalidResponse(format!(
                    "expected response envelope: {err}"
                )));
            }
            // Non-envelope error bodies (proxies, framework 404 pages) still
            // count as rejections; there is just no message to relay.
            Err(_) => {
                self.record(operation, "rejected", started);
                return Err(ServiceError::Rejected {
                    status: status.as_u16(),
                    message: GENERIC_FAILURE_MESSAGE.to_string(),
                });
            }
        };

        if status.is_success() && envelope.success {
            self.record(operation, "success", started);
            debug!(
                operation,
                request_id,
                status = status.as_u16(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Authentication Service request succeeded"
            );
            return Ok(ServiceReply {
                message: envelope.message,
                data: envelope.data.unwrap_or(Value::Null),
                token: envelope.token.filter(|t| !t.is_empty()),
            });
        }

        let message = envelope
            .message
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| GENERIC_FAILURE_MESSAGE.to_string());
        self.record(operation, "rejected", started);
        debug!(
            operation,
            request_id,
            status = status.as_u16(),
            message = %message,
            "Authentication Service rejected request"
        );
        Err(ServiceError::Rejected {
            status: status.as_u16(),
            message,
        })
    }

    /// A register/login success must carry both a profile and a usable token.
    fn auth_success(reply: ServiceReply) -> Result<AuthSuccess, ServiceError> {
        let token = reply
            .token
            .clone()
            .and_then(SessionToken::new)
            .ok_or_else(|| {
                ServiceError::InvalidResponse(
                    "success envelope did not carry a session token".to_string(),
                )
            })?;
        let profile: UserProfile = reply
            .decode_data()
            .map_err(|e| ServiceError::InvalidResponse(e.to_string()))?;
        Ok(AuthSuccess {
            profile,
            token,
            message: reply.message,
        })
    }

    fn record(&self, operation: &str, outcome: &str, started: Instant) {
        if let Some(metrics) = &self.metrics {
            metrics
                .requests_total
                .with_label_values(&[operation, outcome])
                .inc();
            metrics
                .request_duration_seconds
                .with_label_values(&[operation])
                .observe(started.elapsed().as_secs_f64());
        }
    }
}
