//! Authentication Service endpoint configuration.

use std::env;
use url::Url;

/// Configuration for the remote Authentication Service
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ServiceConfig {
    /// Base URL the service is mounted at, including the API prefix
    pub base_url: String,
    pub connect_timeout_seconds: u64,
    pub request_timeout_seconds: u64,
    pub health_probe: HealthProbeConfig,
}

/// Backoff settings for the one-time startup health probe
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct HealthProbeConfig {
    /// Number of retries after the initial attempt
    pub retries: usize,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:5000/api".to_string(),
            connect_timeout_seconds: 3,
            request_timeout_seconds: 10,
            health_probe: HealthProbeConfig::default(),
        }
    }
}

impl Default for HealthProbeConfig {
    fn default() -> Self {
        Self {
            retries: 2,
            initial_delay_ms: 200,
            max_delay_ms: 2000,
        }
    }
}

impl ServiceConfig {
    /// Load configuration from environment variables, falling back to defaults
    pub fn from_env() -> Self {
        let base_url = env::var("AUTH_SERVICE_URL")
            .unwrap_or_else(|_| "http://127.0.0.1:5000/api".to_string());

        let connect_timeout_seconds = env::var("AUTH_SERVICE_CONNECT_TIMEOUT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(3);

        let request_timeout_seconds = env::var("AUTH_SERVICE_REQUEST_TIMEOUT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(10);

        Self {
            base_url,
            connect_timeout_seconds,
            request_timeout_seconds,
            health_probe: HealthProbeConfig::from_env(),
        }
    }

    /// Parse the configured base URL, normalized so relative endpoint paths
    /// append to it instead of replacing its final segment.
    pub fn normalized_base_url(&self) -> Result<Url, String> {
        let mut raw = self.base_url.trim().to_string();
        if !raw.ends_with('/') {
            raw.push('/');
        }
        Url::parse(&raw).map_err(|e| format!("invalid service base URL '{}': {}", self.base_url, e))
    }
}

impl HealthProbeConfig {
    /// Load health probe configuration from environment variables
    pub fn from_env() -> Self {
        let retries = env::var("HEALTH_PROBE_RETRIES")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(2);

        let initial_delay_ms = env::var("HEALTH_PROBE_INITIAL_DELAY_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(200);

        let max_delay_ms = env::var("HEALTH_PROBE_MAX_DELAY_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(2000);

        Self {
            retries,
            initial_delay_ms,
            max_delay_ms,
        }
    }
}
