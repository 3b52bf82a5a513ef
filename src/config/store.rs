//! Session token persistence configuration.

use std::env;
use std::path::PathBuf;

/// Location of the persisted session token
#[derive(Debug, Clone)]
pub struct SessionStoreConfig {
    pub path: PathBuf,
}

impl Default for SessionStoreConfig {
    fn default() -> Self {
        Self {
            path: default_token_path(),
        }
    }
}

impl SessionStoreConfig {
    /// Load configuration from environment variables, falling back to the
    /// platform config directory
    pub fn from_env() -> Self {
        let path = env::var("SESSION_TOKEN_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| default_token_path());

        Self { path }
    }
}

fn default_token_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("quantauth")
        .join("session.token")
}
