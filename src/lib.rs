//! Quantauth Client - layered-factor authentication client core
//!
//! This crate drives registration and login against a remote Authentication
//! Service that layers biometric factors on top of passwords:
//! - Staged flow orchestration with per-field validation
//! - Camera capture lifecycle with countdown and guaranteed device release
//! - Simulated fingerprint scanning
//! - A typed wire client for the service's response envelope
//! - Session token persistence and silent expiry handling
//!
//! ## Architecture
//!
//! The codebase is organized into focused modules:
//! - `models/` - Wire envelopes, factor payloads, profiles, and audit types
//! - `services/` - Flow orchestration, device lifecycles, wire client, shell
//! - `utils/` - Credential validation and payload encoding helpers
//! - `config/` - Configuration structures and environment loading
//!
//! ## Quick Start
//!
//! ```no_run
//! use quantauth_client::{
//!     AppShell, FactorPolicy, FileTokenStore, ServiceConfig, SessionClient, SessionStoreConfig,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ServiceConfig::from_env();
//!     let client = SessionClient::new(&config)?;
//!     let store = FileTokenStore::new(&SessionStoreConfig::from_env());
//!     let mut shell = AppShell::new(
//!         client,
//!         Box::new(store),
//!         FactorPolicy::from_env(),
//!         config.health_probe.clone(),
//!     );
//!     shell.bootstrap().await;
//!     Ok(())
//! }
//! ```

// Core modules
pub mod config;
pub mod models;
pub mod services;
pub mod utils;

// Re-export commonly used types and functions for convenience
pub use config::{
    CaptureConfig, Factor, FactorPolicy, FactorRule, FingerprintConfig, FlowKind,
    HealthProbeConfig, ServiceConfig, SessionStoreConfig,
};
pub use models::{
    AuditEventType, AuditOutcome, AuthRequest, AuthSuccess, BiometricsRegistered, CredentialInput,
    FaceSample, FingerprintTemplate, FlowAuditEvent, ResponseEnvelope, ServiceReply, SessionToken,
    SystemHealth, UserProfile,
};
pub use services::{
    AppShell, AuthOrchestrator, CaptureDevice, CaptureError, CaptureResource, CaptureStage,
    DeviceStream, FileTokenStore, FingerprintSimulator, FlowError, FlowStage, Frame,
    MemoryTokenStore, ScanError, ScanStage, ServiceError, SessionClient, SessionMetrics,
    SessionState, ShellError, SimulatedCamera, StoreError, TokenStore,
};
pub use utils::{CredentialField, ValidationError, validate_credentials};
