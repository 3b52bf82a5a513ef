//! Audit logging data structures for authentication flow events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Types of flow events for audit logging
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventType {
    RegistrationSubmitted,
    LoginSubmitted,
    AuthAccepted,
    AuthRejected,
    SessionRestored,
    SessionEstablished,
    SessionExpired,
    SessionCleared,
    AccountDeleted,
}

/// Outcomes of flow events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditOutcome {
    Success,
    Failure,
}

/// Structured audit log entry for authentication flow events
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowAuditEvent {
    pub event_type: AuditEventType,
    pub outcome: AuditOutcome,
    pub timestamp: DateTime<Utc>,
    pub username: Option<String>,
    pub detail: Option<String>,
}

impl FlowAuditEvent {
    /// Create a new audit event
    pub fn new(event_type: AuditEventType, outcome: AuditOutcome) -> Self {
        Self {
            event_type,
            outcome,
            timestamp: Utc::now(),
            username: None,
            detail: None,
        }
    }

    /// Add the username the event concerns
    pub fn with_username(mut self, username: Option<String>) -> Self {
        self.username = username;
        self
    }

    /// Add human-readable detail, e.g. the rejection message
    pub fn with_detail(mut self, detail: Option<String>) -> Self {
        self.detail = detail;
        self
    }

    /// Log the audit event using structured logging
    pub fn log(&self) {
        info!(
            target: "auth_audit",
            event_type = ?self.event_type,
            outcome = ?self.outcome,
            timestamp = %self.timestamp,
            username = ?self.username,
            detail = ?self.detail,
            "Authentication audit event"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_builder_chains() {
        let event = FlowAuditEvent::new(AuditEventType::AuthRejected, AuditOutcome::Failure)
            .with_username(Some("alice".to_string()))
            .with_detail(Some("Invalid username or password".to_string()));

        assert!(matches!(event.event_type, AuditEventType::AuthRejected));
        assert!(matches!(event.outcome, AuditOutcome::Failure));
        assert_eq!(event.username.as_deref(), Some("alice"));
        assert_eq!(event.detail.as_deref(), Some("Invalid username or password"));
    }

    #[test]
    fn test_event_serializes_snake_case() {
        let event = FlowAuditEvent::new(AuditEventType::SessionExpired, AuditOutcome::Failure);
        let raw = serde_json::to_value(&event).expect("event should serialize");
        assert_eq!(raw["event_type"], "session_expired");
        assert_eq!(raw["outcome"], "failure");
    }
}
