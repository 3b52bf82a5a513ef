//! Staged orchestration of registration and login flows.
//!
//! An orchestrator advances through credential collection, biometric
//! collection, submission, and success. Validation failures and service
//! rejections never destroy collected state: the flow stays where it is
//! (or steps back to biometric collection) so the user can correct one
//! thing and resubmit.

use tracing::{info, warn};

use crate::config::{Factor, FactorPolicy, FlowKind};
use crate::models::{
    AuditEventType, AuditOutcome, AuthRequest, AuthSuccess, CredentialInput, FaceSample,
    FingerprintTemplate, FlowAuditEvent,
};
use crate::services::session::{ServiceError, SessionClient};
use crate::utils::validate::{ValidationError, validate_credentials};

/// Stage of an authentication flow
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowStage {
    CollectingCredentials,
    CollectingBiometrics,
    Submitting,
    Succeeded,
}

/// Errors surfaced by flow orchestration
#[derive(Debug, thiserror::Error)]
pub enum FlowError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Service(#[from] ServiceError),
    #[error("operation requires the {required:?} stage, but the flow is {actual:?}")]
    InvalidStage {
        required: FlowStage,
        actual: FlowStage,
    },
    #[error("a submission is already in flight")]
    SubmissionInFlight,
    #[error("the {factor:?} factor is disabled for this flow")]
    FactorDisabled { factor: Factor },
    #[error("required factors are missing: {missing:?}")]
    MissingFactors { missing: Vec<Factor> },
}

/// Drives one registration or login attempt from start to finish
pub struct AuthOrchestrator {
    kind: FlowKind,
    policy: FactorPolicy,
    client: SessionClient,
    stage: FlowStage,
    credentials: Option<CredentialInput>,
    face: Option<FaceSample>,
    fingerprint: Option<FingerprintTemplate>,
    last_failure: Option<String>,
    outcome: Option<AuthSuccess>,
}

impl AuthOrchestrator {
    pub fn new(kind: FlowKind, policy: FactorPolicy, client: SessionClient) -> Self {
        Self {
            kind,
            policy,
            client,
            stage: FlowStage::CollectingCredentials,
            credentials: None,
            face: None,
            fingerprint: None,
            last_failure: None,
            outcome: None,
        }
    }

    pub fn registration(policy: FactorPolicy, client: SessionClient) -> Self {
        Self::new(FlowKind::Registration, policy, client)
    }

    pub fn login(policy: FactorPolicy, client: SessionClient) -> Self {
        Self::new(FlowKind::Login, policy, client)
    }

    pub fn kind(&self) -> FlowKind {
        self.kind
    }

    pub fn policy(&self) -> &FactorPolicy {
        &self.policy
    }

    pub fn stage(&self) -> FlowStage {
        self.stage
    }

    /// The banner message from the most recent rejected submission.
    pub fn last_failure(&self) -> Option<&str> {
        self.last_failure.as_deref()
    }

    pub fn captured_face(&self) -> Option<&FaceSample> {
        self.face.as_ref()
    }

    pub fn captured_fingerprint(&self) -> Option<&FingerprintTemplate> {
        self.fingerprint.as_ref()
    }

    /// The successful outcome, once the flow has completed.
    pub fn outcome(&self) -> Option<&AuthSuccess> {
        self.outcome.as_ref()
    }

    /// Validate the typed credentials and move on to biometric collection.
    /// On a validation failure the stage and any prior input are untouched.
    pub fn advance(&mut self, input: CredentialInput) -> Result<(), FlowError> {
        self.expect_stage(FlowStage::CollectingCredentials)?;
        validate_credentials(&input, self.kind)?;
        self.credentials = Some(input);
        self.stage = FlowStage::CollectingBiometrics;
        Ok(())
    }

    /// Return to credential collection, discarding captured factors.
    pub fn go_back(&mut self) -> Result<(), FlowError> {
        self.expect_stage(FlowStage::CollectingBiometrics)?;
        self.face = None;
        self.fingerprint = None;
        self.last_failure = None;
        self.stage = FlowStage::CollectingCredentials;
        Ok(())
    }

    /// Attach a captured face sample. Recapturing replaces the previous one.
    pub fn record_face(&mut self, sample: FaceSample) -> Result<(), FlowError> {
        self.expect_stage(FlowStage::CollectingBiometrics)?;
        if self.policy.face.is_disabled() {
            return Err(FlowError::FactorDisabled {
                factor: Factor::Face,
            });
        }
        self.face = Some(sample);
        Ok(())
    }

    /// Discard the captured face sample so it can be retaken.
    pub fn clear_face(&mut self) -> Result<(), FlowError> {
        self.expect_stage(FlowStage::CollectingBiometrics)?;
        self.face = None;
        Ok(())
    }

    /// Attach a scanned fingerprint template. Rescanning replaces it.
    pub fn record_fingerprint(&mut self, template: FingerprintTemplate) -> Result<(), FlowError> {
        self.expect_stage(FlowStage::CollectingBiometrics)?;
        if self.policy.fingerprint.is_disabled() {
            return Err(FlowError::FactorDisabled {
                factor: Factor::Fingerprint,
            });
        }
        self.fingerprint = Some(template);
        Ok(())
    }

    /// Discard the scanned fingerprint template.
    pub fn clear_fingerprint(&mut self) -> Result<(), FlowError> {
        self.expect_stage(FlowStage::CollectingBiometrics)?;
        self.fingerprint = None;
        Ok(())
    }

    /// Required factors not yet collected.
    pub fn missing_factors(&self) -> Vec<Factor> {
        let mut missing = Vec::new();
        if self.policy.face.is_required() && self.face.is_none() {
            missing.push(Factor::Face);
        }
        if self.policy.fingerprint.is_required() && self.fingerprint.is_none() {
            missing.push(Factor::Fingerprint);
        }
        missing
    }

    /// Whether the flow is ready to submit.
    pub fn can_submit(&self) -> bool {
        self.stage == FlowStage::CollectingBiometrics && self.missing_factors().is_empty()
    }

    /// Submit the collected credentials and factors to the service.
    ///
    /// On rejection the flow returns to biometric collection with every
    /// captured factor intact and the service's message recorded, so the
    /// caller may resubmit as-is or adjust first.
    pub async fn submit(&mut self) -> Result<AuthSuccess, FlowError> {
        match self.stage {
            FlowStage::CollectingBiometrics => {}
            FlowStage::Submitting => return Err(FlowError::SubmissionInFlight),
            actual => {
                return Err(FlowError::InvalidStage {
                    required: FlowStage::CollectingBiometrics,
                    actual,
                });
            }
        }

        let missing = self.missing_factors();
        if !missing.is_empty() {
            return Err(FlowError::MissingFactors { missing });
        }

        let request = self.assemble_request()?;
        let username = request.username.clone();
        let kind = self.kind;
        let client = self.client.clone();

        self.stage = FlowStage::Submitting;
        let submitted_event = match kind {
            FlowKind::Registration => AuditEventType::RegistrationSubmitted,
            FlowKind::Login => AuditEventType::LoginSubmitted,
        };
        FlowAuditEvent::new(submitted_event, AuditOutcome::Success)
            .with_username(Some(username.clone()))
            .log();

        let result = {
            // if this future is dropped at the await, the guard steps the
            // flow back to biometric collection instead of wedging it
            let _fallback = StageReset {
                stage: &mut self.stage,
            };
            match kind {
                FlowKind::Registration => client.register(&request).await,
                FlowKind::Login => client.login(&request).await,
            }
        };

        match result {
            Ok(success) => {
                self.stage = FlowStage::Succeeded;
                self.last_failure = None;
                self.outcome = Some(success.clone());
                FlowAuditEvent::new(AuditEventType::AuthAccepted, AuditOutcome::Success)
                    .with_username(Some(username.clone()))
                    .log();
                info!(username = %username, kind = ?kind, "authentication flow succeeded");
                Ok(success)
            }
            Err(err) => {
                let banner = err.surface_message();
                FlowAuditEvent::new(AuditEventType::AuthRejected, AuditOutcome::Failure)
                    .with_username(Some(username.clone()))
                    .with_detail(Some(banner.clone()))
                    .log();
                warn!(username = %username, kind = ?kind, error = %err, "authentication flow rejected");
                self.last_failure = Some(banner);
                Err(FlowError::Service(err))
            }
        }
    }

    fn expect_stage(&self, required: FlowStage) -> Result<(), FlowError> {
        if self.stage == required {
            Ok(())
        } else {
            Err(FlowError::InvalidStage {
                required,
                actual: self.stage,
            })
        }
    }

    fn assemble_request(&self) -> Result<AuthRequest, FlowError> {
        let credentials = self
            .credentials
            .as_ref()
            .ok_or(FlowError::InvalidStage {
                required: FlowStage::CollectingBiometrics,
                actual: self.stage,
            })?;
        Ok(AuthRequest {
            username: credentials.username.clone(),
            email: match self.kind {
                FlowKind::Registration => credentials.email.clone(),
                FlowKind::Login => None,
            },
            password: credentials.password.clone(),
            face_image: self.face.as_ref().map(|sample| sample.data_uri()),
            fingerprint_template: self.fingerprint.as_ref().map(|t| t.id.clone()),
        })
    }
}

/// Rolls a dropped in-flight submission back to biometric collection
struct StageReset<'a> {
    stage: &'a mut FlowStage,
}

impl Drop for StageReset<'_> {
    fn drop(&mut self) {
        if *self.stage == FlowStage::Submitting {
            *self.stage = FlowStage::CollectingBiometrics;
        }
    }
}
