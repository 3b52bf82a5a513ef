//! Factor policy configuration.
//!
//! Controls which layered factors (face capture, fingerprint scan) a flow
//! collects and which of them gate submission.

use std::env;

use serde::{Deserialize, Serialize};

/// Which authentication flow an orchestrator drives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowKind {
    Registration,
    Login,
}

/// A biometric factor collected during a flow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Factor {
    Face,
    Fingerprint,
}

/// How a single factor participates in a flow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FactorRule {
    /// Must be captured before the flow can submit
    Required,
    /// May be captured and is sent along when present
    Optional,
    /// Cannot be recorded on this flow at all
    Disabled,
}

impl FactorRule {
    pub fn is_required(&self) -> bool {
        matches!(self, FactorRule::Required)
    }

    pub fn is_disabled(&self) -> bool {
        matches!(self, FactorRule::Disabled)
    }

    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "required" => Some(FactorRule::Required),
            "optional" => Some(FactorRule::Optional),
            "disabled" => Some(FactorRule::Disabled),
            _ => None,
        }
    }
}

/// Per-factor rules applied to an authentication flow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactorPolicy {
    pub face: FactorRule,
    pub fingerprint: FactorRule,
}

impl Default for FactorPolicy {
    fn default() -> Self {
        Self::dual_mandatory()
    }
}

impl FactorPolicy {
    /// Both biometric factors gate submission
    pub fn dual_mandatory() -> Self {
        Self {
            face: FactorRule::Required,
            fingerprint: FactorRule::Required,
        }
    }

    /// Face capture is offered but skippable, fingerprint is not collected
    pub fn face_optional() -> Self {
        Self {
            face: FactorRule::Optional,
            fingerprint: FactorRule::Disabled,
        }
    }

    /// Load the policy from environment variables, falling back to defaults
    pub fn from_env() -> Self {
        let defaults = Self::dual_mandatory();

        let face = env::var("FACE_FACTOR_RULE")
            .ok()
            .and_then(|v| FactorRule::parse(&v))
            .unwrap_or(defaults.face);

        let fingerprint = env::var("FINGERPRINT_FACTOR_RULE")
            .ok()
            .and_then(|v| FactorRule::parse(&v))
            .unwrap_or(defaults.fingerprint);

        Self { face, fingerprint }
    }

    /// Rule governing the given factor
    pub fn rule(&self, factor: Factor) -> FactorRule {
        match factor {
            Factor::Face => self.face,
            Factor::Fingerprint => self.fingerprint,
        }
    }
}
