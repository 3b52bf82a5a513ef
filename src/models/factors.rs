//! Credential and biometric factor data collected during a flow.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::models::UserProfile;
use crate::utils::encoding;

/// Raw credential fields as the user typed them.
///
/// Registration carries all four fields; login leaves `email` and
/// `confirm_password` empty.
#[derive(Clone)]
pub struct CredentialInput {
    pub username: String,
    pub email: Option<String>,
    pub password: String,
    pub confirm_password: Option<String>,
}

impl CredentialInput {
    pub fn login(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            email: None,
            password: password.into(),
            confirm_password: None,
        }
    }

    pub fn registration(
        username: impl Into<String>,
        email: impl Into<String>,
        password: impl Into<String>,
        confirm_password: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            email: Some(email.into()),
            password: password.into(),
            confirm_password: Some(confirm_password.into()),
        }
    }
}

impl fmt::Debug for CredentialInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialInput")
            .field("username", &self.username)
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .field("confirm_password", &"<redacted>")
            .finish()
    }
}

/// A frozen camera frame, PNG-encoded, ready for upload
#[derive(Clone)]
pub struct FaceSample {
    pub png: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub captured_at: DateTime<Utc>,
}

impl FaceSample {
    /// The `data:` URI form the service accepts for face images.
    pub fn data_uri(&self) -> String {
        encoding::png_data_uri(&self.png)
    }

    /// Digest used to reference this sample in logs.
    pub fn digest(&self) -> String {
        encoding::sha256_hex(&self.png)
    }
}

impl fmt::Debug for FaceSample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FaceSample")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.png.len())
            .field("captured_at", &self.captured_at)
            .finish()
    }
}

/// Opaque template produced by the fingerprint reader
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FingerprintTemplate {
    pub id: String,
    pub generated_at: DateTime<Utc>,
}

impl FingerprintTemplate {
    pub fn generate() -> Self {
        Self {
            id: format!("fp_{}", Uuid::new_v4().simple()),
            generated_at: Utc::now(),
        }
    }
}

/// Bearer token issued by the service on successful authentication.
///
/// Construction guarantees the token is non-empty, and the `Debug`
/// representation never reveals it.
#[derive(Clone)]
pub struct SessionToken {
    value: String,
    issued_at: DateTime<Utc>,
}

impl SessionToken {
    /// Wrap a token string, rejecting empty or whitespace-only values.
    pub fn new(value: impl Into<String>) -> Option<Self> {
        let value = value.into();
        if value.trim().is_empty() {
            None
        } else {
            Some(Self {
                value,
                issued_at: Utc::now(),
            })
        }
    }

    /// The raw token, for attaching to outbound requests and persistence.
    pub fn as_str(&self) -> &str {
        &self.value
    }

    /// When this process obtained the token (issuance for a fresh login,
    /// restore time for a persisted one).
    pub fn issued_at(&self) -> DateTime<Utc> {
        self.issued_at
    }
}

impl PartialEq for SessionToken {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl Eq for SessionToken {}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SessionToken(<redacted>)")
    }
}

/// Body submitted to the register and login endpoints.
///
/// Biometric fields are omitted from the payload entirely when the flow
/// did not collect them.
#[derive(Clone, Serialize)]
pub struct AuthRequest {
    pub username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub face_image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fingerprint_template: Option<String>,
}

impl fmt::Debug for AuthRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthRequest")
            .field("username", &self.username)
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .field("face_image", &self.face_image.as_deref().map(|_| "<data uri>"))
            .field("fingerprint_template", &self.fingerprint_template)
            .finish()
    }
}

/// Outcome of a successful register or login call
#[derive(Debug, Clone)]
pub struct AuthSuccess {
    pub profile: UserProfile,
    pub token: SessionToken,
    pub message: Option<String>,
}
