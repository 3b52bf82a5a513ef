//! User profile payloads returned by the Authentication Service.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::timefmt;

/// Which biometric factors the service has on file for a user
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BiometricsRegistered {
    #[serde(default)]
    pub face: bool,
    #[serde(default)]
    pub fingerprint: bool,
}

/// Profile data the service returns for an authenticated user.
///
/// `created_at` and `last_login` are absent on some operations (a first
/// login has no prior `last_login`, and login replies omit `created_at`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(rename = "user_id", alias = "id")]
    pub id: i64,
    pub username: String,
    pub email: String,
    #[serde(default, with = "timefmt::option")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, with = "timefmt::option")]
    pub last_login: Option<DateTime<Utc>>,
    #[serde(default, alias = "biometrics")]
    pub biometrics_registered: BiometricsRegistered,
}
