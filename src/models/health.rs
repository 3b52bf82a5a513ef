//! Capability snapshot reported by the service health endpoint.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::models::ServiceReply;
use crate::models::timefmt;

#[derive(Debug, Deserialize)]
struct HealthData {
    quantum_crypto: QuantumCryptoStatus,
    #[serde(default)]
    biometric_services: BiometricServices,
    #[serde(default, with = "timefmt::option")]
    timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    total_users: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct QuantumCryptoStatus {
    algorithm: String,
    pqc: bool,
    qrng_source: String,
    #[serde(default)]
    qrng_active: bool,
}

#[derive(Debug, Default, Deserialize)]
struct BiometricServices {
    #[serde(default)]
    face_detection: bool,
    #[serde(default)]
    fingerprint: bool,
}

/// Flattened view of the service's advertised capabilities
#[derive(Debug, Clone, PartialEq)]
pub struct SystemHealth {
    pub crypto_algorithm: String,
    pub pqc_available: bool,
    pub qrng_source: String,
    pub qrng_active: bool,
    pub face_detection_available: bool,
    pub fingerprint_available: bool,
    pub total_users: Option<u64>,
    pub reported_at: Option<DateTime<Utc>>,
}

impl SystemHealth {
    /// Extract the capability snapshot from a health reply.
    pub fn from_reply(reply: &ServiceReply) -> Result<Self, serde_json::Error> {
        let data: HealthData = reply.decode_data()?;
        Ok(Self {
            crypto_algorithm: data.quantum_crypto.algorithm,
            pqc_available: data.quantum_crypto.pqc,
            qrng_source: data.quantum_crypto.qrng_source,
            qrng_active: data.quantum_crypto.qrng_active,
            face_detection_available: data.biometric_services.face_detection,
            fingerprint_available: data.biometric_services.fingerprint,
            total_users: data.total_users,
            reported_at: data.timestamp,
        })
    }
}
