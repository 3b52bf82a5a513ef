//! Capture device and fingerprint reader configuration.

use std::env;

/// Settings for the camera capture resource
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct CaptureConfig {
    /// Seconds counted down after arming before the frame is frozen
    pub countdown_seconds: u32,
    pub frame_width: u32,
    pub frame_height: u32,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            countdown_seconds: 3,
            frame_width: 640,
            frame_height: 480,
        }
    }
}

impl CaptureConfig {
    /// Load configuration from environment variables, falling back to defaults
    pub fn from_env() -> Self {
        let countdown_seconds = env::var("CAPTURE_COUNTDOWN_SECONDS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(3);

        let frame_width = env::var("CAPTURE_FRAME_WIDTH")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(640);

        let frame_height = env::var("CAPTURE_FRAME_HEIGHT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(480);

        Self {
            countdown_seconds,
            frame_width,
            frame_height,
        }
    }
}

/// Settings for the simulated fingerprint reader
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct FingerprintConfig {
    /// Fixed latency a scan takes before yielding a template
    pub scan_latency_ms: u64,
}

impl Default for FingerprintConfig {
    fn default() -> Self {
        Self {
            scan_latency_ms: 2000,
        }
    }
}

impl FingerprintConfig {
    /// Load configuration from environment variables, falling back to defaults
    pub fn from_env() -> Self {
        let scan_latency_ms = env::var("FINGERPRINT_SCAN_LATENCY_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(2000);

        Self { scan_latency_ms }
    }
}
