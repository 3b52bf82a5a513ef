//! Simulated fingerprint reader.
//!
//! Stands in for real sensor hardware: a scan takes a fixed latency and
//! yields an opaque template id. No ridge data exists anywhere.

use std::time::Duration;

use tracing::debug;

use crate::config::FingerprintConfig;
use crate::models::FingerprintTemplate;

/// Lifecycle stage of the reader
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanStage {
    Idle,
    Scanning,
    Complete,
}

/// Errors surfaced by the reader
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    #[error("a fingerprint scan is already in progress")]
    ScanInProgress,
}

/// Fixed-latency fingerprint reader stand-in
pub struct FingerprintSimulator {
    latency: Duration,
    stage: ScanStage,
    template: Option<FingerprintTemplate>,
}

impl FingerprintSimulator {
    pub fn new(config: &FingerprintConfig) -> Self {
        Self::with_latency(Duration::from_millis(config.scan_latency_ms))
    }

    pub fn with_latency(latency: Duration) -> Self {
        Self {
            latency,
            stage: ScanStage::Idle,
            template: None,
        }
    }

    pub fn stage(&self) -> ScanStage {
        self.stage
    }

    /// The template from the last completed scan, if any.
    pub fn template(&self) -> Option<&FingerprintTemplate> {
        self.template.as_ref()
    }

    /// Run a scan to completion. Each scan yields a fresh template; the
    /// reader never reports a poor read.
    pub async fn scan(&mut self) -> Result<FingerprintTemplate, ScanError> {
        if self.stage == ScanStage::Scanning {
            return Err(ScanError::ScanInProgress);
        }
        self.stage = ScanStage::Scanning;
        self.template = None;

        {
            // back to Idle if this future is dropped mid-scan
            let _reset = ScanReset {
                stage: &mut self.stage,
            };
            tokio::time::sleep(self.latency).await;
        }

        let template = FingerprintTemplate::generate();
        self.stage = ScanStage::Complete;
        self.template = Some(template.clone());
        debug!(template = %template.id, "fingerprint scan complete");
        Ok(template)
    }

    /// Discard the last result so a new scan can replace it.
    pub fn rescan(&mut self) {
        self.stage = ScanStage::Idle;
        self.template = None;
    }
}

struct ScanReset<'a> {
    stage: &'a mut ScanStage,
}

impl Drop for ScanReset<'_> {
    fn drop(&mut self) {
        if *self.stage == ScanStage::Scanning {
            *self.stage = ScanStage::Idle;
        }
    }
}
