//! Camera capture lifecycle with exclusive device ownership.
//!
//! A [`CaptureResource`] walks a fixed stage machine: `Idle`, `Acquiring`
//! while the device opens, `Live` while previewing, `Armed` during the
//! countdown, and `Captured` once a frame is frozen. The device stream is
//! held inside the resource and dropped on every path that leaves the
//! `Live`/`Armed` stages, so the device's busy claim cannot outlive them.

use std::io::Cursor;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use image::{DynamicImage, ImageFormat, RgbImage};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::models::FaceSample;

/// Lifecycle stage of the capture resource
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureStage {
    Idle,
    Acquiring,
    Live,
    Armed,
    Captured,
}

/// Errors surfaced by the capture pipeline
#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    /// The device refused to open (busy, missing, or permission denied)
    #[error("capture device unavailable: {0}")]
    DeviceUnavailable(String),
    /// The requested operation does not apply to the current stage
    #[error("{operation} is not valid while the capture resource is {stage:?}")]
    InvalidStage {
        operation: &'static str,
        stage: CaptureStage,
    },
    /// The frozen frame could not be encoded
    #[error("frame encoding failed: {0}")]
    Encoding(String),
}

/// A frame pulled off a device's preview feed, RGB8 with no padding
#[derive(Debug, Clone)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub rgb: Vec<u8>,
}

impl Frame {
    /// PNG-encode the frame into an uploadable face sample.
    pub fn encode(&self) -> Result<FaceSample, CaptureError> {
        let image = RgbImage::from_raw(self.width, self.height, self.rgb.clone()).ok_or_else(
            || CaptureError::Encoding("frame buffer does not match its dimensions".to_string()),
        )?;
        let mut png = Vec::new();
        DynamicImage::ImageRgb8(image)
            .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
            .map_err(|e| CaptureError::Encoding(e.to_string()))?;
        Ok(FaceSample {
            png,
            width: self.width,
            height: self.height,
            captured_at: Utc::now(),
        })
    }
}

/// A camera (or stand-in) that can hand out an exclusive preview stream
#[async_trait]
pub trait CaptureDevice: Send + Sync {
    /// Request exclusive access to the device's preview stream.
    async fn open(&self) -> Result<Box<dyn DeviceStream>, CaptureError>;
}

/// An open, exclusive preview stream. Dropping it releases the device.
pub trait DeviceStream: Send {
    /// The most recent frame off the preview feed.
    fn latest_frame(&mut self) -> Frame;
}

/// Deterministic camera stand-in.
///
/// Hands out at most one stream at a time; a second `open` while a stream
/// lives reports the device as busy, mirroring how real camera stacks behave.
pub struct SimulatedCamera {
    width: u32,
    height: u32,
    available: bool,
    in_use: Arc<AtomicBool>,
}

impl SimulatedCamera {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            available: true,
            in_use: Arc::new(AtomicBool::new(false)),
        }
    }

    /// A camera that refuses to open, for exercising denial paths.
    pub fn unavailable() -> Self {
        Self {
            width: 0,
            height: 0,
            available: false,
            in_use: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Whether a stream currently holds the device.
    pub fn is_in_use(&self) -> bool {
        self.in_use.load(Ordering::Acquire)
    }
}

#[async_trait]
impl CaptureDevice for SimulatedCamera {
    async fn open(&self) -> Result<Box<dyn DeviceStream>, CaptureError> {
        if !self.available {
            return Err(CaptureError::DeviceUnavailable(
                "camera permission denied".to_string(),
            ));
        }
        if self.in_use.swap(true, Ordering::AcqRel) {
            return Err(CaptureError::DeviceUnavailable(
                "camera is already in use".to_string(),
            ));
        }
        Ok(Box::new(SimulatedStream {
            _lease: DeviceLease {
                claim: Arc::clone(&self.in_use),
            },
            width: self.width,
            height: self.height,
            ticks: 0,
        }))
    }
}

/// Clears the camera's busy claim when the stream is dropped
struct DeviceLease {
    claim: Arc<AtomicBool>,
}

impl Drop for DeviceLease {
    fn drop(&mut self) {
        self.claim.store(false, Ordering::Release);
    }
}

struct SimulatedStream {
    _lease: DeviceLease,
    width: u32,
    height: u32,
    ticks: u64,
}

impl DeviceStream for SimulatedStream {
    fn latest_frame(&mut self) -> Frame {
        self.ticks = self.ticks.wrapping_add(1);
        let mut rgb = Vec::with_capacity((self.width * self.height * 3) as usize);
        for y in 0..self.height {
            for x in 0..self.width {
                rgb.push((x % 256) as u8);
                rgb.push((y % 256) as u8);
                rgb.push((self.ticks % 256) as u8);
            }
        }
        Frame {
            width: self.width,
            height: self.height,
            rgb,
        }
    }
}

struct CaptureInner {
    stage: CaptureStage,
    stream: Option<Box<dyn DeviceStream>>,
    sample: Option<FaceSample>,
}

struct CaptureShared {
    inner: Mutex<CaptureInner>,
    stage_tx: watch::Sender<CaptureStage>,
    countdown_tx: watch::Sender<u32>,
}

/// Owns the device stream and drives the capture stage machine.
///
/// Stage changes and countdown ticks are broadcast over watch channels so
/// interfaces can render them without polling.
pub struct CaptureResource {
    device: Arc<dyn CaptureDevice>,
    shared: Arc<CaptureShared>,
    cancel_tx: Option<watch::Sender<bool>>,
    countdown_task: Option<JoinHandle<()>>,
}

impl CaptureResource {
    pub fn new(device: Arc<dyn CaptureDevice>) -> Self {
        let (stage_tx, _) = watch::channel(CaptureStage::Idle);
        let (countdown_tx, _) = watch::channel(0);
        Self {
            device,
            shared: Arc::new(CaptureShared {
                inner: Mutex::new(CaptureInner {
                    stage: CaptureStage::Idle,
                    stream: None,
                    sample: None,
                }),
                stage_tx,
                countdown_tx,
            }),
            cancel_tx: None,
            countdown_task: None,
        }
    }

    pub fn stage(&self) -> CaptureStage {
        self.shared.inner.lock().unwrap().stage
    }

    /// Subscribe to stage transitions.
    pub fn watch_stage(&self) -> watch::Receiver<CaptureStage> {
        self.shared.stage_tx.subscribe()
    }

    /// Subscribe to countdown ticks (remaining whole seconds, 0 when idle).
    pub fn watch_countdown(&self) -> watch::Receiver<u32> {
        self.shared.countdown_tx.subscribe()
    }

    /// Open the device and enter live preview.
    pub async fn acquire(&mut self) -> Result<(), CaptureError> {
        {
            let mut inner = self.shared.inner.lock().unwrap();
            if inner.stage != CaptureStage::Idle {
                return Err(CaptureError::InvalidStage {
                    operation: "acquire",
                    stage: inner.stage,
                });
            }
            inner.stage = CaptureStage::Acquiring;
        }
        self.shared.stage_tx.send_replace(CaptureStage::Acquiring);

        // Rolls the stage back to Idle if this future is dropped mid-open.
        let _reset = AcquireReset {
            shared: Arc::clone(&self.shared),
        };

        match self.device.open().await {
            Ok(stream) => {
                {
                    let mut inner = self.shared.inner.lock().unwrap();
                    inner.stream = Some(stream);
                    inner.stage = CaptureStage::Live;
                }
                self.shared.stage_tx.send_replace(CaptureStage::Live);
                debug!("capture device acquired");
                Ok(())
            }
            Err(err) => {
                {
                    let mut inner = self.shared.inner.lock().unwrap();
                    inner.stage = CaptureStage::Idle;
                }
                self.shared.stage_tx.send_replace(CaptureStage::Idle);
                warn!(error = %err, "capture device could not be acquired");
                Err(err)
            }
        }
    }

    /// Start the capture countdown. The frame freezes when it reaches zero;
    /// arming with zero seconds captures on the next scheduler tick.
    pub fn arm(&mut self, countdown_seconds: u32) -> Result<(), CaptureError> {
        {
            let mut inner = self.shared.inner.lock().unwrap();
            if inner.stage != CaptureStage::Live {
                return Err(CaptureError::InvalidStage {
                    operation: "arm",
                    stage: inner.stage,
                });
            }
            inner.stage = CaptureStage::Armed;
        }
        self.shared.stage_tx.send_replace(CaptureStage::Armed);
        self.shared.countdown_tx.send_replace(countdown_seconds);

        let (cancel_tx, cancel_rx) = watch::channel(false);
        self.cancel_tx = Some(cancel_tx);
        self.countdown_task = Some(spawn_countdown(
            Arc::clone(&self.shared),
            cancel_rx,
            countdown_seconds,
        ));
        debug!(countdown_seconds, "capture armed");
        Ok(())
    }

    /// Abort the countdown or leave live preview. Releases the device and
    /// discards nothing but the countdown; no frame is frozen.
    pub fn cancel(&mut self) -> Result<(), CaptureError> {
        {
            let mut inner = self.shared.inner.lock().unwrap();
            match inner.stage {
                CaptureStage::Live | CaptureStage::Armed => {
                    inner.stream = None;
                    inner.stage = CaptureStage::Idle;
                }
                CaptureStage::Idle => return Ok(()),
                stage => {
                    return Err(CaptureError::InvalidStage {
                        operation: "cancel",
                        stage,
                    });
                }
            }
        }
        if let Some(cancel) = self.cancel_tx.take() {
            let _ = cancel.send(true);
        }
        if let Some(task) = self.countdown_task.take() {
            task.abort();
        }
        self.shared.stage_tx.send_replace(CaptureStage::Idle);
        self.shared.countdown_tx.send_replace(0);
        debug!("capture cancelled; device released");
        Ok(())
    }

    /// Freeze the current frame immediately, without a countdown.
    pub fn capture(&mut self) -> Result<(), CaptureError> {
        let mut inner = self.shared.inner.lock().unwrap();
        if inner.stage != CaptureStage::Live {
            return Err(CaptureError::InvalidStage {
                operation: "capture",
                stage: inner.stage,
            });
        }
        let result = freeze(&mut inner);
        let stage = inner.stage;
        drop(inner);
        self.shared.stage_tx.send_replace(stage);
        result
    }

    /// Hand the frozen sample to the caller and return to Idle.
    pub fn take_sample(&mut self) -> Result<FaceSample, CaptureError> {
        let mut inner = self.shared.inner.lock().unwrap();
        if inner.stage != CaptureStage::Captured {
            return Err(CaptureError::InvalidStage {
                operation: "take_sample",
                stage: inner.stage,
            });
        }
        let sample = inner.sample.take().ok_or(CaptureError::InvalidStage {
            operation: "take_sample",
            stage: CaptureStage::Captured,
        })?;
        inner.stage = CaptureStage::Idle;
        drop(inner);
        self.shared.stage_tx.send_replace(CaptureStage::Idle);
        Ok(sample)
    }
}

impl Drop for CaptureResource {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel_tx.take() {
            let _ = cancel.send(true);
        }
        if let Some(task) = self.countdown_task.take() {
            task.abort();
        }
        if let Ok(mut inner) = self.shared.inner.lock() {
            inner.stream = None;
            inner.stage = CaptureStage::Idle;
        }
    }
}

struct AcquireReset {
    shared: Arc<CaptureShared>,
}

impl Drop for AcquireReset {
    fn drop(&mut self) {
        if let Ok(mut inner) = self.shared.inner.lock() {
            if inner.stage == CaptureStage::Acquiring {
                inner.stage = CaptureStage::Idle;
                self.shared.stage_tx.send_replace(CaptureStage::Idle);
            }
        }
    }
}

/// Freeze the latest frame. The stream is consumed either way, so the device
/// is released even when encoding fails.
fn freeze(inner: &mut CaptureInner) -> Result<(), CaptureError> {
    let mut stream = inner.stream.take().ok_or(CaptureError::InvalidStage {
        operation: "capture",
        stage: CaptureStage::Idle,
    })?;
    let frame = stream.latest_frame();
    drop(stream);

    match frame.encode() {
        Ok(sample) => {
            debug!(
                digest = %sample.digest(),
                width = sample.width,
                height = sample.height,
                "face sample frozen"
            );
            inner.sample = Some(sample);
            inner.stage = CaptureStage::Captured;
            Ok(())
        }
        Err(err) => {
            inner.stage = CaptureStage::Idle;
            Err(err)
        }
    }
}

fn spawn_countdown(
    shared: Arc<CaptureShared>,
    mut cancel_rx: watch::Receiver<bool>,
    countdown_seconds: u32,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut remaining = countdown_seconds;
        while remaining > 0 {
            tokio::select! {
                _ = tokio::time::sleep(Duration::from_secs(1)) => {
                    remaining -= 1;
                    shared.countdown_tx.send_replace(remaining);
                }
                // a cancel signal, or the resource going away entirely
                _ = cancel_rx.changed() => return,
            }
        }

        // Take the same lock cancel() takes: if the stage is no longer Armed
        // by the time we get it, a cancel won the race and no frame freezes.
        let mut inner = shared.inner.lock().unwrap();
        if inner.stage != CaptureStage::Armed {
            return;
        }
        let result = freeze(&mut inner);
        let stage = inner.stage;
        drop(inner);
        shared.stage_tx.send_replace(stage);
        if let Err(err) = result {
            shared.countdown_tx.send_replace(0);
            warn!(error = %err, "countdown capture failed");
        }
    })
}
