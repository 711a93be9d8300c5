use std::fmt;

use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

mod audio;
mod frame;

pub use audio::{verify_wav, AudioClip, PcmRecording, RecorderOutput};
pub use frame::StillFrame;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceKind {
    Camera,
    Microphone,
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceKind::Camera => f.write_str("camera"),
            DeviceKind::Microphone => f.write_str("microphone"),
        }
    }
}

#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("{0} is unavailable")]
    Unavailable(DeviceKind),
    #[error("permission to use the {0} was denied")]
    PermissionDenied(DeviceKind),
    #[error("{kind} capture failed: {reason}")]
    CaptureFailed { kind: DeviceKind, reason: String },
    #[error("captured frame is not a usable image: {0}")]
    InvalidFrame(String),
    #[error("recorded audio is not decodable: {0}")]
    InvalidAudio(String),
    #[error("failed to encode recording as wav: {0}")]
    Wav(#[from] hound::Error),
}

impl DeviceError {
    pub fn kind(&self) -> DeviceKind {
        match self {
            DeviceError::Unavailable(kind)
            | DeviceError::PermissionDenied(kind)
            | DeviceError::CaptureFailed { kind, .. } => *kind,
            DeviceError::InvalidFrame(_) => DeviceKind::Camera,
            DeviceError::InvalidAudio(_) | DeviceError::Wav(_) => DeviceKind::Microphone,
        }
    }
}

/// A held capture stream. Implementations stop the underlying hardware in `release`.
pub trait DeviceHandle: Send {
    fn kind(&self) -> DeviceKind;
    fn release(&mut self);
}

#[async_trait]
pub trait CameraPreview: DeviceHandle {
    async fn grab_still(&mut self) -> Result<StillFrame, DeviceError>;
}

#[async_trait]
pub trait Recorder: DeviceHandle {
    /// Ends the recording and hands back the recorder's native output.
    async fn finish(&mut self) -> Result<RecorderOutput, DeviceError>;
}

#[async_trait]
pub trait CameraSource: Send + Sync {
    async fn open_preview(&self) -> Result<Box<dyn CameraPreview>, DeviceError>;
}

#[async_trait]
pub trait MicrophoneSource: Send + Sync {
    async fn start_recording(&self) -> Result<Box<dyn Recorder>, DeviceError>;
}

pub struct MissingCamera;

#[async_trait]
impl CameraSource for MissingCamera {
    async fn open_preview(&self) -> Result<Box<dyn CameraPreview>, DeviceError> {
        Err(DeviceError::Unavailable(DeviceKind::Camera))
    }
}

pub struct MissingMicrophone;

#[async_trait]
impl MicrophoneSource for MissingMicrophone {
    async fn start_recording(&self) -> Result<Box<dyn Recorder>, DeviceError> {
        Err(DeviceError::Unavailable(DeviceKind::Microphone))
    }
}

/// Scoped ownership of a device handle.
///
/// The handle is released exactly once: either through [`DeviceLease::release`]
/// or when the lease is dropped, whichever comes first.
pub struct DeviceLease<H: DeviceHandle + ?Sized> {
    handle: Box<H>,
    released: bool,
}

impl<H: DeviceHandle + ?Sized> DeviceLease<H> {
    pub fn new(handle: Box<H>) -> Self {
        debug!(device = %handle.kind(), "capture device acquired");
        Self {
            handle,
            released: false,
        }
    }

    pub fn kind(&self) -> DeviceKind {
        self.handle.kind()
    }

    pub fn handle_mut(&mut self) -> &mut H {
        &mut self.handle
    }

    pub fn release(mut self) {
        self.release_once();
    }

    fn release_once(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        self.handle.release();
        debug!(device = %self.handle.kind(), "capture device released");
    }
}

impl<H: DeviceHandle + ?Sized> Drop for DeviceLease<H> {
    fn drop(&mut self) {
        self.release_once();
    }
}

impl<H: DeviceHandle + ?Sized> fmt::Debug for DeviceLease<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceLease")
            .field("kind", &self.handle.kind())
            .field("released", &self.released)
            .finish()
    }
}

pub async fn acquire_camera(
    source: &dyn CameraSource,
) -> Result<DeviceLease<dyn CameraPreview>, DeviceError> {
    let handle = source.open_preview().await?;
    Ok(DeviceLease::new(handle))
}

pub async fn acquire_microphone(
    source: &dyn MicrophoneSource,
) -> Result<DeviceLease<dyn Recorder>, DeviceError> {
    let handle = source.start_recording().await?;
    Ok(DeviceLease::new(handle))
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
