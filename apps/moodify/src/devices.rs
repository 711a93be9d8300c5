use std::path::PathBuf;

use async_trait::async_trait;
use capture::{
    CameraPreview, CameraSource, DeviceError, DeviceHandle, DeviceKind, MicrophoneSource,
    Recorder, RecorderOutput, StillFrame,
};
use tracing::debug;

/// Camera whose "sensor" is an image file or a `data:` URL stored in a file.
pub struct FileCamera {
    path: PathBuf,
}

impl FileCamera {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

#[async_trait]
impl CameraSource for FileCamera {
    async fn open_preview(&self) -> Result<Box<dyn CameraPreview>, DeviceError> {
        if !tokio::fs::try_exists(&self.path).await.unwrap_or(false) {
            return Err(DeviceError::Unavailable(DeviceKind::Camera));
        }
        Ok(Box::new(FilePreview {
            path: self.path.clone(),
        }))
    }
}

struct FilePreview {
    path: PathBuf,
}

impl DeviceHandle for FilePreview {
    fn kind(&self) -> DeviceKind {
        DeviceKind::Camera
    }

    fn release(&mut self) {
        debug!(path = %self.path.display(), "file camera closed");
    }
}

#[async_trait]
impl CameraPreview for FilePreview {
    async fn grab_still(&mut self) -> Result<StillFrame, DeviceError> {
        let bytes = tokio::fs::read(&self.path)
            .await
            .map_err(|err| capture_failed(DeviceKind::Camera, err))?;
        if bytes.starts_with(b"data:") {
            let url = String::from_utf8_lossy(&bytes);
            return StillFrame::from_data_url(url.trim());
        }
        let mime_type = mime_guess::from_path(&self.path)
            .first_or_octet_stream()
            .to_string();
        StillFrame::new(bytes, mime_type)
    }
}

/// Microphone that "records" by playing back an existing clip.
pub struct FileMicrophone {
    path: PathBuf,
}

impl FileMicrophone {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

#[async_trait]
impl MicrophoneSource for FileMicrophone {
    async fn start_recording(&self) -> Result<Box<dyn Recorder>, DeviceError> {
        if !tokio::fs::try_exists(&self.path).await.unwrap_or(false) {
            return Err(DeviceError::Unavailable(DeviceKind::Microphone));
        }
        Ok(Box::new(FileRecorder {
            path: self.path.clone(),
        }))
    }
}

struct FileRecorder {
    path: PathBuf,
}

impl DeviceHandle for FileRecorder {
    fn kind(&self) -> DeviceKind {
        DeviceKind::Microphone
    }

    fn release(&mut self) {
        debug!(path = %self.path.display(), "file microphone closed");
    }
}

#[async_trait]
impl Recorder for FileRecorder {
    async fn finish(&mut self) -> Result<RecorderOutput, DeviceError> {
        let bytes = tokio::fs::read(&self.path)
            .await
            .map_err(|err| capture_failed(DeviceKind::Microphone, err))?;
        let mime_type = mime_guess::from_path(&self.path)
            .first_or_octet_stream()
            .to_string();
        Ok(RecorderOutput::Encoded { bytes, mime_type })
    }
}

fn capture_failed(kind: DeviceKind, err: std::io::Error) -> DeviceError {
    DeviceError::CaptureFailed {
        kind,
        reason: err.to_string(),
    }
}
