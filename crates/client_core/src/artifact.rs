//! Input artifacts and the per-mode upload constraint.

use std::path::Path;

use capture::{AudioClip, StillFrame};
use shared::domain::Mode;
use tracing::debug;

use crate::error::{OrchestratorError, ValidationError};

pub const MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

pub const CAPTURED_IMAGE_STEM: &str = "captured_image";
pub const RECORDED_AUDIO_STEM: &str = "recorded_audio";

/// A file the user picked, held in memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    pub filename: String,
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    pub fn new(filename: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            bytes,
        }
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    /// Reads `path` after checking its metadata against `constraint`, so an
    /// oversized file is never loaded.
    pub async fn read(
        path: &Path,
        constraint: &UploadConstraint,
    ) -> Result<Self, OrchestratorError> {
        let metadata = tokio::fs::metadata(path).await?;
        constraint.check_size(metadata.len())?;

        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        constraint.check_type(&filename)?;

        let bytes = tokio::fs::read(path).await?;
        debug!(file = %filename, bytes = bytes.len(), "read upload from disk");
        let file = Self::new(filename, bytes);
        constraint.validate(&file)?;
        Ok(file)
    }
}

/// Per-mode allow-list plus size ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadConstraint {
    mode: Mode,
    max_bytes: u64,
}

impl UploadConstraint {
    pub fn for_mode(mode: Mode) -> Self {
        Self::with_limit(mode, MAX_UPLOAD_BYTES)
    }

    /// A tighter limit is honoured; anything above [`MAX_UPLOAD_BYTES`] is clamped to it.
    pub fn with_limit(mode: Mode, max_bytes: u64) -> Self {
        Self {
            mode,
            max_bytes: max_bytes.min(MAX_UPLOAD_BYTES),
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn max_bytes(&self) -> u64 {
        self.max_bytes
    }

    pub fn check_size(&self, size: u64) -> Result<(), ValidationError> {
        if size > self.max_bytes {
            return Err(ValidationError::FileTooLarge {
                size,
                limit: self.max_bytes,
            });
        }
        Ok(())
    }

    pub fn accepts(&self, filename: &str) -> bool {
        match self.mode {
            Mode::Text => has_extension(filename, &["txt"]),
            Mode::Speech => has_extension(filename, &["wav", "mp4"]),
            Mode::Face => mime_guess::from_path(filename)
                .iter()
                .any(|mime| mime.type_() == mime_guess::mime::IMAGE),
        }
    }

    pub fn check_type(&self, filename: &str) -> Result<(), ValidationError> {
        if self.accepts(filename) {
            return Ok(());
        }
        Err(ValidationError::UnsupportedFileType {
            mode: self.mode,
            filename: filename.to_string(),
            accept: self.mode.accept_attribute(),
        })
    }

    /// Size is checked first: an oversized file is rejected whatever its type.
    pub fn validate(&self, file: &UploadedFile) -> Result<(), ValidationError> {
        self.check_size(file.size())?;
        self.check_type(&file.filename)
    }
}

fn has_extension(filename: &str, allowed: &[&str]) -> bool {
    Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| allowed.iter().any(|a| ext.eq_ignore_ascii_case(a)))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactOrigin {
    Captured,
    Uploaded,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextArtifact {
    Typed(String),
    File { filename: String, text: String },
}

impl TextArtifact {
    /// Builds a typed artifact, or `None` when the buffer trims to nothing.
    pub fn typed(buffer: &str) -> Option<Self> {
        let trimmed = buffer.trim();
        (!trimmed.is_empty()).then(|| TextArtifact::Typed(trimmed.to_string()))
    }

    pub fn from_upload(file: UploadedFile) -> Result<Self, ValidationError> {
        let UploadedFile { filename, bytes } = file;
        let text = match String::from_utf8(bytes) {
            Ok(text) if !text.trim().is_empty() => text.trim().to_string(),
            _ => return Err(ValidationError::UnreadableTextFile { filename }),
        };
        Ok(TextArtifact::File { filename, text })
    }

    pub fn text(&self) -> &str {
        match self {
            TextArtifact::Typed(text) | TextArtifact::File { text, .. } => text,
        }
    }

    pub fn origin(&self) -> ArtifactOrigin {
        match self {
            TextArtifact::Typed(_) => ArtifactOrigin::Captured,
            TextArtifact::File { .. } => ArtifactOrigin::Uploaded,
        }
    }
}

/// Image or audio bytes plus what the multipart part needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryArtifact {
    pub filename: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
    pub origin: ArtifactOrigin,
}

impl BinaryArtifact {
    pub fn from_still(frame: StillFrame) -> Self {
        let filename = format!("{CAPTURED_IMAGE_STEM}.{}", frame.extension());
        let mime_type = frame.mime_type().to_string();
        Self {
            filename,
            mime_type,
            bytes: frame.into_bytes(),
            origin: ArtifactOrigin::Captured,
        }
    }

    pub fn from_clip(clip: AudioClip) -> Self {
        let filename = format!("{RECORDED_AUDIO_STEM}.{}", clip.extension());
        let mime_type = clip.mime_type().to_string();
        Self {
            filename,
            mime_type,
            bytes: clip.into_bytes(),
            origin: ArtifactOrigin::Captured,
        }
    }

    pub fn from_upload(file: UploadedFile) -> Self {
        let mime_type = mime_guess::from_path(&file.filename)
            .first_or_octet_stream()
            .to_string();
        Self {
            filename: file.filename,
            mime_type,
            bytes: file.bytes,
            origin: ArtifactOrigin::Uploaded,
        }
    }
}

/// One unit of input ready for transmission, tagged by modality.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputArtifact {
    Text(TextArtifact),
    Face(BinaryArtifact),
    Speech(BinaryArtifact),
}

impl InputArtifact {
    pub fn mode(&self) -> Mode {
        match self {
            InputArtifact::Text(_) => Mode::Text,
            InputArtifact::Face(_) => Mode::Face,
            InputArtifact::Speech(_) => Mode::Speech,
        }
    }

    pub fn is_ready(&self) -> bool {
        match self {
            InputArtifact::Text(text) => !text.text().trim().is_empty(),
            InputArtifact::Face(binary) | InputArtifact::Speech(binary) => !binary.bytes.is_empty(),
        }
    }

    pub fn origin(&self) -> ArtifactOrigin {
        match self {
            InputArtifact::Text(text) => text.origin(),
            InputArtifact::Face(binary) | InputArtifact::Speech(binary) => binary.origin,
        }
    }

    pub fn payload_len(&self) -> usize {
        match self {
            InputArtifact::Text(text) => text.text().len(),
            InputArtifact::Face(binary) | InputArtifact::Speech(binary) => binary.bytes.len(),
        }
    }

    /// Validates `file` against `constraint` and turns it into an artifact of the constraint's mode.
    pub fn from_upload(
        file: UploadedFile,
        constraint: &UploadConstraint,
    ) -> Result<Self, ValidationError> {
        constraint.validate(&file)?;
        Ok(match constraint.mode() {
            Mode::Text => InputArtifact::Text(TextArtifact::from_upload(file)?),
            Mode::Face => InputArtifact::Face(BinaryArtifact::from_upload(file)),
            Mode::Speech => InputArtifact::Speech(BinaryArtifact::from_upload(file)),
        })
    }
}

#[cfg(test)]
#[path = "tests/artifact_tests.rs"]
mod tests;
