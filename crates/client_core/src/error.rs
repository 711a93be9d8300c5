use capture::DeviceError;
use shared::{domain::Mode, error::ApiException};
use thiserror::Error;

use crate::acquisition::ModalPhase;

/// Problems caught before any request is issued.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Please enter some text.")]
    EmptyText,
    #[error("File size must be under {}MB", mebibytes(.limit))]
    FileTooLarge { size: u64, limit: u64 },
    #[error("{filename} is not an accepted {mode} file ({accept})")]
    UnsupportedFileType {
        mode: Mode,
        filename: String,
        accept: &'static str,
    },
    #[error("{filename} is empty or not valid UTF-8 text.")]
    UnreadableTextFile { filename: String },
    #[error("No image captured.")]
    NoImageCaptured,
    #[error("No audio recorded.")]
    NoAudioRecorded,
    #[error("cannot {action} in {mode} mode while the modal is {phase}")]
    InvalidModalState {
        mode: Mode,
        action: &'static str,
        phase: ModalPhase,
    },
}

fn mebibytes(bytes: &u64) -> u64 {
    bytes / (1024 * 1024)
}

#[derive(Debug, Error)]
pub enum SubmissionError {
    #[error("transport failure: {0}")]
    Transport(#[source] reqwest::Error),
    #[error(transparent)]
    Rejected(#[from] ApiException),
    #[error("malformed response: {0}")]
    Malformed(String),
    #[error("refusing to transmit an empty {0} payload")]
    EmptyPayload(Mode),
}

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Device(#[from] DeviceError),
    #[error(transparent)]
    Submission(#[from] SubmissionError),
    #[error("failed to read upload: {0}")]
    Io(#[from] std::io::Error),
}
