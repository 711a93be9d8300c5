//! Acquisition modals, one variant per mode.
//!
//! A [`Workspace`] holds everything transient for the active mode: the modal
//! state, the text draft and the ready artifact. Device leases live inside the
//! modal variants, so replacing or closing a modal releases whatever it held.

use std::fmt;

use capture::{AudioClip, CameraPreview, DeviceLease, Recorder, StillFrame};
use shared::domain::Mode;

use crate::{
    artifact::{ArtifactOrigin, BinaryArtifact, InputArtifact, TextArtifact},
    error::ValidationError,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModalPhase {
    Closed,
    Open,
    /// A capture device is held: camera preview live or recorder running.
    Acquiring,
    /// A still is held for confirm/retake; the camera is released.
    Reviewing,
}

impl fmt::Display for ModalPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ModalPhase::Closed => "closed",
            ModalPhase::Open => "open",
            ModalPhase::Acquiring => "acquiring",
            ModalPhase::Reviewing => "reviewing",
        };
        f.write_str(name)
    }
}

#[derive(Debug)]
pub enum TextModal {
    Closed,
    Open,
}

#[derive(Debug)]
pub enum FaceModal {
    Closed,
    Open,
    Previewing(DeviceLease<dyn CameraPreview>),
    /// A still is being grabbed; the caller holds the lease until it returns.
    Capturing,
    Reviewing(StillFrame),
}

#[derive(Debug)]
pub enum SpeechModal {
    Closed,
    Open,
    Recording(DeviceLease<dyn Recorder>),
    /// The recorder is finishing; the caller holds the lease until it returns.
    Stopping,
}

#[derive(Debug)]
pub enum Workspace {
    Text {
        modal: TextModal,
        draft: String,
        artifact: Option<TextArtifact>,
    },
    Face {
        modal: FaceModal,
        artifact: Option<BinaryArtifact>,
    },
    Speech {
        modal: SpeechModal,
        artifact: Option<BinaryArtifact>,
    },
}

impl Workspace {
    pub fn new(mode: Mode) -> Self {
        match mode {
            Mode::Text => Workspace::Text {
                modal: TextModal::Closed,
                draft: String::new(),
                artifact: None,
            },
            Mode::Face => Workspace::Face {
                modal: FaceModal::Closed,
                artifact: None,
            },
            Mode::Speech => Workspace::Speech {
                modal: SpeechModal::Closed,
                artifact: None,
            },
        }
    }

    pub fn mode(&self) -> Mode {
        match self {
            Workspace::Text { .. } => Mode::Text,
            Workspace::Face { .. } => Mode::Face,
            Workspace::Speech { .. } => Mode::Speech,
        }
    }

    pub fn phase(&self) -> ModalPhase {
        match self {
            Workspace::Text {
                modal: TextModal::Closed,
                ..
            }
            | Workspace::Face {
                modal: FaceModal::Closed,
                ..
            }
            | Workspace::Speech {
                modal: SpeechModal::Closed,
                ..
            } => ModalPhase::Closed,
            Workspace::Text {
                modal: TextModal::Open,
                ..
            }
            | Workspace::Face {
                modal: FaceModal::Open,
                ..
            }
            | Workspace::Speech {
                modal: SpeechModal::Open,
                ..
            } => ModalPhase::Open,
            Workspace::Face {
                modal: FaceModal::Previewing(_) | FaceModal::Capturing,
                ..
            }
            | Workspace::Speech {
                modal: SpeechModal::Recording(_) | SpeechModal::Stopping,
                ..
            } => ModalPhase::Acquiring,
            Workspace::Face {
                modal: FaceModal::Reviewing(_),
                ..
            } => ModalPhase::Reviewing,
        }
    }

    pub fn holds_device(&self) -> bool {
        self.phase() == ModalPhase::Acquiring
    }

    pub fn artifact(&self) -> Option<InputArtifact> {
        match self {
            Workspace::Text { artifact, .. } => artifact.clone().map(InputArtifact::Text),
            Workspace::Face { artifact, .. } => artifact.clone().map(InputArtifact::Face),
            Workspace::Speech { artifact, .. } => artifact.clone().map(InputArtifact::Speech),
        }
    }

    pub fn draft(&self) -> Option<&str> {
        match self {
            Workspace::Text { draft, .. } => Some(draft),
            _ => None,
        }
    }

    pub fn reviewed_frame(&self) -> Option<&StillFrame> {
        match self {
            Workspace::Face {
                modal: FaceModal::Reviewing(frame),
                ..
            } => Some(frame),
            _ => None,
        }
    }

    /// Returns `false` when a modal was already open.
    pub fn open(&mut self) -> bool {
        if self.phase() != ModalPhase::Closed {
            return false;
        }
        match self {
            Workspace::Text { modal, .. } => *modal = TextModal::Open,
            Workspace::Face { modal, .. } => *modal = FaceModal::Open,
            Workspace::Speech { modal, .. } => *modal = SpeechModal::Open,
        }
        true
    }

    /// Closes the modal, releasing any held device. Captured artifacts are
    /// discarded; an uploaded file stays selected. Returns whether a modal was open.
    pub fn close(&mut self) -> bool {
        let was_open = self.phase() != ModalPhase::Closed;
        match self {
            Workspace::Text {
                modal, artifact, ..
            } => {
                *modal = TextModal::Closed;
                if artifact
                    .as_ref()
                    .is_some_and(|a| a.origin() == ArtifactOrigin::Captured)
                {
                    *artifact = None;
                }
            }
            Workspace::Face { modal, artifact } => {
                *modal = FaceModal::Closed;
                drop_captured(artifact);
            }
            Workspace::Speech { modal, artifact } => {
                *modal = SpeechModal::Closed;
                drop_captured(artifact);
            }
        }
        was_open
    }

    /// Back to a fresh workspace for the same mode once a submission has completed.
    pub fn reset(&mut self) {
        *self = Workspace::new(self.mode());
    }

    pub fn set_draft(&mut self, text: &str) -> Result<(), ValidationError> {
        let err = self.invalid("edit text");
        match self {
            Workspace::Text {
                modal: TextModal::Open,
                draft,
                ..
            } => {
                *draft = text.to_string();
                Ok(())
            }
            _ => Err(err),
        }
    }

    /// Promotes the trimmed draft to the ready artifact.
    pub fn confirm_text(&mut self) -> Result<(), ValidationError> {
        let err = self.invalid("send text");
        match self {
            Workspace::Text {
                modal: TextModal::Open,
                draft,
                artifact,
            } => {
                *artifact = Some(TextArtifact::typed(draft).ok_or(ValidationError::EmptyText)?);
                Ok(())
            }
            _ => Err(err),
        }
    }

    /// Checks that `action` may acquire a device right now.
    pub fn ready_to_acquire(&self, mode: Mode, action: &'static str) -> Result<(), ValidationError> {
        if self.mode() == mode && self.phase() == ModalPhase::Open {
            return Ok(());
        }
        Err(self.invalid(action))
    }

    pub fn begin_preview(
        &mut self,
        lease: DeviceLease<dyn CameraPreview>,
    ) -> Result<(), ValidationError> {
        let err = self.invalid("start the camera");
        match self {
            Workspace::Face { modal, .. } if matches!(modal, FaceModal::Open) => {
                *modal = FaceModal::Previewing(lease);
                Ok(())
            }
            _ => Err(err),
        }
    }

    pub fn take_preview(&mut self) -> Result<DeviceLease<dyn CameraPreview>, ValidationError> {
        let err = self.invalid("capture a frame");
        match self {
            Workspace::Face { modal, .. } => match std::mem::replace(modal, FaceModal::Capturing) {
                FaceModal::Previewing(lease) => Ok(lease),
                other => {
                    *modal = other;
                    Err(err)
                }
            },
            _ => Err(err),
        }
    }

    pub fn hold_frame(&mut self, frame: StillFrame) -> Result<(), ValidationError> {
        let err = self.invalid("review a frame");
        match self {
            Workspace::Face { modal, .. } if matches!(modal, FaceModal::Capturing) => {
                *modal = FaceModal::Reviewing(frame);
                Ok(())
            }
            _ => Err(err),
        }
    }

    pub fn discard_frame(&mut self) -> Result<(), ValidationError> {
        let err = self.invalid("retake");
        match self {
            Workspace::Face { modal, .. } if matches!(modal, FaceModal::Reviewing(_)) => {
                *modal = FaceModal::Open;
                Ok(())
            }
            _ => Err(err),
        }
    }

    pub fn confirm_frame(&mut self) -> Result<(), ValidationError> {
        let err = self.invalid("confirm a frame");
        match self {
            Workspace::Face { modal, artifact } => {
                match std::mem::replace(modal, FaceModal::Open) {
                    FaceModal::Reviewing(frame) => {
                        *artifact = Some(BinaryArtifact::from_still(frame));
                        Ok(())
                    }
                    other => {
                        *modal = other;
                        Err(ValidationError::NoImageCaptured)
                    }
                }
            }
            _ => Err(err),
        }
    }

    pub fn begin_recording(
        &mut self,
        lease: DeviceLease<dyn Recorder>,
    ) -> Result<(), ValidationError> {
        let err = self.invalid("start recording");
        match self {
            Workspace::Speech { modal, .. } if matches!(modal, SpeechModal::Open) => {
                *modal = SpeechModal::Recording(lease);
                Ok(())
            }
            _ => Err(err),
        }
    }

    pub fn take_recorder(&mut self) -> Result<DeviceLease<dyn Recorder>, ValidationError> {
        let err = self.invalid("stop recording");
        match self {
            Workspace::Speech { modal, .. } => match std::mem::replace(modal, SpeechModal::Stopping) {
                SpeechModal::Recording(lease) => Ok(lease),
                other => {
                    *modal = other;
                    Err(err)
                }
            },
            _ => Err(err),
        }
    }

    pub fn store_recording(&mut self, clip: AudioClip) -> Result<(), ValidationError> {
        let err = self.invalid("store a recording");
        match self {
            Workspace::Speech { modal, artifact } if matches!(modal, SpeechModal::Stopping) => {
                *modal = SpeechModal::Open;
                *artifact = Some(BinaryArtifact::from_clip(clip));
                Ok(())
            }
            _ => Err(err),
        }
    }

    /// Returns a modal stuck mid-capture to `Open` after the device failed.
    pub fn abandon_capture(&mut self) {
        match self {
            Workspace::Face { modal, .. } if matches!(modal, FaceModal::Capturing) => {
                *modal = FaceModal::Open;
            }
            Workspace::Speech { modal, .. } if matches!(modal, SpeechModal::Stopping) => {
                *modal = SpeechModal::Open;
            }
            _ => {}
        }
    }

    /// Installs an uploaded artifact. Not allowed while a device is held or a
    /// frame is under review.
    pub fn accept_upload(&mut self, upload: InputArtifact) -> Result<(), ValidationError> {
        let err = self.invalid("select a file");
        if !matches!(self.phase(), ModalPhase::Closed | ModalPhase::Open) {
            return Err(err);
        }
        match (self, upload) {
            (Workspace::Text { artifact, .. }, InputArtifact::Text(text)) => {
                *artifact = Some(text);
            }
            (Workspace::Face { artifact, .. }, InputArtifact::Face(binary))
            | (Workspace::Speech { artifact, .. }, InputArtifact::Speech(binary)) => {
                *artifact = Some(binary);
            }
            _ => return Err(err),
        }
        Ok(())
    }

    fn invalid(&self, action: &'static str) -> ValidationError {
        ValidationError::InvalidModalState {
            mode: self.mode(),
            action,
            phase: self.phase(),
        }
    }
}

fn drop_captured(artifact: &mut Option<BinaryArtifact>) {
    if artifact
        .as_ref()
        .is_some_and(|a| a.origin == ArtifactOrigin::Captured)
    {
        *artifact = None;
    }
}
