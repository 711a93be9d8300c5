use std::{fmt, path::Path, sync::Arc};

use capture::{
    acquire_camera, acquire_microphone, CameraPreview, CameraSource, DeviceError, DeviceLease,
    MicrophoneSource, MissingCamera, MissingMicrophone, Recorder,
};
use shared::domain::Mode;
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info, warn};
use uuid::Uuid;

pub mod acquisition;
pub mod artifact;
pub mod config;
pub mod error;
pub mod notification;
pub mod router;
pub mod submission;

pub use acquisition::{ModalPhase, Workspace};
pub use artifact::{
    ArtifactOrigin, BinaryArtifact, InputArtifact, TextArtifact, UploadConstraint, UploadedFile,
    MAX_UPLOAD_BYTES,
};
pub use error::{OrchestratorError, SubmissionError, ValidationError};
pub use notification::{Notification, NotificationKind, Notifier};
pub use router::{Navigator, NoopNavigator, ResultRouter};
pub use submission::{
    EmotionBackend, EmotionReport, HttpEmotionBackend, SubmissionResult, SubmissionService,
};

/// Identifies one modal instance (or the closed state between instances).
/// Renewed on every mode switch, modal open and modal close.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionToken(Uuid);

impl SessionToken {
    fn fresh() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    Completed(EmotionReport),
    /// The modal closed or the mode changed while the request was pending.
    Discarded,
    /// A submission for the same modal instance is still pending.
    Ignored,
}

struct OrchestratorState {
    workspace: Workspace,
    session: SessionToken,
    in_flight: Option<SessionToken>,
}

impl OrchestratorState {
    fn renew_session(&mut self) {
        self.session = SessionToken::fresh();
    }

    fn submitting(&self) -> bool {
        self.in_flight == Some(self.session)
    }
}

/// Coordinates mode selection, acquisition and submission for one input panel.
pub struct Orchestrator {
    submission: SubmissionService,
    router: ResultRouter,
    notifier: Notifier,
    camera: Arc<dyn CameraSource>,
    microphone: Arc<dyn MicrophoneSource>,
    upload_limit: u64,
    inner: Mutex<OrchestratorState>,
}

impl Orchestrator {
    pub fn new(backend: Arc<dyn EmotionBackend>, navigator: Arc<dyn Navigator>) -> Self {
        Self::new_with_dependencies(
            backend,
            navigator,
            Arc::new(MissingCamera),
            Arc::new(MissingMicrophone),
        )
    }

    pub fn new_with_dependencies(
        backend: Arc<dyn EmotionBackend>,
        navigator: Arc<dyn Navigator>,
        camera: Arc<dyn CameraSource>,
        microphone: Arc<dyn MicrophoneSource>,
    ) -> Self {
        let notifier = Notifier::default();
        Self {
            submission: SubmissionService::new(backend),
            router: ResultRouter::new(navigator, notifier.clone()),
            notifier,
            camera,
            microphone,
            upload_limit: MAX_UPLOAD_BYTES,
            inner: Mutex::new(OrchestratorState {
                workspace: Workspace::new(Mode::default()),
                session: SessionToken::fresh(),
                in_flight: None,
            }),
        }
    }

    /// Lowers the upload ceiling. Values above [`MAX_UPLOAD_BYTES`] are clamped.
    pub fn with_upload_limit(mut self, max_bytes: u64) -> Self {
        self.upload_limit = max_bytes.min(MAX_UPLOAD_BYTES);
        self
    }

    pub fn subscribe_notifications(&self) -> broadcast::Receiver<Notification> {
        self.notifier.subscribe()
    }

    pub fn upload_constraint(&self, mode: Mode) -> UploadConstraint {
        UploadConstraint::with_limit(mode, self.upload_limit)
    }

    /// Switches mode, discarding every transient artifact and releasing any
    /// held device. Always succeeds, even when `mode` is already active.
    pub async fn set_mode(&self, mode: Mode) {
        let mut state = self.inner.lock().await;
        let previous = state.workspace.mode();
        let released_device = state.workspace.holds_device();
        state.workspace = Workspace::new(mode);
        state.renew_session();
        state.in_flight = None;
        info!(
            from = %previous,
            to = %mode,
            released_device,
            session = %state.session,
            "input mode switched"
        );
    }

    pub async fn current_mode(&self) -> Mode {
        self.inner.lock().await.workspace.mode()
    }

    pub async fn phase(&self) -> ModalPhase {
        self.inner.lock().await.workspace.phase()
    }

    pub async fn artifact(&self) -> Option<InputArtifact> {
        self.inner.lock().await.workspace.artifact()
    }

    pub async fn text_draft(&self) -> Option<String> {
        self.inner
            .lock()
            .await
            .workspace
            .draft()
            .map(ToString::to_string)
    }

    pub async fn holds_device(&self) -> bool {
        self.inner.lock().await.workspace.holds_device()
    }

    pub async fn is_submitting(&self) -> bool {
        self.inner.lock().await.submitting()
    }

    pub async fn open_modal(&self) {
        let mut state = self.inner.lock().await;
        if state.workspace.open() {
            state.renew_session();
            debug!(mode = %state.workspace.mode(), session = %state.session, "modal opened");
        }
    }

    /// Closes the modal without confirming. Any held device is released.
    pub async fn close_modal(&self) {
        let mut state = self.inner.lock().await;
        if state.workspace.close() {
            state.renew_session();
            debug!(mode = %state.workspace.mode(), "modal closed");
        }
    }

    pub async fn edit_text(&self, text: &str) -> Result<(), OrchestratorError> {
        let result = self.inner.lock().await.workspace.set_draft(text);
        self.check(result)
    }

    /// Confirms the text draft and submits it.
    pub async fn send_text(&self) -> Result<SubmitOutcome, OrchestratorError> {
        let result = self.inner.lock().await.workspace.confirm_text();
        self.check(result)?;
        self.submit().await
    }

    pub async fn start_camera(&self) -> Result<(), OrchestratorError> {
        let token = self.ready_to_acquire(Mode::Face, "start the camera").await?;
        let lease = match acquire_camera(self.camera.as_ref()).await {
            Ok(lease) => lease,
            Err(err) => return Err(self.device_failure(err)),
        };

        let mut state = self.inner.lock().await;
        if state.session != token {
            drop(state);
            debug!("camera became ready after its modal went away; releasing");
            lease.release();
            return Ok(());
        }
        let result = state.workspace.begin_preview(lease);
        drop(state);
        self.check(result)
    }

    /// Takes a still from the live preview, starting the camera first if needed.
    /// The camera is released once the still is held for review.
    pub async fn capture_frame(&self) -> Result<(), OrchestratorError> {
        let needs_camera = {
            let state = self.inner.lock().await;
            state.workspace.mode() == Mode::Face && state.workspace.phase() == ModalPhase::Open
        };
        if needs_camera {
            self.start_camera().await?;
        }

        let (taken, token) = {
            let mut state = self.inner.lock().await;
            (state.workspace.take_preview(), state.session)
        };
        let mut lease: DeviceLease<dyn CameraPreview> = self.check(taken)?;
        let grabbed = lease.handle_mut().grab_still().await;
        lease.release();
        let frame = match grabbed {
            Ok(frame) => frame,
            Err(err) => {
                self.abandon_capture(token).await;
                return Err(self.device_failure(err));
            }
        };

        let mut state = self.inner.lock().await;
        if state.session != token {
            debug!("discarding frame captured for a closed modal");
            return Ok(());
        }
        let result = state.workspace.hold_frame(frame);
        drop(state);
        self.check(result)
    }

    /// Drops the reviewed still and brings the preview back.
    pub async fn retake(&self) -> Result<(), OrchestratorError> {
        let result = self.inner.lock().await.workspace.discard_frame();
        self.check(result)?;
        self.start_camera().await
    }

    /// Finalises the reviewed still and submits it.
    pub async fn confirm_frame(&self) -> Result<SubmitOutcome, OrchestratorError> {
        let result = self.inner.lock().await.workspace.confirm_frame();
        self.check(result)?;
        self.submit().await
    }

    pub async fn start_recording(&self) -> Result<(), OrchestratorError> {
        let token = self
            .ready_to_acquire(Mode::Speech, "start recording")
            .await?;
        let lease = match acquire_microphone(self.microphone.as_ref()).await {
            Ok(lease) => lease,
            Err(err) => return Err(self.device_failure(err)),
        };

        let mut state = self.inner.lock().await;
        if state.session != token {
            drop(state);
            debug!("microphone became ready after its modal went away; releasing");
            lease.release();
            return Ok(());
        }
        let result = state.workspace.begin_recording(lease);
        drop(state);
        self.check(result)
    }

    /// Ends the recording, releases the microphone and materialises the audio.
    pub async fn stop_recording(&self) -> Result<(), OrchestratorError> {
        let (taken, token) = {
            let mut state = self.inner.lock().await;
            (state.workspace.take_recorder(), state.session)
        };
        let mut lease: DeviceLease<dyn Recorder> = self.check(taken)?;
        let finished = lease.handle_mut().finish().await;
        lease.release();
        let clip = match finished.and_then(|output| output.into_clip()) {
            Ok(clip) => clip,
            Err(err) => {
                self.abandon_capture(token).await;
                return Err(self.device_failure(err));
            }
        };

        let mut state = self.inner.lock().await;
        if state.session != token {
            debug!("discarding recording for a closed modal");
            return Ok(());
        }
        debug!(bytes = clip.bytes().len(), mime = clip.mime_type(), "recording stored");
        let result = state.workspace.store_recording(clip);
        drop(state);
        self.check(result)
    }

    pub async fn upload_audio(&self) -> Result<SubmitOutcome, OrchestratorError> {
        let result = {
            let state = self.inner.lock().await;
            match state.workspace.mode() {
                Mode::Speech => Ok(()),
                mode => Err(ValidationError::InvalidModalState {
                    mode,
                    action: "upload audio",
                    phase: state.workspace.phase(),
                }),
            }
        };
        self.check(result)?;
        self.submit().await
    }

    /// Validates `file` against the active mode and makes it the ready artifact.
    pub async fn select_file(&self, file: UploadedFile) -> Result<(), OrchestratorError> {
        let mut state = self.inner.lock().await;
        let mode = state.workspace.mode();
        let filename = file.filename.clone();
        let result = InputArtifact::from_upload(file, &self.upload_constraint(mode))
            .and_then(|artifact| state.workspace.accept_upload(artifact));
        drop(state);

        match &result {
            Ok(()) => info!(%mode, file = %filename, "upload selected"),
            Err(err) => warn!(%mode, file = %filename, error = %err, "upload rejected"),
        }
        self.check(result)
    }

    pub async fn select_file_from_path(&self, path: &Path) -> Result<(), OrchestratorError> {
        let constraint = self.upload_constraint(self.current_mode().await);
        match UploadedFile::read(path, &constraint).await {
            Ok(file) => self.select_file(file).await,
            Err(err) => Err(self.reject(err)),
        }
    }

    /// Submits the ready artifact of the active mode.
    ///
    /// At most one request is in flight per modal instance; a result that
    /// arrives after the modal closed or the mode changed is dropped. A
    /// completed submission closes the modal and clears the artifact whatever
    /// its outcome.
    pub async fn submit(&self) -> Result<SubmitOutcome, OrchestratorError> {
        let (artifact, token) = {
            let mut state = self.inner.lock().await;
            let mode = state.workspace.mode();
            let artifact = match state.workspace.artifact() {
                Some(artifact) if artifact.is_ready() => artifact,
                _ => {
                    drop(state);
                    return Err(self.reject(readiness_error(mode)));
                }
            };
            if state.submitting() {
                debug!(%mode, "submission already in flight; ignoring");
                return Ok(SubmitOutcome::Ignored);
            }
            state.in_flight = Some(state.session);
            (artifact, state.session)
        };

        let mode = artifact.mode();
        let result = self.submission.submit(&artifact).await;

        let mut state = self.inner.lock().await;
        if state.in_flight == Some(token) {
            state.in_flight = None;
        }
        if state.session != token {
            info!(%mode, "discarding stale submission result");
            return Ok(SubmitOutcome::Discarded);
        }
        state.workspace.reset();
        state.renew_session();
        drop(state);

        self.router.route(mode, &result);
        Ok(SubmitOutcome::Completed(result?))
    }

    async fn ready_to_acquire(
        &self,
        mode: Mode,
        action: &'static str,
    ) -> Result<SessionToken, OrchestratorError> {
        let result = {
            let state = self.inner.lock().await;
            state
                .workspace
                .ready_to_acquire(mode, action)
                .map(|()| state.session)
        };
        self.check(result)
    }

    async fn abandon_capture(&self, token: SessionToken) {
        let mut state = self.inner.lock().await;
        if state.session == token {
            state.workspace.abandon_capture();
        }
    }

    fn check<T>(&self, result: Result<T, ValidationError>) -> Result<T, OrchestratorError> {
        result.map_err(|err| self.reject(err))
    }

    fn device_failure(&self, err: DeviceError) -> OrchestratorError {
        warn!(device = %err.kind(), error = %err, "capture device failure");
        self.reject(err)
    }

    /// Surfaces `err` on the notification channel and hands it back.
    fn reject(&self, err: impl Into<OrchestratorError>) -> OrchestratorError {
        let err = err.into();
        let kind = match &err {
            OrchestratorError::Validation(_) | OrchestratorError::Io(_) => {
                NotificationKind::Validation
            }
            OrchestratorError::Device(_) => NotificationKind::Device,
            OrchestratorError::Submission(_) => NotificationKind::SubmissionFailed,
        };
        let message = match &err {
            OrchestratorError::Device(device) => device_message(device),
            other => other.to_string(),
        };
        self.notifier.emit(kind, message);
        err
    }
}

fn readiness_error(mode: Mode) -> ValidationError {
    match mode {
        Mode::Text => ValidationError::EmptyText,
        Mode::Face => ValidationError::NoImageCaptured,
        Mode::Speech => ValidationError::NoAudioRecorded,
    }
}

fn device_message(err: &DeviceError) -> String {
    match err {
        DeviceError::Unavailable(kind) => format!("No {kind} is available."),
        DeviceError::PermissionDenied(kind) => {
            format!("Permission to use the {kind} was denied.")
        }
        other => format!("Could not capture from the {}. Please try again.", other.kind()),
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
