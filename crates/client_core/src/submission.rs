use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use reqwest::{
    multipart::{Form, Part},
    Client, Response,
};
use serde::de::DeserializeOwned;
use shared::{
    domain::Mode,
    error::{ApiErrorBody, ApiException},
    protocol::{
        endpoint_path, MediaEmotionResponse, TextEmotionRequest, TextEmotionResponse,
        UPLOAD_FIELD,
    },
};
use tracing::{debug, info, warn};

use crate::{
    artifact::{BinaryArtifact, InputArtifact},
    config::Settings,
    error::SubmissionError,
};

pub type SubmissionResult = Result<EmotionReport, SubmissionError>;

/// Successful analysis outcome. Face and speech shapes are backend-defined.
#[derive(Debug, Clone, PartialEq)]
pub enum EmotionReport {
    Text(TextEmotionResponse),
    Face(MediaEmotionResponse),
    Speech(MediaEmotionResponse),
}

impl EmotionReport {
    pub fn mode(&self) -> Mode {
        match self {
            EmotionReport::Text(_) => Mode::Text,
            EmotionReport::Face(_) => Mode::Face,
            EmotionReport::Speech(_) => Mode::Speech,
        }
    }

    pub fn emotion(&self) -> Option<&str> {
        match self {
            EmotionReport::Text(response) => Some(&response.emotion),
            EmotionReport::Face(response) | EmotionReport::Speech(response) => response.emotion(),
        }
    }
}

/// The three remote analysis operations.
#[async_trait]
pub trait EmotionBackend: Send + Sync {
    async fn text_emotion(
        &self,
        request: TextEmotionRequest,
    ) -> Result<TextEmotionResponse, SubmissionError>;
    async fn facial_emotion(
        &self,
        upload: &BinaryArtifact,
    ) -> Result<MediaEmotionResponse, SubmissionError>;
    async fn speech_emotion(
        &self,
        upload: &BinaryArtifact,
    ) -> Result<MediaEmotionResponse, SubmissionError>;
}

pub struct HttpEmotionBackend {
    http: Client,
    base_url: String,
}

impl HttpEmotionBackend {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(http: Client, base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .build()?;
        Ok(Self::with_client(http, settings.api_base_url.clone()))
    }

    fn endpoint(&self, mode: Mode) -> String {
        format!("{}{}", self.base_url, endpoint_path(mode))
    }

    async fn post_upload(
        &self,
        mode: Mode,
        upload: &BinaryArtifact,
    ) -> Result<MediaEmotionResponse, SubmissionError> {
        let part = Part::bytes(upload.bytes.clone())
            .file_name(upload.filename.clone())
            .mime_str(&upload.mime_type)
            .map_err(SubmissionError::Transport)?;
        let form = Form::new().part(UPLOAD_FIELD, part);

        let response = self
            .http
            .post(self.endpoint(mode))
            .multipart(form)
            .send()
            .await
            .map_err(SubmissionError::Transport)?;
        read_json(response).await
    }
}

#[async_trait]
impl EmotionBackend for HttpEmotionBackend {
    async fn text_emotion(
        &self,
        request: TextEmotionRequest,
    ) -> Result<TextEmotionResponse, SubmissionError> {
        let response = self
            .http
            .post(self.endpoint(Mode::Text))
            .json(&request)
            .send()
            .await
            .map_err(SubmissionError::Transport)?;
        read_json(response).await
    }

    async fn facial_emotion(
        &self,
        upload: &BinaryArtifact,
    ) -> Result<MediaEmotionResponse, SubmissionError> {
        self.post_upload(Mode::Face, upload).await
    }

    async fn speech_emotion(
        &self,
        upload: &BinaryArtifact,
    ) -> Result<MediaEmotionResponse, SubmissionError> {
        self.post_upload(Mode::Speech, upload).await
    }
}

async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, SubmissionError> {
    let status = response.status();
    let body = response
        .bytes()
        .await
        .map_err(SubmissionError::Transport)?;

    if !status.is_success() {
        let error_body = serde_json::from_slice::<ApiErrorBody>(&body).unwrap_or_default();
        return Err(ApiException::new(status.as_u16(), error_body).into());
    }

    serde_json::from_slice(&body).map_err(|err| SubmissionError::Malformed(err.to_string()))
}

/// Turns a ready artifact into exactly one backend call. Holds no state between calls.
#[derive(Clone)]
pub struct SubmissionService {
    backend: Arc<dyn EmotionBackend>,
}

impl SubmissionService {
    pub fn new(backend: Arc<dyn EmotionBackend>) -> Self {
        Self { backend }
    }

    pub async fn submit(&self, artifact: &InputArtifact) -> SubmissionResult {
        let mode = artifact.mode();
        info!(%mode, bytes = artifact.payload_len(), "submitting artifact");

        let result = self.dispatch(artifact).await;
        match &result {
            Ok(report) => debug!(%mode, emotion = ?report.emotion(), "submission succeeded"),
            Err(err) => warn!(%mode, error = %err, "submission failed"),
        }
        result
    }

    async fn dispatch(&self, artifact: &InputArtifact) -> SubmissionResult {
        match artifact {
            InputArtifact::Text(text) => {
                let request = TextEmotionRequest {
                    text: text.text().trim().to_string(),
                };
                self.backend
                    .text_emotion(request)
                    .await
                    .map(EmotionReport::Text)
            }
            InputArtifact::Face(upload) => {
                ensure_payload(Mode::Face, upload)?;
                self.backend
                    .facial_emotion(upload)
                    .await
                    .map(EmotionReport::Face)
            }
            InputArtifact::Speech(upload) => {
                ensure_payload(Mode::Speech, upload)?;
                self.backend
                    .speech_emotion(upload)
                    .await
                    .map(EmotionReport::Speech)
            }
        }
    }
}

fn ensure_payload(mode: Mode, upload: &BinaryArtifact) -> Result<(), SubmissionError> {
    if upload.bytes.is_empty() {
        return Err(SubmissionError::EmptyPayload(mode));
    }
    Ok(())
}

#[cfg(test)]
#[path = "tests/submission_tests.rs"]
mod tests;
