use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error body returned by the analysis backend on non-success responses.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl ApiErrorBody {
    pub fn message(&self) -> Option<&str> {
        self.error.as_deref().or(self.detail.as_deref())
    }
}

#[derive(Debug, Error)]
#[error("backend rejected request with status {status}: {}", describe(.body))]
pub struct ApiException {
    pub status: u16,
    pub body: ApiErrorBody,
}

fn describe(body: &ApiErrorBody) -> &str {
    body.message().unwrap_or("no details")
}

impl ApiException {
    pub fn new(status: u16, body: ApiErrorBody) -> Self {
        Self { status, body }
    }
}
