use std::fmt;

use serde::{Deserialize, Serialize};

/// Input modality the user submits for emotion analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    #[default]
    Text,
    Face,
    Speech,
}

impl Mode {
    pub const ALL: [Mode; 3] = [Mode::Text, Mode::Face, Mode::Speech];

    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Text => "text",
            Mode::Face => "face",
            Mode::Speech => "speech",
        }
    }

    /// Label of the button that opens the acquisition modal.
    pub fn capture_label(self) -> &'static str {
        match self {
            Mode::Text => "Add Text",
            Mode::Face => "Capture Image",
            Mode::Speech => "Record Audio",
        }
    }

    pub fn upload_label(self) -> &'static str {
        match self {
            Mode::Text => "Upload Text File",
            Mode::Face => "Upload Image",
            Mode::Speech => "Upload Audio File",
        }
    }

    /// Value for the file input's `accept` attribute.
    pub fn accept_attribute(self) -> &'static str {
        match self {
            Mode::Text => ".txt",
            Mode::Face => "image/*",
            Mode::Speech => ".wav, .mp4",
        }
    }

    /// Noun used in user-facing submission messages.
    pub fn subject(self) -> &'static str {
        match self {
            Mode::Text => "text",
            Mode::Face => "image",
            Mode::Speech => "audio",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Routes the orchestrator may navigate to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "route", content = "state", rename_all = "snake_case")]
pub enum Route {
    Results(ResultsState),
}

impl Route {
    pub fn path(&self) -> &'static str {
        match self {
            Route::Results(_) => "/results",
        }
    }
}

/// Opaque state handed to the results view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultsState {
    pub emotion: String,
    pub recommendations: Vec<serde_json::Value>,
}
