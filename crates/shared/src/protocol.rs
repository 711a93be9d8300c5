use serde::{Deserialize, Serialize};

use crate::domain::Mode;

pub const TEXT_EMOTION_PATH: &str = "/api/text_emotion/";
pub const FACIAL_EMOTION_PATH: &str = "/api/facial_emotion/";
pub const SPEECH_EMOTION_PATH: &str = "/api/speech_emotion/";

/// Multipart field carrying image and audio bytes.
pub const UPLOAD_FIELD: &str = "file";

pub fn endpoint_path(mode: Mode) -> &'static str {
    match mode {
        Mode::Text => TEXT_EMOTION_PATH,
        Mode::Face => FACIAL_EMOTION_PATH,
        Mode::Speech => SPEECH_EMOTION_PATH,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextEmotionRequest {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextEmotionResponse {
    pub emotion: String,
    #[serde(default)]
    pub recommendations: Vec<serde_json::Value>,
}

/// Face and speech responses are backend-defined; only `emotion` is commonly present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MediaEmotionResponse(pub serde_json::Value);

impl MediaEmotionResponse {
    pub fn emotion(&self) -> Option<&str> {
        self.0.get("emotion").and_then(serde_json::Value::as_str)
    }

    pub fn recommendations(&self) -> Option<&Vec<serde_json::Value>> {
        self.0
            .get("recommendations")
            .and_then(serde_json::Value::as_array)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn text_response_tolerates_missing_recommendations() {
        let parsed: TextEmotionResponse =
            serde_json::from_value(json!({ "emotion": "sadness" })).expect("parse");
        assert_eq!(parsed.emotion, "sadness");
        assert!(parsed.recommendations.is_empty());
    }

    #[test]
    fn media_response_keeps_unknown_fields() {
        let raw = json!({ "emotion": "neutral", "confidence": 0.4, "faces": 1 });
        let parsed: MediaEmotionResponse = serde_json::from_value(raw.clone()).expect("parse");
        assert_eq!(parsed.emotion(), Some("neutral"));
        assert_eq!(serde_json::to_value(&parsed).expect("serialize"), raw);
    }

    #[test]
    fn every_mode_has_its_own_endpoint() {
        assert_eq!(endpoint_path(Mode::Text), "/api/text_emotion/");
        assert_eq!(endpoint_path(Mode::Face), "/api/facial_emotion/");
        assert_eq!(endpoint_path(Mode::Speech), "/api/speech_emotion/");
    }
}
