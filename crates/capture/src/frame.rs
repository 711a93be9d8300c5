use base64::{engine::general_purpose::STANDARD, Engine as _};

use crate::DeviceError;

/// A single encoded still taken from a camera preview.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StillFrame {
    bytes: Vec<u8>,
    mime_type: String,
}

impl StillFrame {
    pub fn new(bytes: Vec<u8>, mime_type: impl Into<String>) -> Result<Self, DeviceError> {
        let mime_type = mime_type.into();
        if !mime_type.starts_with("image/") {
            return Err(DeviceError::InvalidFrame(format!(
                "unexpected content type {mime_type}"
            )));
        }
        if bytes.is_empty() {
            return Err(DeviceError::InvalidFrame("frame is empty".into()));
        }
        Ok(Self { bytes, mime_type })
    }

    /// Parses the `data:image/<fmt>;base64,<payload>` form browsers return for screenshots.
    pub fn from_data_url(url: &str) -> Result<Self, DeviceError> {
        let rest = url
            .trim()
            .strip_prefix("data:")
            .ok_or_else(|| DeviceError::InvalidFrame("not a data url".into()))?;
        let (header, payload) = rest
            .split_once(',')
            .ok_or_else(|| DeviceError::InvalidFrame("data url has no payload".into()))?;
        let mime_type = header
            .strip_suffix(";base64")
            .ok_or_else(|| DeviceError::InvalidFrame("data url is not base64 encoded".into()))?;
        let bytes = STANDARD
            .decode(payload)
            .map_err(|err| DeviceError::InvalidFrame(err.to_string()))?;
        Self::new(bytes, mime_type)
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn extension(&self) -> &'static str {
        match self.mime_type.as_str() {
            "image/png" => "png",
            "image/webp" => "webp",
            "image/gif" => "gif",
            "image/bmp" => "bmp",
            _ => "jpg",
        }
    }
}
