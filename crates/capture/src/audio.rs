use std::io::Cursor;

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};

use crate::DeviceError;

/// Raw interleaved 16-bit samples as delivered by a recorder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PcmRecording {
    pub sample_rate: u32,
    pub channels: u16,
    pub samples: Vec<i16>,
}

impl PcmRecording {
    pub fn encode_wav(&self) -> Result<Vec<u8>, DeviceError> {
        if self.samples.is_empty() {
            return Err(DeviceError::InvalidAudio(
                "recording contains no samples".into(),
            ));
        }
        if self.channels == 0 || self.sample_rate == 0 {
            return Err(DeviceError::InvalidAudio(format!(
                "invalid format: {} channel(s) at {} Hz",
                self.channels, self.sample_rate
            )));
        }

        let spec = WavSpec {
            channels: self.channels,
            sample_rate: self.sample_rate,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let mut wav = Vec::new();
        {
            let mut writer = WavWriter::new(Cursor::new(&mut wav), spec)?;
            for sample in &self.samples {
                writer.write_sample(*sample)?;
            }
            writer.finalize()?;
        }
        Ok(wav)
    }
}

/// What a recorder hands back when stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecorderOutput {
    Pcm(PcmRecording),
    /// An already-encoded container such as `audio/wav` or `audio/mp4`.
    Encoded { bytes: Vec<u8>, mime_type: String },
}

impl RecorderOutput {
    /// Materialises the recorder output into a transmittable audio buffer.
    pub fn into_clip(self) -> Result<AudioClip, DeviceError> {
        match self {
            RecorderOutput::Pcm(pcm) => Ok(AudioClip {
                bytes: pcm.encode_wav()?,
                mime_type: "audio/wav".into(),
            }),
            RecorderOutput::Encoded { bytes, mime_type } => {
                if bytes.is_empty() {
                    return Err(DeviceError::InvalidAudio("recording is empty".into()));
                }
                if matches!(mime_type.as_str(), "audio/wav" | "audio/x-wav" | "audio/wave") {
                    verify_wav(&bytes)?;
                }
                Ok(AudioClip { bytes, mime_type })
            }
        }
    }
}

/// A finished recording ready for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioClip {
    bytes: Vec<u8>,
    mime_type: String,
}

impl AudioClip {
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
            "audio/mp4" | "video/mp4" => "mp4",
            "audio/webm" => "webm",
            "audio/ogg" => "ogg",
            _ => "wav",
        }
    }
}

/// Checks that `bytes` is a RIFF/WAV stream with at least one sample.
pub fn verify_wav(bytes: &[u8]) -> Result<(), DeviceError> {
    let reader = WavReader::new(Cursor::new(bytes))
        .map_err(|err| DeviceError::InvalidAudio(err.to_string()))?;
    if reader.len() == 0 {
        return Err(DeviceError::InvalidAudio("wav stream has no samples".into()));
    }
    Ok(())
}
