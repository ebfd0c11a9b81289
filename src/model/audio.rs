use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AudioPayload {
    Samples(Vec<f32>),
    Encoded(Bytes),
}

impl AudioPayload {
    pub fn len(&self) -> usize {
        match self {
            AudioPayload::Samples(samples) => samples.len(),
            AudioPayload::Encoded(bytes) => bytes.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Already-decoded audio descriptor. The pipeline passes it through to plugins
/// and never looks at the samples themselves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioInput {
    pub payload: AudioPayload,
    pub sample_rate_hz: u32,
    pub channels: u16,
    pub format: String,
}

impl AudioInput {
    pub fn from_samples(samples: Vec<f32>, sample_rate_hz: u32, channels: u16) -> Self {
        Self {
            payload: AudioPayload::Samples(samples),
            sample_rate_hz,
            channels,
            format: "f32le".to_string(),
        }
    }

    pub fn from_encoded(bytes: Bytes, sample_rate_hz: u32, channels: u16, format: &str) -> Self {
        Self {
            payload: AudioPayload::Encoded(bytes),
            sample_rate_hz,
            channels,
            format: format.to_string(),
        }
    }

    /// Structural checks only; the payload content is opaque.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.sample_rate_hz == 0 {
            return Err(PipelineError::invalid_input(
                "audio sample rate must be positive",
            ));
        }
        if self.channels == 0 {
            return Err(PipelineError::invalid_input(
                "audio must have at least one channel",
            ));
        }
        if self.format.trim().is_empty() {
            return Err(PipelineError::invalid_input("audio format tag is missing"));
        }
        if let AudioPayload::Samples(samples) = &self.payload {
            if samples.len() % usize::from(self.channels) != 0 {
                return Err(PipelineError::invalid_input(format!(
                    "{} samples cannot be split into {} channels",
                    samples.len(),
                    self.channels
                )));
            }
        }
        Ok(())
    }
}
