use serde::{Deserialize, Serialize};

use crate::error::PipelineError;
use crate::model::{AudioInput, PluginParams};

/// A plugin name plus the params its factory and calls receive.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PluginSelection {
    pub name: String,
    #[serde(default)]
    pub params: PluginParams,
}

impl PluginSelection {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: PluginParams::new(),
        }
    }

    pub fn with_params(name: impl Into<String>, params: PluginParams) -> Self {
        Self {
            name: name.into(),
            params,
        }
    }
}

/// One comparison request as received from the request layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompareRequest {
    pub audio: AudioInput,
    pub text: String,
    pub lang: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preprocess: Option<PluginSelection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backend: Option<PluginSelection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub textref: Option<PluginSelection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comparator: Option<PluginSelection>,
}

impl CompareRequest {
    pub fn new(audio: AudioInput, text: impl Into<String>, lang: impl Into<String>) -> Self {
        Self {
            audio,
            text: text.into(),
            lang: lang.into(),
            preprocess: None,
            backend: None,
            textref: None,
            comparator: None,
        }
    }

    pub fn with_preprocess(mut self, selection: PluginSelection) -> Self {
        self.preprocess = Some(selection);
        self
    }

    pub fn with_backend(mut self, selection: PluginSelection) -> Self {
        self.backend = Some(selection);
        self
    }

    pub fn with_textref(mut self, selection: PluginSelection) -> Self {
        self.textref = Some(selection);
        self
    }

    pub fn with_comparator(mut self, selection: PluginSelection) -> Self {
        self.comparator = Some(selection);
        self
    }

    pub fn validate(&self) -> Result<(), PipelineError> {
        self.audio.validate()?;
        if self.text.trim().is_empty() {
            return Err(PipelineError::invalid_input("reference text cannot be empty"));
        }
        if self.lang.trim().is_empty() {
            return Err(PipelineError::invalid_input("language tag cannot be empty"));
        }
        for selection in [&self.preprocess, &self.backend, &self.textref, &self.comparator]
            .into_iter()
            .flatten()
        {
            if selection.name.trim().is_empty() {
                return Err(PipelineError::invalid_input("plugin name cannot be empty"));
            }
        }
        Ok(())
    }
}
