use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::PipelineError;
use crate::orchestrator::constants::{
    DEFAULT_ASR, DEFAULT_COMPARATOR, DEFAULT_TEXTREF, ENV_ASR, ENV_COMPARATOR,
    ENV_CONCURRENT_REFERENCE, ENV_PREPROCESS, ENV_TEXTREF, ENV_TIMEOUT_MS,
};

/// Plugin defaults used when a request leaves a role unselected, plus
/// per-request execution limits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub default_preprocess: Option<String>,
    pub default_asr: String,
    pub default_textref: String,
    pub default_comparator: String,
    /// Upper bound for setup plus the four processing steps. Teardown is not
    /// counted and always runs.
    #[serde(default)]
    pub timeout_ms: Option<u64>,
    /// Run transcription and reference generation concurrently.
    #[serde(default)]
    pub concurrent_reference: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            default_preprocess: None,
            default_asr: DEFAULT_ASR.to_string(),
            default_textref: DEFAULT_TEXTREF.to_string(),
            default_comparator: DEFAULT_COMPARATOR.to_string(),
            timeout_ms: None,
            concurrent_reference: false,
        }
    }
}

impl PipelineConfig {
    pub fn from_env() -> Result<Self, PipelineError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, PipelineError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        let value = |key: &str| {
            lookup(key)
                .map(|raw| raw.trim().to_string())
                .filter(|raw| !raw.is_empty())
        };

        if let Some(name) = value(ENV_ASR) {
            config.default_asr = name;
        }
        if let Some(name) = value(ENV_TEXTREF) {
            config.default_textref = name;
        }
        if let Some(name) = value(ENV_COMPARATOR) {
            config.default_comparator = name;
        }
        if let Some(name) = value(ENV_PREPROCESS) {
            config.default_preprocess = Some(name);
        }
        if let Some(raw) = value(ENV_TIMEOUT_MS) {
            let timeout_ms = raw.parse::<u64>().map_err(|err| {
                PipelineError::invalid_input(format!("{ENV_TIMEOUT_MS}=`{raw}` is not a number: {err}"))
            })?;
            config.timeout_ms = (timeout_ms > 0).then_some(timeout_ms);
        }
        if let Some(raw) = value(ENV_CONCURRENT_REFERENCE) {
            config.concurrent_reference = parse_flag(ENV_CONCURRENT_REFERENCE, &raw)?;
        }
        Ok(config)
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }
}

fn parse_flag(key: &str, raw: &str) -> Result<bool, PipelineError> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(PipelineError::invalid_input(format!(
            "{key}=`{raw}` is not a boolean flag"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults_without_environment() {
        let config = PipelineConfig::from_lookup(|_| None).expect("defaults");
        assert_eq!(config, PipelineConfig::default());
        assert_eq!(config.default_comparator, "levenshtein");
        assert!(config.timeout().is_none());
    }

    #[test]
    fn environment_overrides_defaults() {
        let config = PipelineConfig::from_lookup(lookup(&[
            (ENV_ASR, "wav2vec2"),
            (ENV_PREPROCESS, " downmix_guard "),
            (ENV_TIMEOUT_MS, "1500"),
            (ENV_CONCURRENT_REFERENCE, "yes"),
        ]))
        .expect("valid overrides");
        assert_eq!(config.default_asr, "wav2vec2");
        assert_eq!(config.default_preprocess.as_deref(), Some("downmix_guard"));
        assert_eq!(config.timeout(), Some(Duration::from_millis(1500)));
        assert!(config.concurrent_reference);
    }

    #[test]
    fn malformed_values_are_rejected() {
        assert!(PipelineConfig::from_lookup(lookup(&[(ENV_TIMEOUT_MS, "soon")])).is_err());
        assert!(PipelineConfig::from_lookup(lookup(&[(ENV_CONCURRENT_REFERENCE, "maybe")])).is_err());
    }

    #[test]
    fn deserializes_with_optional_fields_missing() {
        let config: PipelineConfig = serde_json::from_str(
            r#"{"default_asr":"scripted","default_textref":"graphemes","default_comparator":"levenshtein"}"#,
        )
        .expect("valid config");
        assert_eq!(config.default_textref, "graphemes");
        assert!(!config.concurrent_reference);
    }
}
