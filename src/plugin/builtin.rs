//! Reference backends shipped with the core. Model-backed recognisers and G2P
//! engines live outside this crate and register through the same factories.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::error::PipelineError;
use crate::model::{AudioInput, PluginParams, Token};
use crate::plugin::traits::{AsrBackend, Plugin, Preprocessor, TextRefProvider};

#[derive(Debug, Default)]
pub struct IdentityPreprocessor;

impl IdentityPreprocessor {
    pub const NAME: &'static str = "identity";
}

#[async_trait]
impl Plugin for IdentityPreprocessor {
    fn name(&self) -> &str {
        Self::NAME
    }
}

#[async_trait]
impl Preprocessor for IdentityPreprocessor {
    async fn process_audio(&self, audio: AudioInput, _options: &PluginParams) -> Result<AudioInput> {
        Ok(audio)
    }
}

/// Rejects descriptors with more channels than the downstream recogniser
/// accepts instead of letting it fail deep inside inference.
#[derive(Debug)]
pub struct DownmixGuardPreprocessor {
    max_channels: u16,
}

impl DownmixGuardPreprocessor {
    pub const NAME: &'static str = "downmix_guard";

    pub fn new(max_channels: u16) -> Self {
        Self { max_channels }
    }

    pub fn from_params(params: &PluginParams) -> Result<Self> {
        let max_channels = match params.get("max_channels") {
            None => 1,
            Some(value) => value
                .as_u64()
                .and_then(|raw| u16::try_from(raw).ok())
                .filter(|raw| *raw > 0)
                .ok_or_else(|| anyhow!("`max_channels` must be a positive integer, got {value}"))?,
        };
        Ok(Self::new(max_channels))
    }
}

#[async_trait]
impl Plugin for DownmixGuardPreprocessor {
    fn name(&self) -> &str {
        Self::NAME
    }
}

#[async_trait]
impl Preprocessor for DownmixGuardPreprocessor {
    async fn process_audio(&self, audio: AudioInput, _options: &PluginParams) -> Result<AudioInput> {
        if audio.channels > self.max_channels {
            return Err(PipelineError::invalid_input(format!(
                "audio has {} channels, at most {} supported",
                audio.channels, self.max_channels
            ))
            .into());
        }
        Ok(audio)
    }
}

/// Emits a fixed phoneme sequence. Stands in for a recogniser in tests and
/// dry runs.
#[derive(Debug, Clone)]
pub struct ScriptedAsrBackend {
    symbols: Vec<String>,
}

impl ScriptedAsrBackend {
    pub const NAME: &'static str = "scripted";

    pub fn new<I, S>(symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            symbols: symbols.into_iter().map(Into::into).collect(),
        }
    }

    pub fn from_params(params: &PluginParams) -> Result<Self> {
        Ok(Self::new(string_list(params, "symbols")?.unwrap_or_default()))
    }
}

#[async_trait]
impl Plugin for ScriptedAsrBackend {
    fn name(&self) -> &str {
        Self::NAME
    }
}

#[async_trait]
impl AsrBackend for ScriptedAsrBackend {
    async fn transcribe(&self, audio: &AudioInput, options: &PluginParams) -> Result<Vec<Token>> {
        let symbols = match string_list(options, "symbols")? {
            Some(symbols) => symbols,
            None => self.symbols.clone(),
        };
        debug!(
            target: "plugin_registry",
            sample_rate_hz = audio.sample_rate_hz,
            tokens = symbols.len(),
            "scripted transcription"
        );
        Ok(Token::sequence(symbols)?)
    }
}

/// Language allow-list shared by the text reference providers. An empty
/// list accepts any non-empty language tag.
#[derive(Debug, Clone, Default)]
struct LanguageFilter {
    languages: Vec<String>,
}

impl LanguageFilter {
    fn from_params(params: &PluginParams) -> Result<Self> {
        let languages = string_list(params, "languages")?
            .unwrap_or_default()
            .into_iter()
            .map(|lang| lang.trim().to_ascii_lowercase())
            .collect();
        Ok(Self { languages })
    }

    fn check(&self, lang: &str) -> Result<(), PipelineError> {
        let lang = lang.trim().to_ascii_lowercase();
        if lang.is_empty() {
            return Err(PipelineError::invalid_input("language tag cannot be empty"));
        }
        if !self.languages.is_empty() && !self.languages.contains(&lang) {
            return Err(PipelineError::invalid_input(format!(
                "unsupported language `{lang}`"
            )));
        }
        Ok(())
    }
}

/// Treats the reference text as space-separated IPA symbols.
#[derive(Debug, Clone, Default)]
pub struct WhitespaceTextRef {
    languages: LanguageFilter,
}

impl WhitespaceTextRef {
    pub const NAME: &'static str = "whitespace";

    pub fn from_params(params: &PluginParams) -> Result<Self> {
        Ok(Self {
            languages: LanguageFilter::from_params(params)?,
        })
    }
}

#[async_trait]
impl Plugin for WhitespaceTextRef {
    fn name(&self) -> &str {
        Self::NAME
    }
}

#[async_trait]
impl TextRefProvider for WhitespaceTextRef {
    async fn to_ipa(&self, text: &str, lang: &str, _options: &PluginParams) -> Result<Vec<Token>> {
        self.languages.check(lang)?;
        Ok(Token::sequence(text.split_whitespace())?)
    }
}

/// One token per non-space character, for scripts written without spaces.
#[derive(Debug, Clone, Default)]
pub struct GraphemeTextRef {
    languages: LanguageFilter,
}

impl GraphemeTextRef {
    pub const NAME: &'static str = "graphemes";

    pub fn from_params(params: &PluginParams) -> Result<Self> {
        Ok(Self {
            languages: LanguageFilter::from_params(params)?,
        })
    }
}

#[async_trait]
impl Plugin for GraphemeTextRef {
    fn name(&self) -> &str {
        Self::NAME
    }
}

#[async_trait]
impl TextRefProvider for GraphemeTextRef {
    async fn to_ipa(&self, text: &str, lang: &str, _options: &PluginParams) -> Result<Vec<Token>> {
        self.languages.check(lang)?;
        let mut symbols: Vec<String> = Vec::new();
        for ch in text.chars().filter(|ch| !ch.is_whitespace()) {
            // Combining marks (length, stress diacritics) stay on their base symbol.
            match symbols.last_mut() {
                Some(last) if is_combining(ch) => last.push(ch),
                _ => symbols.push(ch.to_string()),
            }
        }
        Ok(Token::sequence(symbols)?)
    }
}

fn is_combining(ch: char) -> bool {
    matches!(ch, '\u{0300}'..='\u{036F}' | 'ː' | 'ˑ' | 'ʰ' | 'ʲ' | 'ʷ')
}

fn string_list(params: &PluginParams, key: &str) -> Result<Option<Vec<String>>> {
    let Some(value) = params.get(key) else {
        return Ok(None);
    };
    match value {
        Value::Array(items) => items
            .iter()
            .map(|item| {
                item.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| anyhow!("`{key}` must contain only strings, got {item}"))
            })
            .collect::<Result<Vec<_>>>()
            .map(Some),
        Value::String(joined) => Ok(Some(
            joined.split_whitespace().map(str::to_string).collect(),
        )),
        other => Err(anyhow!("`{key}` must be a list of strings, got {other}")),
    }
}
