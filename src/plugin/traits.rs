use anyhow::Result;
use async_trait::async_trait;

use crate::model::{AudioInput, CompareResult, PluginParams, Token};

/// Lifecycle shared by every plugin role.
///
/// `setup` runs at most once per instance before its first processing call;
/// `teardown` runs exactly once for every instance whose `setup` was invoked,
/// including when `setup` itself failed.
#[async_trait]
pub trait Plugin: Send + Sync {
    fn name(&self) -> &str;

    async fn setup(&self) -> Result<()> {
        Ok(())
    }

    async fn teardown(&self) -> Result<()> {
        Ok(())
    }
}

#[async_trait]
pub trait Preprocessor: Plugin {
    async fn process_audio(&self, audio: AudioInput, options: &PluginParams) -> Result<AudioInput>;
}

#[async_trait]
pub trait AsrBackend: Plugin {
    async fn transcribe(&self, audio: &AudioInput, options: &PluginParams) -> Result<Vec<Token>>;
}

#[async_trait]
pub trait TextRefProvider: Plugin {
    async fn to_ipa(&self, text: &str, lang: &str, options: &PluginParams) -> Result<Vec<Token>>;
}

#[async_trait]
pub trait Comparator: Plugin {
    async fn compare(
        &self,
        hypothesis: &[Token],
        reference: &[Token],
        options: &PluginParams,
    ) -> Result<CompareResult>;
}
