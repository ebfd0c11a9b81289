use std::sync::Arc;

use anyhow::Result;

use crate::plugin::role::PluginRole;
use crate::plugin::traits::{AsrBackend, Comparator, Preprocessor, TextRefProvider};

/// A constructed plugin tagged with the role it was built for.
#[derive(Clone)]
pub enum PluginInstance {
    Preprocess(Arc<dyn Preprocessor>),
    Asr(Arc<dyn AsrBackend>),
    TextRef(Arc<dyn TextRefProvider>),
    Compare(Arc<dyn Comparator>),
}

impl std::fmt::Debug for PluginInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginInstance")
            .field("role", &self.role())
            .field("name", &self.name())
            .finish()
    }
}

impl PluginInstance {
    pub fn role(&self) -> PluginRole {
        match self {
            PluginInstance::Preprocess(_) => PluginRole::Preprocess,
            PluginInstance::Asr(_) => PluginRole::Asr,
            PluginInstance::TextRef(_) => PluginRole::TextRef,
            PluginInstance::Compare(_) => PluginRole::Compare,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            PluginInstance::Preprocess(plugin) => plugin.name(),
            PluginInstance::Asr(plugin) => plugin.name(),
            PluginInstance::TextRef(plugin) => plugin.name(),
            PluginInstance::Compare(plugin) => plugin.name(),
        }
    }

    pub async fn setup(&self) -> Result<()> {
        match self {
            PluginInstance::Preprocess(plugin) => plugin.setup().await,
            PluginInstance::Asr(plugin) => plugin.setup().await,
            PluginInstance::TextRef(plugin) => plugin.setup().await,
            PluginInstance::Compare(plugin) => plugin.setup().await,
        }
    }

    pub async fn teardown(&self) -> Result<()> {
        match self {
            PluginInstance::Preprocess(plugin) => plugin.teardown().await,
            PluginInstance::Asr(plugin) => plugin.teardown().await,
            PluginInstance::TextRef(plugin) => plugin.teardown().await,
            PluginInstance::Compare(plugin) => plugin.teardown().await,
        }
    }

    pub fn as_preprocessor(&self) -> Option<Arc<dyn Preprocessor>> {
        match self {
            PluginInstance::Preprocess(plugin) => Some(Arc::clone(plugin)),
            _ => None,
        }
    }

    pub fn as_asr(&self) -> Option<Arc<dyn AsrBackend>> {
        match self {
            PluginInstance::Asr(plugin) => Some(Arc::clone(plugin)),
            _ => None,
        }
    }

    pub fn as_textref(&self) -> Option<Arc<dyn TextRefProvider>> {
        match self {
            PluginInstance::TextRef(plugin) => Some(Arc::clone(plugin)),
            _ => None,
        }
    }

    pub fn as_comparator(&self) -> Option<Arc<dyn Comparator>> {
        match self {
            PluginInstance::Compare(plugin) => Some(Arc::clone(plugin)),
            _ => None,
        }
    }
}
