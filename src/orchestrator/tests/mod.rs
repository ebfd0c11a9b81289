
use crate::alignment::{align, UnitCost};
use crate::model::{AudioInput, CompareResult, PluginParams, Token};
use crate::plugin::{
    AsrBackend, Comparator, FnPluginFactory, Plugin, PluginInstance, PluginRegistry, PluginRole,
    Preprocessor, TextRefProvider,
};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::sleep;

/// Ordered record of lifecycle and processing calls across all mocks.
#[derive(Clone, Default)]
struct Journal(Arc<Mutex<Vec<String>>>);

impl Journal {
    fn push(&self, entry: String) {
        self.0.lock().expect("journal lock poisoned").push(entry);
    }

    fn entries(&self) -> Vec<String> {
        self.0.lock().expect("journal lock poisoned").clone()
    }

    fn count(&self, prefix: &str) -> usize {
        self.entries()
            .iter()
            .filter(|entry| entry.starts_with(prefix))
            .count()
    }
}

#[derive(Clone, Default)]
struct Behaviour {
    fail_setup: bool,
    fail_process: bool,
    fail_teardown: bool,
    delay: Duration,
    setup_delay: Duration,
    symbols: Vec<&'static str>,
}

impl Behaviour {
    fn emitting(symbols: &[&'static str]) -> Self {
        Self {
            symbols: symbols.to_vec(),
            ..Self::default()
        }
    }
}

struct MockPlugin {
    name: &'static str,
    journal: Journal,
    behaviour: Behaviour,
}

impl MockPlugin {
    async fn process(&self, call: &str) -> Result<()> {
        self.journal.push(format!("{call}:{}", self.name));
        if !self.behaviour.delay.is_zero() {
            sleep(self.behaviour.delay).await;
        }
        if self.behaviour.fail_process {
            return Err(anyhow!("{} backend unavailable", self.name));
        }
        self.journal.push(format!("done:{}", self.name));
        Ok(())
    }

    fn tokens(&self) -> Result<Vec<Token>> {
        Ok(Token::sequence(self.behaviour.symbols.iter().copied())?)
    }
}

#[async_trait]
impl Plugin for MockPlugin {
    fn name(&self) -> &str {
        self.name
    }

    async fn setup(&self) -> Result<()> {
        self.journal.push(format!("setup:{}", self.name));
        if !self.behaviour.setup_delay.is_zero() {
            sleep(self.behaviour.setup_delay).await;
        }
        if self.behaviour.fail_setup {
            return Err(anyhow!("{} failed to load", self.name));
        }
        Ok(())
    }

    async fn teardown(&self) -> Result<()> {
        self.journal.push(format!("teardown:{}", self.name));
        if self.behaviour.fail_teardown {
            return Err(anyhow!("{} session did not close", self.name));
        }
        Ok(())
    }
}

#[async_trait]
impl Preprocessor for MockPlugin {
    async fn process_audio(&self, audio: AudioInput, _options: &PluginParams) -> Result<AudioInput> {
        self.process("preprocess").await?;
        Ok(audio)
    }
}

#[async_trait]
impl AsrBackend for MockPlugin {
    async fn transcribe(&self, _audio: &AudioInput, _options: &PluginParams) -> Result<Vec<Token>> {
        self.process("transcribe").await?;
        self.tokens()
    }
}

#[async_trait]
impl TextRefProvider for MockPlugin {
    async fn to_ipa(&self, _text: &str, _lang: &str, _options: &PluginParams) -> Result<Vec<Token>> {
        self.process("to_ipa").await?;
        self.tokens()
    }
}

#[async_trait]
impl Comparator for MockPlugin {
    async fn compare(
        &self,
        hypothesis: &[Token],
        reference: &[Token],
        _options: &PluginParams,
    ) -> Result<CompareResult> {
        self.process("compare").await?;
        Ok(align(hypothesis, reference, &UnitCost)?)
    }
}

/// Registers a request-scoped mock and returns how many instances were built.
fn register_mock(
    registry: &mut PluginRegistry,
    role: PluginRole,
    name: &'static str,
    journal: &Journal,
    behaviour: Behaviour,
) -> Arc<AtomicUsize> {
    let built = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&built);
    let journal = journal.clone();
    registry.register(Arc::new(FnPluginFactory::new(role, name, move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
        let plugin = Arc::new(MockPlugin {
            name,
            journal: journal.clone(),
            behaviour: behaviour.clone(),
        });
        Ok(match role {
            PluginRole::Preprocess => PluginInstance::Preprocess(plugin),
            PluginRole::Asr => PluginInstance::Asr(plugin),
            PluginRole::TextRef => PluginInstance::TextRef(plugin),
            PluginRole::Compare => PluginInstance::Compare(plugin),
        })
    })));
    built
}

/// Registry with mocks named after their role: `pre`, `asr`, `ref`, `cmp`.
/// `asr` hears "p a m", `ref` expects "p a n".
fn mock_registry(journal: &Journal, overrides: &[(PluginRole, Behaviour)]) -> PluginRegistry {
    let mut registry = PluginRegistry::new();
    for (role, name, default) in [
        (PluginRole::Preprocess, "pre", Behaviour::default()),
        (PluginRole::Asr, "asr", Behaviour::emitting(&["p", "a", "m"])),
        (PluginRole::TextRef, "ref", Behaviour::emitting(&["p", "a", "n"])),
        (PluginRole::Compare, "cmp", Behaviour::default()),
    ] {
        let behaviour = overrides
            .iter()
            .find(|(candidate, _)| *candidate == role)
            .map(|(_, behaviour)| behaviour.clone())
            .unwrap_or(default);
        register_mock(&mut registry, role, name, journal, behaviour);
    }
    registry
}

fn mock_config() -> crate::orchestrator::PipelineConfig {
    crate::orchestrator::PipelineConfig {
        default_preprocess: Some("pre".to_string()),
        default_asr: "asr".to_string(),
        default_textref: "ref".to_string(),
        default_comparator: "cmp".to_string(),
        timeout_ms: None,
        concurrent_reference: false,
    }
}

fn request() -> crate::orchestrator::CompareRequest {
    crate::orchestrator::CompareRequest::new(
        AudioInput::from_samples(vec![0.0; 1_600], 16_000, 1),
        "pan",
        "fr",
    )
}
