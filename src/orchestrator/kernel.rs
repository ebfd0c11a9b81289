use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::anyhow;
use tracing::{debug, info, warn};

use crate::error::PipelineError;
use crate::model::{AudioInput, CompareResult, PluginParams, Token};
use crate::orchestrator::config::PipelineConfig;
use crate::orchestrator::constants::TARGET;
use crate::orchestrator::request::{CompareRequest, PluginSelection};
use crate::orchestrator::scope::LifecycleScope;
use crate::plugin::{
    AsrBackend, Comparator, PluginInstance, PluginRegistry, PluginRole, Preprocessor,
    TextRefProvider,
};
use crate::telemetry::events::{record_compare_completed, record_compare_failed};

/// Result of a successful run. Teardown failures are reported alongside the
/// result and never replace it.
#[derive(Debug)]
pub struct RunOutcome {
    pub request_id: u64,
    pub result: CompareResult,
    pub teardown_failures: Vec<PipelineError>,
    pub elapsed: Duration,
}

/// A resolved plugin together with the selection that produced it.
struct Stage<T: ?Sized> {
    name: String,
    params: PluginParams,
    plugin: Arc<T>,
    instance: PluginInstance,
    request_scoped: bool,
}

struct ResolvedStages {
    preprocess: Option<Stage<dyn Preprocessor>>,
    asr: Stage<dyn AsrBackend>,
    textref: Stage<dyn TextRefProvider>,
    comparator: Stage<dyn Comparator>,
}

impl ResolvedStages {
    /// Acquisition order: preprocess, asr, textref, compare.
    fn instances(&self) -> Vec<(&PluginInstance, bool)> {
        let mut instances = Vec::with_capacity(4);
        if let Some(stage) = &self.preprocess {
            instances.push((&stage.instance, stage.request_scoped));
        }
        instances.push((&self.asr.instance, self.asr.request_scoped));
        instances.push((&self.textref.instance, self.textref.request_scoped));
        instances.push((&self.comparator.instance, self.comparator.request_scoped));
        instances
    }
}

/// Drives one comparison request through preprocess, transcribe, reference
/// generation and comparison, owning the lifecycle of request-scoped plugins.
///
/// `run` takes `&self`, so one kernel can serve many concurrent tasks; each
/// call resolves its own plugin instances.
pub struct PipelineKernel {
    config: PipelineConfig,
    registry: Arc<PluginRegistry>,
    next_request_id: AtomicU64,
}

impl PipelineKernel {
    pub fn new(config: PipelineConfig, registry: Arc<PluginRegistry>) -> Self {
        Self {
            config,
            registry,
            next_request_id: AtomicU64::new(1),
        }
    }

    pub fn with_builtins(config: PipelineConfig) -> Self {
        Self::new(config, Arc::new(PluginRegistry::with_builtins()))
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<PluginRegistry> {
        &self.registry
    }

    pub async fn run(&self, request: CompareRequest) -> Result<RunOutcome, PipelineError> {
        let request_id = self.next_request_id.fetch_add(1, Ordering::Relaxed);
        let started = Instant::now();
        info!(
            target: TARGET,
            request_id,
            lang = %request.lang,
            sample_rate_hz = request.audio.sample_rate_hz,
            "comparison request received"
        );

        if let Err(err) = request.validate() {
            record_compare_failed(request_id, err.category(), &err, started.elapsed(), 0);
            return Err(err);
        }

        let mut scope = LifecycleScope::new(request_id);
        let outcome = match self.config.timeout() {
            Some(limit) => {
                match tokio::time::timeout(limit, self.execute(request_id, request, &mut scope)).await
                {
                    Ok(outcome) => outcome,
                    Err(_) => {
                        warn!(
                            target: TARGET,
                            request_id,
                            ?limit,
                            "request timed out, cancelling pending plugin call"
                        );
                        Err(PipelineError::Timeout {
                            elapsed: started.elapsed(),
                        })
                    }
                }
            }
            None => self.execute(request_id, request, &mut scope).await,
        };

        debug!(
            target: TARGET,
            request_id,
            plugins = scope.len(),
            "releasing request-scoped plugins"
        );
        let teardown_failures = scope.close().await;
        let elapsed = started.elapsed();

        match outcome {
            Ok(result) => {
                record_compare_completed(
                    request_id,
                    result.counts,
                    result.error_rate,
                    elapsed,
                    teardown_failures.len(),
                );
                Ok(RunOutcome {
                    request_id,
                    result,
                    teardown_failures,
                    elapsed,
                })
            }
            Err(err) => {
                record_compare_failed(
                    request_id,
                    err.category(),
                    &err,
                    elapsed,
                    teardown_failures.len(),
                );
                Err(err)
            }
        }
    }

    /// Tears down shared plugins held by the registry.
    pub async fn shutdown(&self) -> Vec<PipelineError> {
        self.registry.shutdown().await
    }

    async fn execute(
        &self,
        request_id: u64,
        request: CompareRequest,
        scope: &mut LifecycleScope,
    ) -> Result<CompareResult, PipelineError> {
        let CompareRequest {
            audio,
            text,
            lang,
            preprocess,
            backend,
            textref,
            comparator,
        } = request;

        let stages = self
            .resolve_stages(preprocess, backend, textref, comparator)
            .await?;

        for (instance, request_scoped) in stages.instances() {
            if request_scoped {
                scope.acquire(instance.clone()).await?;
            }
        }

        let audio = match &stages.preprocess {
            Some(stage) => self.preprocess(request_id, stage, audio).await?,
            None => audio,
        };

        let (hypothesis, reference) = if self.config.concurrent_reference {
            tokio::try_join!(
                self.transcribe(request_id, &stages.asr, &audio),
                self.reference(request_id, &stages.textref, &text, &lang),
            )?
        } else {
            let hypothesis = self.transcribe(request_id, &stages.asr, &audio).await?;
            let reference = self
                .reference(request_id, &stages.textref, &text, &lang)
                .await?;
            (hypothesis, reference)
        };

        self.compare(request_id, &stages.comparator, &hypothesis, &reference)
            .await
    }

    async fn resolve_stages(
        &self,
        preprocess: Option<PluginSelection>,
        backend: Option<PluginSelection>,
        textref: Option<PluginSelection>,
        comparator: Option<PluginSelection>,
    ) -> Result<ResolvedStages, PipelineError> {
        let preprocess = preprocess.or_else(|| {
            self.config
                .default_preprocess
                .as_ref()
                .map(PluginSelection::named)
        });
        let backend = backend.unwrap_or_else(|| PluginSelection::named(&self.config.default_asr));
        let textref =
            textref.unwrap_or_else(|| PluginSelection::named(&self.config.default_textref));
        let comparator =
            comparator.unwrap_or_else(|| PluginSelection::named(&self.config.default_comparator));

        let preprocess = match preprocess {
            Some(selection) => Some(
                self.resolve_stage(PluginRole::Preprocess, selection, PluginInstance::as_preprocessor)
                    .await?,
            ),
            None => None,
        };
        let asr = self
            .resolve_stage(PluginRole::Asr, backend, PluginInstance::as_asr)
            .await?;
        let textref = self
            .resolve_stage(PluginRole::TextRef, textref, PluginInstance::as_textref)
            .await?;
        let comparator = self
            .resolve_stage(PluginRole::Compare, comparator, PluginInstance::as_comparator)
            .await?;

        Ok(ResolvedStages {
            preprocess,
            asr,
            textref,
            comparator,
        })
    }

    async fn resolve_stage<T: ?Sized>(
        &self,
        role: PluginRole,
        selection: PluginSelection,
        project: fn(&PluginInstance) -> Option<Arc<T>>,
    ) -> Result<Stage<T>, PipelineError> {
        let resolved = self
            .registry
            .resolve(role, &selection.name, &selection.params)
            .await?;
        let plugin = project(&resolved.instance).ok_or_else(|| PipelineError::BackendFailure {
            role,
            plugin: selection.name.clone(),
            stage: "construct",
            source: anyhow!("registry returned a {} plugin", resolved.instance.role()),
        })?;
        Ok(Stage {
            name: selection.name,
            params: selection.params,
            plugin,
            instance: resolved.instance,
            request_scoped: resolved.request_scoped,
        })
    }

    async fn preprocess(
        &self,
        request_id: u64,
        stage: &Stage<dyn Preprocessor>,
        audio: AudioInput,
    ) -> Result<AudioInput, PipelineError> {
        debug!(target: TARGET, request_id, plugin = %stage.name, "preprocessing audio");
        let processed = stage
            .plugin
            .process_audio(audio, &stage.params)
            .await
            .map_err(|err| {
                PipelineError::from_plugin(PluginRole::Preprocess, &stage.name, "process", err)
            })?;
        processed
            .validate()
            .map_err(|err| PipelineError::BackendFailure {
                role: PluginRole::Preprocess,
                plugin: stage.name.clone(),
                stage: "process",
                source: anyhow!("produced a malformed audio descriptor: {err}"),
            })?;
        Ok(processed)
    }

    async fn transcribe(
        &self,
        request_id: u64,
        stage: &Stage<dyn AsrBackend>,
        audio: &AudioInput,
    ) -> Result<Vec<Token>, PipelineError> {
        debug!(target: TARGET, request_id, plugin = %stage.name, "transcribing audio");
        let hypothesis = stage
            .plugin
            .transcribe(audio, &stage.params)
            .await
            .map_err(|err| PipelineError::from_plugin(PluginRole::Asr, &stage.name, "process", err))?;
        debug!(
            target: TARGET,
            request_id,
            tokens = hypothesis.len(),
            "hypothesis ready"
        );
        Ok(hypothesis)
    }

    async fn reference(
        &self,
        request_id: u64,
        stage: &Stage<dyn TextRefProvider>,
        text: &str,
        lang: &str,
    ) -> Result<Vec<Token>, PipelineError> {
        debug!(target: TARGET, request_id, plugin = %stage.name, %lang, "generating reference");
        let reference = stage
            .plugin
            .to_ipa(text, lang, &stage.params)
            .await
            .map_err(|err| {
                PipelineError::from_plugin(PluginRole::TextRef, &stage.name, "process", err)
            })?;
        debug!(
            target: TARGET,
            request_id,
            tokens = reference.len(),
            "reference ready"
        );
        Ok(reference)
    }

    async fn compare(
        &self,
        request_id: u64,
        stage: &Stage<dyn Comparator>,
        hypothesis: &[Token],
        reference: &[Token],
    ) -> Result<CompareResult, PipelineError> {
        debug!(target: TARGET, request_id, plugin = %stage.name, "comparing sequences");
        let result = stage
            .plugin
            .compare(hypothesis, reference, &stage.params)
            .await
            .map_err(|err| {
                PipelineError::from_plugin(PluginRole::Compare, &stage.name, "process", err)
            })?;

        result.validate()?;
        if result.hypothesis_tokens.as_slice() != hypothesis
            || result.reference_tokens.as_slice() != reference
        {
            return Err(PipelineError::Alignment(crate::error::AlignmentError::invariant(
                format!("comparator `{}` returned sequences it was not given", stage.name),
            )));
        }
        Ok(result)
    }
}
