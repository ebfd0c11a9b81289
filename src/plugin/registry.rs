use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use crate::alignment::LevenshteinComparator;
use crate::error::PipelineError;
use crate::model::PluginParams;
use crate::plugin::builtin::{
    DownmixGuardPreprocessor, GraphemeTextRef, IdentityPreprocessor, ScriptedAsrBackend,
    WhitespaceTextRef,
};
use crate::plugin::instance::PluginInstance;
use crate::plugin::role::PluginRole;

const TARGET: &str = "plugin_registry";

/// Builds plugin instances for one (role, name) pair.
pub trait PluginFactory: Send + Sync {
    fn role(&self) -> PluginRole;
    fn name(&self) -> &str;

    /// Shareable plugins are stateless or internally synchronised and may
    /// serve concurrent requests from a single instance.
    fn shareable(&self) -> bool {
        false
    }

    fn build(&self, params: &PluginParams) -> Result<PluginInstance>;
}

type BuildFn = dyn Fn(&PluginParams) -> Result<PluginInstance> + Send + Sync;

/// Closure-backed factory, handy for registering backends at process start.
pub struct FnPluginFactory {
    role: PluginRole,
    name: String,
    shareable: bool,
    build: Box<BuildFn>,
}

impl FnPluginFactory {
    pub fn new<F>(role: PluginRole, name: impl Into<String>, build: F) -> Self
    where
        F: Fn(&PluginParams) -> Result<PluginInstance> + Send + Sync + 'static,
    {
        Self {
            role,
            name: name.into(),
            shareable: false,
            build: Box::new(build),
        }
    }

    pub fn shared(mut self) -> Self {
        self.shareable = true;
        self
    }
}

impl PluginFactory for FnPluginFactory {
    fn role(&self) -> PluginRole {
        self.role
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn shareable(&self) -> bool {
        self.shareable
    }

    fn build(&self, params: &PluginParams) -> Result<PluginInstance> {
        (self.build)(params)
    }
}

/// Outcome of a lookup. Request-scoped instances are owned by the caller,
/// which is responsible for their `setup`/`teardown`; shared instances are
/// already set up and are torn down by [`PluginRegistry::shutdown`].
#[derive(Debug, Clone)]
pub struct ResolvedPlugin {
    pub instance: PluginInstance,
    pub request_scoped: bool,
}

type FactoryKey = (PluginRole, String);
type SharedKey = (PluginRole, String);

pub struct PluginRegistry {
    factories: HashMap<FactoryKey, Arc<dyn PluginFactory>>,
    shared: Mutex<HashMap<SharedKey, Arc<OnceCell<PluginInstance>>>>,
}

impl Default for PluginRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
            shared: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register_builtin_plugins();
        registry
    }

    /// Later registrations replace earlier ones under the same role and name.
    pub fn register(&mut self, factory: Arc<dyn PluginFactory>) {
        let key = (factory.role(), normalize_name(factory.name()));
        debug!(
            target: TARGET,
            role = %key.0,
            plugin = %key.1,
            shareable = factory.shareable(),
            "registering plugin factory"
        );
        self.factories.insert(key, factory);
    }

    pub fn contains(&self, role: PluginRole, name: &str) -> bool {
        self.factories.contains_key(&(role, normalize_name(name)))
    }

    pub fn names(&self, role: PluginRole) -> Vec<String> {
        let mut names: Vec<String> = self
            .factories
            .keys()
            .filter(|(candidate, _)| *candidate == role)
            .map(|(_, name)| name.clone())
            .collect();
        names.sort();
        names
    }

    /// Request-scoped factories build a fresh instance per call. Shareable
    /// factories selected without params resolve to one registry-owned
    /// instance per (role, name); a selection carrying params gets its own
    /// request-scoped instance so request input never grows the shared set.
    pub async fn resolve(
        &self,
        role: PluginRole,
        name: &str,
        params: &PluginParams,
    ) -> Result<ResolvedPlugin, PipelineError> {
        let factory = self.factory(role, name)?;
        if !factory.shareable() || !params.is_empty() {
            let instance = build_instance(factory.as_ref(), params)?;
            return Ok(ResolvedPlugin {
                instance,
                request_scoped: true,
            });
        }

        let cell = {
            let key = (role, normalize_name(name));
            let mut shared = self.shared.lock().unwrap_or_else(|err| err.into_inner());
            Arc::clone(shared.entry(key).or_default())
        };
        if let Some(instance) = cell.get() {
            return Ok(ResolvedPlugin {
                instance: instance.clone(),
                request_scoped: false,
            });
        }

        // Setup runs detached: a cancelled request cannot drop an instance
        // whose setup already started, it still lands in the cell.
        let task = tokio::spawn(init_shared(Arc::clone(factory), cell));
        let instance = task.await.map_err(|err| PipelineError::BackendFailure {
            role,
            plugin: name.to_string(),
            stage: "setup",
            source: anyhow::Error::new(err),
        })??;

        Ok(ResolvedPlugin {
            instance,
            request_scoped: false,
        })
    }

    /// Tears down every shared instance, waiting for setups still in flight.
    /// Failures are returned instead of stopping at the first one.
    pub async fn shutdown(&self) -> Vec<PipelineError> {
        let cells: Vec<Arc<OnceCell<PluginInstance>>> = {
            let mut shared = self.shared.lock().unwrap_or_else(|err| err.into_inner());
            shared.drain().map(|(_, cell)| cell).collect()
        };

        let mut failures = Vec::new();
        for cell in cells {
            // Blocks on an in-flight setup; an empty or failed cell yields Err.
            let Ok(instance) = cell.get_or_try_init(|| async { Err(()) }).await else {
                continue;
            };
            if let Err(source) = instance.teardown().await {
                warn!(
                    target: TARGET,
                    role = %instance.role(),
                    plugin = instance.name(),
                    err = %source,
                    "shared plugin teardown failed"
                );
                failures.push(PipelineError::TeardownFailure {
                    role: instance.role(),
                    plugin: instance.name().to_string(),
                    source,
                });
            }
        }
        failures
    }

    fn factory(&self, role: PluginRole, name: &str) -> Result<&Arc<dyn PluginFactory>, PipelineError> {
        self.factories
            .get(&(role, normalize_name(name)))
            .ok_or_else(|| PipelineError::PluginNotFound {
                role,
                name: name.to_string(),
            })
    }

    fn register_builtin_plugins(&mut self) {
        self.register(Arc::new(FnPluginFactory::new(
            PluginRole::Preprocess,
            IdentityPreprocessor::NAME,
            |_| Ok(PluginInstance::Preprocess(Arc::new(IdentityPreprocessor))),
        )));
        self.register(Arc::new(FnPluginFactory::new(
            PluginRole::Preprocess,
            DownmixGuardPreprocessor::NAME,
            |params| {
                Ok(PluginInstance::Preprocess(Arc::new(
                    DownmixGuardPreprocessor::from_params(params)?,
                )))
            },
        )));
        self.register(Arc::new(FnPluginFactory::new(
            PluginRole::Asr,
            ScriptedAsrBackend::NAME,
            |params| {
                Ok(PluginInstance::Asr(Arc::new(
                    ScriptedAsrBackend::from_params(params)?,
                )))
            },
        )));
        self.register(Arc::new(FnPluginFactory::new(
            PluginRole::TextRef,
            WhitespaceTextRef::NAME,
            |params| {
                Ok(PluginInstance::TextRef(Arc::new(
                    WhitespaceTextRef::from_params(params)?,
                )))
            },
        )));
        self.register(Arc::new(FnPluginFactory::new(
            PluginRole::TextRef,
            GraphemeTextRef::NAME,
            |params| {
                Ok(PluginInstance::TextRef(Arc::new(
                    GraphemeTextRef::from_params(params)?,
                )))
            },
        )));
        self.register(Arc::new(
            FnPluginFactory::new(PluginRole::Compare, LevenshteinComparator::NAME, |params| {
                Ok(PluginInstance::Compare(Arc::new(
                    LevenshteinComparator::from_params(params)?,
                )))
            })
            .shared(),
        ));
    }
}

fn build_instance(
    factory: &dyn PluginFactory,
    params: &PluginParams,
) -> Result<PluginInstance, PipelineError> {
    let instance = factory
        .build(params)
        .map_err(|err| PipelineError::from_plugin(factory.role(), factory.name(), "construct", err))?;
    if instance.role() != factory.role() {
        return Err(PipelineError::BackendFailure {
            role: factory.role(),
            plugin: factory.name().to_string(),
            stage: "construct",
            source: anyhow::anyhow!(
                "factory produced a {} plugin instead of {}",
                instance.role(),
                factory.role()
            ),
        });
    }
    Ok(instance)
}

fn normalize_name(name: &str) -> String {
    name.trim().to_ascii_lowercase()
}

async fn init_shared(
    factory: Arc<dyn PluginFactory>,
    cell: Arc<OnceCell<PluginInstance>>,
) -> Result<PluginInstance, PipelineError> {
    cell.get_or_try_init(|| async {
        let role = factory.role();
        let instance = build_instance(factory.as_ref(), &PluginParams::new())?;
        if let Err(err) = instance.setup().await {
            if let Err(teardown_err) = instance.teardown().await {
                warn!(
                    target: TARGET,
                    role = %role,
                    plugin = instance.name(),
                    err = %teardown_err,
                    "teardown after failed shared setup also failed"
                );
            }
            return Err(PipelineError::from_plugin(role, factory.name(), "setup", err));
        }
        info!(
            target: TARGET,
            role = %role,
            plugin = instance.name(),
            "shared plugin ready"
        );
        Ok(instance)
    })
    .await
    .cloned()
}
