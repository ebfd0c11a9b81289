use tracing::{debug, warn};

use crate::error::PipelineError;
use crate::orchestrator::constants::TARGET;
use crate::plugin::PluginInstance;

/// Tracks the request-scoped plugins whose `setup` was invoked and releases
/// them in reverse acquisition order.
///
/// If the owning future is dropped before [`LifecycleScope::close`] finishes,
/// the remaining teardowns are spawned onto the current runtime.
pub(crate) struct LifecycleScope {
    request_id: u64,
    acquired: Vec<PluginInstance>,
}

impl LifecycleScope {
    pub(crate) fn new(request_id: u64) -> Self {
        Self {
            request_id,
            acquired: Vec::new(),
        }
    }

    /// Records the plugin before running `setup`, so a failed or cancelled
    /// setup still gets its teardown attempted.
    pub(crate) async fn acquire(&mut self, instance: PluginInstance) -> Result<(), PipelineError> {
        self.acquired.push(instance.clone());
        debug!(
            target: TARGET,
            request_id = self.request_id,
            role = %instance.role(),
            plugin = instance.name(),
            "setting up plugin"
        );
        instance
            .setup()
            .await
            .map_err(|err| PipelineError::from_plugin(instance.role(), instance.name(), "setup", err))
    }

    pub(crate) fn len(&self) -> usize {
        self.acquired.len()
    }

    /// Tears down every acquired plugin, newest first. Failures are collected
    /// and never stop the remaining teardowns.
    pub(crate) async fn close(&mut self) -> Vec<PipelineError> {
        let mut failures = Vec::new();
        while let Some(instance) = self.acquired.pop() {
            let outcome = instance.teardown().await;
            if let Some(failure) = teardown_failure(self.request_id, &instance, outcome) {
                failures.push(failure);
            }
        }
        failures
    }
}

impl Drop for LifecycleScope {
    fn drop(&mut self) {
        if self.acquired.is_empty() {
            return;
        }

        let request_id = self.request_id;
        let pending = std::mem::take(&mut self.acquired);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                warn!(
                    target: TARGET,
                    request_id,
                    pending = pending.len(),
                    "request abandoned, releasing plugins in background"
                );
                handle.spawn(async move {
                    for instance in pending.into_iter().rev() {
                        let outcome = instance.teardown().await;
                        teardown_failure(request_id, &instance, outcome);
                    }
                });
            }
            Err(err) => warn!(
                target: TARGET,
                request_id,
                pending = pending.len(),
                %err,
                "no runtime available, plugins were not torn down"
            ),
        }
    }
}

fn teardown_failure(
    request_id: u64,
    instance: &PluginInstance,
    outcome: anyhow::Result<()>,
) -> Option<PipelineError> {
    let source = outcome.err()?;
    crate::telemetry::events::record_teardown_failure(
        request_id,
        instance.role().as_str(),
        instance.name(),
        &source,
    );
    Some(PipelineError::TeardownFailure {
        role: instance.role(),
        plugin: instance.name().to_string(),
        source,
    })
}
