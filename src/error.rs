use std::time::Duration;

use thiserror::Error;

use crate::plugin::PluginRole;

/// Failures raised by the alignment engine and by result validation.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum AlignmentError {
    #[error("reference sequence is empty, error rate cannot be normalized")]
    EmptyReference,
    #[error("cost model returned an invalid {operation} cost: {value}")]
    InvalidCost { operation: &'static str, value: f64 },
    #[error("alignment invariant violated: {reason}")]
    InvariantViolation { reason: String },
}

impl AlignmentError {
    pub(crate) fn invariant(reason: impl Into<String>) -> Self {
        Self::InvariantViolation {
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("no {role} plugin registered under `{name}`")]
    PluginNotFound { role: PluginRole, name: String },
    #[error("{role} plugin `{plugin}` failed during {stage}: {source}")]
    BackendFailure {
        role: PluginRole,
        plugin: String,
        stage: &'static str,
        #[source]
        source: anyhow::Error,
    },
    #[error("{role} plugin `{plugin}` failed to tear down: {source}")]
    TeardownFailure {
        role: PluginRole,
        plugin: String,
        #[source]
        source: anyhow::Error,
    },
    #[error("alignment defect: {0}")]
    Alignment(AlignmentError),
    #[error("request timed out after {elapsed:?}")]
    Timeout { elapsed: Duration },
}

impl PipelineError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Outward classification used by request layers to pick a status.
    pub fn category(&self) -> &'static str {
        match self {
            PipelineError::InvalidInput { .. } => "validation",
            PipelineError::PluginNotFound { .. } => "configuration",
            PipelineError::BackendFailure { .. } => "backend",
            PipelineError::TeardownFailure { .. } => "teardown",
            PipelineError::Alignment(_) => "defect",
            PipelineError::Timeout { .. } => "timeout",
        }
    }

    /// Wraps a plugin failure, keeping typed input and alignment errors intact.
    pub(crate) fn from_plugin(
        role: PluginRole,
        plugin: &str,
        stage: &'static str,
        err: anyhow::Error,
    ) -> Self {
        let err = match err.downcast::<PipelineError>() {
            Ok(inner @ PipelineError::InvalidInput { .. }) => return inner,
            Ok(inner @ PipelineError::Alignment(_)) => return inner,
            Ok(other) => anyhow::Error::new(other),
            Err(err) => err,
        };
        match err.downcast::<AlignmentError>() {
            Ok(inner) => inner.into(),
            Err(source) => PipelineError::BackendFailure {
                role,
                plugin: plugin.to_string(),
                stage,
                source,
            },
        }
    }
}

impl From<AlignmentError> for PipelineError {
    fn from(err: AlignmentError) -> Self {
        match err {
            AlignmentError::EmptyReference => PipelineError::InvalidInput {
                message: err.to_string(),
            },
            other => PipelineError::Alignment(other),
        }
    }
}
