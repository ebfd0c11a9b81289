//! Phonalign Core Library
//!
//! Pronunciation assessment core: a pluggable asynchronous pipeline that
//! transcribes audio into phonetic tokens, derives a reference from text, and
//! scores the two with a deterministic phoneme alignment.

pub mod alignment;
pub mod error;
pub mod model;
pub mod orchestrator;
pub mod plugin;
pub mod telemetry;

pub use alignment::{align, CostModel, LevenshteinComparator, UnitCost, WeightedCost};
pub use error::{AlignmentError, PipelineError};
pub use model::{
    AudioInput, AudioPayload, CompareResult, Operation, OperationCounts, OperationKind,
    PluginParams, Token,
};
pub use orchestrator::{CompareRequest, PipelineConfig, PipelineKernel, PluginSelection, RunOutcome};
pub use plugin::{
    AsrBackend, Comparator, FnPluginFactory, Plugin, PluginFactory, PluginInstance,
    PluginRegistry, PluginRole, Preprocessor, ResolvedPlugin, TextRefProvider,
};
