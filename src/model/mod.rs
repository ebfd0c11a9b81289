//! Value types shared by every pipeline stage.

mod audio;
mod result;
mod token;

pub use audio::{AudioInput, AudioPayload};
pub use result::{CompareResult, Operation, OperationCounts, OperationKind};
pub use token::Token;

/// Free-form parameters handed to plugin factories and plugin calls.
pub type PluginParams = serde_json::Map<String, serde_json::Value>;
