//! Pipeline kernel: runs one comparison request end to end.

mod constants;
mod kernel;
mod request;
mod scope;

pub mod config;

pub use config::PipelineConfig;
pub use kernel::{PipelineKernel, RunOutcome};
pub use request::{CompareRequest, PluginSelection};

#[cfg(test)]
mod tests;
