//! Plugin contract, registry and the built-in reference backends.

mod builtin;
mod instance;
mod registry;
mod role;
mod traits;

pub use builtin::{
    DownmixGuardPreprocessor, GraphemeTextRef, IdentityPreprocessor, ScriptedAsrBackend,
    WhitespaceTextRef,
};
pub use instance::PluginInstance;
pub use registry::{FnPluginFactory, PluginFactory, PluginRegistry, ResolvedPlugin};
pub use role::PluginRole;
pub use traits::{AsrBackend, Comparator, Plugin, Preprocessor, TextRefProvider};
