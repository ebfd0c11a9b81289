pub(crate) const TARGET: &str = "pipeline_kernel";

pub(crate) const DEFAULT_ASR: &str = "scripted";
pub(crate) const DEFAULT_TEXTREF: &str = "whitespace";
pub(crate) const DEFAULT_COMPARATOR: &str = "levenshtein";

pub(crate) const ENV_ASR: &str = "PHONALIGN_ASR";
pub(crate) const ENV_TEXTREF: &str = "PHONALIGN_TEXTREF";
pub(crate) const ENV_COMPARATOR: &str = "PHONALIGN_COMPARATOR";
pub(crate) const ENV_PREPROCESS: &str = "PHONALIGN_PREPROCESS";
pub(crate) const ENV_TIMEOUT_MS: &str = "PHONALIGN_TIMEOUT_MS";
pub(crate) const ENV_CONCURRENT_REFERENCE: &str = "PHONALIGN_CONCURRENT_REFERENCE";
