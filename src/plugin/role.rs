use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PluginRole {
    Preprocess,
    Asr,
    TextRef,
    Compare,
}

impl PluginRole {
    pub const ALL: [PluginRole; 4] = [
        PluginRole::Preprocess,
        PluginRole::Asr,
        PluginRole::TextRef,
        PluginRole::Compare,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PluginRole::Preprocess => "preprocess",
            PluginRole::Asr => "asr",
            PluginRole::TextRef => "textref",
            PluginRole::Compare => "compare",
        }
    }
}

impl fmt::Display for PluginRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PluginRole {
    type Err = PipelineError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        PluginRole::ALL
            .into_iter()
            .find(|role| role.as_str().eq_ignore_ascii_case(value.trim()))
            .ok_or_else(|| PipelineError::invalid_input(format!("unknown plugin role `{value}`")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_role_names() {
        assert_eq!("asr".parse::<PluginRole>().ok(), Some(PluginRole::Asr));
        assert_eq!(" TextRef ".parse::<PluginRole>().ok(), Some(PluginRole::TextRef));
        assert!("vocoder".parse::<PluginRole>().is_err());
    }
}
