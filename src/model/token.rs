use serde::Serialize;

use crate::error::PipelineError;

/// A single phonetic symbol, optionally anchored in time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Token {
    symbol: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    start: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    end: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    confidence: Option<f32>,
}

impl Token {
    pub fn new(symbol: impl Into<String>) -> Result<Self, PipelineError> {
        let symbol = symbol.into();
        if symbol.trim().is_empty() {
            return Err(PipelineError::invalid_input("token symbol cannot be empty"));
        }
        Ok(Self {
            symbol,
            start: None,
            end: None,
            confidence: None,
        })
    }

    /// Builds one token per symbol, preserving order.
    pub fn sequence<I, S>(symbols: I) -> Result<Vec<Self>, PipelineError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        symbols.into_iter().map(Token::new).collect()
    }

    /// Offsets are seconds from the start of the audio.
    pub fn with_timing(self, start: Option<f64>, end: Option<f64>) -> Result<Self, PipelineError> {
        for offset in [start, end].into_iter().flatten() {
            if !offset.is_finite() || offset < 0.0 {
                return Err(PipelineError::invalid_input(format!(
                    "token `{}` has invalid time offset {offset}",
                    self.symbol
                )));
            }
        }
        if let (Some(start), Some(end)) = (start, end) {
            if end < start {
                return Err(PipelineError::invalid_input(format!(
                    "token `{}` ends ({end}) before it starts ({start})",
                    self.symbol
                )));
            }
        }
        Ok(Self { start, end, ..self })
    }

    pub fn with_confidence(self, confidence: f32) -> Result<Self, PipelineError> {
        if !(0.0..=1.0).contains(&confidence) {
            return Err(PipelineError::invalid_input(format!(
                "token `{}` confidence {confidence} is outside [0, 1]",
                self.symbol
            )));
        }
        Ok(Self {
            confidence: Some(confidence),
            ..self
        })
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn start(&self) -> Option<f64> {
        self.start
    }

    pub fn end(&self) -> Option<f64> {
        self.end
    }

    pub fn confidence(&self) -> Option<f32> {
        self.confidence
    }
}
