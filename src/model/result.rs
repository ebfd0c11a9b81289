use serde::{Serialize, Serializer};

use crate::error::AlignmentError;
use crate::model::Token;

/// Relative slack allowed when re-checking a reported error rate.
const ERROR_RATE_TOLERANCE: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Match,
    Substitution,
    Insertion,
    Deletion,
}

impl OperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::Match => "match",
            OperationKind::Substitution => "substitution",
            OperationKind::Insertion => "insertion",
            OperationKind::Deletion => "deletion",
        }
    }

    pub fn is_error(&self) -> bool {
        !matches!(self, OperationKind::Match)
    }
}

/// One step of an edit script from the reference towards the hypothesis.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Operation {
    pub kind: OperationKind,
    #[serde(
        rename = "hyp",
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_symbol"
    )]
    pub hypothesis_token: Option<Token>,
    #[serde(
        rename = "ref",
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_symbol"
    )]
    pub reference_token: Option<Token>,
    pub cost: f64,
}

impl Operation {
    pub fn matched(reference: Token, hypothesis: Token) -> Self {
        Self {
            kind: OperationKind::Match,
            hypothesis_token: Some(hypothesis),
            reference_token: Some(reference),
            cost: 0.0,
        }
    }

    pub fn substitution(reference: Token, hypothesis: Token, cost: f64) -> Self {
        Self {
            kind: OperationKind::Substitution,
            hypothesis_token: Some(hypothesis),
            reference_token: Some(reference),
            cost,
        }
    }

    pub fn insertion(hypothesis: Token, cost: f64) -> Self {
        Self {
            kind: OperationKind::Insertion,
            hypothesis_token: Some(hypothesis),
            reference_token: None,
            cost,
        }
    }

    pub fn deletion(reference: Token, cost: f64) -> Self {
        Self {
            kind: OperationKind::Deletion,
            hypothesis_token: None,
            reference_token: Some(reference),
            cost,
        }
    }

    fn check_shape(&self, index: usize) -> Result<(), AlignmentError> {
        let (needs_hyp, needs_ref) = match self.kind {
            OperationKind::Match | OperationKind::Substitution => (true, true),
            OperationKind::Insertion => (true, false),
            OperationKind::Deletion => (false, true),
        };
        if self.hypothesis_token.is_some() != needs_hyp || self.reference_token.is_some() != needs_ref
        {
            return Err(AlignmentError::invariant(format!(
                "operation {index} ({}) carries the wrong tokens",
                self.kind.as_str()
            )));
        }
        if !self.cost.is_finite() || self.cost < 0.0 {
            return Err(AlignmentError::invariant(format!(
                "operation {index} has invalid cost {}",
                self.cost
            )));
        }
        if let (Some(hyp), Some(reference)) = (&self.hypothesis_token, &self.reference_token) {
            let same = hyp.symbol() == reference.symbol();
            if same != (self.kind == OperationKind::Match) {
                return Err(AlignmentError::invariant(format!(
                    "operation {index} is labelled {} for `{}` -> `{}`",
                    self.kind.as_str(),
                    reference.symbol(),
                    hyp.symbol()
                )));
            }
        }
        Ok(())
    }
}

fn serialize_symbol<S: Serializer>(token: &Option<Token>, serializer: S) -> Result<S::Ok, S::Error> {
    match token {
        Some(token) => serializer.serialize_some(token.symbol()),
        None => serializer.serialize_none(),
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct OperationCounts {
    #[serde(rename = "match")]
    pub matches: usize,
    #[serde(rename = "sub")]
    pub substitutions: usize,
    #[serde(rename = "ins")]
    pub insertions: usize,
    #[serde(rename = "del")]
    pub deletions: usize,
}

impl OperationCounts {
    pub fn tally<'a>(operations: impl IntoIterator<Item = &'a Operation>) -> Self {
        let mut counts = Self::default();
        for operation in operations {
            match operation.kind {
                OperationKind::Match => counts.matches += 1,
                OperationKind::Substitution => counts.substitutions += 1,
                OperationKind::Insertion => counts.insertions += 1,
                OperationKind::Deletion => counts.deletions += 1,
            }
        }
        counts
    }

    pub fn errors(&self) -> usize {
        self.substitutions + self.insertions + self.deletions
    }

    pub fn total(&self) -> usize {
        self.matches + self.errors()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompareResult {
    pub hypothesis_tokens: Vec<Token>,
    pub reference_tokens: Vec<Token>,
    pub operations: Vec<Operation>,
    pub error_rate: f64,
    pub counts: OperationCounts,
}

impl CompareResult {
    /// Derives counts and the phoneme error rate from an edit script and
    /// checks that the script is consistent with both sequences.
    pub fn from_operations(
        hypothesis_tokens: Vec<Token>,
        reference_tokens: Vec<Token>,
        operations: Vec<Operation>,
    ) -> Result<Self, AlignmentError> {
        let counts = OperationCounts::tally(&operations);
        let error_rate = phoneme_error_rate(&counts, reference_tokens.len())?;
        let result = Self {
            hypothesis_tokens,
            reference_tokens,
            operations,
            error_rate,
            counts,
        };
        result.validate()?;
        Ok(result)
    }

    pub fn validate(&self) -> Result<(), AlignmentError> {
        if self.reference_tokens.is_empty() {
            return Err(AlignmentError::EmptyReference);
        }

        for (index, operation) in self.operations.iter().enumerate() {
            operation.check_shape(index)?;
        }

        let counts = OperationCounts::tally(&self.operations);
        if counts != self.counts || counts.total() != self.operations.len() {
            return Err(AlignmentError::invariant(format!(
                "reported counts {:?} disagree with operations {:?}",
                self.counts, counts
            )));
        }

        let hyp_rebuilt = self
            .operations
            .iter()
            .filter_map(|operation| operation.hypothesis_token.as_ref());
        if !hyp_rebuilt.eq(self.hypothesis_tokens.iter()) {
            return Err(AlignmentError::invariant(
                "operations do not reconstruct the hypothesis sequence",
            ));
        }

        let ref_rebuilt = self
            .operations
            .iter()
            .filter_map(|operation| operation.reference_token.as_ref());
        if !ref_rebuilt.eq(self.reference_tokens.iter()) {
            return Err(AlignmentError::invariant(
                "operations do not reconstruct the reference sequence",
            ));
        }

        let expected = phoneme_error_rate(&counts, self.reference_tokens.len())?;
        if (expected - self.error_rate).abs() > ERROR_RATE_TOLERANCE * expected.max(1.0) {
            return Err(AlignmentError::invariant(format!(
                "error rate {} does not match counted operations ({expected})",
                self.error_rate
            )));
        }
        Ok(())
    }
}

/// (substitutions + insertions + deletions) / reference length.
fn phoneme_error_rate(
    counts: &OperationCounts,
    reference_len: usize,
) -> Result<f64, AlignmentError> {
    if reference_len == 0 {
        return Err(AlignmentError::EmptyReference);
    }
    Ok(counts.errors() as f64 / reference_len as f64)
}
