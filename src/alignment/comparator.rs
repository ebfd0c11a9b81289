use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use async_trait::async_trait;
use tracing::debug;

use crate::alignment::cost::{CostModel, UnitCost, WeightedCost};
use crate::alignment::engine::align;
use crate::model::{CompareResult, PluginParams, Token};
use crate::plugin::{Comparator, Plugin};

/// Default comparator: runs the alignment engine with a unit or weighted
/// cost model chosen from its construction params.
pub struct LevenshteinComparator {
    cost: Arc<dyn CostModel>,
}

impl std::fmt::Debug for LevenshteinComparator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LevenshteinComparator").finish_non_exhaustive()
    }
}

impl Default for LevenshteinComparator {
    fn default() -> Self {
        Self::new(Arc::new(UnitCost))
    }
}

impl LevenshteinComparator {
    pub const NAME: &'static str = "levenshtein";

    pub fn new(cost: Arc<dyn CostModel>) -> Self {
        Self { cost }
    }

    pub fn from_params(params: &PluginParams) -> Result<Self> {
        if WeightedCost::uses_params(params) {
            return Ok(Self::new(Arc::new(WeightedCost::from_params(params)?)));
        }
        Ok(Self::default())
    }
}

#[async_trait]
impl Plugin for LevenshteinComparator {
    fn name(&self) -> &str {
        Self::NAME
    }
}

#[async_trait]
impl Comparator for LevenshteinComparator {
    async fn compare(
        &self,
        hypothesis: &[Token],
        reference: &[Token],
        _options: &PluginParams,
    ) -> Result<CompareResult> {
        let started = Instant::now();
        let result = align(hypothesis, reference, self.cost.as_ref())?;
        debug!(
            target: "alignment",
            hypothesis_len = hypothesis.len(),
            reference_len = reference.len(),
            operations = result.operations.len(),
            error_rate = result.error_rate,
            elapsed_us = started.elapsed().as_micros() as u64,
            "aligned phoneme sequences"
        );
        Ok(result)
    }
}
