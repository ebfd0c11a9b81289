use std::collections::HashMap;

use anyhow::{anyhow, Result};
use serde_json::Value;

use crate::model::PluginParams;

/// Edit costs used by the alignment table. Substitution costs must be
/// symmetric and non-negative; identical symbols always cost zero regardless
/// of what the model returns.
pub trait CostModel: Send + Sync {
    fn substitution_cost(&self, reference: &str, hypothesis: &str) -> f64;

    fn insertion_cost(&self) -> f64 {
        1.0
    }

    fn deletion_cost(&self) -> f64 {
        1.0
    }
}

/// Plain Levenshtein weights.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnitCost;

impl CostModel for UnitCost {
    fn substitution_cost(&self, _reference: &str, _hypothesis: &str) -> f64 {
        1.0
    }
}

/// Per-pair substitution weights, e.g. cheaper confusions between phonetically
/// close symbols.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightedCost {
    insertion: f64,
    deletion: f64,
    substitution: f64,
    pairs: HashMap<(String, String), f64>,
}

impl Default for WeightedCost {
    fn default() -> Self {
        Self {
            insertion: 1.0,
            deletion: 1.0,
            substitution: 1.0,
            pairs: HashMap::new(),
        }
    }
}

impl WeightedCost {
    pub fn new(insertion: f64, deletion: f64, substitution: f64) -> Result<Self> {
        Ok(Self {
            insertion: non_negative("insertion", insertion)?,
            deletion: non_negative("deletion", deletion)?,
            substitution: non_negative("substitution", substitution)?,
            pairs: HashMap::new(),
        })
    }

    pub fn with_pair(mut self, a: &str, b: &str, cost: f64) -> Result<Self> {
        let cost = non_negative("pair", cost)?;
        self.pairs.insert(pair_key(a, b), cost);
        Ok(self)
    }

    /// Reads `insertion`, `deletion`, `substitution` and
    /// `pairs: [[a, b, cost], ...]` from comparator params.
    pub fn from_params(params: &PluginParams) -> Result<Self> {
        let defaults = Self::default();
        let mut model = Self::new(
            number(params, "insertion")?.unwrap_or(defaults.insertion),
            number(params, "deletion")?.unwrap_or(defaults.deletion),
            number(params, "substitution")?.unwrap_or(defaults.substitution),
        )?;

        if let Some(pairs) = params.get("pairs") {
            let pairs = pairs
                .as_array()
                .ok_or_else(|| anyhow!("`pairs` must be a list of [a, b, cost] triples"))?;
            for entry in pairs {
                let (a, b, cost) = parse_pair(entry)?;
                model = model.with_pair(a, b, cost)?;
            }
        }
        Ok(model)
    }

    pub fn uses_params(params: &PluginParams) -> bool {
        ["insertion", "deletion", "substitution", "pairs"]
            .iter()
            .any(|key| params.contains_key(*key))
    }
}

impl CostModel for WeightedCost {
    fn substitution_cost(&self, reference: &str, hypothesis: &str) -> f64 {
        self.pairs
            .get(&pair_key(reference, hypothesis))
            .copied()
            .unwrap_or(self.substitution)
    }

    fn insertion_cost(&self) -> f64 {
        self.insertion
    }

    fn deletion_cost(&self) -> f64 {
        self.deletion
    }
}

fn pair_key(a: &str, b: &str) -> (String, String) {
    if a <= b {
        (a.to_string(), b.to_string())
    } else {
        (b.to_string(), a.to_string())
    }
}

fn non_negative(label: &str, value: f64) -> Result<f64> {
    if !value.is_finite() || value < 0.0 {
        return Err(anyhow!("{label} cost must be a finite non-negative number, got {value}"));
    }
    Ok(value)
}

fn number(params: &PluginParams, key: &str) -> Result<Option<f64>> {
    match params.get(key) {
        None => Ok(None),
        Some(value) => value
            .as_f64()
            .map(Some)
            .ok_or_else(|| anyhow!("`{key}` must be a number, got {value}")),
    }
}

fn parse_pair(entry: &Value) -> Result<(&str, &str, f64)> {
    match entry.as_array().map(Vec::as_slice) {
        Some([Value::String(a), Value::String(b), cost]) => {
            let cost = cost
                .as_f64()
                .ok_or_else(|| anyhow!("pair cost must be a number, got {cost}"))?;
            Ok((a.as_str(), b.as_str(), cost))
        }
        _ => Err(anyhow!("malformed substitution pair {entry}")),
    }
}
