//! Phoneme sequence alignment and scoring.

mod comparator;
mod cost;
mod engine;

pub use comparator::LevenshteinComparator;
pub use cost::{CostModel, UnitCost, WeightedCost};
pub use engine::{align, COST_EPSILON};
