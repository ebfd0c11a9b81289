use crate::alignment::cost::CostModel;
use crate::error::AlignmentError;
use crate::model::{CompareResult, Operation, Token};

/// Two accumulated costs closer than this are treated as a tie.
pub const COST_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Diagonal,
    Delete,
    Insert,
}

/// Full `(m + 1) x (n + 1)` Wagner-Fischer table with one backpointer per
/// cell. Memory grows with `m * n`; phoneme sequences are short enough that
/// the full table is kept rather than a Hirschberg reconstruction.
struct AlignmentTable {
    cols: usize,
    costs: Vec<f64>,
    steps: Vec<Step>,
}

impl AlignmentTable {
    fn build(
        hypothesis: &[Token],
        reference: &[Token],
        model: &dyn CostModel,
        insertion: f64,
        deletion: f64,
    ) -> Result<Self, AlignmentError> {
        let rows = reference.len() + 1;
        let cols = hypothesis.len() + 1;
        let mut costs = vec![0.0_f64; rows * cols];
        let mut steps = vec![Step::Diagonal; rows * cols];

        for i in 1..rows {
            costs[i * cols] = i as f64 * deletion;
            steps[i * cols] = Step::Delete;
        }
        for j in 1..cols {
            costs[j] = j as f64 * insertion;
            steps[j] = Step::Insert;
        }

        for i in 1..rows {
            let reference_symbol = reference[i - 1].symbol();
            for j in 1..cols {
                let substitution = edit_cost(model, reference_symbol, hypothesis[j - 1].symbol())?;
                let diagonal = costs[(i - 1) * cols + (j - 1)] + substitution;
                let delete = costs[(i - 1) * cols + j] + deletion;
                let insert = costs[i * cols + (j - 1)] + insertion;

                // Ties resolve diagonal, then deletion, then insertion.
                let (mut best, mut step) = (diagonal, Step::Diagonal);
                if delete < best - COST_EPSILON {
                    best = delete;
                    step = Step::Delete;
                }
                if insert < best - COST_EPSILON {
                    best = insert;
                    step = Step::Insert;
                }

                costs[i * cols + j] = best;
                steps[i * cols + j] = step;
            }
        }

        Ok(Self { cols, costs, steps })
    }

    fn total_cost(&self) -> f64 {
        self.costs[self.costs.len() - 1]
    }

    fn backtrace(
        &self,
        hypothesis: &[Token],
        reference: &[Token],
        model: &dyn CostModel,
        insertion: f64,
        deletion: f64,
    ) -> Result<Vec<Operation>, AlignmentError> {
        let (mut i, mut j) = (reference.len(), hypothesis.len());
        let mut operations = Vec::with_capacity(i.max(j));

        while i > 0 || j > 0 {
            match self.steps[i * self.cols + j] {
                Step::Diagonal if i > 0 && j > 0 => {
                    let reference_token = reference[i - 1].clone();
                    let hypothesis_token = hypothesis[j - 1].clone();
                    let operation = if reference_token.symbol() == hypothesis_token.symbol() {
                        Operation::matched(reference_token, hypothesis_token)
                    } else {
                        let cost = edit_cost(
                            model,
                            reference_token.symbol(),
                            hypothesis_token.symbol(),
                        )?;
                        Operation::substitution(reference_token, hypothesis_token, cost)
                    };
                    operations.push(operation);
                    i -= 1;
                    j -= 1;
                }
                Step::Delete if i > 0 => {
                    operations.push(Operation::deletion(reference[i - 1].clone(), deletion));
                    i -= 1;
                }
                Step::Insert if j > 0 => {
                    operations.push(Operation::insertion(hypothesis[j - 1].clone(), insertion));
                    j -= 1;
                }
                step => {
                    return Err(AlignmentError::invariant(format!(
                        "backtrace left the table at ({i}, {j}) via {step:?}"
                    )));
                }
            }
        }

        operations.reverse();
        Ok(operations)
    }
}

/// Minimum-cost edit script turning `reference` into `hypothesis`, with
/// counts and phoneme error rate.
///
/// Pure and deterministic: identical inputs always produce identical
/// operations. Fails with [`AlignmentError::EmptyReference`] when there is
/// nothing to normalise the error rate by.
pub fn align(
    hypothesis: &[Token],
    reference: &[Token],
    model: &dyn CostModel,
) -> Result<CompareResult, AlignmentError> {
    if reference.is_empty() {
        return Err(AlignmentError::EmptyReference);
    }

    let insertion = checked("insertion", model.insertion_cost())?;
    let deletion = checked("deletion", model.deletion_cost())?;

    let table = AlignmentTable::build(hypothesis, reference, model, insertion, deletion)?;
    let operations = table.backtrace(hypothesis, reference, model, insertion, deletion)?;

    let script_cost: f64 = operations.iter().map(|operation| operation.cost).sum();
    if (script_cost - table.total_cost()).abs() > COST_EPSILON * (operations.len() as f64 + 1.0) {
        return Err(AlignmentError::invariant(format!(
            "edit script costs {script_cost} but the table minimum is {}",
            table.total_cost()
        )));
    }

    CompareResult::from_operations(hypothesis.to_vec(), reference.to_vec(), operations)
}

fn edit_cost(model: &dyn CostModel, reference: &str, hypothesis: &str) -> Result<f64, AlignmentError> {
    if reference == hypothesis {
        return Ok(0.0);
    }
    checked("substitution", model.substitution_cost(reference, hypothesis))
}

fn checked(operation: &'static str, value: f64) -> Result<f64, AlignmentError> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(AlignmentError::InvalidCost { operation, value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alignment::cost::{UnitCost, WeightedCost};
    use crate::model::OperationKind;

    fn seq(symbols: &str) -> Vec<Token> {
        Token::sequence(symbols.split_whitespace()).expect("valid symbols")
    }

    fn kinds(result: &CompareResult) -> Vec<OperationKind> {
        result.operations.iter().map(|operation| operation.kind).collect()
    }

    #[test]
    fn single_substitution_at_the_end() {
        let result = align(&seq("p a m"), &seq("p a n"), &UnitCost).expect("aligns");
        assert_eq!(
            kinds(&result),
            vec![
                OperationKind::Match,
                OperationKind::Match,
                OperationKind::Substitution
            ]
        );
        let last = &result.operations[2];
        assert_eq!(last.reference_token.as_ref().map(Token::symbol), Some("n"));
        assert_eq!(last.hypothesis_token.as_ref().map(Token::symbol), Some("m"));
        assert_eq!(result.counts.matches, 2);
        assert_eq!(result.counts.substitutions, 1);
        assert_eq!(result.counts.insertions, 0);
        assert_eq!(result.counts.deletions, 0);
        assert!((result.error_rate - 1.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn trailing_deletion() {
        let result = align(&seq("k a s"), &seq("k a s a"), &UnitCost).expect("aligns");
        assert_eq!(result.counts.deletions, 1);
        assert_eq!(result.counts.matches, 3);
        let deleted = result
            .operations
            .iter()
            .find(|operation| operation.kind == OperationKind::Deletion)
            .expect("one deletion");
        assert_eq!(deleted.reference_token.as_ref().map(Token::symbol), Some("a"));
        assert!((result.error_rate - 0.25).abs() < 1e-12);
    }

    #[test]
    fn identical_sequences_only_match() {
        let reference = seq("ʃ ɛ ʁ ʃ e");
        let result = align(&reference, &reference, &UnitCost).expect("aligns");
        assert_eq!(result.operations.len(), reference.len());
        assert!(result
            .operations
            .iter()
            .all(|operation| operation.kind == OperationKind::Match && operation.cost == 0.0));
        assert_eq!(result.error_rate, 0.0);
    }

    #[test]
    fn empty_reference_is_invalid_input() {
        let err = align(&seq("a"), &[], &UnitCost).expect_err("no reference");
        assert_eq!(err, AlignmentError::EmptyReference);
    }

    #[test]
    fn empty_hypothesis_deletes_everything() {
        let result = align(&[], &seq("a b c"), &UnitCost).expect("aligns");
        assert_eq!(result.counts.deletions, 3);
        assert_eq!(result.error_rate, 1.0);
    }

    #[test]
    fn error_rate_is_unbounded_above() {
        let result = align(&seq("x y z w"), &seq("a"), &UnitCost).expect("aligns");
        assert_eq!(result.counts.substitutions, 1);
        assert_eq!(result.counts.insertions, 3);
        assert_eq!(result.error_rate, 4.0);
    }

    #[test]
    fn ties_prefer_substitution_over_gaps() {
        // "a b" -> "b c" can be sub+sub or del+match+ins at equal cost.
        let result = align(&seq("b c"), &seq("a b"), &UnitCost).expect("aligns");
        assert_eq!(
            kinds(&result),
            vec![OperationKind::Substitution, OperationKind::Substitution]
        );
    }

    #[test]
    fn ties_prefer_deletion_over_insertion() {
        // With a prohibitive substitution cost, the final cell ties between a
        // deletion and an insertion; the deletion is taken there, so it ends
        // the script.
        let model = WeightedCost::new(1.0, 1.0, 5.0).expect("valid costs");
        let result = align(&seq("n"), &seq("m"), &model).expect("aligns");
        assert_eq!(
            kinds(&result),
            vec![OperationKind::Insertion, OperationKind::Deletion]
        );
        assert_eq!(result.error_rate, 2.0);
    }

    #[test]
    fn swapped_symbols_are_two_substitutions() {
        let result = align(&seq("a x"), &seq("x a"), &UnitCost).expect("aligns");
        assert_eq!(result.counts.errors(), 2);
        assert_eq!(
            kinds(&result),
            vec![OperationKind::Substitution, OperationKind::Substitution]
        );
    }

    #[test]
    fn leading_gap_then_diagonal() {
        let result = align(&seq("b"), &seq("a c"), &UnitCost).expect("aligns");
        assert_eq!(
            kinds(&result),
            vec![OperationKind::Deletion, OperationKind::Substitution]
        );
    }

    #[test]
    fn repeated_runs_are_identical() {
        let hypothesis = seq("t ɛ s t ɪ ŋ");
        let reference = seq("t e s t i n g");
        let first = align(&hypothesis, &reference, &UnitCost).expect("aligns");
        let second = align(&hypothesis, &reference, &UnitCost).expect("aligns");
        assert_eq!(
            serde_json::to_string(&first).expect("serializable"),
            serde_json::to_string(&second).expect("serializable")
        );
    }

    #[test]
    fn reconstructs_both_sequences() {
        let hypothesis = seq("s t r ɛ ŋ θ");
        let reference = seq("s t ɹ ɛ ŋ k θ s");
        let result = align(&hypothesis, &reference, &UnitCost).expect("aligns");

        let rebuilt_hyp: Vec<Token> = result
            .operations
            .iter()
            .filter(|operation| operation.kind != OperationKind::Deletion)
            .filter_map(|operation| operation.hypothesis_token.clone())
            .collect();
        let rebuilt_ref: Vec<Token> = result
            .operations
            .iter()
            .filter(|operation| operation.kind != OperationKind::Insertion)
            .filter_map(|operation| operation.reference_token.clone())
            .collect();
        assert_eq!(rebuilt_hyp, hypothesis);
        assert_eq!(rebuilt_ref, reference);

        let errors = result.counts.errors() as f64;
        assert_eq!(result.error_rate, errors / reference.len() as f64);
        assert_eq!(result.counts.total(), result.operations.len());
        assert!(result.operations.len() >= hypothesis.len().max(reference.len()));
    }

    #[test]
    fn weighted_costs_change_the_script_not_the_counting() {
        // Substituting i/ɪ is cheap, so the aligner keeps it as a substitution
        // and reports its weighted cost; the error rate still counts it once.
        let model = WeightedCost::default()
            .with_pair("i", "ɪ", 0.2)
            .expect("valid pair");
        let result = align(&seq("b ɪ t"), &seq("b i t"), &model).expect("aligns");
        assert_eq!(result.counts.substitutions, 1);
        assert!((result.operations[1].cost - 0.2).abs() < 1e-12);
        assert!((result.error_rate - 1.0 / 3.0).abs() < 1e-12);
    }

    struct BrokenCost;

    impl CostModel for BrokenCost {
        fn substitution_cost(&self, _reference: &str, _hypothesis: &str) -> f64 {
            -1.0
        }
    }

    #[test]
    fn negative_costs_are_rejected() {
        let err = align(&seq("a"), &seq("b"), &BrokenCost).expect_err("invalid cost");
        assert!(matches!(
            err,
            AlignmentError::InvalidCost {
                operation: "substitution",
                ..
            }
        ));
    }
}
