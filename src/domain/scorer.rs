// ============================================================
// Layer 3 — Micro-averaged Relation Scorer
// ============================================================
// Pools true/false positives over every relation before taking
// the ratio. `no_relation` is the negative class: predicting it
// is never a guess, and gold `no_relation` is never a target.
//
//   precision = correct / guessed   (1.0 when nothing was guessed)
//   recall    = correct / gold      (0.0 when there is no gold)
//   f1        = 2PR / (P + R)

use serde::{Deserialize, Serialize};

use crate::domain::{error::TrainError, labels::NO_RELATION};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Score {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
}

/// Score `predicted` against `gold`; both must be in the same example order.
pub fn score<G, P>(gold: &[G], predicted: &[P]) -> Result<Score, TrainError>
where
    G: AsRef<str>,
    P: AsRef<str>,
{
    if gold.len() != predicted.len() {
        return Err(TrainError::data(
            "scorer",
            format!(
                "{} predictions for {} gold labels",
                predicted.len(),
                gold.len()
            ),
        ));
    }

    let mut correct = 0usize;
    let mut guessed = 0usize;
    let mut gold_total = 0usize;

    for (g, p) in gold.iter().zip(predicted) {
        let (g, p) = (g.as_ref(), p.as_ref());
        let gold_positive = g != NO_RELATION;
        let guess_positive = p != NO_RELATION;

        if guess_positive {
            guessed += 1;
        }
        if gold_positive {
            gold_total += 1;
        }
        if gold_positive && guess_positive && g == p {
            correct += 1;
        }
    }

    let precision = if guessed > 0 {
        correct as f64 / guessed as f64
    } else {
        1.0
    };
    let recall = if gold_total > 0 {
        correct as f64 / gold_total as f64
    } else {
        0.0
    };
    let f1 = if precision + recall > 0.0 {
        2.0 * precision * recall / (precision + recall)
    } else {
        0.0
    };

    Ok(Score { precision, recall, f1 })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_perfect_predictions() {
        let gold = ["per:title", NO_RELATION, "org:founded"];
        let s = score(&gold, &gold).unwrap();
        assert_eq!(s, Score { precision: 1.0, recall: 1.0, f1: 1.0 });
    }

    #[test]
    fn test_negative_class_is_not_counted() {
        // one correct, one false positive, one miss
        let gold = ["per:title", NO_RELATION, "org:founded", NO_RELATION];
        let pred = ["per:title", "per:age", NO_RELATION, NO_RELATION];
        let s = score(&gold, &pred).unwrap();
        assert!((s.precision - 0.5).abs() < 1e-12);
        assert!((s.recall - 0.5).abs() < 1e-12);
        assert!((s.f1 - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_wrong_positive_label_counts_as_guess_and_miss() {
        let gold = ["per:title"];
        let pred = ["per:age"];
        let s = score(&gold, &pred).unwrap();
        assert_eq!(s.precision, 0.0);
        assert_eq!(s.recall, 0.0);
        assert_eq!(s.f1, 0.0);
    }

    #[test]
    fn test_all_negative_predictions() {
        let gold = ["per:title", "org:founded"];
        let pred = [NO_RELATION, NO_RELATION];
        let s = score(&gold, &pred).unwrap();
        assert_eq!(s.precision, 1.0);
        assert_eq!(s.recall, 0.0);
        assert_eq!(s.f1, 0.0);
    }

    #[test]
    fn test_length_mismatch_is_a_data_error() {
        let gold = ["per:title", "org:founded"];
        let pred = ["per:title"];
        assert!(matches!(score(&gold, &pred), Err(TrainError::Data { .. })));
    }
}
