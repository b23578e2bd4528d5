//! Held-out evaluation metrics
//!
//! Accuracy plus per-class precision/recall/F1/support, mirroring the
//! classification-report fields operators use to decide whether a weak
//! class needs more training data.

use serde::{Deserialize, Serialize};

/// Metrics for one class
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassMetrics {
    pub class: String,
    pub precision: f32,
    pub recall: f32,
    pub f1: f32,
    /// Held-out examples of this class
    pub support: u32,
}

/// Evaluation over a held-out subset
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Evaluation {
    pub accuracy: f32,
    pub macro_f1: f32,
    pub per_class: Vec<ClassMetrics>,
    /// Held-out set size
    pub n_examples: u32,
}

/// Compute metrics from parallel truth/prediction class-index slices.
///
/// Classes with zero support and zero predictions report 0.0 across the
/// board rather than NaN.
pub fn evaluate(truth: &[u16], predicted: &[u16], classes: &[String]) -> Evaluation {
    debug_assert_eq!(truth.len(), predicted.len());
    let n = classes.len();
    let mut true_positive = vec![0u32; n];
    let mut false_positive = vec![0u32; n];
    let mut false_negative = vec![0u32; n];
    let mut correct = 0u32;

    for (&t, &p) in truth.iter().zip(predicted) {
        if t == p {
            correct += 1;
            true_positive[t as usize] += 1;
        } else {
            false_positive[p as usize] += 1;
            false_negative[t as usize] += 1;
        }
    }

    let safe_div = |num: f32, den: f32| if den > 0.0 { num / den } else { 0.0 };

    let per_class: Vec<ClassMetrics> = classes
        .iter()
        .enumerate()
        .map(|(i, class)| {
            let tp = true_positive[i] as f32;
            let precision = safe_div(tp, tp + false_positive[i] as f32);
            let recall = safe_div(tp, tp + false_negative[i] as f32);
            let f1 = safe_div(2.0 * precision * recall, precision + recall);
            ClassMetrics {
                class: class.clone(),
                precision,
                recall,
                f1,
                support: true_positive[i] + false_negative[i],
            }
        })
        .collect();

    let macro_f1 = safe_div(
        per_class.iter().map(|m| m.f1).sum(),
        per_class.len() as f32,
    );

    Evaluation {
        accuracy: safe_div(correct as f32, truth.len() as f32),
        macro_f1,
        per_class,
        n_examples: truth.len() as u32,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classes(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn perfect_predictions() {
        let truth = [0, 1, 1, 0];
        let eval = evaluate(&truth, &truth, &classes(&["a", "b"]));
        assert_eq!(eval.accuracy, 1.0);
        assert_eq!(eval.macro_f1, 1.0);
        assert_eq!(eval.per_class[0].support, 2);
        assert_eq!(eval.per_class[1].support, 2);
    }

    #[test]
    fn mixed_predictions() {
        // truth:     a a b b
        // predicted: a b b b
        let eval = evaluate(&[0, 0, 1, 1], &[0, 1, 1, 1], &classes(&["a", "b"]));
        assert!((eval.accuracy - 0.75).abs() < 1e-6);

        let a = &eval.per_class[0];
        assert!((a.precision - 1.0).abs() < 1e-6);
        assert!((a.recall - 0.5).abs() < 1e-6);

        let b = &eval.per_class[1];
        assert!((b.precision - 2.0 / 3.0).abs() < 1e-6);
        assert!((b.recall - 1.0).abs() < 1e-6);
    }

    #[test]
    fn absent_class_reports_zero_not_nan() {
        let eval = evaluate(&[0, 0], &[0, 0], &classes(&["a", "b"]));
        let b = &eval.per_class[1];
        assert_eq!(b.support, 0);
        assert_eq!(b.precision, 0.0);
        assert_eq!(b.recall, 0.0);
        assert!(b.f1.is_finite());
    }
}
