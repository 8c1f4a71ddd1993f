use crate::math::matrix::Matrix;

/// Sparse categorical cross-entropy for a softmax output.
pub struct CrossEntropyLoss;

/// Small epsilon added inside log() to prevent log(0) = -inf.
const EPS: f64 = 1e-12;

impl CrossEntropyLoss {
    /// Mean of `-ln(p[label])` over every row of every step in a window.
    ///
    /// `predictions[t]` has shape `(batch, num_classes)`; `labels[t][b]` is the
    /// class of row `b` at step `t`.
    pub fn loss(predictions: &[Matrix], labels: &[Vec<u8>]) -> f64 {
        assert_eq!(predictions.len(), labels.len(), "one label column per step");
        let mut total = 0.0;
        let mut count = 0usize;
        for (probs, step_labels) in predictions.iter().zip(labels.iter()) {
            for (row, &label) in probs.data.iter().zip(step_labels.iter()) {
                total -= (row[label as usize] + EPS).ln();
                count += 1;
            }
        }
        if count == 0 { 0.0 } else { total / count as f64 }
    }

    /// Gradient of the combined Softmax + cross-entropy w.r.t. the logits of
    /// one step: `(predicted - onehot(label)) / normalizer`.
    ///
    /// `normalizer` is the number of predictions the loss is averaged over.
    pub fn derivative(predicted: &Matrix, labels: &[u8], normalizer: f64) -> Matrix {
        let mut grad = predicted.clone();
        for (row, &label) in grad.data.iter_mut().zip(labels.iter()) {
            row[label as usize] -= 1.0;
        }
        grad.scale(1.0 / normalizer)
    }
}
