use crate::activation::activation::softmax_rows;
use crate::loss::criterion::Criterion;
use crate::math::matrix::Matrix;

/// Small epsilon added inside log() to prevent log(0) = -inf.
const EPS: f64 = 1e-12;

/// Softmax cross-entropy over raw logits.
///
/// Targets are row distributions: one-hot for hard labels, or soft rows as
/// produced by mixup. With `label_smoothing > 0` every target row is first
/// mixed with the uniform distribution.
#[derive(Debug, Clone, Copy, Default)]
pub struct CrossEntropyLoss {
    pub label_smoothing: f64,
}

impl CrossEntropyLoss {
    pub fn new() -> CrossEntropyLoss {
        CrossEntropyLoss { label_smoothing: 0.0 }
    }

    pub fn with_label_smoothing(label_smoothing: f64) -> CrossEntropyLoss {
        CrossEntropyLoss { label_smoothing }
    }

    fn smoothed(&self, targets: &Matrix) -> Matrix {
        if self.label_smoothing <= 0.0 || targets.cols == 0 {
            return targets.clone();
        }
        let off = self.label_smoothing / targets.cols as f64;
        targets.map(|t| t * (1.0 - self.label_smoothing) + off)
    }
}

impl Criterion for CrossEntropyLoss {
    ///   L = -1/B · Σ_b Σ_i t[b,i] · log(softmax(z)[b,i] + eps)
    fn loss(&self, outputs: &Matrix, targets: &Matrix) -> f64 {
        assert_eq!(outputs.shape(), targets.shape(), "outputs and targets must share a shape");
        if outputs.rows == 0 {
            return 0.0;
        }
        let probs = softmax_rows(outputs);
        let targets = self.smoothed(targets);
        let total: f64 = probs
            .as_slice()
            .iter()
            .zip(targets.as_slice())
            .map(|(p, t)| -t * (p + EPS).ln())
            .sum();
        total / outputs.rows as f64
    }

    /// Softmax and cross-entropy composed: ∂L/∂z = (softmax(z) - t) / B.
    fn gradient(&self, outputs: &Matrix, targets: &Matrix) -> Matrix {
        let probs = softmax_rows(outputs);
        let batch = outputs.rows.max(1) as f64;
        (probs - self.smoothed(targets)).scale(1.0 / batch)
    }
}

/// One-hot encodes class indices into a `classes`-wide target matrix.
pub fn one_hot(classes: &[usize], num_classes: usize) -> Matrix {
    let mut m = Matrix::zeros(classes.len(), num_classes);
    for (r, &c) in classes.iter().enumerate() {
        m.set(r, c, 1.0);
    }
    m
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_logits_give_log_classes() {
        let logits = Matrix::zeros(2, 4);
        let targets = one_hot(&[0, 3], 4);
        let loss = CrossEntropyLoss::new().loss(&logits, &targets);
        assert!((loss - 4f64.ln()).abs() < 1e-9);
    }

    #[test]
    fn gradient_rows_sum_to_zero() {
        let logits = Matrix::from_data(vec![vec![1.0, -1.0, 0.5]]);
        let targets = one_hot(&[2], 3);
        let g = CrossEntropyLoss::with_label_smoothing(0.1).gradient(&logits, &targets);
        let s: f64 = g.row(0).iter().sum();
        assert!(s.abs() < 1e-12);
    }

    #[test]
    fn huge_logits_yield_non_finite_free_loss() {
        let logits = Matrix::from_data(vec![vec![1e6, -1e6]]);
        let loss = CrossEntropyLoss::new().loss(&logits, &one_hot(&[0], 2));
        assert!(loss.is_finite());
    }
}
