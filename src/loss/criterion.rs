use crate::math::matrix::Matrix;

/// A batch loss over model outputs and per-row target distributions.
pub trait Criterion {
    /// Mean loss over the batch.
    fn loss(&self, outputs: &Matrix, targets: &Matrix) -> f64;

    /// ∂(mean loss)/∂outputs, same shape as `outputs`.
    fn gradient(&self, outputs: &Matrix, targets: &Matrix) -> Matrix;
}
