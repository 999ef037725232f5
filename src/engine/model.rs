use crate::layers::dense::Parameter;
use crate::math::matrix::Matrix;

/// What the epoch loops need from a trainable model.
///
/// `forward` may cache intermediate activations for a following `backward`;
/// `predict` must not touch any gradient state and is the only entry point
/// used during evaluation.
pub trait Model {
    /// Switches between training and evaluation behaviour.
    fn set_training(&mut self, training: bool);

    fn is_training(&self) -> bool;

    fn forward(&mut self, inputs: &Matrix) -> Matrix;

    fn predict(&self, inputs: &Matrix) -> Matrix;

    /// Back-propagates ∂L/∂outputs, accumulating into parameter gradients.
    fn backward(&mut self, grad_output: &Matrix);

    fn parameters(&self) -> Vec<&Parameter>;

    fn parameters_mut(&mut self) -> Vec<&mut Parameter>;

    /// Rescales all gradients so their global L2 norm is at most `max_norm`.
    /// Returns the norm measured before clipping.
    fn clip_grad_norm(&mut self, max_norm: f64) -> f64 {
        let mut params = self.parameters_mut();
        let total = params
            .iter()
            .map(|p| p.grad.squared_norm())
            .sum::<f64>()
            .sqrt();
        if total > max_norm && total > 0.0 {
            let factor = max_norm / (total + 1e-6);
            for p in params.iter_mut() {
                p.grad = p.grad.scale(factor);
            }
        }
        total
    }
}
