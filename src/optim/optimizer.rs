use crate::layers::dense::Parameter;

/// Parameter-update rule driven by the training loop.
pub trait Optimizable {
    /// Clears accumulated gradients before a new backward pass.
    fn zero_grad(&mut self, params: &mut [&mut Parameter]) {
        for p in params.iter_mut() {
            p.zero_grad();
        }
    }

    /// Applies one update from the gradients currently stored in `params`.
    fn step(&mut self, params: &mut [&mut Parameter]);

    fn learning_rate(&self) -> f64;

    fn set_learning_rate(&mut self, lr: f64);
}
