use serde::{Serialize, Deserialize};

use crate::{math::matrix::Matrix, activation::activation::ActivationFunction};

/// A trainable tensor together with its accumulated gradient.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Parameter {
    pub value: Matrix,
    #[serde(skip)]
    pub grad: Matrix,
}

impl Parameter {
    pub fn new(value: Matrix) -> Parameter {
        let grad = Matrix::zeros(value.rows, value.cols);
        Parameter { value, grad }
    }

    pub fn zero_grad(&mut self) {
        // Deserialized parameters start with an empty gradient.
        if self.grad.shape() != self.value.shape() {
            self.grad = Matrix::zeros(self.value.rows, self.value.cols);
        } else {
            self.grad.as_mut_slice().iter_mut().for_each(|g| *g = 0.0);
        }
    }

    pub fn accumulate(&mut self, grad: Matrix) {
        if self.grad.shape() != self.value.shape() {
            self.grad = grad;
        } else {
            self.grad = std::mem::take(&mut self.grad) + grad;
        }
    }
}

/// Fully-connected layer: `a = f(x·W + b)` over a batch of rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Layer {
    pub size: usize,
    pub weights: Parameter,
    pub biases: Parameter,
    pub activator: ActivationFunction,
    #[serde(skip)]
    cached_input: Option<Matrix>,
    #[serde(skip)]
    pre_activation: Option<Matrix>, // z = xW + b, needed for the derivative
}

impl Layer {
    pub fn new(size: usize, input_size: usize, activation: ActivationFunction) -> Layer {
        let weights = match activation {
            ActivationFunction::ReLU | ActivationFunction::LeakyReLU { .. } | ActivationFunction::Gelu => {
                Matrix::he(input_size, size)
            }
            _ => Matrix::xavier(input_size, size),
        };
        Layer {
            size,
            weights: Parameter::new(weights),
            biases: Parameter::new(Matrix::zeros(1, size)),
            activator: activation,
            cached_input: None,
            pre_activation: None,
        }
    }

    pub fn input_size(&self) -> usize {
        self.weights.value.rows
    }

    /// Forward pass that keeps what `backward` needs.
    pub fn feed_from(&mut self, input: &Matrix) -> Matrix {
        let z = input.matmul(&self.weights.value).add_row(&self.biases.value);
        let a = z.map(|x| self.activator.function(x));
        self.cached_input = Some(input.clone());
        self.pre_activation = Some(z);
        a
    }

    /// Forward pass with no side effects.
    pub fn infer(&self, input: &Matrix) -> Matrix {
        input
            .matmul(&self.weights.value)
            .add_row(&self.biases.value)
            .map(|x| self.activator.function(x))
    }

    /// Accumulates parameter gradients from `delta` (∂L/∂a for this layer)
    /// and returns ∂L/∂x for the previous layer.
    ///
    /// # Panics
    /// Panics if called without a preceding `feed_from`.
    pub fn backward(&mut self, delta: &Matrix) -> Matrix {
        let z = self.pre_activation.as_ref().expect("backward called before forward");
        let input = self.cached_input.as_ref().expect("backward called before forward");

        // δ = error ⊙ σ'(z)
        let layer_delta = delta.hadamard(&z.map(|x| self.activator.derivative(x)));

        let w_grad = input.transpose().matmul(&layer_delta);
        let b_grad = layer_delta.sum_rows();
        self.weights.accumulate(w_grad);
        self.biases.accumulate(b_grad);

        layer_delta.matmul(&self.weights.value.transpose())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backward_accumulates_until_zeroed() {
        let mut layer = Layer::new(2, 3, ActivationFunction::Identity);
        let x = Matrix::from_data(vec![vec![1.0, 0.0, -1.0]]);
        let delta = Matrix::from_data(vec![vec![1.0, 1.0]]);

        layer.feed_from(&x);
        layer.backward(&delta);
        layer.backward(&delta);
        assert_eq!(layer.biases.grad.as_slice(), &[2.0, 2.0]);

        layer.biases.zero_grad();
        assert_eq!(layer.biases.grad.as_slice(), &[0.0, 0.0]);
    }

    #[test]
    fn infer_matches_feed_from() {
        let mut layer = Layer::new(4, 2, ActivationFunction::Tanh);
        let x = Matrix::from_data(vec![vec![0.5, -0.25], vec![1.0, 2.0]]);
        let a = layer.infer(&x);
        let b = layer.feed_from(&x);
        assert_eq!(a, b);
    }
}
