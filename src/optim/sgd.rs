use crate::{math::matrix::Matrix, layers::dense::Parameter};
use crate::optim::optimizer::Optimizable;

/// Stochastic gradient descent with optional momentum and L2 weight decay.
pub struct Sgd {
    pub learning_rate: f64,
    pub momentum: f64,
    pub weight_decay: f64,
    velocity: Vec<Matrix>,
}

impl Sgd {
    pub fn new(learning_rate: f64) -> Sgd {
        Sgd { learning_rate, momentum: 0.0, weight_decay: 0.0, velocity: Vec::new() }
    }

    pub fn with_momentum(mut self, momentum: f64) -> Sgd {
        self.momentum = momentum;
        self
    }

    pub fn with_weight_decay(mut self, weight_decay: f64) -> Sgd {
        self.weight_decay = weight_decay;
        self
    }
}

impl Optimizable for Sgd {
    fn step(&mut self, params: &mut [&mut Parameter]) {
        // Momentum buffers are keyed by parameter position.
        if self.velocity.len() != params.len() {
            self.velocity = params
                .iter()
                .map(|p| Matrix::zeros(p.value.rows, p.value.cols))
                .collect();
        }

        for (p, v) in params.iter_mut().zip(self.velocity.iter_mut()) {
            if p.grad.shape() != p.value.shape() {
                continue;
            }
            let mut grad = p.grad.clone();
            if self.weight_decay > 0.0 {
                grad = grad + p.value.scale(self.weight_decay);
            }
            if self.momentum > 0.0 {
                *v = v.scale(self.momentum) + grad;
                grad = v.clone();
            }
            p.value = std::mem::take(&mut p.value) - grad.scale(self.learning_rate);
        }
    }

    fn learning_rate(&self) -> f64 {
        self.learning_rate
    }

    fn set_learning_rate(&mut self, lr: f64) {
        self.learning_rate = lr;
    }
}
