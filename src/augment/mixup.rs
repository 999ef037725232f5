use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Beta, Distribution};
use serde::{Deserialize, Serialize};

use crate::augment::Augment;
use crate::math::matrix::Matrix;

/// Mixup settings, as stored in run configs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MixupConfig {
    /// Beta(alpha, alpha) concentration; `0` disables mixing.
    pub alpha: f64,
    /// Probability of mixing a given batch.
    #[serde(default = "default_prob")]
    pub prob: f64,
    #[serde(default)]
    pub label_smoothing: f64,
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_prob() -> f64 {
    1.0
}

/// Batch-level mixup: every sample is blended with its mirror in the batch
/// (`x[i]` with `x[B-1-i]`) using one λ ~ Beta(α, α) per batch. Targets are
/// label-smoothed and blended with the same λ.
pub struct Mixup {
    config: MixupConfig,
    beta: Option<Beta<f64>>,
    rng: StdRng,
    last_lambda: f64,
}

impl Mixup {
    pub fn new(config: MixupConfig) -> Mixup {
        let beta = if config.alpha > 0.0 { Beta::new(config.alpha, config.alpha).ok() } else { None };
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Mixup { config, beta, rng, last_lambda: 1.0 }
    }

    /// λ used for the most recent batch (1.0 when it was left unmixed).
    pub fn last_lambda(&self) -> f64 {
        self.last_lambda
    }

    fn sample_lambda(&mut self) -> f64 {
        match &self.beta {
            Some(beta) if self.rng.gen::<f64>() < self.config.prob => beta.sample(&mut self.rng),
            _ => 1.0,
        }
    }

    fn smooth(&self, targets: &Matrix) -> Matrix {
        let eps = self.config.label_smoothing;
        if eps <= 0.0 || targets.cols == 0 {
            return targets.clone();
        }
        let off = eps / targets.cols as f64;
        targets.map(|t| t * (1.0 - eps) + off)
    }
}

impl Augment for Mixup {
    fn apply(&mut self, inputs: Matrix, targets: Matrix) -> (Matrix, Matrix) {
        let lam = self.sample_lambda();
        self.last_lambda = lam;
        let targets = self.smooth(&targets);
        if lam >= 1.0 {
            return (inputs, targets);
        }
        let mixed_inputs = inputs.scale(lam) + inputs.flip_rows().scale(1.0 - lam);
        let mixed_targets = targets.scale(lam) + targets.flip_rows().scale(1.0 - lam);
        (mixed_inputs, mixed_targets)
    }
}
