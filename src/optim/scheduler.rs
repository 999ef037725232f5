use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

/// Epoch-indexed learning-rate schedule.
///
/// The training loop calls `advance(epoch)` once per batch with the current
/// epoch index and pushes the returned rate into the optimizer, so a
/// schedule must be a pure function of the epoch.
pub trait Schedulable {
    fn advance(&mut self, epoch: usize) -> f64;
}

/// Multiplies the base rate by `gamma` every `step_size` epochs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepLr {
    pub base_lr: f64,
    pub step_size: usize,
    pub gamma: f64,
}

impl StepLr {
    pub fn new(base_lr: f64, step_size: usize, gamma: f64) -> StepLr {
        StepLr { base_lr, step_size: step_size.max(1), gamma }
    }
}

impl Schedulable for StepLr {
    fn advance(&mut self, epoch: usize) -> f64 {
        self.base_lr * self.gamma.powi((epoch / self.step_size) as i32)
    }
}

/// Cosine decay from `base_lr` to `min_lr` over `t_max` epochs, with an
/// optional linear warmup from `warmup_lr`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CosineLr {
    pub base_lr: f64,
    pub min_lr: f64,
    pub t_max: usize,
    pub warmup_epochs: usize,
    pub warmup_lr: f64,
}

impl CosineLr {
    pub fn new(base_lr: f64, min_lr: f64, t_max: usize) -> CosineLr {
        CosineLr { base_lr, min_lr, t_max: t_max.max(1), warmup_epochs: 0, warmup_lr: min_lr }
    }

    pub fn with_warmup(mut self, warmup_epochs: usize, warmup_lr: f64) -> CosineLr {
        self.warmup_epochs = warmup_epochs;
        self.warmup_lr = warmup_lr;
        self
    }
}

impl Schedulable for CosineLr {
    fn advance(&mut self, epoch: usize) -> f64 {
        if epoch < self.warmup_epochs {
            let t = epoch as f64 / self.warmup_epochs as f64;
            return self.warmup_lr + t * (self.base_lr - self.warmup_lr);
        }
        let t = (epoch - self.warmup_epochs).min(self.t_max) as f64 / self.t_max as f64;
        self.min_lr + 0.5 * (self.base_lr - self.min_lr) * (1.0 + (PI * t).cos())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_lr_decays_on_boundaries() {
        let mut s = StepLr::new(0.1, 2, 0.5);
        assert_eq!(s.advance(0), 0.1);
        assert_eq!(s.advance(1), 0.1);
        assert_eq!(s.advance(2), 0.05);
        assert_eq!(s.advance(5), 0.025);
    }

    #[test]
    fn cosine_hits_endpoints() {
        let mut s = CosineLr::new(1.0, 0.0, 10).with_warmup(2, 0.1);
        assert!((s.advance(0) - 0.1).abs() < 1e-12);
        assert!((s.advance(2) - 1.0).abs() < 1e-12);
        assert!(s.advance(12).abs() < 1e-12);
        assert!(s.advance(50).abs() < 1e-12);
    }
}
