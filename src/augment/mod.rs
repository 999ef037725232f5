pub mod mixup;

pub use mixup::{Mixup, MixupConfig};

use crate::math::matrix::Matrix;

/// Batch augmentation applied before the forward pass.
pub trait Augment {
    fn apply(&mut self, inputs: Matrix, targets: Matrix) -> (Matrix, Matrix);
}
