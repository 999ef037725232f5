use serde::{Deserialize, Serialize};

use crate::data::loader::Batch;
use crate::math::matrix::Matrix;

/// Numeric precision used inside an autocast region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Precision {
    #[default]
    F64,
    /// Values leaving the autocast region are rounded through `f32`.
    F32,
}

impl Precision {
    pub fn round(self, m: Matrix) -> Matrix {
        match self {
            Precision::F64 => m,
            Precision::F32 => m.map(|x| x as f32 as f64),
        }
    }
}

/// Where batches are computed.
pub trait Device {
    /// Moves a batch into device memory.
    fn transfer(&self, batch: Batch) -> Batch;

    fn precision(&self) -> Precision;

    /// Runs `f` inside the device's reduced-precision context.
    fn autocast<R, F: FnOnce(Precision) -> R>(&self, f: F) -> R {
        f(self.precision())
    }

    /// Blocks until all queued device work has finished.
    fn synchronize(&self);
}

/// Host execution: transfers are moves and work is never queued.
#[derive(Debug, Clone, Copy, Default)]
pub struct Cpu {
    pub precision: Precision,
}

impl Cpu {
    pub fn new() -> Cpu {
        Cpu::default()
    }

    pub fn with_precision(precision: Precision) -> Cpu {
        Cpu { precision }
    }
}

impl Device for Cpu {
    fn transfer(&self, batch: Batch) -> Batch {
        batch
    }

    fn precision(&self) -> Precision {
        self.precision
    }

    fn synchronize(&self) {}
}
