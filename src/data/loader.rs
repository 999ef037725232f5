use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::loss::cross_entropy::one_hot;
use crate::math::matrix::Matrix;

/// One mini-batch: inputs are `[batch, features]`, targets are
/// `[batch, classes]` row distributions (one-hot unless augmented).
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    pub inputs: Matrix,
    pub targets: Matrix,
}

impl Batch {
    pub fn new(inputs: Matrix, targets: Matrix) -> Batch {
        assert_eq!(inputs.rows, targets.rows, "inputs and targets must have equal length");
        Batch { inputs, targets }
    }

    pub fn len(&self) -> usize {
        self.inputs.rows
    }

    pub fn is_empty(&self) -> bool {
        self.inputs.rows == 0
    }

    /// Hard class of each row (argmax of the target distribution).
    pub fn classes(&self) -> Vec<usize> {
        self.targets.argmax_rows()
    }
}

/// An in-memory classification dataset split into mini-batches.
///
/// Each call to `iter(epoch)` yields every sample exactly once. With
/// shuffling on, the order is a deterministic function of `seed + epoch`.
#[derive(Debug, Clone)]
pub struct DataLoader {
    inputs: Vec<Vec<f64>>,
    classes: Vec<usize>,
    num_classes: usize,
    batch_size: usize,
    shuffle: bool,
    seed: u64,
}

impl DataLoader {
    /// # Panics
    /// Panics if lengths mismatch or `batch_size == 0`.
    pub fn new(inputs: Vec<Vec<f64>>, classes: Vec<usize>, num_classes: usize, batch_size: usize) -> DataLoader {
        assert_eq!(inputs.len(), classes.len(), "inputs and classes must have equal length");
        assert!(batch_size > 0, "batch_size must be at least 1");
        DataLoader { inputs, classes, num_classes, batch_size, shuffle: false, seed: 0 }
    }

    pub fn shuffled(mut self, seed: u64) -> DataLoader {
        self.shuffle = true;
        self.seed = seed;
        self
    }

    pub fn num_samples(&self) -> usize {
        self.inputs.len()
    }

    pub fn num_classes(&self) -> usize {
        self.num_classes
    }

    /// Number of batches per epoch, counting a final partial batch.
    pub fn num_batches(&self) -> usize {
        (self.inputs.len() + self.batch_size - 1) / self.batch_size
    }

    pub fn iter(&self, epoch: usize) -> Batches<'_> {
        let mut order: Vec<usize> = (0..self.inputs.len()).collect();
        if self.shuffle {
            let mut rng = StdRng::seed_from_u64(self.seed.wrapping_add(epoch as u64));
            order.shuffle(&mut rng);
        }
        Batches { loader: self, order, cursor: 0 }
    }
}

/// Iterator over the batches of one epoch.
pub struct Batches<'a> {
    loader: &'a DataLoader,
    order: Vec<usize>,
    cursor: usize,
}

impl Iterator for Batches<'_> {
    type Item = Batch;

    fn next(&mut self) -> Option<Batch> {
        if self.cursor >= self.order.len() {
            return None;
        }
        let end = (self.cursor + self.loader.batch_size).min(self.order.len());
        let idx = &self.order[self.cursor..end];
        self.cursor = end;

        let inputs = Matrix::from_data(idx.iter().map(|&i| self.loader.inputs[i].clone()).collect());
        let classes: Vec<usize> = idx.iter().map(|&i| self.loader.classes[i]).collect();
        Some(Batch::new(inputs, one_hot(&classes, self.loader.num_classes)))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.order.len() - self.cursor;
        let n = (left + self.loader.batch_size - 1) / self.loader.batch_size;
        (n, Some(n))
    }
}

impl ExactSizeIterator for Batches<'_> {}
