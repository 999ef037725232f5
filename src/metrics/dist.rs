/// Collective reduction across training processes.
///
/// Only the single-process group ships with the crate; a multi-process
/// backend plugs in here.
pub trait ProcessGroup {
    fn world_size(&self) -> usize;

    /// Replaces every value with its sum over all participants.
    fn all_reduce_sum(&self, values: &mut [f64]);
}

/// The group of one: reductions are the identity.
#[derive(Debug, Clone, Copy, Default)]
pub struct SingleProcess;

impl ProcessGroup for SingleProcess {
    fn world_size(&self) -> usize {
        1
    }

    fn all_reduce_sum(&self, _values: &mut [f64]) {}
}
