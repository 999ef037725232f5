pub mod dist;
pub mod epoch_stats;
pub mod sink;
pub mod smoothed;

pub use dist::{ProcessGroup, SingleProcess};
pub use epoch_stats::{EpochStats, EpochSummary};
pub use sink::{JsonlSink, MemorySink, ScalarRecord, ScalarSink};
pub use smoothed::{MeterFormat, SmoothedValue};
