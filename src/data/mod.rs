pub mod csv;
pub mod loader;

pub use csv::{builtin_blobs, load_csv, parse_csv, Dataset};
pub use loader::{Batch, Batches, DataLoader};
