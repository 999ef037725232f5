pub mod dense;

pub use dense::{Layer, Parameter};
