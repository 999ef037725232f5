pub mod optimizer;
pub mod scheduler;
pub mod sgd;

pub use optimizer::Optimizable;
pub use scheduler::{Schedulable, StepLr, CosineLr};
pub use sgd::Sgd;
