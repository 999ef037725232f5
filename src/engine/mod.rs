pub mod accuracy;
pub mod device;
pub mod evaluate;
pub mod model;
pub mod train;

pub use accuracy::{accuracy, TopK};
pub use device::{Cpu, Device, Precision};
pub use evaluate::evaluate;
pub use model::Model;
pub use train::{train_one_epoch, TrainHooks, TrainOptions};
