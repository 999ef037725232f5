pub mod math;
pub mod activation;
pub mod layers;
pub mod network;
pub mod loss;
pub mod optim;
pub mod metrics;
pub mod data;
pub mod augment;
pub mod ema;
pub mod engine;
pub mod convert;
pub mod labels;
pub mod config;
pub mod error;
pub mod logging;

// Convenience re-exports
pub use math::matrix::Matrix;
pub use activation::activation::ActivationFunction;
pub use layers::dense::{Layer, Parameter};
pub use network::network::Network;
pub use loss::{Criterion, CrossEntropyLoss};
pub use optim::{Optimizable, Schedulable, Sgd};
pub use metrics::{EpochStats, EpochSummary, ScalarSink};
pub use data::{Batch, DataLoader};
pub use engine::{evaluate, train_one_epoch, Cpu, Device, Model, TopK, TrainHooks, TrainOptions};
pub use convert::{convert, ConvertReport, DecoderOptions, ImageJob};
pub use error::{ConvertError, EngineError, LabelError};
