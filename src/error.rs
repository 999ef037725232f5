use std::path::PathBuf;

use thiserror::Error;

/// Failures of the image batch converter.
#[derive(Error, Debug)]
pub enum ConvertError {
    /// The image could not be decoded, even after the end-of-image repair.
    #[error("failed to decode image at '{path}': {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("failed to encode JPEG for '{path}': {source}")]
    Encode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("source path does not exist: {0}")]
    MissingSource(PathBuf),

    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Failures of the label-file generator.
#[derive(Error, Debug)]
pub enum LabelError {
    #[error("The image({0}) couldn't be recognized")]
    Unrecognized(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures surfaced by the epoch loops.
///
/// `NonFiniteLoss` is fatal for the run: the loop stops pulling batches and
/// hands the decision of how to terminate to the caller.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("Loss is {value}, stopping training (epoch {epoch}, batch {step})")]
    NonFiniteLoss { value: f64, epoch: usize, step: usize },

    #[error("batch shape mismatch: {0}")]
    Shape(String),
}

/// Failures loading datasets from disk.
#[derive(Error, Debug)]
pub enum DataError {
    #[error("dataset parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("dataset is empty")]
    Empty,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures loading or saving JSON configuration files.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}
