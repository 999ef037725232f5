use serde::{Deserialize, Serialize};

use crate::augment::MixupConfig;
use crate::engine::device::Precision;
use crate::error::ConfigError;
use crate::network::spec::NetworkSpec;
use crate::optim::scheduler::{CosineLr, Schedulable, StepLr};

/// Learning-rate schedule selection for a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SchedulerConfig {
    Step { step_size: usize, gamma: f64 },
    Cosine {
        min_lr: f64,
        #[serde(default)]
        warmup_epochs: usize,
        #[serde(default)]
        warmup_lr: f64,
    },
}

impl SchedulerConfig {
    pub fn build(&self, base_lr: f64, epochs: usize) -> Box<dyn Schedulable> {
        match *self {
            SchedulerConfig::Step { step_size, gamma } => Box::new(StepLr::new(base_lr, step_size, gamma)),
            SchedulerConfig::Cosine { min_lr, warmup_epochs, warmup_lr } => Box::new(
                CosineLr::new(base_lr, min_lr, epochs.saturating_sub(warmup_epochs))
                    .with_warmup(warmup_epochs, warmup_lr),
            ),
        }
    }
}

/// Everything the `train` command needs besides the data itself.
///
/// Every field has a default, so a config file only lists what it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Architecture; when absent a one-hidden-layer classifier is sized from the data.
    pub network: Option<NetworkSpec>,
    pub hidden: usize,
    pub epochs: usize,
    pub batch_size: usize,
    pub lr: f64,
    pub momentum: f64,
    pub weight_decay: f64,
    pub scheduler: SchedulerConfig,
    pub max_norm: Option<f64>,
    pub mixup: Option<MixupConfig>,
    pub ema_decay: Option<f64>,
    pub topk: Vec<usize>,
    pub val_split: f64,
    pub seed: u64,
    pub precision: Precision,
    pub print_freq: usize,
}

impl Default for RunConfig {
    fn default() -> Self {
        RunConfig {
            network: None,
            hidden: 16,
            epochs: 10,
            batch_size: 32,
            lr: 0.1,
            momentum: 0.9,
            weight_decay: 0.0,
            scheduler: SchedulerConfig::Cosine { min_lr: 1e-4, warmup_epochs: 0, warmup_lr: 0.0 },
            max_norm: None,
            mixup: None,
            ema_decay: None,
            topk: vec![1, 5],
            val_split: 0.2,
            seed: 42,
            precision: Precision::F64,
            print_freq: 20,
        }
    }
}

impl RunConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.epochs == 0 {
            return Err(ConfigError::Invalid("epochs must be at least 1".into()));
        }
        if self.batch_size == 0 {
            return Err(ConfigError::Invalid("batch_size must be at least 1".into()));
        }
        if !(self.lr.is_finite() && self.lr > 0.0) {
            return Err(ConfigError::Invalid(format!("lr must be positive, got {}", self.lr)));
        }
        if !(0.0..1.0).contains(&self.val_split) {
            return Err(ConfigError::Invalid(format!("val_split must be in [0, 1), got {}", self.val_split)));
        }
        if let Some(decay) = self.ema_decay {
            if !(0.0..1.0).contains(&decay) {
                return Err(ConfigError::Invalid(format!("ema_decay must be in [0, 1), got {}", decay)));
            }
        }
        if let Some(spec) = &self.network {
            spec.validate()?;
        }
        Ok(())
    }

    /// Serializes the config to a pretty-printed JSON file.
    pub fn save_json(&self, path: &str) -> Result<(), ConfigError> {
        let file = std::fs::File::create(path)?;
        let writer = std::io::BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    /// Loads and validates a config written by `save_json` (or by hand).
    pub fn load_json(path: &str) -> Result<RunConfig, ConfigError> {
        let file = std::fs::File::open(path)?;
        let reader = std::io::BufReader::new(file);
        let config: RunConfig = serde_json::from_reader(reader)?;
        config.validate()?;
        Ok(config)
    }
}
