use serde::{Serialize, Deserialize};

use crate::activation::activation::ActivationFunction;
use crate::error::ConfigError;
use crate::network::network::Network;

/// Describes one layer in a network specification.
///
/// `input_size` is the output size of the previous layer, or the raw input
/// dimension for the first layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerSpec {
    pub size: usize,
    pub input_size: usize,
    pub activation: ActivationFunction,
}

/// A serializable network architecture, stored separately from weights so a
/// run can be configured before anything is trained.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkSpec {
    pub name: String,
    /// Ordered list of layer descriptions (input → output).
    pub layers: Vec<LayerSpec>,
}

impl NetworkSpec {
    /// A small classifier head: `inputs → hidden (ReLU) → classes (logits)`.
    pub fn classifier(name: &str, inputs: usize, hidden: usize, classes: usize) -> NetworkSpec {
        NetworkSpec {
            name: name.to_string(),
            layers: vec![
                LayerSpec { size: hidden, input_size: inputs, activation: ActivationFunction::ReLU },
                LayerSpec { size: classes, input_size: hidden, activation: ActivationFunction::Identity },
            ],
        }
    }

    /// Checks that consecutive layers line up.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.layers.is_empty() {
            return Err(ConfigError::Invalid(format!("network '{}' has no layers", self.name)));
        }
        for (i, pair) in self.layers.windows(2).enumerate() {
            if pair[0].size != pair[1].input_size {
                return Err(ConfigError::Invalid(format!(
                    "layer {} outputs {} values but layer {} expects {}",
                    i, pair[0].size, i + 1, pair[1].input_size
                )));
            }
        }
        Ok(())
    }

    pub fn build(&self) -> Result<Network, ConfigError> {
        self.validate()?;
        Ok(Network::new(
            self.layers.iter().map(|l| (l.size, l.input_size, l.activation)).collect(),
        ))
    }

    pub fn input_size(&self) -> usize {
        self.layers.first().map(|l| l.input_size).unwrap_or(0)
    }

    pub fn output_size(&self) -> usize {
        self.layers.last().map(|l| l.size).unwrap_or(0)
    }
}
