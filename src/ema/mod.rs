use crate::engine::model::Model;
use crate::math::matrix::Matrix;
use crate::network::network::Network;

/// Keeps a moving average of a model's weights alongside training.
pub trait EmaTracker<M: Model> {
    fn update(&mut self, model: &M);
}

/// Exponential moving average of network parameters:
/// `shadow = decay · shadow + (1 - decay) · weights`.
///
/// The shadow copy is a full `Network`, so it can be evaluated directly.
pub struct ModelEma {
    pub decay: f64,
    shadow: Network,
    updates: usize,
}

impl ModelEma {
    pub fn new(model: &Network, decay: f64) -> ModelEma {
        let mut shadow = model.clone();
        shadow.set_training(false);
        ModelEma { decay, shadow, updates: 0 }
    }

    pub fn shadow_network(&self) -> &Network {
        &self.shadow
    }

    /// Mutable access, needed to run `evaluate` on the averaged weights.
    pub fn shadow_network_mut(&mut self) -> &mut Network {
        &mut self.shadow
    }

    pub fn updates(&self) -> usize {
        self.updates
    }
}

impl EmaTracker<Network> for ModelEma {
    fn update(&mut self, model: &Network) {
        let d = self.decay;
        for (ema, live) in self.shadow.parameters_mut().into_iter().zip(model.parameters()) {
            let blended: Matrix = ema.value.scale(d) + live.value.scale(1.0 - d);
            ema.value = blended;
        }
        self.updates += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activation::activation::ActivationFunction;

    #[test]
    fn shadow_moves_toward_live_weights() {
        let mut net = Network::new(vec![(1, 1, ActivationFunction::Identity)]);
        net.layers[0].weights.value = Matrix::from_data(vec![vec![0.0]]);
        let mut ema = ModelEma::new(&net, 0.5);

        net.layers[0].weights.value = Matrix::from_data(vec![vec![1.0]]);
        ema.update(&net);
        ema.update(&net);

        assert_eq!(ema.shadow_network().layers[0].weights.value.get(0, 0), 0.75);
        assert_eq!(ema.updates(), 2);
    }
}
