use rand::Rng;

use crate::activation::activation::ActivationFunction;
use crate::device::Device;
use crate::error::{FitError, Result};
use crate::layers::dense::Dense;
use crate::math::matrix::Matrix;
use crate::model::{Mode, Model, Parameter, StateDict};

/// A feed-forward stack of dense layers producing class logits.
#[derive(Debug, Clone)]
pub struct Network {
    pub layers: Vec<Dense>,
    mode: Mode,
    device: Device,
}

impl Network {
    /// Builds a network from (size, input_size, activation) tuples.
    pub fn new<R: Rng + ?Sized>(
        layer_specs: Vec<(usize, usize, ActivationFunction)>,
        rng: &mut R,
    ) -> Network {
        let layers = layer_specs
            .into_iter()
            .map(|(size, input_size, activation)| Dense::new(size, input_size, activation, &mut *rng))
            .collect();
        Network { layers, mode: Mode::Train, device: Device::Cpu }
    }

    pub fn input_size(&self) -> usize {
        self.layers.first().map_or(0, |l| l.input_size)
    }

    pub fn output_size(&self) -> usize {
        self.layers.last().map_or(0, |l| l.size)
    }

    pub fn device(&self) -> Device {
        self.device
    }

    fn parameter_names(index: usize) -> (String, String) {
        (format!("layers.{index}.weight"), format!("layers.{index}.bias"))
    }
}

fn load_into(target: &mut Parameter, name: &str, state: &StateDict) -> Result<()> {
    let value = state.get(name).ok_or_else(|| FitError::MissingParameter(name.to_owned()))?;
    if value.shape() != target.value.shape() {
        return Err(FitError::ShapeMismatch {
            context: "state dict load",
            expected: format!("{name} {:?}", target.value.shape()),
            got: format!("{:?}", value.shape()),
        });
    }
    target.value = value.clone();
    target.zero_grad();
    Ok(())
}

impl Model for Network {
    fn forward(&mut self, input: &Matrix) -> Result<Matrix> {
        let keep_cache = self.mode == Mode::Train;
        let mut current = input.clone();
        for layer in &mut self.layers {
            current = layer.forward(&current, keep_cache)?;
        }
        Ok(current)
    }

    fn backward(&mut self, grad_output: &Matrix) -> Result<()> {
        if self.mode != Mode::Train {
            return Err(FitError::NoForwardCache);
        }
        let mut grad = grad_output.clone();
        for layer in self.layers.iter_mut().rev() {
            grad = layer.backward(&grad)?;
        }
        Ok(())
    }

    fn set_mode(&mut self, mode: Mode) {
        if mode == Mode::Eval {
            self.layers.iter_mut().for_each(Dense::clear_cache);
        }
        self.mode = mode;
    }

    fn mode(&self) -> Mode {
        self.mode
    }

    fn parameters_mut(&mut self) -> Vec<&mut Parameter> {
        self.layers
            .iter_mut()
            .flat_map(|l| [&mut l.weights, &mut l.biases])
            .collect()
    }

    fn state_dict(&self) -> StateDict {
        let mut state = StateDict::new();
        for (i, layer) in self.layers.iter().enumerate() {
            let (w, b) = Network::parameter_names(i);
            state.insert(w, layer.weights.value.clone());
            state.insert(b, layer.biases.value.clone());
        }
        state
    }

    fn load_state_dict(&mut self, state: &StateDict) -> Result<()> {
        let expected: Vec<String> = (0..self.layers.len())
            .flat_map(|i| {
                let (w, b) = Network::parameter_names(i);
                [w, b]
            })
            .collect();
        if let Some(unknown) = state.keys().find(|k| !expected.contains(k)) {
            return Err(FitError::UnknownParameter(unknown.clone()));
        }
        for (i, layer) in self.layers.iter_mut().enumerate() {
            let (w, b) = Network::parameter_names(i);
            load_into(&mut layer.weights, &w, state)?;
            load_into(&mut layer.biases, &b, state)?;
        }
        Ok(())
    }

    fn to_device(&mut self, device: Device) -> Result<()> {
        device.ensure_available()?;
        self.device = device;
        Ok(())
    }
}
