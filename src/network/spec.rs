use rand::Rng;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::activation::activation::ActivationFunction;
use crate::error::{FitError, Result};
use crate::network::network::Network;

/// One hidden or output layer. The input width is implied by the previous
/// layer (or by `NetworkSpec::input_size` for the first one).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerSpec {
    pub size: usize,
    pub activation: ActivationFunction,
}

/// A serializable description of a classifier architecture.
///
/// Kept apart from trained weights so an architecture can be stored before
/// training and rebuilt before loading a checkpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkSpec {
    /// Flattened input width (channels × height × width).
    pub input_size: usize,
    /// Ordered layers, input → output. The last size is the class count.
    pub layers: Vec<LayerSpec>,
}

impl NetworkSpec {
    /// A multilayer perceptron: ReLU hidden layers and an identity (logit) head.
    pub fn mlp(input_size: usize, hidden: &[usize], classes: usize) -> NetworkSpec {
        let mut layers: Vec<LayerSpec> = hidden
            .iter()
            .map(|&size| LayerSpec { size, activation: ActivationFunction::ReLU })
            .collect();
        layers.push(LayerSpec { size: classes, activation: ActivationFunction::Identity });
        NetworkSpec { input_size, layers }
    }

    pub fn classes(&self) -> usize {
        self.layers.last().map_or(0, |l| l.size)
    }

    pub fn build<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Network> {
        if self.input_size == 0 {
            return Err(FitError::InvalidConfig("network input_size must be positive".into()));
        }
        if self.layers.is_empty() || self.layers.iter().any(|l| l.size == 0) {
            return Err(FitError::InvalidConfig(
                "network needs at least one layer and every layer needs a positive size".into(),
            ));
        }
        let mut fan_in = self.input_size;
        let mut tuples = Vec::with_capacity(self.layers.len());
        for layer in &self.layers {
            tuples.push((layer.size, fan_in, layer.activation));
            fan_in = layer.size;
        }
        Ok(Network::new(tuples, rng))
    }

    pub fn save_json(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = std::fs::File::create(path)?;
        serde_json::to_writer_pretty(std::io::BufWriter::new(file), self)?;
        Ok(())
    }

    pub fn load_json(path: impl AsRef<Path>) -> Result<NetworkSpec> {
        let file = std::fs::File::open(path)?;
        Ok(serde_json::from_reader(std::io::BufReader::new(file))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn mlp_chains_fan_in() {
        let spec = NetworkSpec::mlp(64, &[32, 16], 4);
        let net = spec.build(&mut StdRng::seed_from_u64(1)).unwrap();
        let widths: Vec<_> = net.layers.iter().map(|l| (l.input_size, l.size)).collect();
        assert_eq!(widths, vec![(64, 32), (32, 16), (16, 4)]);
        assert_eq!(spec.classes(), 4);
    }

    #[test]
    fn empty_spec_is_rejected() {
        let spec = NetworkSpec { input_size: 8, layers: vec![] };
        assert!(spec.build(&mut StdRng::seed_from_u64(1)).is_err());
    }

    #[test]
    fn json_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("arch.json");
        let spec = NetworkSpec::mlp(9, &[5], 3);
        spec.save_json(&path).unwrap();
        assert_eq!(NetworkSpec::load_json(&path).unwrap(), spec);
    }
}
