//! The layer stack of a pose-scoring CNN.

use candle_core::Tensor;
use candle_nn::{Linear, Module, VarBuilder};
use tracing::debug;

use crate::config::{LayerSpec, ModelConfig, PoolMode};
use crate::error::{CnnError, Result};
use crate::pooling::{conv3d, pool3d};
use crate::typing::NUM_CHANNELS;

/// A loaded layer with its weights.
#[derive(Debug, Clone)]
pub enum Layer {
    Conv {
        name: String,
        weight: Tensor,
        bias: Tensor,
        pad: usize,
    },
    Relu,
    Pool {
        mode: PoolMode,
        size: usize,
    },
    Flatten,
    Dense {
        name: String,
        linear: Linear,
    },
}

impl Layer {
    pub fn forward(&self, x: &Tensor) -> candle_core::Result<Tensor> {
        match self {
            Layer::Conv { weight, bias, pad, .. } => conv3d(x, weight, bias, *pad),
            Layer::Relu => x.relu(),
            Layer::Pool { mode, size } => pool3d(x, *size, *mode),
            Layer::Flatten => x.flatten_from(1),
            Layer::Dense { linear, .. } => linear.forward(x),
        }
    }

    /// Whether relevance is redistributed through this layer, as opposed to
    /// passed through unchanged (activations and reshapes).
    pub fn redistributes(&self) -> bool {
        matches!(self, Layer::Conv { .. } | Layer::Pool { .. } | Layer::Dense { .. })
    }

    pub fn name(&self) -> &str {
        match self {
            Layer::Conv { name, .. } | Layer::Dense { name, .. } => name,
            Layer::Relu => "relu",
            Layer::Pool { .. } => "pool",
            Layer::Flatten => "flatten",
        }
    }
}

/// Shape of the activation flowing between layers (batch dimension omitted).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ActivationShape {
    Volume { channels: usize, side: usize },
    Flat(usize),
}

#[derive(Debug, Clone)]
pub struct Network {
    layers: Vec<Layer>,
}

impl Network {
    /// Load the layer stack described by `config`, checking that every
    /// layer's weights fit the activation it receives.
    pub fn load(config: &ModelConfig, vb: VarBuilder) -> Result<Self> {
        let mut shape = ActivationShape::Volume {
            channels: NUM_CHANNELS,
            side: config.grid_points(),
        };
        let mut layers = Vec::with_capacity(config.layers.len());

        for (position, spec) in config.layers.iter().enumerate() {
            let invalid = |msg: String| CnnError::InvalidModel(format!("layer {}: {}", position, msg));
            let layer = match spec {
                LayerSpec::Conv { name, out_channels, kernel, pad } => {
                    let ActivationShape::Volume { channels, side } = shape else {
                        return Err(invalid("conv after flatten".into()));
                    };
                    if side + 2 * pad < *kernel || *kernel == 0 {
                        return Err(invalid(format!("kernel {} larger than input {}", kernel, side)));
                    }
                    let lvb = vb.pp(name);
                    let weight = lvb
                        .get((*out_channels, channels, *kernel, *kernel, *kernel), "weight")
                        .map_err(|e| CnnError::ModelLoad(format!("{}.weight: {}", name, e)))?;
                    let bias = lvb
                        .get(*out_channels, "bias")
                        .map_err(|e| CnnError::ModelLoad(format!("{}.bias: {}", name, e)))?;
                    shape = ActivationShape::Volume {
                        channels: *out_channels,
                        side: side + 2 * pad + 1 - kernel,
                    };
                    Layer::Conv { name: name.clone(), weight, bias, pad: *pad }
                }
                LayerSpec::Relu => Layer::Relu,
                LayerSpec::Pool { mode, size } => {
                    let ActivationShape::Volume { channels, side } = shape else {
                        return Err(invalid("pool after flatten".into()));
                    };
                    if *size == 0 || side < *size {
                        return Err(invalid(format!("pool size {} does not fit input {}", size, side)));
                    }
                    shape = ActivationShape::Volume { channels, side: side / size };
                    Layer::Pool { mode: *mode, size: *size }
                }
                LayerSpec::Flatten => {
                    if let ActivationShape::Volume { channels, side } = shape {
                        shape = ActivationShape::Flat(channels * side * side * side);
                    }
                    Layer::Flatten
                }
                LayerSpec::Dense { name, out_features } => {
                    let ActivationShape::Flat(in_features) = shape else {
                        return Err(invalid("dense layer needs a flatten before it".into()));
                    };
                    let lvb = vb.pp(name);
                    let weight = lvb
                        .get((*out_features, in_features), "weight")
                        .map_err(|e| CnnError::ModelLoad(format!("{}.weight: {}", name, e)))?;
                    let bias = lvb
                        .get(*out_features, "bias")
                        .map_err(|e| CnnError::ModelLoad(format!("{}.bias: {}", name, e)))?;
                    shape = ActivationShape::Flat(*out_features);
                    Layer::Dense { name: name.clone(), linear: Linear::new(weight, Some(bias)) }
                }
            };
            debug!("Layer {} ({}) -> {:?}", position, layer.name(), shape);
            layers.push(layer);
        }

        Ok(Self { layers })
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    /// Output logits of shape (1, outputs).
    pub fn forward(&self, input: &Tensor) -> Result<Tensor> {
        let mut x = input.clone();
        for layer in &self.layers {
            x = layer.forward(&x)?;
        }
        Ok(x)
    }

    /// Input followed by every layer's output; the last entry is the logits.
    pub fn forward_with_activations(&self, input: &Tensor) -> Result<Vec<Tensor>> {
        let mut activations = Vec::with_capacity(self.layers.len() + 1);
        activations.push(input.clone());
        for layer in &self.layers {
            let next = layer.forward(&activations[activations.len() - 1])?;
            activations.push(next);
        }
        Ok(activations)
    }
}
