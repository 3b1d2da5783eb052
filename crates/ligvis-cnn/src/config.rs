//! Model description: grid parameters and layer stack.
//!
//! The description is a JSON file; weights live in a separate safetensors
//! file keyed `<layer name>.weight` / `<layer name>.bias`.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{CnnError, Result};

/// Activation applied to the score-class logit to obtain the pose score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OutputActivation {
    Identity,
    Sigmoid,
    /// Softmax over all outputs, then the score class (two-class pose models)
    #[default]
    Softmax,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PoolMode {
    #[default]
    Max,
    Avg,
}

/// One entry of the layer stack.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LayerSpec {
    /// 3D convolution, stride 1, cubic kernel
    Conv {
        name: String,
        out_channels: usize,
        kernel: usize,
        #[serde(default)]
        pad: usize,
    },
    Relu,
    /// Non-overlapping cubic pooling; trailing voxels that do not fill a window are dropped
    Pool {
        #[serde(default)]
        mode: PoolMode,
        size: usize,
    },
    Flatten,
    Dense {
        name: String,
        out_features: usize,
    },
}

/// Configuration for a grid-based CNN pose scorer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    #[serde(default = "default_name")]
    pub name: String,

    /// Grid spacing in Å (default: 0.5)
    #[serde(default = "default_resolution")]
    pub resolution: f32,

    /// Grid edge length in Å (default: 23.5)
    #[serde(default = "default_dimension")]
    pub dimension: f32,

    /// Scale applied to van der Waals radii when gridding atoms (default: 1.0)
    #[serde(default = "default_radius_multiplier")]
    pub radius_multiplier: f32,

    #[serde(default)]
    pub output: OutputActivation,

    /// Output index holding the pose score (default: 1)
    #[serde(default = "default_score_class")]
    pub score_class: usize,

    pub layers: Vec<LayerSpec>,
}

fn default_name() -> String { "pose_cnn".to_string() }
fn default_resolution() -> f32 { 0.5 }
fn default_dimension() -> f32 { 23.5 }
fn default_radius_multiplier() -> f32 { 1.0 }
fn default_score_class() -> usize { 1 }

impl ModelConfig {
    /// Build a configuration with default grid parameters.
    pub fn new(layers: Vec<LayerSpec>) -> Self {
        Self {
            name: default_name(),
            resolution: default_resolution(),
            dimension: default_dimension(),
            radius_multiplier: default_radius_multiplier(),
            output: OutputActivation::default(),
            score_class: default_score_class(),
            layers,
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| CnnError::ModelLoad(format!("{}: {}", path.display(), e)))?;
        Self::from_json(&content)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let config: ModelConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Set grid spacing and edge length.
    pub fn with_grid(mut self, resolution: f32, dimension: f32) -> Self {
        self.resolution = resolution;
        self.dimension = dimension;
        self
    }

    pub fn with_output(mut self, output: OutputActivation, score_class: usize) -> Self {
        self.output = output;
        self.score_class = score_class;
        self
    }

    /// Grid points per axis.
    pub fn grid_points(&self) -> usize {
        (self.dimension / self.resolution).round() as usize + 1
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.resolution > 0.0) {
            return Err(CnnError::InvalidModel("resolution must be positive".into()));
        }
        if !(self.dimension > 0.0) {
            return Err(CnnError::InvalidModel("dimension must be positive".into()));
        }
        if !(self.radius_multiplier > 0.0) {
            return Err(CnnError::InvalidModel("radius_multiplier must be positive".into()));
        }
        match self.layers.last() {
            Some(LayerSpec::Dense { out_features, .. }) => {
                if self.score_class >= *out_features {
                    return Err(CnnError::InvalidModel(format!(
                        "score_class {} out of range for {} outputs",
                        self.score_class, out_features
                    )));
                }
            }
            Some(_) => {
                return Err(CnnError::InvalidModel("last layer must be dense".into()));
            }
            None => return Err(CnnError::InvalidModel("no layers".into())),
        }
        if self.output == OutputActivation::Softmax && self.score_class == 0 {
            if let Some(LayerSpec::Dense { out_features: 1, .. }) = self.layers.last() {
                return Err(CnnError::InvalidModel("softmax needs more than one output".into()));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MODEL: &str = r#"{
        "name": "tiny",
        "resolution": 1.0,
        "dimension": 6.0,
        "layers": [
            {"type": "conv", "name": "conv1", "out_channels": 4, "kernel": 3, "pad": 1},
            {"type": "relu"},
            {"type": "pool", "size": 2},
            {"type": "flatten"},
            {"type": "dense", "name": "pose_output", "out_features": 2}
        ]
    }"#;

    #[test]
    fn test_parse_model_description() {
        let config = ModelConfig::from_json(MODEL).unwrap();
        assert_eq!(config.name, "tiny");
        assert_eq!(config.grid_points(), 7);
        assert_eq!(config.output, OutputActivation::Softmax);
        assert_eq!(config.score_class, 1);
        assert_eq!(config.layers[2], LayerSpec::Pool { mode: PoolMode::Max, size: 2 });
    }

    #[test]
    fn test_default_grid_matches_box() {
        let config = ModelConfig::new(vec![LayerSpec::Dense { name: "out".into(), out_features: 2 }]);
        assert_eq!(config.grid_points(), 48);
    }

    #[test]
    fn test_last_layer_must_be_dense() {
        let err = ModelConfig::from_json(r#"{"layers": [{"type": "relu"}]}"#).unwrap_err();
        assert!(matches!(err, CnnError::InvalidModel(_)));
    }

    #[test]
    fn test_score_class_in_range() {
        let json = r#"{"score_class": 2, "layers": [{"type": "flatten"}, {"type": "dense", "name": "o", "out_features": 2}]}"#;
        assert!(ModelConfig::from_json(json).is_err());
    }
}
