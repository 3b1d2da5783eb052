//! Pose scoring contract and its Candle implementation.

use std::collections::HashMap;
use std::path::Path;
use std::time::Instant;

use candle_core::{DType, Device, Tensor, Var};
use candle_nn::VarBuilder;
use glam::Vec3;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use ligvis_structure::Complex;

use crate::config::{ModelConfig, OutputActivation};
use crate::error::{CnnError, Result};
use crate::grid::{GridGeometry, InputGrid, PerAtom};
use crate::lrp;
use crate::network::Network;
use crate::typing::NUM_CHANNELS;

/// Score and per-atom positional gradient of the score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreGradients {
    pub score: f32,
    pub atoms: PerAtom<Vec3>,
}

/// Relevance summed over each molecule's channels, one value per voxel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoxelRelevance {
    pub geometry: GridGeometry,
    pub ligand: Vec<f32>,
    pub receptor: Vec<f32>,
}

impl VoxelRelevance {
    /// Nearest-point resampling onto `target`. Points of `target` outside
    /// the scored grid get zero relevance.
    pub fn resample(&self, target: GridGeometry) -> Self {
        let mut ligand = vec![0.0; target.voxel_count()];
        let mut receptor = vec![0.0; target.voxel_count()];
        for i in 0..target.points {
            for j in 0..target.points {
                for k in 0..target.points {
                    let Some(source) = self.geometry.nearest_index(target.position(i, j, k)) else {
                        continue;
                    };
                    let index = target.index(i, j, k);
                    ligand[index] = self.ligand[source];
                    receptor[index] = self.receptor[source];
                }
            }
        }
        Self { geometry: target, ligand, receptor }
    }
}

/// Score plus LRP relevance mapped onto atoms (and voxels, when gridded).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelevanceMap {
    pub score: f32,
    pub atoms: PerAtom<f32>,
    pub voxels: Option<VoxelRelevance>,
}

/// Anything that can score a pose and explain the score.
///
/// Each method is one scorer invocation. `center` is where the scorer's
/// input grid is centered.
pub trait PoseScorer {
    fn score(&self, complex: &Complex, center: Vec3) -> Result<f32>;

    fn gradients(&self, complex: &Complex, center: Vec3) -> Result<ScoreGradients>;

    fn relevance(&self, complex: &Complex, center: Vec3) -> Result<RelevanceMap>;
}

/// Grid-based 3D CNN pose scorer.
///
/// Loads a model description and safetensors weights once and keeps them on
/// the selected device for the lifetime of the scorer.
pub struct CnnScorer {
    config: ModelConfig,
    network: Network,
    device: Device,
}

impl CnnScorer {
    /// Load a model description and its weights. `gpu < 0` selects the CPU.
    pub fn load(model_path: &Path, weights_path: &Path, gpu: i32) -> Result<Self> {
        let start = Instant::now();
        let config = ModelConfig::from_file(model_path)?;
        info!("Loading CNN model {} from {:?}", config.name, model_path);

        let device = Self::select_device(gpu)?;
        debug!("Using device: {:?}", device);

        let vb = unsafe { VarBuilder::from_mmaped_safetensors(&[weights_path], DType::F32, &device) }
            .map_err(|e| CnnError::ModelLoad(format!("{}: {}", weights_path.display(), e)))?;
        let network = Network::load(&config, vb)?;

        info!(
            "Model loaded in {:.2}s ({} layers, {}³ grid at {} Å)",
            start.elapsed().as_secs_f32(),
            network.layers().len(),
            config.grid_points(),
            config.resolution
        );
        Ok(Self { config, network, device })
    }

    /// Build a scorer from in-memory weights.
    pub fn from_tensors(config: ModelConfig, tensors: HashMap<String, Tensor>, device: Device) -> Result<Self> {
        config.validate()?;
        let vb = VarBuilder::from_tensors(tensors, DType::F32, &device);
        let network = Network::load(&config, vb)?;
        Ok(Self { config, network, device })
    }

    /// Select the compute device for a GPU id.
    fn select_device(gpu: i32) -> Result<Device> {
        if gpu < 0 {
            return Ok(Device::Cpu);
        }

        #[cfg(feature = "cuda")]
        {
            match Device::new_cuda(gpu as usize) {
                Ok(device) => {
                    info!("CUDA device {} available", gpu);
                    Ok(device)
                }
                Err(e) => Err(CnnError::Device(format!("CUDA device {}: {}", gpu, e))),
            }
        }

        #[cfg(not(feature = "cuda"))]
        {
            tracing::warn!("GPU {} requested but built without CUDA support, using CPU", gpu);
            Ok(Device::Cpu)
        }
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    pub fn geometry(&self, center: Vec3) -> GridGeometry {
        GridGeometry::centered(center, self.config.dimension, self.config.resolution)
    }

    fn input_grid(&self, complex: &Complex, center: Vec3) -> InputGrid {
        InputGrid::build(complex, self.geometry(center), self.config.radius_multiplier)
    }

    fn input_tensor(&self, grid: &InputGrid) -> Result<Tensor> {
        let n = grid.geometry.points;
        Ok(Tensor::from_vec(grid.values.clone(), (1, NUM_CHANNELS, n, n, n), &self.device)?)
    }

    /// Pose score from the output logits, as a scalar tensor.
    fn pose_score(&self, logits: &Tensor) -> Result<Tensor> {
        let class = self.config.score_class;
        let score = match self.config.output {
            OutputActivation::Identity => logits.get(0)?.get(class)?,
            OutputActivation::Sigmoid => {
                let logit = logits.get(0)?.get(class)?;
                (logit.neg()?.exp()? + 1.0)?.recip()?
            }
            OutputActivation::Softmax => candle_nn::ops::softmax(logits, 1)?.get(0)?.get(class)?,
        };
        Ok(score)
    }

    fn scalar(score: &Tensor) -> Result<f32> {
        let value = score.to_dtype(DType::F32)?.to_scalar::<f32>()?;
        if !value.is_finite() {
            return Err(CnnError::Inference(format!("non-finite score {}", value)));
        }
        Ok(value)
    }
}

impl PoseScorer for CnnScorer {
    fn score(&self, complex: &Complex, center: Vec3) -> Result<f32> {
        let grid = self.input_grid(complex, center);
        let logits = self.network.forward(&self.input_tensor(&grid)?)?;
        Self::scalar(&self.pose_score(&logits)?)
    }

    fn gradients(&self, complex: &Complex, center: Vec3) -> Result<ScoreGradients> {
        let grid = self.input_grid(complex, center);
        let input = Var::from_tensor(&self.input_tensor(&grid)?)?;
        let logits = self.network.forward(input.as_tensor())?;
        let score = self.pose_score(&logits)?;

        let grads = score.backward()?;
        let voxel_gradient = grads
            .get(input.as_tensor())
            .ok_or_else(|| CnnError::Inference("score does not depend on the input grid".into()))?
            .flatten_all()?
            .to_vec1::<f32>()?;

        Ok(ScoreGradients {
            score: Self::scalar(&score)?,
            atoms: grid.atom_gradients(&voxel_gradient),
        })
    }

    fn relevance(&self, complex: &Complex, center: Vec3) -> Result<RelevanceMap> {
        let grid = self.input_grid(complex, center);
        let activations = self.network.forward_with_activations(&self.input_tensor(&grid)?)?;
        let logits = activations
            .last()
            .ok_or_else(|| CnnError::Inference("network produced no output".into()))?;
        let score = Self::scalar(&self.pose_score(logits)?)?;

        let start = lrp::output_relevance(logits, self.config.score_class)?;
        let input_relevance = lrp::propagate(&self.network, &activations, start)?
            .flatten_all()?
            .to_vec1::<f32>()?;

        let sides = grid.side_totals(&input_relevance);
        Ok(RelevanceMap {
            score,
            atoms: grid.atom_relevance(&input_relevance),
            voxels: Some(VoxelRelevance {
                geometry: grid.geometry,
                ligand: sides.ligand,
                receptor: sides.receptor,
            }),
        })
    }
}
