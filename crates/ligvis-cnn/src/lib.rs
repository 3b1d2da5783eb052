//! Ligvis CNN Scoring
//!
//! Grid-based 3D convolutional pose scorer built on Candle (Hugging Face).
//! A receptor–ligand complex is rendered as atom densities on a cubic grid,
//! scored by a small CNN, and explained in two ways:
//!
//! - positional gradients of the score with respect to every atom
//! - layer-wise relevance propagation (ε-rule) back to voxels and atoms
//!
//! # Features
//! - JSON model description + safetensors weights
//! - 16 atom-type channels (8 receptor, 8 ligand)
//! - Optional CUDA support, CPU otherwise
//!
//! # Example
//! ```no_run
//! use std::path::Path;
//! use ligvis_cnn::{CnnScorer, PoseScorer};
//! use ligvis_structure::Complex;
//!
//! fn main() -> anyhow::Result<()> {
//!     let scorer = CnnScorer::load(Path::new("model.json"), Path::new("model.safetensors"), -1)?;
//!     let complex = Complex::load(Path::new("rec.pdbqt"), Path::new("lig.pdbqt"))?;
//!     let center = complex.ligand_centroid()?;
//!     println!("score = {}", scorer.score(&complex, center)?);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod grid;
pub mod lrp;
pub mod network;
pub mod pooling;
pub mod scorer;
pub mod typing;

pub use config::{LayerSpec, ModelConfig, OutputActivation, PoolMode};
pub use error::{CnnError, Result};
pub use grid::{GridGeometry, InputGrid, PerAtom};
pub use scorer::{CnnScorer, PoseScorer, RelevanceMap, ScoreGradients, VoxelRelevance};
pub use typing::{AtomClass, NUM_CHANNELS};
