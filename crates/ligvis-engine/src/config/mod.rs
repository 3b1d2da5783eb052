//! Run configuration for a visualization.
//!
//! Built by the CLI (or directly by library users) and checked with
//! [`VisualizationConfig::validate`] before any structure is read or scored.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use ligvis_structure::Side;

use crate::error::{Result, VisError};

/// Attribution method selected on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum VisMethod {
    /// Score change on removal of each unit (also accepted as `removal`)
    #[default]
    Masking,
    Lrp,
    Gradient,
    /// Gradient, then LRP, then masking
    All,
}

impl VisMethod {
    pub const CHOICES: &'static str = "removal, masking, lrp, gradient, all";
}

impl FromStr for VisMethod {
    type Err = VisError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "removal" | "masking" => Ok(VisMethod::Masking),
            "lrp" => Ok(VisMethod::Lrp),
            "gradient" => Ok(VisMethod::Gradient),
            "all" => Ok(VisMethod::All),
            other => Err(VisError::Configuration(format!(
                "Specified vis_method '{}' not known. Use one of: {}",
                other,
                Self::CHOICES
            ))),
        }
    }
}

impl fmt::Display for VisMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            VisMethod::Masking => "masking",
            VisMethod::Lrp => "lrp",
            VisMethod::Gradient => "gradient",
            VisMethod::All => "all",
        };
        f.write_str(name)
    }
}

/// How ligand atoms are grouped into perturbation units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum UnitMode {
    /// Fragments, with single-atom fragments and rigid ligands as atoms
    #[default]
    Default,
    AtomsOnly,
    FragsOnly,
}

impl UnitMode {
    pub fn from_flags(frags_only: bool, atoms_only: bool) -> Result<Self> {
        match (frags_only, atoms_only) {
            (true, true) => Err(VisError::Configuration(
                "Cannot use 'frags_only' and 'atoms_only' together.".into(),
            )),
            (true, false) => Ok(UnitMode::FragsOnly),
            (false, true) => Ok(UnitMode::AtomsOnly),
            (false, false) => Ok(UnitMode::Default),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisualizationConfig {
    pub receptor: Option<PathBuf>,
    pub ligand: Option<PathBuf>,
    pub cnn_model: Option<PathBuf>,
    pub cnn_weights: Option<PathBuf>,

    /// Edge of the cubic box around the ligand centroid, in Å (default: 23.5)
    #[serde(default = "default_box_size")]
    pub box_size: f32,

    /// GPU id; negative selects the CPU (default: -1)
    #[serde(default = "default_gpu")]
    pub gpu: i32,

    #[serde(default)]
    pub method: VisMethod,

    #[serde(default)]
    pub frags_only: bool,
    #[serde(default)]
    pub atoms_only: bool,
    /// Print removed atoms per unit
    #[serde(default)]
    pub verbose: bool,
    /// Write LRP relevance as DX grids
    #[serde(default)]
    pub outputdx: bool,
    #[serde(default)]
    pub skip_ligand_output: bool,
    /// Also excludes receptor residues from masking
    #[serde(default)]
    pub skip_receptor_output: bool,
    /// Write every perturbed structure
    #[serde(default)]
    pub output_files: bool,
    /// Admit every receptor residue regardless of the box
    #[serde(default)]
    pub skip_bound_check: bool,

    /// Group whose joint removal is compared with the sum of its unit deltas
    #[serde(default)]
    pub additivity: Option<Side>,

    #[serde(default = "default_out_dir")]
    pub out_dir: PathBuf,

    /// Write all results as JSON to this path
    #[serde(default)]
    pub json_output: Option<PathBuf>,
}

fn default_box_size() -> f32 { 23.5 }
fn default_gpu() -> i32 { -1 }
fn default_out_dir() -> PathBuf { PathBuf::from(".") }

impl Default for VisualizationConfig {
    fn default() -> Self {
        Self {
            receptor: None,
            ligand: None,
            cnn_model: None,
            cnn_weights: None,
            box_size: default_box_size(),
            gpu: default_gpu(),
            method: VisMethod::default(),
            frags_only: false,
            atoms_only: false,
            verbose: false,
            outputdx: false,
            skip_ligand_output: false,
            skip_receptor_output: false,
            output_files: false,
            skip_bound_check: false,
            additivity: None,
            out_dir: default_out_dir(),
            json_output: None,
        }
    }
}

impl VisualizationConfig {
    /// Check required inputs and option combinations.
    pub fn validate(&self) -> Result<()> {
        self.receptor_path()?;
        self.ligand_path()?;
        self.model_path()?;
        self.weights_path()?;
        self.validate_options()
    }

    /// Check option combinations only; input paths may be absent.
    pub fn validate_options(&self) -> Result<()> {
        self.unit_mode()?;
        if !(self.box_size.is_finite() && self.box_size > 0.0) {
            return Err(VisError::Configuration(format!(
                "box_size must be a positive number of angstroms, got {}",
                self.box_size
            )));
        }
        Ok(())
    }

    pub fn unit_mode(&self) -> Result<UnitMode> {
        UnitMode::from_flags(self.frags_only, self.atoms_only)
    }

    pub fn receptor_path(&self) -> Result<&Path> {
        required(&self.receptor, "receptor")
    }

    pub fn ligand_path(&self) -> Result<&Path> {
        required(&self.ligand, "ligand")
    }

    pub fn model_path(&self) -> Result<&Path> {
        required(&self.cnn_model, "cnn_model")
    }

    pub fn weights_path(&self) -> Result<&Path> {
        required(&self.cnn_weights, "cnn_weights")
    }
}

fn required<'a>(path: &'a Option<PathBuf>, name: &str) -> Result<&'a Path> {
    path.as_deref()
        .ok_or_else(|| VisError::Configuration(format!("Missing {}.", name)))
}

#[cfg(test)]
mod tests;
