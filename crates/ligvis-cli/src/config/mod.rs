//! Command-line arguments and their mapping onto a run configuration.
//!
//! Long option names keep underscores (`--cnn_model`, `--box_size`, ...).

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

use ligvis_engine::{VisError, VisualizationConfig};
use ligvis_structure::Side;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum AdditivityTarget {
    Ligand,
    Receptor,
}

impl From<AdditivityTarget> for Side {
    fn from(target: AdditivityTarget) -> Self {
        match target {
            AdditivityTarget::Ligand => Side::Ligand,
            AdditivityTarget::Receptor => Side::Receptor,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "ligvis", version)]
#[command(about = "Attribute a CNN docking score to ligand atoms, fragments and receptor residues", long_about = None)]
pub struct Cli {
    /// Receptor for coloring (PDBQT or PDB)
    #[arg(short = 'r', long, value_name = "FILE", help_heading = "Input")]
    pub receptor: Option<PathBuf>,

    /// Ligand for coloring (PDBQT or PDB)
    #[arg(short = 'l', long, value_name = "FILE", help_heading = "Input")]
    pub ligand: Option<PathBuf>,

    /// CNN model description (JSON)
    #[arg(long = "cnn_model", value_name = "FILE", help_heading = "CNN Input")]
    pub cnn_model: Option<PathBuf>,

    /// CNN weights (safetensors)
    #[arg(long = "cnn_weights", value_name = "FILE", help_heading = "CNN Input")]
    pub cnn_weights: Option<PathBuf>,

    /// Skip ligand visualization
    #[arg(long = "skip_ligand_output", help_heading = "Output")]
    pub skip_ligand_output: bool,

    /// Skip receptor visualization
    #[arg(long = "skip_receptor_output", help_heading = "Output")]
    pub skip_receptor_output: bool,

    /// Directory for scored structures, DX grids and modified structures
    #[arg(long = "out_dir", value_name = "DIR", default_value = ".", help_heading = "Output")]
    pub out_dir: PathBuf,

    /// Also write all results as JSON
    #[arg(long, value_name = "FILE", help_heading = "Output")]
    pub json: Option<PathBuf>,

    /// Edge of the bounding box for receptor coloring, in angstroms
    #[arg(long = "box_size", default_value_t = 23.5)]
    pub box_size: f32,

    /// Only run fragment removal on the ligand
    #[arg(long = "frags_only")]
    pub frags_only: bool,

    /// Only run individual atom removal on the ligand
    #[arg(long = "atoms_only")]
    pub atoms_only: bool,

    /// Print full output, including removed atom lists
    #[arg(long)]
    pub verbose: bool,

    /// GPU id for accelerated scoring (-1 for CPU)
    #[arg(long, default_value_t = -1, allow_negative_numbers = true)]
    pub gpu: i32,

    /// Visualization method: removal, masking, lrp, gradient or all
    #[arg(long = "vis_method", default_value = "removal")]
    pub vis_method: String,

    /// Output DX grid files (lrp only)
    #[arg(long)]
    pub outputdx: bool,

    /// Write every modified structure
    #[arg(long = "output_files", help_heading = "Debug")]
    pub output_files: bool,

    /// Print additivity data for the ligand or the receptor
    #[arg(long, value_enum, help_heading = "Debug")]
    pub additivity: Option<AdditivityTarget>,

    /// Score all residues, regardless of proximity to the ligand
    #[arg(long = "skip_bound_check", help_heading = "Debug")]
    pub skip_bound_check: bool,
}

impl Cli {
    /// Build the run configuration. Only the method name can fail here;
    /// everything else is checked by [`VisualizationConfig::validate`].
    pub fn into_config(self) -> Result<VisualizationConfig, VisError> {
        Ok(VisualizationConfig {
            method: self.vis_method.parse()?,
            receptor: self.receptor,
            ligand: self.ligand,
            cnn_model: self.cnn_model,
            cnn_weights: self.cnn_weights,
            box_size: self.box_size,
            gpu: self.gpu,
            frags_only: self.frags_only,
            atoms_only: self.atoms_only,
            verbose: self.verbose,
            outputdx: self.outputdx,
            skip_ligand_output: self.skip_ligand_output,
            skip_receptor_output: self.skip_receptor_output,
            output_files: self.output_files,
            skip_bound_check: self.skip_bound_check,
            additivity: self.additivity.map(Side::from),
            out_dir: self.out_dir,
            json_output: self.json,
        })
    }
}
