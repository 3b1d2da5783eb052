//! A receptor–ligand pose.

use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

use crate::error::{Result, StructureError};
use crate::molecule::Molecule;
use crate::pdbqt::read_molecule;

/// Which molecule of the complex an atom or unit belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Ligand,
    Receptor,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Ligand => write!(f, "ligand"),
            Side::Receptor => write!(f, "receptor"),
        }
    }
}

/// Receptor and ligand of a docked pose.
///
/// Both molecules are shared, so a perturbed copy only duplicates the side
/// that actually changed.
#[derive(Debug, Clone)]
pub struct Complex {
    pub receptor: Arc<Molecule>,
    pub ligand: Arc<Molecule>,
}

impl Complex {
    pub fn new(receptor: Molecule, ligand: Molecule) -> Self {
        Self {
            receptor: Arc::new(receptor),
            ligand: Arc::new(ligand),
        }
    }

    /// Load receptor and ligand files.
    pub fn load(receptor: &Path, ligand: &Path) -> Result<Self> {
        let receptor = read_molecule(receptor)?;
        let ligand = read_molecule(ligand)?;
        info!(
            "Loaded receptor {} ({} atoms) and ligand {} ({} atoms)",
            receptor.name(),
            receptor.len(),
            ligand.name(),
            ligand.len()
        );
        Ok(Self::new(receptor, ligand))
    }

    pub fn molecule(&self, side: Side) -> &Molecule {
        match side {
            Side::Ligand => &self.ligand,
            Side::Receptor => &self.receptor,
        }
    }

    pub fn ligand_centroid(&self) -> Result<Vec3> {
        self.ligand
            .centroid()
            .ok_or_else(|| StructureError::Empty(self.ligand.name().to_string()))
    }

    /// Copy of the complex with the given atoms of one side removed.
    pub fn without(&self, side: Side, removed: &BTreeSet<usize>) -> Complex {
        match side {
            Side::Ligand => Complex {
                receptor: Arc::clone(&self.receptor),
                ligand: Arc::new(self.ligand.without(removed)),
            },
            Side::Receptor => Complex {
                receptor: Arc::new(self.receptor.without(removed)),
                ligand: Arc::clone(&self.ligand),
            },
        }
    }
}
