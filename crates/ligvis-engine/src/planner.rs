//! Enumerates the perturbation units of a run.
//!
//! Ligand units come first (atoms or fragments depending on the mode), then
//! receptor residues in file order. The list is computed once per run and
//! shared by every strategy, so all methods report the same units.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

use ligvis_structure::{Complex, Molecule, ScoringBox, Side};

use crate::config::{UnitMode, VisualizationConfig};
use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitKind {
    /// One ligand heavy atom and its bonded hydrogens
    Atom,
    /// One rigid ligand fragment
    Fragment,
    /// One receptor residue
    Residue,
}

/// A set of atoms removed (or summed over) together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerturbationUnit {
    /// Stable identifier, also used in file names
    pub id: String,
    pub side: Side,
    pub kind: UnitKind,
    /// Atom indices within the owning molecule, ascending
    pub atoms: Vec<usize>,
}

impl fmt::Display for PerturbationUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlanOptions {
    pub mode: UnitMode,
    pub include_receptor: bool,
    pub skip_bound_check: bool,
}

impl Default for PlanOptions {
    fn default() -> Self {
        Self {
            mode: UnitMode::Default,
            include_receptor: true,
            skip_bound_check: false,
        }
    }
}

impl PlanOptions {
    pub fn from_config(config: &VisualizationConfig) -> Result<Self> {
        Ok(Self {
            mode: config.unit_mode()?,
            include_receptor: !config.skip_receptor_output,
            skip_bound_check: config.skip_bound_check,
        })
    }
}

/// Compute the ordered unit list for a complex.
pub fn plan(complex: &Complex, scoring_box: &ScoringBox, options: &PlanOptions) -> Vec<PerturbationUnit> {
    let mut units = ligand_units(&complex.ligand, options.mode);
    let ligand_count = units.len();

    if options.include_receptor {
        for residue in complex.receptor.residues() {
            let atoms = complex.receptor.atoms();
            if !options.skip_bound_check && !scoring_box.contains_any(residue.atoms.iter().map(|&i| &atoms[i])) {
                continue;
            }
            units.push(PerturbationUnit {
                id: format!("R_{}", residue.key.tag()),
                side: Side::Receptor,
                kind: UnitKind::Residue,
                atoms: residue.atoms,
            });
        }
    }

    debug!(
        "Planned {} ligand and {} receptor units ({:?})",
        ligand_count,
        units.len() - ligand_count,
        options.mode
    );
    units
}

fn ligand_units(ligand: &Molecule, mode: UnitMode) -> Vec<PerturbationUnit> {
    match mode {
        UnitMode::AtomsOnly => atom_units(ligand),
        UnitMode::FragsOnly => fragment_units(ligand, false),
        UnitMode::Default => {
            if ligand.fragments().len() <= 1 {
                atom_units(ligand)
            } else {
                fragment_units(ligand, true)
            }
        }
    }
}

fn atom_units(ligand: &Molecule) -> Vec<PerturbationUnit> {
    let bonds = ligand.bonds();
    let hydrogens = ligand.attached_hydrogens(&bonds);
    ligand
        .heavy_atom_indices()
        .into_iter()
        .map(|i| atom_unit(ligand, i, hydrogens.get(&i).map(Vec::as_slice).unwrap_or(&[])))
        .collect()
}

fn atom_unit(ligand: &Molecule, heavy: usize, hydrogens: &[usize]) -> PerturbationUnit {
    let mut atoms = Vec::with_capacity(1 + hydrogens.len());
    atoms.push(heavy);
    atoms.extend_from_slice(hydrogens);
    atoms.sort_unstable();
    PerturbationUnit {
        id: format!("L_atom_{}", ligand.atoms()[heavy].serial),
        side: Side::Ligand,
        kind: UnitKind::Atom,
        atoms,
    }
}

/// Fragment units, numbered from 1. With `split_singletons`, fragments with a
/// single heavy atom become atom units instead.
fn fragment_units(ligand: &Molecule, split_singletons: bool) -> Vec<PerturbationUnit> {
    let mut units = Vec::new();
    let mut number = 0;
    for fragment in ligand.fragments() {
        let heavy: Vec<usize> = fragment
            .iter()
            .copied()
            .filter(|&i| !ligand.atoms()[i].is_hydrogen())
            .collect();
        if split_singletons && heavy.len() == 1 {
            let hydrogens: Vec<usize> = fragment.iter().copied().filter(|&i| i != heavy[0]).collect();
            units.push(atom_unit(ligand, heavy[0], &hydrogens));
            continue;
        }
        number += 1;
        units.push(PerturbationUnit {
            id: format!("L_frag_{}", number),
            side: Side::Ligand,
            kind: UnitKind::Fragment,
            atoms: fragment,
        });
    }
    units
}
