//! Atom and residue identity.

use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::element::Element;

/// A single atom record from a receptor or ligand file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Atom {
    /// Atom serial number
    pub serial: u32,

    /// Atom name (e.g. "CA", "C12"), trimmed
    pub name: String,

    pub residue_name: String,

    pub chain_id: char,

    pub residue_seq: i32,

    /// Insertion code (PDB column 27)
    pub insertion_code: Option<char>,

    /// Cartesian coordinates in Å
    pub position: Vec3,

    pub occupancy: f32,

    pub b_factor: f32,

    /// Partial charge (PDBQT only)
    pub partial_charge: f32,

    /// AutoDock atom type (PDBQT only), e.g. "A", "OA", "HD"
    pub autodock_type: Option<String>,

    pub element: Element,

    /// Whether this came from a HETATM record
    pub is_hetatm: bool,
}

impl Atom {
    pub fn is_hydrogen(&self) -> bool {
        self.element.is_hydrogen()
    }

    /// Aromatic carbon per AutoDock typing ("A").
    pub fn is_aromatic_carbon(&self) -> bool {
        self.autodock_type.as_deref() == Some("A")
    }

    pub fn distance_to(&self, point: Vec3) -> f32 {
        self.position.distance(point)
    }

    pub fn residue_key(&self) -> ResidueKey {
        ResidueKey {
            chain_id: self.chain_id,
            residue_seq: self.residue_seq,
            insertion_code: self.insertion_code,
            residue_name: self.residue_name.clone(),
        }
    }
}

/// Identity of a residue within a molecule.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResidueKey {
    pub chain_id: char,
    pub residue_seq: i32,
    pub insertion_code: Option<char>,
    pub residue_name: String,
}

impl ResidueKey {
    /// Filename-safe tag, e.g. `A_45_LYS` or `A_45B_LYS`.
    pub fn tag(&self) -> String {
        let chain = if self.chain_id.is_ascii_alphanumeric() {
            self.chain_id
        } else {
            '_'
        };
        let icode = self.insertion_code.map(String::from).unwrap_or_default();
        format!("{}_{}{}_{}", chain, self.residue_seq, icode, self.residue_name)
    }
}

impl fmt::Display for ResidueKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}{}", self.chain_id, self.residue_name, self.residue_seq)?;
        if let Some(icode) = self.insertion_code {
            write!(f, "{}", icode)?;
        }
        Ok(())
    }
}

/// Atoms sharing a residue key, in file order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Residue {
    pub key: ResidueKey,
    pub atoms: Vec<usize>,
}
