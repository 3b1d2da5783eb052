//! ligvis-structure — receptor/ligand structure model.
//!
//! Provides what the attribution engine needs from a docked pose:
//! 1. Reading and writing PDBQT / PDB files
//! 2. Bond perception, residues and rigid fragments
//! 3. Perturbed copies with atoms removed
//! 4. The scoring box and spatial queries

pub mod atom;
pub mod bbox;
pub mod complex;
pub mod element;
pub mod error;
pub mod molecule;
pub mod pdbqt;

pub use atom::{Atom, Residue, ResidueKey};
pub use bbox::ScoringBox;
pub use complex::{Complex, Side};
pub use element::Element;
pub use error::{Result, StructureError};
pub use molecule::Molecule;
pub use pdbqt::{format_molecule, parse_molecule, read_molecule, write_molecule, StructureFormat};

pub use glam::Vec3;
