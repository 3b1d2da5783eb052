//! Element classification and per-element radii.

use serde::{Deserialize, Serialize};

/// Chemical element, collapsed to the classes the scorer distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Element {
    H,
    C,
    N,
    O,
    S,
    P,
    F,
    Cl,
    Br,
    I,
    /// Any metal ion (Zn, Fe, Mg, ...)
    Metal,
    Other,
}

const METALS: &[&str] = &[
    "Li", "Na", "K", "Mg", "Ca", "Mn", "Fe", "Co", "Ni", "Cu", "Zn", "Cd", "Hg", "Sr",
];

impl Element {
    /// Resolve an element from an AutoDock atom type (PDBQT columns 78-79).
    ///
    /// AutoDock types are case sensitive: `CA` is not calcium, `Ca` is.
    pub fn from_autodock_type(ad_type: &str) -> Option<Self> {
        let element = match ad_type.trim() {
            "H" | "HD" | "HS" => Element::H,
            "C" | "A" => Element::C,
            "N" | "NA" | "NS" => Element::N,
            "O" | "OA" | "OS" => Element::O,
            "S" | "SA" => Element::S,
            "P" => Element::P,
            "F" => Element::F,
            "Cl" | "CL" => Element::Cl,
            "Br" | "BR" => Element::Br,
            "I" => Element::I,
            "" => return None,
            other if METALS.contains(&other) => Element::Metal,
            _ => Element::Other,
        };
        Some(element)
    }

    /// Resolve an element from a PDB element symbol (columns 77-78), case-insensitive.
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        let symbol = symbol.trim();
        let mut chars = symbol.chars();
        let first = chars.next()?.to_ascii_uppercase();
        let normalized: String = std::iter::once(first)
            .chain(chars.map(|c| c.to_ascii_lowercase()))
            .collect();

        let element = match normalized.as_str() {
            "H" | "D" => Element::H,
            "C" => Element::C,
            "N" => Element::N,
            "O" => Element::O,
            "S" => Element::S,
            "P" => Element::P,
            "F" => Element::F,
            "Cl" => Element::Cl,
            "Br" => Element::Br,
            "I" => Element::I,
            other if METALS.contains(&other) => Element::Metal,
            _ => Element::Other,
        };
        Some(element)
    }

    /// Guess an element from an atom name when no type column is present.
    pub fn from_atom_name(name: &str) -> Self {
        name.trim()
            .chars()
            .find(|c| c.is_ascii_alphabetic())
            .and_then(|c| Self::from_symbol(&c.to_string()))
            .unwrap_or(Element::Other)
    }

    pub fn is_hydrogen(self) -> bool {
        self == Element::H
    }

    pub fn is_halogen(self) -> bool {
        matches!(self, Element::F | Element::Cl | Element::Br | Element::I)
    }

    /// Van der Waals radius in Å, used for grid densities.
    pub fn vdw_radius(self) -> f32 {
        match self {
            Element::H => 1.1,
            Element::C => 1.9,
            Element::N => 1.8,
            Element::O => 1.7,
            Element::S => 2.0,
            Element::P => 2.1,
            Element::F => 1.5,
            Element::Cl => 1.8,
            Element::Br => 2.0,
            Element::I => 2.2,
            Element::Metal => 1.2,
            Element::Other => 1.9,
        }
    }

    /// Covalent radius in Å, used for bond perception.
    pub fn covalent_radius(self) -> f32 {
        match self {
            Element::H => 0.31,
            Element::C => 0.76,
            Element::N => 0.71,
            Element::O => 0.66,
            Element::S => 1.05,
            Element::P => 1.07,
            Element::F => 0.57,
            Element::Cl => 1.02,
            Element::Br => 1.20,
            Element::I => 1.39,
            Element::Metal => 1.40,
            Element::Other => 0.80,
        }
    }

    /// Single-letter symbols are written one column to the right in PDB atom names.
    pub fn symbol_len(self) -> usize {
        match self {
            Element::Cl | Element::Br | Element::Metal => 2,
            _ => 1,
        }
    }
}
