//! Atom typing into grid channels.
//!
//! Receptor atoms occupy channels `0..8`, ligand atoms `8..16`. Hydrogens and
//! unrecognised elements are not gridded.

use ligvis_structure::{Atom, Element, Side};

pub const CHANNELS_PER_SIDE: usize = 8;
pub const NUM_CHANNELS: usize = 2 * CHANNELS_PER_SIDE;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AtomClass {
    AliphaticCarbon = 0,
    AromaticCarbon = 1,
    Nitrogen = 2,
    Oxygen = 3,
    Sulfur = 4,
    Phosphorus = 5,
    Halogen = 6,
    Metal = 7,
}

impl AtomClass {
    pub const ALL: [AtomClass; CHANNELS_PER_SIDE] = [
        AtomClass::AliphaticCarbon,
        AtomClass::AromaticCarbon,
        AtomClass::Nitrogen,
        AtomClass::Oxygen,
        AtomClass::Sulfur,
        AtomClass::Phosphorus,
        AtomClass::Halogen,
        AtomClass::Metal,
    ];

    pub fn of(atom: &Atom) -> Option<AtomClass> {
        let class = match atom.element {
            Element::C if atom.is_aromatic_carbon() => AtomClass::AromaticCarbon,
            Element::C => AtomClass::AliphaticCarbon,
            Element::N => AtomClass::Nitrogen,
            Element::O => AtomClass::Oxygen,
            Element::S => AtomClass::Sulfur,
            Element::P => AtomClass::Phosphorus,
            e if e.is_halogen() => AtomClass::Halogen,
            Element::Metal => AtomClass::Metal,
            _ => return None,
        };
        Some(class)
    }

    pub fn name(self) -> &'static str {
        match self {
            AtomClass::AliphaticCarbon => "AliphaticCarbon",
            AtomClass::AromaticCarbon => "AromaticCarbon",
            AtomClass::Nitrogen => "Nitrogen",
            AtomClass::Oxygen => "Oxygen",
            AtomClass::Sulfur => "Sulfur",
            AtomClass::Phosphorus => "Phosphorus",
            AtomClass::Halogen => "Halogen",
            AtomClass::Metal => "Metal",
        }
    }
}

pub fn channel(side: Side, class: AtomClass) -> usize {
    let offset = match side {
        Side::Receptor => 0,
        Side::Ligand => CHANNELS_PER_SIDE,
    };
    offset + class as usize
}

/// Grid channel for an atom, `None` when the atom is not gridded.
pub fn channel_of(side: Side, atom: &Atom) -> Option<usize> {
    AtomClass::of(atom).map(|class| channel(side, class))
}

pub fn side_of_channel(channel: usize) -> Side {
    if channel < CHANNELS_PER_SIDE {
        Side::Receptor
    } else {
        Side::Ligand
    }
}

/// Human-readable channel name, e.g. `Lig_Nitrogen`.
pub fn channel_name(channel: usize) -> String {
    let prefix = match side_of_channel(channel) {
        Side::Receptor => "Rec",
        Side::Ligand => "Lig",
    };
    format!("{}_{}", prefix, AtomClass::ALL[channel % CHANNELS_PER_SIDE].name())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_layout() {
        assert_eq!(channel(Side::Receptor, AtomClass::AliphaticCarbon), 0);
        assert_eq!(channel(Side::Ligand, AtomClass::Metal), NUM_CHANNELS - 1);
        assert_eq!(side_of_channel(8), Side::Ligand);
        assert_eq!(channel_name(10), "Lig_Nitrogen");
        assert_eq!(channel_name(3), "Rec_Oxygen");
    }
}
