//! The scoring box around the ligand.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::atom::Atom;
use crate::molecule::Molecule;

/// Cubic region centered on the ligand.
///
/// A point is inside when every coordinate lies within `size / 2` of the center.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoringBox {
    pub center: Vec3,
    /// Edge length in Å
    pub size: f32,
}

impl ScoringBox {
    pub fn new(center: Vec3, size: f32) -> Self {
        Self { center, size }
    }

    /// Box of edge `size` centered on the ligand centroid.
    pub fn around(ligand: &Molecule, size: f32) -> Option<Self> {
        ligand.centroid().map(|center| Self::new(center, size))
    }

    pub fn half_extent(&self) -> f32 {
        self.size / 2.0
    }

    pub fn contains(&self, point: Vec3) -> bool {
        let offset = (point - self.center).abs();
        offset.max_element() <= self.half_extent()
    }

    /// Whether any of the given atoms lies inside the box.
    pub fn contains_any<'a>(&self, mut atoms: impl Iterator<Item = &'a Atom>) -> bool {
        atoms.any(|a| self.contains(a.position))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cubic_containment() {
        let b = ScoringBox::new(Vec3::new(1.0, 1.0, 1.0), 4.0);
        assert!(b.contains(Vec3::new(3.0, -1.0, 1.0)));
        assert!(!b.contains(Vec3::new(3.1, 1.0, 1.0)));
        // Corner of the cube is inside even though it is farther than size/2.
        assert!(b.contains(Vec3::new(2.9, 2.9, 2.9)));
    }
}
