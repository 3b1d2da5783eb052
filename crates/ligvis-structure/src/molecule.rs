//! Molecule topology: bonds, residues, fragments and perturbed copies.

use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, VecDeque};

use crate::atom::{Atom, Residue, ResidueKey};
use crate::pdbqt::StructureFormat;

/// Added to the sum of covalent radii when perceiving bonds.
const BOND_TOLERANCE: f32 = 0.45;
/// Closer than this is an overlap, not a bond.
const MIN_BOND_LENGTH: f32 = 0.4;

/// A receptor or ligand: atoms in file order plus optional torsion-tree groups.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Molecule {
    name: String,
    atoms: Vec<Atom>,
    torsion_groups: Option<Vec<Vec<usize>>>,
    format: StructureFormat,
}

impl Molecule {
    pub fn new(name: impl Into<String>, atoms: Vec<Atom>, format: StructureFormat) -> Self {
        Self {
            name: name.into(),
            atoms,
            torsion_groups: None,
            format,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn atoms(&self) -> &[Atom] {
        &self.atoms
    }

    pub fn len(&self) -> usize {
        self.atoms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }

    pub fn format(&self) -> StructureFormat {
        self.format
    }

    /// Rigid groups from a PDBQT torsion tree (ROOT and each BRANCH body).
    pub fn torsion_groups(&self) -> Option<&[Vec<usize>]> {
        self.torsion_groups.as_deref()
    }

    pub fn set_torsion_groups(&mut self, groups: Vec<Vec<usize>>) {
        self.torsion_groups = Some(groups);
    }

    pub fn heavy_atom_indices(&self) -> Vec<usize> {
        self.atoms
            .iter()
            .enumerate()
            .filter(|(_, a)| !a.is_hydrogen())
            .map(|(i, _)| i)
            .collect()
    }

    /// Mean position of all atoms, `None` for an empty molecule.
    pub fn centroid(&self) -> Option<Vec3> {
        if self.atoms.is_empty() {
            return None;
        }
        let sum: Vec3 = self.atoms.iter().map(|a| a.position).sum();
        Some(sum / self.atoms.len() as f32)
    }

    /// Bonds perceived from covalent radii, as `(i, j)` with `i < j`.
    pub fn bonds(&self) -> Vec<(usize, usize)> {
        let mut bonds = Vec::new();
        for i in 0..self.atoms.len() {
            let a = &self.atoms[i];
            for j in (i + 1)..self.atoms.len() {
                let b = &self.atoms[j];
                if a.is_hydrogen() && b.is_hydrogen() {
                    continue;
                }
                let cutoff = a.element.covalent_radius() + b.element.covalent_radius() + BOND_TOLERANCE;
                let d = a.distance_to(b.position);
                if d > MIN_BOND_LENGTH && d < cutoff {
                    bonds.push((i, j));
                }
            }
        }
        bonds
    }

    /// For each heavy atom, the hydrogens bonded to it.
    pub fn attached_hydrogens(&self, bonds: &[(usize, usize)]) -> BTreeMap<usize, Vec<usize>> {
        let mut attached: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
        for &(i, j) in bonds {
            match (self.atoms[i].is_hydrogen(), self.atoms[j].is_hydrogen()) {
                (false, true) => attached.entry(i).or_default().push(j),
                (true, false) => attached.entry(j).or_default().push(i),
                _ => {}
            }
        }
        attached
    }

    /// Residues in order of first appearance.
    pub fn residues(&self) -> Vec<Residue> {
        let mut order: Vec<ResidueKey> = Vec::new();
        let mut members: BTreeMap<ResidueKey, Vec<usize>> = BTreeMap::new();
        for (i, atom) in self.atoms.iter().enumerate() {
            let key = atom.residue_key();
            let entry = members.entry(key.clone()).or_default();
            if entry.is_empty() {
                order.push(key);
            }
            entry.push(i);
        }
        order
            .into_iter()
            .map(|key| {
                let atoms = members.remove(&key).unwrap_or_default();
                Residue { key, atoms }
            })
            .collect()
    }

    /// Rigid fragments, ordered by their lowest atom index.
    ///
    /// Uses the torsion tree when it covers every atom; otherwise cuts
    /// rotatable bonds in the perceived bond graph.
    pub fn fragments(&self) -> Vec<Vec<usize>> {
        let mut fragments = match self.torsion_groups.as_deref() {
            Some(groups) if covers_all(groups, self.atoms.len()) => groups.to_vec(),
            _ => self.fragments_from_bonds(),
        };
        for fragment in &mut fragments {
            fragment.sort_unstable();
            fragment.dedup();
        }
        fragments.retain(|f| !f.is_empty());
        fragments.sort_by_key(|f| f[0]);
        fragments
    }

    fn fragments_from_bonds(&self) -> Vec<Vec<usize>> {
        let n = self.atoms.len();
        let bonds = self.bonds();
        let adjacency = adjacency(n, &bonds);

        let heavy_degree = |i: usize| {
            adjacency[i]
                .iter()
                .filter(|&&j| !self.atoms[j].is_hydrogen())
                .count()
        };

        let kept: Vec<(usize, usize)> = bonds
            .iter()
            .copied()
            .filter(|&(i, j)| {
                let rotatable = !self.atoms[i].is_hydrogen()
                    && !self.atoms[j].is_hydrogen()
                    && heavy_degree(i) >= 2
                    && heavy_degree(j) >= 2
                    && !in_ring(&adjacency, i, j);
                !rotatable
            })
            .collect();

        connected_components(n, &kept)
    }

    /// Copy of this molecule with the given atoms removed.
    ///
    /// Torsion groups are remapped onto the surviving atoms.
    pub fn without(&self, removed: &BTreeSet<usize>) -> Molecule {
        let mut remap = vec![None; self.atoms.len()];
        let mut atoms = Vec::with_capacity(self.atoms.len().saturating_sub(removed.len()));
        for (i, atom) in self.atoms.iter().enumerate() {
            if !removed.contains(&i) {
                remap[i] = Some(atoms.len());
                atoms.push(atom.clone());
            }
        }

        let torsion_groups = self.torsion_groups.as_ref().map(|groups| {
            groups
                .iter()
                .map(|g| g.iter().filter_map(|&i| remap[i]).collect::<Vec<_>>())
                .filter(|g| !g.is_empty())
                .collect()
        });

        Molecule {
            name: self.name.clone(),
            atoms,
            torsion_groups,
            format: self.format,
        }
    }
}

fn covers_all(groups: &[Vec<usize>], n: usize) -> bool {
    let mut seen = vec![false; n];
    for &i in groups.iter().flatten() {
        if i < n {
            seen[i] = true;
        }
    }
    seen.into_iter().all(|s| s)
}

fn adjacency(n: usize, bonds: &[(usize, usize)]) -> Vec<Vec<usize>> {
    let mut adj = vec![Vec::new(); n];
    for &(i, j) in bonds {
        adj[i].push(j);
        adj[j].push(i);
    }
    adj
}

/// Whether `i` and `j` stay connected once their direct bond is ignored.
fn in_ring(adjacency: &[Vec<usize>], i: usize, j: usize) -> bool {
    let mut seen = vec![false; adjacency.len()];
    let mut queue = VecDeque::from([i]);
    seen[i] = true;
    while let Some(k) = queue.pop_front() {
        for &next in &adjacency[k] {
            if k == i && next == j {
                continue;
            }
            if next == j {
                return true;
            }
            if !seen[next] {
                seen[next] = true;
                queue.push_back(next);
            }
        }
    }
    false
}

fn connected_components(n: usize, bonds: &[(usize, usize)]) -> Vec<Vec<usize>> {
    let adj = adjacency(n, bonds);
    let mut component = vec![usize::MAX; n];
    let mut components = Vec::new();
    for start in 0..n {
        if component[start] != usize::MAX {
            continue;
        }
        let id = components.len();
        let mut members = vec![start];
        component[start] = id;
        let mut queue = VecDeque::from([start]);
        while let Some(k) = queue.pop_front() {
            for &next in &adj[k] {
                if component[next] == usize::MAX {
                    component[next] = id;
                    members.push(next);
                    queue.push_back(next);
                }
            }
        }
        members.sort_unstable();
        components.push(members);
    }
    components
}
