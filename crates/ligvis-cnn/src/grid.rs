//! Atom densities on a regular grid, and the maps back from voxels to atoms.

use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::f32::consts::E;
use std::ops::RangeInclusive;
use tracing::debug;

use ligvis_structure::{Complex, Side};

use crate::typing::{channel_name, channel_of, side_of_channel, NUM_CHANNELS};

/// Regular cubic lattice: `points`³ voxels starting at `origin`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridGeometry {
    pub origin: Vec3,
    pub resolution: f32,
    pub points: usize,
}

impl GridGeometry {
    /// Grid of edge `dimension` centered on `center`.
    pub fn centered(center: Vec3, dimension: f32, resolution: f32) -> Self {
        Self {
            origin: center - Vec3::splat(dimension / 2.0),
            resolution,
            points: (dimension / resolution).round() as usize + 1,
        }
    }

    pub fn voxel_count(&self) -> usize {
        self.points * self.points * self.points
    }

    /// Flat index, z fastest.
    pub fn index(&self, i: usize, j: usize, k: usize) -> usize {
        (i * self.points + j) * self.points + k
    }

    pub fn position(&self, i: usize, j: usize, k: usize) -> Vec3 {
        self.origin + Vec3::new(i as f32, j as f32, k as f32) * self.resolution
    }

    /// Flat index of the grid point nearest to `position`, `None` outside the grid.
    pub fn nearest_index(&self, position: Vec3) -> Option<usize> {
        let steps = ((position - self.origin) / self.resolution).round();
        if steps.min_element() < 0.0 || steps.max_element() >= self.points as f32 {
            return None;
        }
        Some(self.index(steps.x as usize, steps.y as usize, steps.z as usize))
    }

    /// Grid indices along one axis within `cutoff` of `coord`.
    fn axis_range(&self, coord: f32, origin: f32, cutoff: f32) -> Option<RangeInclusive<usize>> {
        let lo = ((coord - cutoff - origin) / self.resolution).ceil().max(0.0);
        let hi = ((coord + cutoff - origin) / self.resolution)
            .floor()
            .min(self.points as f32 - 1.0);
        (hi >= lo).then(|| lo as usize..=hi as usize)
    }
}

/// Atom density at distance `d` for radius `r`.
///
/// Gaussian inside the radius, a quadratic tail that reaches zero at 1.5r.
pub fn density(d: f32, r: f32) -> f32 {
    if d >= 1.5 * r {
        0.0
    } else if d < r {
        (-2.0 * d * d / (r * r)).exp()
    } else {
        let e2 = E * E;
        (4.0 / (e2 * r * r)) * d * d - (12.0 / (e2 * r)) * d + 9.0 / e2
    }
}

/// Derivative of [`density`] with respect to `d`.
pub fn density_derivative(d: f32, r: f32) -> f32 {
    if d >= 1.5 * r {
        0.0
    } else if d < r {
        -4.0 * d / (r * r) * (-2.0 * d * d / (r * r)).exp()
    } else {
        let e2 = E * E;
        8.0 * d / (e2 * r * r) - 12.0 / (e2 * r)
    }
}

/// Per-atom values for both molecules of a complex.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerAtom<T> {
    pub receptor: Vec<T>,
    pub ligand: Vec<T>,
}

impl<T: Clone + Default> PerAtom<T> {
    pub fn zeros(receptor_len: usize, ligand_len: usize) -> Self {
        Self {
            receptor: vec![T::default(); receptor_len],
            ligand: vec![T::default(); ligand_len],
        }
    }
}

impl<T> PerAtom<T> {
    pub fn side(&self, side: Side) -> &[T] {
        match side {
            Side::Receptor => &self.receptor,
            Side::Ligand => &self.ligand,
        }
    }

    pub fn side_mut(&mut self, side: Side) -> &mut Vec<T> {
        match side {
            Side::Receptor => &mut self.receptor,
            Side::Ligand => &mut self.ligand,
        }
    }
}

/// An atom that touches the grid.
#[derive(Debug, Clone, Copy)]
pub struct GriddedAtom {
    pub side: Side,
    /// Index within its molecule
    pub index: usize,
    pub channel: usize,
    pub position: Vec3,
    pub radius: f32,
}

/// Channel-major densities (`NUM_CHANNELS` × voxels) for one complex.
#[derive(Debug, Clone)]
pub struct InputGrid {
    pub geometry: GridGeometry,
    pub atoms: Vec<GriddedAtom>,
    pub values: Vec<f32>,
    receptor_len: usize,
    ligand_len: usize,
}

impl InputGrid {
    pub fn build(complex: &Complex, geometry: GridGeometry, radius_multiplier: f32) -> Self {
        let mut grid = InputGrid {
            geometry,
            atoms: Vec::new(),
            values: vec![0.0; NUM_CHANNELS * geometry.voxel_count()],
            receptor_len: complex.receptor.len(),
            ligand_len: complex.ligand.len(),
        };

        for side in [Side::Receptor, Side::Ligand] {
            for (index, atom) in complex.molecule(side).atoms().iter().enumerate() {
                let Some(channel) = channel_of(side, atom) else {
                    continue;
                };
                let gridded = GriddedAtom {
                    side,
                    index,
                    channel,
                    position: atom.position,
                    radius: atom.element.vdw_radius() * radius_multiplier,
                };
                let mut touched = false;
                let base = channel * geometry.voxel_count();
                let values = &mut grid.values;
                visit_voxels(&geometry, &gridded, |voxel, d, _| {
                    let rho = density(d, gridded.radius);
                    if rho > 0.0 {
                        values[base + voxel] += rho;
                        touched = true;
                    }
                });
                if touched {
                    grid.atoms.push(gridded);
                }
            }
        }
        debug!("Gridded {} atoms: {}", grid.atoms.len(), grid.channel_summary());
        grid
    }

    fn channel_values(&self, channel: usize) -> &[f32] {
        let n = self.geometry.voxel_count();
        &self.values[channel * n..(channel + 1) * n]
    }

    /// Gridded atom count per channel, e.g. `Lig_Nitrogen=2`.
    fn channel_summary(&self) -> String {
        let mut counts = [0usize; NUM_CHANNELS];
        for atom in &self.atoms {
            counts[atom.channel] += 1;
        }
        counts
            .iter()
            .enumerate()
            .filter(|(_, count)| **count > 0)
            .map(|(channel, count)| format!("{}={}", channel_name(channel), count))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Chain a gradient over voxels into a gradient over atom positions.
    pub fn atom_gradients(&self, voxel_gradient: &[f32]) -> PerAtom<Vec3> {
        let n = self.geometry.voxel_count();
        let mut out = PerAtom::<Vec3>::zeros(self.receptor_len, self.ligand_len);
        for atom in &self.atoms {
            let base = atom.channel * n;
            let mut gradient = Vec3::ZERO;
            visit_voxels(&self.geometry, atom, |voxel, d, offset| {
                if d > 0.0 {
                    // offset = atom - voxel, so d(distance)/d(atom) = offset / d
                    let slope = density_derivative(d, atom.radius);
                    gradient += voxel_gradient[base + voxel] * slope * offset / d;
                }
            });
            out.side_mut(atom.side)[atom.index] += gradient;
        }
        out
    }

    /// Share voxel relevance among atoms in proportion to their density.
    pub fn atom_relevance(&self, voxel_relevance: &[f32]) -> PerAtom<f32> {
        let n = self.geometry.voxel_count();
        let mut out = PerAtom::<f32>::zeros(self.receptor_len, self.ligand_len);
        for atom in &self.atoms {
            let base = atom.channel * n;
            let densities = self.channel_values(atom.channel);
            let mut relevance = 0.0;
            visit_voxels(&self.geometry, atom, |voxel, d, _| {
                let total = densities[voxel];
                if total > f32::EPSILON {
                    relevance += voxel_relevance[base + voxel] * density(d, atom.radius) / total;
                }
            });
            out.side_mut(atom.side)[atom.index] += relevance;
        }
        out
    }

    /// Sum channel-major voxel values over each side's channels.
    pub fn side_totals(&self, voxel_values: &[f32]) -> PerAtom<f32> {
        let n = self.geometry.voxel_count();
        let mut out = PerAtom {
            receptor: vec![0.0; n],
            ligand: vec![0.0; n],
        };
        for channel in 0..NUM_CHANNELS {
            let target = out.side_mut(side_of_channel(channel));
            for (t, v) in target.iter_mut().zip(&voxel_values[channel * n..(channel + 1) * n]) {
                *t += v;
            }
        }
        out
    }
}

/// Call `f(voxel, distance, atom - voxel)` for every voxel within the atom's cutoff.
fn visit_voxels(geometry: &GridGeometry, atom: &GriddedAtom, mut f: impl FnMut(usize, f32, Vec3)) {
    let cutoff = 1.5 * atom.radius;
    let p = atom.position;
    let o = geometry.origin;
    let (Some(xs), Some(ys), Some(zs)) = (
        geometry.axis_range(p.x, o.x, cutoff),
        geometry.axis_range(p.y, o.y, cutoff),
        geometry.axis_range(p.z, o.z, cutoff),
    ) else {
        return;
    };
    for i in xs {
        for j in ys.clone() {
            for k in zs.clone() {
                let offset = p - geometry.position(i, j, k);
                let d = offset.length();
                if d < cutoff {
                    f(geometry.index(i, j, k), d, offset);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::typing::{channel, AtomClass};
    use ligvis_structure::{parse_molecule, StructureFormat};

    fn complex_with_ligand_atom(x: f32) -> Complex {
        let lig = format!(
            "ATOM      1  C1  LIG L   1    {:>8.3}   0.000   0.000  1.00  0.00     0.000 C\n",
            x
        );
        let rec = "ATOM      1  N   ALA A   1      50.000  50.000  50.000  1.00  0.00    -0.300 N\n";
        Complex::new(
            parse_molecule(rec, "rec", StructureFormat::Pdbqt).unwrap(),
            parse_molecule(&lig, "lig", StructureFormat::Pdbqt).unwrap(),
        )
    }

    #[test]
    fn test_density_is_continuous() {
        let r = 1.9;
        assert!((density(0.0, r) - 1.0).abs() < 1e-6);
        assert!((density(r - 1e-4, r) - density(r + 1e-4, r)).abs() < 1e-3);
        assert!(density(1.5 * r - 1e-4, r) < 1e-3);
        assert_eq!(density(1.5 * r, r), 0.0);
    }

    #[test]
    fn test_density_derivative_matches_finite_difference() {
        let r = 1.8;
        for &d in &[0.3f32, 1.0, 2.0, 2.5] {
            let h = 1e-3;
            let numeric = (density(d + h, r) - density(d - h, r)) / (2.0 * h);
            assert!((numeric - density_derivative(d, r)).abs() < 1e-2, "d = {d}");
        }
    }

    #[test]
    fn test_atom_on_grid_point_fills_its_channel() {
        let complex = complex_with_ligand_atom(0.0);
        let geometry = GridGeometry::centered(Vec3::ZERO, 4.0, 1.0);
        let grid = InputGrid::build(&complex, geometry, 1.0);

        // The receptor atom is far outside the grid.
        assert_eq!(grid.atoms.len(), 1);
        let c = channel(Side::Ligand, AtomClass::AliphaticCarbon);
        let center = geometry.index(2, 2, 2);
        assert!((grid.channel_values(c)[center] - 1.0).abs() < 1e-6);
        assert!(grid.channel_values(0).iter().all(|&v| v == 0.0));
        assert_eq!(grid.channel_summary(), "Lig_AliphaticCarbon=1");
    }

    #[test]
    fn test_nearest_index() {
        let geometry = GridGeometry::centered(Vec3::ZERO, 4.0, 1.0);
        assert_eq!(geometry.nearest_index(Vec3::ZERO), Some(geometry.index(2, 2, 2)));
        assert_eq!(geometry.nearest_index(Vec3::new(-2.4, 1.6, 0.2)), Some(geometry.index(0, 4, 2)));
        assert_eq!(geometry.nearest_index(Vec3::new(-2.6, 0.0, 0.0)), None);
        assert_eq!(geometry.nearest_index(Vec3::new(0.0, 0.0, 2.6)), None);
    }

    #[test]
    fn test_relevance_is_conserved_when_shared() {
        let complex = complex_with_ligand_atom(0.3);
        let geometry = GridGeometry::centered(Vec3::ZERO, 4.0, 1.0);
        let grid = InputGrid::build(&complex, geometry, 1.0);

        // Relevance equal to the density itself sums back to the total density.
        let total: f32 = grid.values.iter().sum();
        let per_atom = grid.atom_relevance(&grid.values);
        assert!((per_atom.ligand[0] - total).abs() < 1e-3);
        assert_eq!(per_atom.receptor, vec![0.0]);

        let sides = grid.side_totals(&grid.values);
        assert!((sides.ligand.iter().sum::<f32>() - total).abs() < 1e-3);
    }

    #[test]
    fn test_gradient_points_towards_higher_weight() {
        let complex = complex_with_ligand_atom(0.4);
        let geometry = GridGeometry::centered(Vec3::ZERO, 4.0, 1.0);
        let grid = InputGrid::build(&complex, geometry, 1.0);

        // Upstream gradient rewards density at larger x.
        let n = geometry.points;
        let mut upstream = vec![0.0; grid.values.len()];
        for c in 0..NUM_CHANNELS {
            for i in 0..n {
                for j in 0..n {
                    for k in 0..n {
                        upstream[c * geometry.voxel_count() + geometry.index(i, j, k)] = i as f32;
                    }
                }
            }
        }
        let g = grid.atom_gradients(&upstream);
        assert!(g.ligand[0].x > 0.0);
        assert!(g.ligand[0].y.abs() < 1e-4);
    }
}
