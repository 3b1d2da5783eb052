//! What a strategy produces.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use ligvis_cnn::{PerAtom, VoxelRelevance};
use ligvis_structure::Side;

use crate::planner::PerturbationUnit;
use crate::strategy::Strategy;

/// Attribution value of one planned unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitAttribution {
    #[serde(flatten)]
    pub unit: PerturbationUnit,
    pub value: f32,
}

/// Joint removal of a group compared with the sum of its unit deltas.
///
/// The two are not expected to agree; the discrepancy is reported as is.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AdditivityReport {
    pub target: Side,
    pub unit_sum: f32,
    pub group_delta: f32,
    /// `group_delta - unit_sum`
    pub discrepancy: f32,
}

impl AdditivityReport {
    pub fn new(target: Side, unit_sum: f32, group_delta: f32) -> Self {
        Self {
            target,
            unit_sum,
            group_delta,
            discrepancy: group_delta - unit_sum,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttributionResult {
    pub method: Strategy,
    /// Score of the unperturbed pose
    pub baseline: f32,
    /// One entry per planned unit, in planner order
    pub entries: Vec<UnitAttribution>,
    /// Per-atom values written to the scored structure files
    pub atom_scores: PerAtom<f32>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub additivity: Option<AdditivityReport>,
    /// Voxel relevance (LRP with DX output only)
    #[serde(skip)]
    pub grid: Option<VoxelRelevance>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub failed_writes: Vec<PathBuf>,
}

impl AttributionResult {
    pub fn new(method: Strategy, baseline: f32, atom_scores: PerAtom<f32>) -> Self {
        Self {
            method,
            baseline,
            entries: Vec::new(),
            atom_scores,
            additivity: None,
            grid: None,
            failed_writes: Vec::new(),
        }
    }

    pub fn value_of(&self, unit_id: &str) -> Option<f32> {
        self.entries
            .iter()
            .find(|e| e.unit.id == unit_id)
            .map(|e| e.value)
    }

    /// Sum of entry values for one side.
    pub fn side_sum(&self, side: Side) -> f32 {
        self.entries
            .iter()
            .filter(|e| e.unit.side == side)
            .map(|e| e.value)
            .sum()
    }
}
