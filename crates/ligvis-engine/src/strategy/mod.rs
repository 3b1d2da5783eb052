//! Attribution strategies.
//!
//! The set is closed: masking, gradient saliency and LRP all share one
//! [`Strategy::run`] contract over the same planned units.

use serde::{Deserialize, Serialize};
use std::fmt;

use ligvis_cnn::{PerAtom, PoseScorer};
use ligvis_structure::{Complex, ScoringBox};

use crate::config::{VisMethod, VisualizationConfig};
use crate::error::Result;
use crate::planner::PerturbationUnit;
use crate::result::{AttributionResult, UnitAttribution};

pub mod gradient;
pub mod lrp;
pub mod masking;

/// Everything a strategy needs for one run. Borrowed, never mutated.
#[derive(Debug, Clone, Copy)]
pub struct RunContext<'a> {
    pub config: &'a VisualizationConfig,
    pub complex: &'a Complex,
    pub scoring_box: ScoringBox,
    pub units: &'a [PerturbationUnit],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    Masking,
    Gradient,
    Lrp,
}

impl Strategy {
    /// Strategies run for a method, in order.
    pub fn for_method(method: VisMethod) -> &'static [Strategy] {
        match method {
            VisMethod::Masking => &[Strategy::Masking],
            VisMethod::Gradient => &[Strategy::Gradient],
            VisMethod::Lrp => &[Strategy::Lrp],
            VisMethod::All => &[Strategy::Gradient, Strategy::Lrp, Strategy::Masking],
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Strategy::Masking => "masking",
            Strategy::Gradient => "gradient",
            Strategy::Lrp => "lrp",
        }
    }

    /// Section header printed before each strategy under `all`.
    pub fn header(self) -> &'static str {
        match self {
            Strategy::Gradient => "\nGradient\n------------\n",
            Strategy::Lrp => "\nLRP\n------------\n",
            Strategy::Masking => "\nMasking\n------------\n",
        }
    }

    pub fn run<S: PoseScorer + ?Sized>(self, ctx: &RunContext<'_>, scorer: &S) -> Result<AttributionResult> {
        match self {
            Strategy::Masking => masking::run(ctx, scorer),
            Strategy::Gradient => gradient::run(ctx, scorer),
            Strategy::Lrp => lrp::run(ctx, scorer),
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Per-unit values as sums of per-atom values.
fn sum_over_units(units: &[PerturbationUnit], per_atom: &PerAtom<f32>) -> Vec<UnitAttribution> {
    units
        .iter()
        .map(|unit| {
            let values = per_atom.side(unit.side);
            let value = unit.atoms.iter().filter_map(|&i| values.get(i)).sum();
            UnitAttribution {
                unit: unit.clone(),
                value,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ligvis_structure::Side;
    use crate::planner::UnitKind;

    #[test]
    fn test_all_runs_gradient_lrp_masking() {
        assert_eq!(
            Strategy::for_method(VisMethod::All),
            &[Strategy::Gradient, Strategy::Lrp, Strategy::Masking]
        );
        assert_eq!(Strategy::for_method(VisMethod::Masking), &[Strategy::Masking]);
        assert_eq!(Strategy::Gradient.header(), "\nGradient\n------------\n");
    }

    #[test]
    fn test_unit_sums() {
        let units = vec![
            PerturbationUnit {
                id: "L_frag_1".into(),
                side: Side::Ligand,
                kind: UnitKind::Fragment,
                atoms: vec![0, 2],
            },
            PerturbationUnit {
                id: "R_A_1_ALA".into(),
                side: Side::Receptor,
                kind: UnitKind::Residue,
                atoms: vec![1],
            },
        ];
        let per_atom = PerAtom {
            receptor: vec![5.0, 7.0],
            ligand: vec![1.0, 2.0, 3.0],
        };
        let sums = sum_over_units(&units, &per_atom);
        assert_eq!(sums[0].value, 4.0);
        assert_eq!(sums[1].value, 7.0);
    }
}
