//! Gradient saliency: magnitude of the score gradient at every atom.

use tracing::info;

use ligvis_cnn::{CnnError, PerAtom, PoseScorer};

use super::{sum_over_units, RunContext, Strategy};
use crate::error::Result;
use crate::result::AttributionResult;

pub fn run<S: PoseScorer + ?Sized>(ctx: &RunContext<'_>, scorer: &S) -> Result<AttributionResult> {
    let gradients = scorer.gradients(ctx.complex, ctx.scoring_box.center)?;
    let norms = |g: &[glam::Vec3]| g.iter().map(|v| v.length()).collect::<Vec<f32>>();
    let saliency = PerAtom {
        receptor: norms(&gradients.atoms.receptor),
        ligand: norms(&gradients.atoms.ligand),
    };
    if saliency.receptor.iter().chain(&saliency.ligand).any(|s| !s.is_finite()) {
        return Err(CnnError::Inference("non-finite atom gradient".into()).into());
    }
    info!("Gradient saliency computed, score {:.5}", gradients.score);

    let mut result = AttributionResult::new(Strategy::Gradient, gradients.score, saliency);
    result.entries = sum_over_units(ctx.units, &result.atom_scores);
    Ok(result)
}
