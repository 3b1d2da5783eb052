//! Layer-wise relevance propagation mapped onto units.

use tracing::{debug, info, warn};

use ligvis_cnn::{GridGeometry, PoseScorer};

use super::{sum_over_units, RunContext, Strategy};
use crate::error::Result;
use crate::result::AttributionResult;

pub fn run<S: PoseScorer + ?Sized>(ctx: &RunContext<'_>, scorer: &S) -> Result<AttributionResult> {
    let map = scorer.relevance(ctx.complex, ctx.scoring_box.center)?;
    let total: f32 = map.atoms.ligand.iter().chain(&map.atoms.receptor).sum();
    info!("LRP relevance computed, score {:.5}, total relevance {:.5}", map.score, total);

    let mut result = AttributionResult::new(Strategy::Lrp, map.score, map.atoms);
    result.entries = sum_over_units(ctx.units, &result.atom_scores);
    if ctx.config.outputdx {
        match map.voxels {
            Some(voxels) => {
                let b = &ctx.scoring_box;
                let target = GridGeometry::centered(b.center, b.size, voxels.geometry.resolution);
                debug!(
                    "Resampling {}³ relevance grid onto {}³ box grid",
                    voxels.geometry.points, target.points
                );
                result.grid = Some(voxels.resample(target));
            }
            None => warn!("Scorer returned no voxel relevance, DX grids will not be written"),
        }
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::VisualizationConfig;
    use crate::planner::{plan, PlanOptions};
    use glam::Vec3;
    use ligvis_cnn::{RelevanceMap, ScoreGradients, VoxelRelevance};
    use ligvis_structure::{Complex, ScoringBox};
    use ligvis_test_utils::{fixture_complex, CountingScorer};

    /// Unit relevance on every voxel of an 8 Å grid at 1 Å.
    struct GriddedScorer(CountingScorer);

    impl PoseScorer for GriddedScorer {
        fn score(&self, complex: &Complex, center: Vec3) -> ligvis_cnn::Result<f32> {
            self.0.score(complex, center)
        }

        fn gradients(&self, complex: &Complex, center: Vec3) -> ligvis_cnn::Result<ScoreGradients> {
            self.0.gradients(complex, center)
        }

        fn relevance(&self, complex: &Complex, center: Vec3) -> ligvis_cnn::Result<RelevanceMap> {
            let mut map = self.0.relevance(complex, center)?;
            let geometry = GridGeometry::centered(center, 8.0, 1.0);
            map.voxels = Some(VoxelRelevance {
                geometry,
                ligand: vec![1.0; geometry.voxel_count()],
                receptor: vec![0.0; geometry.voxel_count()],
            });
            Ok(map)
        }
    }

    fn run_with_box(box_size: f32) -> (ScoringBox, AttributionResult) {
        let config = VisualizationConfig { outputdx: true, box_size, ..Default::default() };
        let complex = fixture_complex();
        let scoring_box = ScoringBox::around(&complex.ligand, config.box_size).unwrap();
        let units = plan(&complex, &scoring_box, &PlanOptions::from_config(&config).unwrap());
        let ctx = RunContext { config: &config, complex: &complex, scoring_box, units: &units };
        let result = run(&ctx, &GriddedScorer(CountingScorer::new())).unwrap();
        (scoring_box, result)
    }

    #[test]
    fn test_single_call_and_conservation() {
        let config = VisualizationConfig { skip_bound_check: true, ..Default::default() };
        let complex = fixture_complex();
        let scoring_box = ScoringBox::around(&complex.ligand, config.box_size).unwrap();
        let units = plan(&complex, &scoring_box, &PlanOptions::from_config(&config).unwrap());
        let ctx = RunContext { config: &config, complex: &complex, scoring_box, units: &units };
        let scorer = CountingScorer::new();

        let result = run(&ctx, &scorer).unwrap();
        assert_eq!(scorer.relevance_calls(), 1);
        assert_eq!(scorer.total_calls(), 1);

        // Every atom belongs to exactly one unit here, so unit values add up to the score.
        let total: f32 = result.entries.iter().map(|e| e.value).sum();
        assert!((total - result.baseline).abs() < 1e-4);
        assert!(result.grid.is_none());
    }

    #[test]
    fn test_voxel_grid_follows_box_size() {
        let (small_box, small) = run_with_box(4.0);
        let grid = small.grid.unwrap();
        assert_eq!(grid.geometry.points, 5);
        assert!((grid.geometry.origin - (small_box.center - Vec3::splat(2.0))).length() < 1e-5);
        assert!(grid.ligand.iter().all(|&v| v == 1.0));

        let (large_box, large) = run_with_box(12.0);
        let grid = large.grid.unwrap();
        assert_eq!(grid.geometry.points, 13);
        assert!((grid.geometry.origin - (large_box.center - Vec3::splat(6.0))).length() < 1e-5);
        // Corners lie beyond the scored grid.
        assert_eq!(grid.ligand[0], 0.0);
        assert_eq!(grid.ligand[grid.geometry.index(6, 6, 6)], 1.0);
    }
}
