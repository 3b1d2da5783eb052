//! Masking (removal): re-score the pose with each unit removed.
//!
//! N units cost N + 1 scorer calls, plus one when an additivity target is
//! configured and has planned units.

use std::collections::BTreeSet;
use std::path::PathBuf;

use tracing::{debug, info, warn};

use ligvis_cnn::{PerAtom, PoseScorer};
use ligvis_structure::{write_molecule, Complex, Side};

use super::{RunContext, Strategy};
use crate::error::Result;
use crate::planner::PerturbationUnit;
use crate::result::{AdditivityReport, AttributionResult, UnitAttribution};

pub fn run<S: PoseScorer + ?Sized>(ctx: &RunContext<'_>, scorer: &S) -> Result<AttributionResult> {
    let center = ctx.scoring_box.center;
    let baseline = scorer.score(ctx.complex, center)?;
    info!("Masking {} units, baseline score {:.5}", ctx.units.len(), baseline);

    let mut result = AttributionResult::new(
        Strategy::Masking,
        baseline,
        PerAtom::zeros(ctx.complex.receptor.len(), ctx.complex.ligand.len()),
    );

    for unit in ctx.units {
        let removed: BTreeSet<usize> = unit.atoms.iter().copied().collect();
        let perturbed = ctx.complex.without(unit.side, &removed);
        if ctx.config.output_files {
            if let Some(path) = write_perturbed(ctx, unit, &perturbed) {
                result.failed_writes.push(path);
            }
        }

        let score = scorer.score(&perturbed, center)?;
        let delta = baseline - score;
        debug!("{}: {} atoms removed, score {:.5}, delta {:.5}", unit.id, unit.atoms.len(), score, delta);

        spread(&mut result.atom_scores, ctx.complex, unit, delta);
        result.entries.push(UnitAttribution {
            unit: unit.clone(),
            value: delta,
        });
    }

    if let Some(target) = ctx.config.additivity {
        result.additivity = additivity(ctx, scorer, target, &result)?;
    }
    Ok(result)
}

/// Split a unit's delta evenly over its heavy atoms (all atoms if it has none).
fn spread(atom_scores: &mut PerAtom<f32>, complex: &Complex, unit: &PerturbationUnit, delta: f32) {
    let atoms = complex.molecule(unit.side).atoms();
    let heavy: Vec<usize> = unit
        .atoms
        .iter()
        .copied()
        .filter(|&i| !atoms[i].is_hydrogen())
        .collect();
    let members = if heavy.is_empty() { unit.atoms.clone() } else { heavy };
    if members.is_empty() {
        return;
    }
    let share = delta / members.len() as f32;
    let scores = atom_scores.side_mut(unit.side);
    for i in members {
        scores[i] += share;
    }
}

/// Write the perturbed molecule; returns the path on failure.
fn write_perturbed(ctx: &RunContext<'_>, unit: &PerturbationUnit, perturbed: &Complex) -> Option<PathBuf> {
    let molecule = perturbed.molecule(unit.side);
    let path = ctx
        .config
        .out_dir
        .join(format!("{}.{}", unit.id, molecule.format().extension()));
    let remarks = [format!("{} with {} removed", ctx.complex.molecule(unit.side).name(), unit.id)];
    match write_molecule(&path, molecule, None, &remarks) {
        Ok(()) => None,
        Err(e) => {
            warn!("Failed to write modified structure: {}", e);
            Some(path)
        }
    }
}

fn additivity<S: PoseScorer + ?Sized>(
    ctx: &RunContext<'_>,
    scorer: &S,
    target: Side,
    result: &AttributionResult,
) -> Result<Option<AdditivityReport>> {
    let group: BTreeSet<usize> = ctx
        .units
        .iter()
        .filter(|u| u.side == target)
        .flat_map(|u| u.atoms.iter().copied())
        .collect();
    if group.is_empty() {
        warn!("No {} units planned, skipping additivity check", target);
        return Ok(None);
    }

    let score = scorer.score(&ctx.complex.without(target, &group), ctx.scoring_box.center)?;
    let report = AdditivityReport::new(target, result.side_sum(target), result.baseline - score);
    info!(
        "Additivity ({}): unit sum {:.5}, joint removal {:.5}, discrepancy {:.5}",
        target, report.unit_sum, report.group_delta, report.discrepancy
    );
    Ok(Some(report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::VisualizationConfig;
    use crate::planner::{plan, PlanOptions};
    use ligvis_structure::ScoringBox;
    use ligvis_test_utils::{fixture_complex, CountingScorer};

    fn context<'a>(
        config: &'a VisualizationConfig,
        complex: &'a Complex,
        units: &'a [PerturbationUnit],
    ) -> RunContext<'a> {
        RunContext {
            config,
            complex,
            scoring_box: ScoringBox::around(&complex.ligand, config.box_size).unwrap(),
            units,
        }
    }

    #[test]
    fn test_one_call_per_unit_plus_baseline() {
        let config = VisualizationConfig::default();
        let complex = fixture_complex();
        let b = ScoringBox::around(&complex.ligand, config.box_size).unwrap();
        let units = plan(&complex, &b, &PlanOptions::default());
        let scorer = CountingScorer::new();

        let result = run(&context(&config, &complex, &units), &scorer).unwrap();
        assert_eq!(scorer.score_calls(), units.len() + 1);
        assert_eq!(result.entries.len(), units.len());
        assert!(result.entries.iter().all(|e| e.value.is_finite()));
        assert!(result.additivity.is_none());
    }

    #[test]
    fn test_delta_is_removed_contribution() {
        let config = VisualizationConfig::default();
        let complex = fixture_complex();
        let b = ScoringBox::around(&complex.ligand, config.box_size).unwrap();
        let units = plan(&complex, &b, &PlanOptions::default());
        let result = run(&context(&config, &complex, &units), &CountingScorer::new()).unwrap();

        // The additive scorer makes each delta the removed atoms' contribution.
        let expected: f32 = [3usize, 4]
            .iter()
            .map(|&i| CountingScorer::contribution(&complex.ligand.atoms()[i], b.center))
            .sum();
        assert!((result.value_of("L_frag_2").unwrap() - expected).abs() < 1e-5);

        // Per-atom shares add back up to the unit delta.
        let shares = result.atom_scores.ligand[3] + result.atom_scores.ligand[4];
        assert!((shares - expected).abs() < 1e-5);
        // SER's hydrogen gets no share.
        assert_eq!(result.atom_scores.receptor[3], 0.0);
    }

    #[test]
    fn test_additivity_adds_one_call() {
        let config = VisualizationConfig {
            additivity: Some(Side::Ligand),
            ..Default::default()
        };
        let complex = fixture_complex();
        let b = ScoringBox::around(&complex.ligand, config.box_size).unwrap();
        let units = plan(&complex, &b, &PlanOptions::default());
        let scorer = CountingScorer::new();

        let result = run(&context(&config, &complex, &units), &scorer).unwrap();
        assert_eq!(scorer.score_calls(), units.len() + 2);
        let report = result.additivity.unwrap();
        assert_eq!(report.target, Side::Ligand);
        assert!(report.unit_sum.is_finite() && report.group_delta.is_finite());
        assert!(report.discrepancy.abs() < 1e-4);
    }

    #[test]
    fn test_additivity_without_target_units_is_skipped() {
        let config = VisualizationConfig {
            additivity: Some(Side::Receptor),
            skip_receptor_output: true,
            ..Default::default()
        };
        let complex = fixture_complex();
        let b = ScoringBox::around(&complex.ligand, config.box_size).unwrap();
        let units = plan(&complex, &b, &PlanOptions::from_config(&config).unwrap());
        let scorer = CountingScorer::new();

        let result = run(&context(&config, &complex, &units), &scorer).unwrap();
        assert!(result.additivity.is_none());
        assert_eq!(scorer.score_calls(), units.len() + 1);
    }

    #[test]
    fn test_scorer_failure_aborts() {
        let config = VisualizationConfig::default();
        let complex = fixture_complex();
        let b = ScoringBox::around(&complex.ligand, config.box_size).unwrap();
        let units = plan(&complex, &b, &PlanOptions::default());
        let scorer = CountingScorer::new().failing_after(2);

        let err = run(&context(&config, &complex, &units), &scorer).unwrap_err();
        assert_eq!(err.exit_code(), 2);
        assert_eq!(scorer.score_calls(), 3);
    }

    #[test]
    fn test_output_files_are_written_per_unit() {
        let dir = tempfile::tempdir().unwrap();
        let config = VisualizationConfig {
            output_files: true,
            out_dir: dir.path().to_path_buf(),
            ..Default::default()
        };
        let complex = fixture_complex();
        let b = ScoringBox::around(&complex.ligand, config.box_size).unwrap();
        let units = plan(&complex, &b, &PlanOptions::default());

        let result = run(&context(&config, &complex, &units), &CountingScorer::new()).unwrap();
        assert!(result.failed_writes.is_empty());
        let frag = std::fs::read_to_string(dir.path().join("L_frag_2.pdbqt")).unwrap();
        assert_eq!(frag.lines().filter(|l| l.starts_with("ATOM")).count(), 3);
        assert!(dir.path().join("R_A_10_SER.pdbqt").exists());
    }

    #[test]
    fn test_unwritable_output_is_recorded_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let config = VisualizationConfig {
            output_files: true,
            out_dir: dir.path().join("missing").join("nested"),
            ..Default::default()
        };
        let complex = fixture_complex();
        let b = ScoringBox::around(&complex.ligand, config.box_size).unwrap();
        let units = plan(&complex, &b, &PlanOptions::default());

        let result = run(&context(&config, &complex, &units), &CountingScorer::new()).unwrap();
        assert_eq!(result.failed_writes.len(), units.len());
        assert_eq!(result.entries.len(), units.len());
    }
}
