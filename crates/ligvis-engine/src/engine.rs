//! Run dispatch: validate, plan once, run each selected strategy, report.

use std::io::Write;
use std::time::Instant;

use tracing::{info, warn};

use ligvis_cnn::PoseScorer;
use ligvis_structure::{Complex, ScoringBox};

use crate::config::{VisMethod, VisualizationConfig};
use crate::error::{Result, VisError};
use crate::planner::{plan, PlanOptions};
use crate::report;
use crate::result::AttributionResult;
use crate::strategy::{RunContext, Strategy};

/// Load the structures named in `config` and run it.
///
/// Configuration problems are reported before anything is read or scored.
pub fn visualize<S, W>(config: &VisualizationConfig, scorer: &S, out: &mut W) -> Result<Vec<AttributionResult>>
where
    S: PoseScorer + ?Sized,
    W: Write,
{
    config.validate()?;
    let complex = Complex::load(config.receptor_path()?, config.ligand_path()?)?;
    run(config, &complex, scorer, out)
}

/// Run the configured method(s) on an already loaded complex.
///
/// Text goes to `out`; files go to `config.out_dir`. The first failing
/// strategy aborts the run.
pub fn run<S, W>(
    config: &VisualizationConfig,
    complex: &Complex,
    scorer: &S,
    out: &mut W,
) -> Result<Vec<AttributionResult>>
where
    S: PoseScorer + ?Sized,
    W: Write,
{
    config.validate_options()?;
    let options = PlanOptions::from_config(config)?;
    if config.outputdx && !matches!(config.method, VisMethod::Lrp | VisMethod::All) {
        warn!("outputdx only applies to the lrp method, no DX grids will be written");
    }

    let scoring_box = ScoringBox::new(complex.ligand_centroid()?, config.box_size);
    let units = plan(complex, &scoring_box, &options);
    info!(
        "Box of {} Å at ({:.3}, {:.3}, {:.3}), {} units",
        scoring_box.size,
        scoring_box.center.x,
        scoring_box.center.y,
        scoring_box.center.z,
        units.len()
    );

    std::fs::create_dir_all(&config.out_dir).map_err(|e| VisError::io(&config.out_dir, e))?;

    let ctx = RunContext {
        config,
        complex,
        scoring_box,
        units: &units,
    };
    let mut results = Vec::new();
    for &strategy in Strategy::for_method(config.method) {
        if config.method == VisMethod::All {
            write!(out, "{}", strategy.header()).map_err(stdout_error)?;
        }
        let start = Instant::now();
        let result = strategy.run(&ctx, scorer)?;
        info!("{} finished in {:.2}s", strategy, start.elapsed().as_secs_f32());

        report::write_text(&result, &ctx, out).map_err(stdout_error)?;
        report::write_files(&result, &ctx)?;
        results.push(result);
    }

    if let Some(path) = &config.json_output {
        report::write_json(path, &results)?;
    }
    Ok(results)
}

fn stdout_error(e: std::io::Error) -> VisError {
    VisError::io("<stdout>", e)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ligvis_test_utils::{fixture_complex, CountingScorer};

    fn config_in(dir: &tempfile::TempDir, method: VisMethod) -> VisualizationConfig {
        VisualizationConfig {
            method,
            out_dir: dir.path().to_path_buf(),
            ..Default::default()
        }
    }

    #[test]
    fn test_all_prints_headers_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(&dir, VisMethod::All);
        let scorer = CountingScorer::new();
        let mut out = Vec::new();

        let results = run(&config, &fixture_complex(), &scorer, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();

        let methods: Vec<Strategy> = results.iter().map(|r| r.method).collect();
        assert_eq!(methods, vec![Strategy::Gradient, Strategy::Lrp, Strategy::Masking]);
        let g = text.find("\nGradient\n------------\n").unwrap();
        let l = text.find("\nLRP\n------------\n").unwrap();
        let m = text.find("\nMasking\n------------\n").unwrap();
        assert!(g < l && l < m);

        // One gradient call, one relevance call, N + 1 masking calls.
        assert_eq!(scorer.gradient_calls(), 1);
        assert_eq!(scorer.relevance_calls(), 1);
        assert_eq!(scorer.score_calls(), results[2].entries.len() + 1);
    }

    #[test]
    fn test_single_method_has_no_header() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(&dir, VisMethod::Gradient);
        let mut out = Vec::new();
        run(&config, &fixture_complex(), &CountingScorer::new(), &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("gradient attribution\n"));
        assert!(dir.path().join("ligand_gradient.pdbqt").exists());
        assert!(dir.path().join("receptor_gradient.pdbqt").exists());
    }

    #[test]
    fn test_conflicting_modes_score_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let config = VisualizationConfig {
            frags_only: true,
            atoms_only: true,
            ..config_in(&dir, VisMethod::Masking)
        };
        let scorer = CountingScorer::new();
        let err = run(&config, &fixture_complex(), &scorer, &mut Vec::new()).unwrap_err();
        assert!(err.is_configuration());
        assert_eq!(scorer.total_calls(), 0);
    }

    #[test]
    fn test_outputdx_is_ignored_outside_lrp() {
        let dir = tempfile::tempdir().unwrap();
        let config = VisualizationConfig {
            outputdx: true,
            ..config_in(&dir, VisMethod::Gradient)
        };
        run(&config, &fixture_complex(), &CountingScorer::new(), &mut Vec::new()).unwrap();
        assert!(!dir.path().join("lrp_ligand.dx").exists());
    }

    #[test]
    fn test_json_output() {
        let dir = tempfile::tempdir().unwrap();
        let json = dir.path().join("results.json");
        let config = VisualizationConfig {
            json_output: Some(json.clone()),
            ..config_in(&dir, VisMethod::Lrp)
        };
        run(&config, &fixture_complex(), &CountingScorer::new(), &mut Vec::new()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(json).unwrap()).unwrap();
        assert_eq!(value.as_array().unwrap().len(), 1);
        assert_eq!(value[0]["method"], "lrp");
    }
}
