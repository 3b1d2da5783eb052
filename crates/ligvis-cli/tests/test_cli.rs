//! Drive the `ligvis` binary and check exit codes and output.
//!
//! Run with: cargo test --package ligvis-cli --test test_cli

use std::path::Path;
use std::process::{Command, Output};

use ligvis_test_utils::{write_fixture_structures, write_tiny_model};

fn ligvis(dir: &Path, extra: &[&str]) -> Output {
    let (receptor, ligand) = write_fixture_structures(dir).unwrap();
    let (model, weights) = write_tiny_model(dir).unwrap();
    let out_dir = dir.join("out");
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_ligvis"));
    cmd.arg("--receptor").arg(&receptor)
        .arg("--ligand").arg(&ligand)
        .arg("--cnn_model").arg(&model)
        .arg("--cnn_weights").arg(&weights)
        .arg("--out_dir").arg(&out_dir)
        .args(extra)
        .env_remove("RUST_LOG");
    cmd.output().unwrap()
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

#[test]
fn test_masking_run_succeeds() {
    let dir = tempfile::tempdir().unwrap();
    let output = ligvis(dir.path(), &["--frags_only", "--additivity", "ligand"]);
    assert_eq!(output.status.code(), Some(0), "stderr: {}", stderr(&output));

    let text = stdout(&output);
    assert!(text.starts_with("masking attribution\n"));
    assert!(text.contains("L_frag_1"));
    assert!(text.contains("L_frag_2"));
    assert!(text.contains("additivity (ligand)"));
    assert!(dir.path().join("out/ligand_masking.pdbqt").exists());
}

#[test]
fn test_all_prints_section_headers() {
    let dir = tempfile::tempdir().unwrap();
    let output = ligvis(dir.path(), &["--vis_method", "all", "--outputdx"]);
    assert_eq!(output.status.code(), Some(0), "stderr: {}", stderr(&output));

    let text = stdout(&output);
    assert!(text.starts_with("\nGradient\n------------\n"));
    assert!(text.contains("\nLRP\n------------\n"));
    assert!(text.contains("\nMasking\n------------\n"));
    assert!(dir.path().join("out/lrp_ligand.dx").exists());
    assert!(!stderr(&output).is_empty());
}

#[test]
fn test_missing_receptor_exits_with_usage() {
    let output = Command::new(env!("CARGO_BIN_EXE_ligvis"))
        .args(["--ligand", "lig.pdbqt", "--cnn_model", "m.json", "--cnn_weights", "w.safetensors"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
    let err = stderr(&output);
    assert!(err.contains("Missing receptor."));
    assert!(err.contains("Correct usage:"));
    assert!(stdout(&output).is_empty());
}

#[test]
fn test_conflicting_unit_modes() {
    let dir = tempfile::tempdir().unwrap();
    let output = ligvis(dir.path(), &["--frags_only", "--atoms_only"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("Cannot use 'frags_only' and 'atoms_only' together."));
}

#[test]
fn test_unknown_method_lists_choices() {
    let dir = tempfile::tempdir().unwrap();
    let output = ligvis(dir.path(), &["--vis_method", "occlusion"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("removal, masking, lrp, gradient, all"));
}

#[test]
fn test_corrupt_weights_is_a_runtime_failure() {
    let dir = tempfile::tempdir().unwrap();
    let (receptor, ligand) = write_fixture_structures(dir.path()).unwrap();
    let (model, _) = write_tiny_model(dir.path()).unwrap();
    let weights = dir.path().join("broken.safetensors");
    std::fs::write(&weights, b"not a safetensors file").unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_ligvis"))
        .arg("-r").arg(&receptor)
        .arg("-l").arg(&ligand)
        .arg("--cnn_model").arg(&model)
        .arg("--cnn_weights").arg(&weights)
        .arg("--out_dir").arg(dir.path())
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(stdout(&output).is_empty());
}
