//! Rendering results: text on the output stream, scored structures, DX
//! grids and JSON.

use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use ligvis_structure::{write_molecule, Side};

use crate::dx::write_dx;
use crate::error::{Result, VisError};
use crate::result::AttributionResult;
use crate::strategy::{RunContext, Strategy};

/// Write the text report of one result.
///
/// Ligand lines are left out with `skip_ligand_output`; verbose masking
/// output lists the removed atoms under each unit.
pub fn write_text<W: Write>(result: &AttributionResult, ctx: &RunContext<'_>, out: &mut W) -> std::io::Result<()> {
    let config = ctx.config;
    writeln!(out, "{} attribution", result.method)?;
    writeln!(out, "baseline score: {:.6}", result.baseline)?;
    for entry in &result.entries {
        if config.skip_ligand_output && entry.unit.side == Side::Ligand {
            continue;
        }
        writeln!(out, "{:<24} {:>12.6}", entry.unit.id, entry.value)?;
        if config.verbose && result.method == Strategy::Masking {
            let atoms = ctx.complex.molecule(entry.unit.side).atoms();
            let removed: Vec<String> = entry
                .unit
                .atoms
                .iter()
                .map(|&i| format!("{}:{}", atoms[i].name, atoms[i].serial))
                .collect();
            writeln!(out, "    removed: {}", removed.join(" "))?;
        }
    }
    if let Some(report) = &result.additivity {
        writeln!(
            out,
            "additivity ({}): unit sum {:.6}, group delta {:.6}, discrepancy {:.6}",
            report.target, report.unit_sum, report.group_delta, report.discrepancy
        )?;
    }
    Ok(())
}

/// Write the per-result files: scored structures and, for LRP, DX grids.
pub fn write_files(result: &AttributionResult, ctx: &RunContext<'_>) -> Result<Vec<PathBuf>> {
    let config = ctx.config;
    let mut written = Vec::new();

    for side in [Side::Ligand, Side::Receptor] {
        let skipped = match side {
            Side::Ligand => config.skip_ligand_output,
            Side::Receptor => config.skip_receptor_output,
        };
        if skipped {
            continue;
        }
        let molecule = ctx.complex.molecule(side);
        let path = config
            .out_dir
            .join(format!("{}_{}.{}", side, result.method, molecule.format().extension()));
        let remarks = [
            format!("ligvis {} attribution in the B-factor column", result.method),
            format!("baseline score {:.6}", result.baseline),
        ];
        write_molecule(&path, molecule, Some(result.atom_scores.side(side)), &remarks)
            .map_err(VisError::from_write)?;
        written.push(path);
    }

    if let Some(grid) = &result.grid {
        for (side, values) in [(Side::Ligand, &grid.ligand), (Side::Receptor, &grid.receptor)] {
            let path = config.out_dir.join(format!("lrp_{}.dx", side));
            write_dx(&path, &grid.geometry, values, &format!("ligvis LRP relevance, {} channels", side))?;
            written.push(path);
        }
    }

    for path in &written {
        info!("Wrote {}", path.display());
    }
    if !result.failed_writes.is_empty() {
        warn!(
            "{} modified structure files could not be written",
            result.failed_writes.len()
        );
    }
    Ok(written)
}

/// Write every result of the run as a JSON array.
pub fn write_json(path: &Path, results: &[AttributionResult]) -> Result<()> {
    let json = serde_json::to_string_pretty(results).map_err(|e| VisError::io(path, e.into()))?;
    std::fs::write(path, json).map_err(|e| VisError::io(path, e))?;
    info!("Wrote {}", path.display());
    Ok(())
}
