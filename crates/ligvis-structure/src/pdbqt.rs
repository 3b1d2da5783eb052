//! PDBQT and PDB reading and writing.
//!
//! Only the first model is read. PDBQT torsion trees (ROOT / BRANCH blocks)
//! are kept as rigid atom groups; they are not written back, since removing
//! atoms invalidates the tree.

use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

use crate::atom::Atom;
use crate::element::Element;
use crate::error::{Result, StructureError};
use crate::molecule::Molecule;

/// On-disk structure format, chosen by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum StructureFormat {
    #[default]
    Pdbqt,
    Pdb,
}

impl StructureFormat {
    pub fn from_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .as_deref()
        {
            Some("pdb") | Some("ent") => StructureFormat::Pdb,
            _ => StructureFormat::Pdbqt,
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            StructureFormat::Pdbqt => "pdbqt",
            StructureFormat::Pdb => "pdb",
        }
    }
}

/// Read a molecule from disk, detecting the format from the extension.
pub fn read_molecule(path: &Path) -> Result<Molecule> {
    let contents = fs::read_to_string(path).map_err(|source| StructureError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let name = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("molecule")
        .to_string();
    let molecule = parse_molecule(&contents, &name, StructureFormat::from_path(path))?;
    debug!(
        "Read {} atoms from {:?} ({} torsion groups)",
        molecule.len(),
        path,
        molecule.torsion_groups().map_or(0, |g| g.len())
    );
    Ok(molecule)
}

/// Parse a molecule from an in-memory string.
pub fn parse_molecule(contents: &str, name: &str, format: StructureFormat) -> Result<Molecule> {
    let mut atoms = Vec::new();
    let mut groups: Vec<Vec<usize>> = Vec::new();
    let mut open_groups: Vec<usize> = Vec::new();
    let mut saw_tree = false;

    for (line_no, line) in contents.lines().enumerate() {
        let record = column(line, 0, 6).trim_end();
        if record == "ATOM" || record == "HETATM" {
            let alt_loc = column(line, 16, 17).chars().next().filter(|c| *c != ' ');
            if matches!(alt_loc, Some(c) if c != 'A') {
                continue;
            }
            let atom = parse_atom_line(line, record == "HETATM", format)
                .map_err(|message| parse_error(name, line_no, message))?;
            if let Some(&group) = open_groups.last() {
                groups[group].push(atoms.len());
            }
            atoms.push(atom);
            continue;
        }

        match line.split_whitespace().next().unwrap_or("") {
            "ENDMDL" => break,
            "ROOT" | "BRANCH" => {
                saw_tree = true;
                groups.push(Vec::new());
                open_groups.push(groups.len() - 1);
            }
            keyword @ ("ENDROOT" | "ENDBRANCH") => {
                if open_groups.pop().is_none() {
                    return Err(parse_error(name, line_no, format!("unbalanced {}", keyword)));
                }
            }
            _ => {}
        }
    }

    if atoms.is_empty() {
        return Err(StructureError::Empty(name.to_string()));
    }
    if !open_groups.is_empty() {
        warn!("{}: torsion tree not closed, ignoring it", name);
        saw_tree = false;
    }

    let mut molecule = Molecule::new(name, atoms, format);
    if saw_tree {
        groups.retain(|g| !g.is_empty());
        molecule.set_torsion_groups(groups);
    }
    Ok(molecule)
}

fn parse_error(name: &str, line_no: usize, message: String) -> StructureError {
    StructureError::Parse {
        source_name: name.to_string(),
        line: line_no + 1,
        message,
    }
}

/// Fixed-column slice that tolerates short lines.
fn column(line: &str, start: usize, end: usize) -> &str {
    let len = line.len();
    line.get(start.min(len)..end.min(len)).unwrap_or("")
}

fn parse_coord(line: &str, start: usize, axis: &str) -> std::result::Result<f32, String> {
    let field = column(line, start, start + 8).trim();
    field
        .parse::<f32>()
        .map_err(|_| format!("invalid {} coordinate {:?}", axis, field))
}

fn parse_atom_line(
    line: &str,
    is_hetatm: bool,
    format: StructureFormat,
) -> std::result::Result<Atom, String> {
    let position = Vec3::new(
        parse_coord(line, 30, "x")?,
        parse_coord(line, 38, "y")?,
        parse_coord(line, 46, "z")?,
    );

    let name = column(line, 12, 16).trim().to_string();
    let (autodock_type, partial_charge, element) = match format {
        StructureFormat::Pdbqt => {
            let ad_type = column(line, 77, 79).trim().to_string();
            let charge = column(line, 66, 76).trim().parse().unwrap_or(0.0);
            let element = Element::from_autodock_type(&ad_type)
                .unwrap_or_else(|| Element::from_atom_name(&name));
            let ad_type = (!ad_type.is_empty()).then_some(ad_type);
            (ad_type, charge, element)
        }
        StructureFormat::Pdb => {
            let element = Element::from_symbol(column(line, 76, 78))
                .unwrap_or_else(|| Element::from_atom_name(&name));
            (None, 0.0, element)
        }
    };

    Ok(Atom {
        serial: column(line, 6, 11).trim().parse().unwrap_or(0),
        name,
        residue_name: column(line, 17, 20).trim().to_string(),
        chain_id: column(line, 21, 22).chars().next().unwrap_or(' '),
        residue_seq: column(line, 22, 26).trim().parse().unwrap_or(0),
        insertion_code: column(line, 26, 27).chars().next().filter(|c| *c != ' '),
        position,
        occupancy: column(line, 54, 60).trim().parse().unwrap_or(1.0),
        b_factor: column(line, 60, 66).trim().parse().unwrap_or(0.0),
        partial_charge,
        autodock_type,
        element,
        is_hetatm,
    })
}

/// Format a single ATOM/HETATM record, optionally overriding the B-factor.
pub fn format_atom_line(atom: &Atom, b_factor: Option<f32>, format: StructureFormat) -> String {
    let record = if atom.is_hetatm { "HETATM" } else { "ATOM" };
    let name = if atom.name.len() < 4 && atom.element.symbol_len() == 1 {
        format!(" {:<3}", atom.name)
    } else {
        format!("{:<4}", atom.name)
    };
    let b = b_factor_field(b_factor.unwrap_or(atom.b_factor));

    let mut line = format!(
        "{:<6}{:>5} {} {:>3} {}{:>4}{}   {:>8.3}{:>8.3}{:>8.3}{:>6.2}{:>6}",
        record,
        atom.serial % 100_000,
        name,
        atom.residue_name,
        atom.chain_id,
        atom.residue_seq,
        atom.insertion_code.unwrap_or(' '),
        atom.position.x,
        atom.position.y,
        atom.position.z,
        atom.occupancy,
        b,
    );
    match format {
        StructureFormat::Pdbqt => {
            let ad_type = atom.autodock_type.as_deref().unwrap_or("");
            line.push_str(&format!("    {:>6.3} {:<2}", atom.partial_charge, ad_type));
        }
        StructureFormat::Pdb => {
            line.push_str(&format!("          {:>2}", element_symbol(atom)));
        }
    }
    line
}

/// The B-factor column is six wide; keep as many decimals as fit.
fn b_factor_field(value: f32) -> String {
    let value = if value.is_finite() { value } else { 0.0 };
    let magnitude = value.abs();
    if magnitude < 10.0 {
        format!("{:>6.3}", value)
    } else if magnitude < 100.0 {
        format!("{:>6.2}", value)
    } else {
        format!("{:>6.1}", value.clamp(-999.9, 9999.9))
    }
}

fn element_symbol(atom: &Atom) -> String {
    match atom.element {
        Element::Metal | Element::Other => atom
            .name
            .chars()
            .filter(|c| c.is_ascii_alphabetic())
            .take(2)
            .collect::<String>()
            .to_ascii_uppercase(),
        other => format!("{:?}", other).to_ascii_uppercase(),
    }
}

/// Render a molecule as flat ATOM/HETATM records.
///
/// `b_factors`, when given, must have one value per atom.
pub fn format_molecule(molecule: &Molecule, b_factors: Option<&[f32]>, remarks: &[String]) -> String {
    let mut out = String::new();
    for remark in remarks {
        out.push_str(&format!("REMARK {}\n", remark));
    }
    for (i, atom) in molecule.atoms().iter().enumerate() {
        let b = b_factors.and_then(|b| b.get(i).copied());
        out.push_str(&format_atom_line(atom, b, molecule.format()));
        out.push('\n');
    }
    out.push_str("END\n");
    out
}

/// Write a molecule to disk.
pub fn write_molecule(
    path: &Path,
    molecule: &Molecule,
    b_factors: Option<&[f32]>,
    remarks: &[String],
) -> Result<()> {
    fs::write(path, format_molecule(molecule, b_factors, remarks)).map_err(|source| {
        StructureError::Write {
            path: path.to_path_buf(),
            source,
        }
    })
}
