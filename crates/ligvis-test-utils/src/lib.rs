//! Shared fixtures and fakes for ligvis tests.
//!
//! - a five-atom ligand with a two-group torsion tree
//! - a three-residue receptor, one residue far outside any sensible box
//! - [`CountingScorer`], a deterministic additive [`PoseScorer`] that counts calls
//! - a tiny CNN model on disk for end-to-end runs

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use candle_core::{DType, Device, Tensor};
use glam::Vec3;
use ligvis_cnn::{CnnError, PerAtom, PoseScorer, RelevanceMap, ScoreGradients, NUM_CHANNELS};
use ligvis_structure::{parse_molecule, Atom, Complex, Element, StructureFormat};

pub use pretty_assertions::{assert_eq, assert_ne};

/// Ligand: C1-C2-O1 rigid root, N1-C3 in one branch off C1.
pub const LIGAND_PDBQT: &str = "\
REMARK  1 active torsions:
REMARK    1  A    between atoms: C1_1  and  N1_4
ROOT
ATOM      1  C1  LIG L   1       0.000   0.000   0.000  1.00  0.00     0.100 C
ATOM      2  C2  LIG L   1       1.520   0.000   0.000  1.00  0.00     0.200 C
ATOM      3  O1  LIG L   1       2.100   1.300   0.000  1.00  0.00    -0.400 OA
ENDROOT
BRANCH   1   4
ATOM      4  N1  LIG L   1      -1.470   0.000   0.000  1.00  0.00    -0.300 NA
ATOM      5  C3  LIG L   1      -2.200   1.200   0.000  1.00  0.00     0.100 C
ENDBRANCH   1   4
TORSDOF 1
";

/// Receptor: SER 10 and GLY 11 near the ligand, LYS 45 about 30 Å away.
pub const RECEPTOR_PDBQT: &str = "\
ATOM      1  N   SER A  10       0.500   4.500   0.500  1.00  0.00    -0.350 N
ATOM      2  CA  SER A  10       1.200   5.200   1.300  1.00  0.00     0.180 C
ATOM      3  OG  SER A  10       0.900   3.600   1.200  1.00  0.00    -0.400 OA
ATOM      4  HG  SER A  10       0.600   2.900   1.700  1.00  0.00     0.210 HD
ATOM      5  N   GLY A  11       3.500  -3.000   0.000  1.00  0.00    -0.350 N
ATOM      6  CA  GLY A  11       4.200  -3.800   0.900  1.00  0.00     0.200 C
ATOM      7  NZ  LYS A  45      30.000   0.000   0.000  1.00  0.00    -0.100 N
ATOM      8  CE  LYS A  45      31.400   0.300   0.200  1.00  0.00     0.200 C
";

/// Edge length that admits only SER 10 around [`fixture_complex`].
pub const SMALL_BOX: f32 = 6.0;

pub fn fixture_complex() -> Complex {
    Complex::new(
        parse_molecule(RECEPTOR_PDBQT, "receptor", StructureFormat::Pdbqt).expect("receptor fixture"),
        parse_molecule(LIGAND_PDBQT, "ligand", StructureFormat::Pdbqt).expect("ligand fixture"),
    )
}

/// Write the fixture structures as `receptor.pdbqt` and `ligand.pdbqt`.
pub fn write_fixture_structures(dir: &Path) -> anyhow::Result<(PathBuf, PathBuf)> {
    let receptor = dir.join("receptor.pdbqt");
    let ligand = dir.join("ligand.pdbqt");
    std::fs::write(&receptor, RECEPTOR_PDBQT)?;
    std::fs::write(&ligand, LIGAND_PDBQT)?;
    Ok((receptor, ligand))
}

/// Model description for [`write_tiny_model`]: 1×1×1 conv, global average, two-class softmax.
pub const TINY_MODEL_JSON: &str = r#"{
    "name": "tiny_pose",
    "resolution": 1.0,
    "dimension": 8.0,
    "output": "softmax",
    "score_class": 1,
    "layers": [
        { "type": "conv", "name": "conv1", "out_channels": 2, "kernel": 1 },
        { "type": "relu" },
        { "type": "pool", "mode": "avg", "size": 9 },
        { "type": "flatten" },
        { "type": "dense", "name": "pose", "out_features": 2 }
    ]
}"#;

/// Write `tiny.json` and `tiny.safetensors` into `dir`.
pub fn write_tiny_model(dir: &Path) -> anyhow::Result<(PathBuf, PathBuf)> {
    let model = dir.join("tiny.json");
    std::fs::write(&model, TINY_MODEL_JSON)?;

    let dev = Device::Cpu;
    // Channel 0 of conv1 sees ligand density, channel 1 receptor density.
    let mut conv = vec![0f32; 2 * NUM_CHANNELS];
    for c in 0..NUM_CHANNELS {
        if c < NUM_CHANNELS / 2 {
            conv[NUM_CHANNELS + c] = 1.0;
        } else {
            conv[c] = 1.0;
        }
    }
    let mut tensors = HashMap::new();
    tensors.insert(
        "conv1.weight".to_string(),
        Tensor::from_vec(conv, (2, NUM_CHANNELS, 1, 1, 1), &dev)?,
    );
    tensors.insert("conv1.bias".to_string(), Tensor::zeros(2, DType::F32, &dev)?);
    tensors.insert(
        "pose.weight".to_string(),
        Tensor::from_vec(vec![-2f32, -1.0, 4.0, 3.0], (2, 2), &dev)?,
    );
    tensors.insert("pose.bias".to_string(), Tensor::new(&[0.1f32, -0.1], &dev)?);

    let weights = dir.join("tiny.safetensors");
    candle_core::safetensors::save(&tensors, &weights)?;
    Ok((model, weights))
}

/// Deterministic additive scorer.
///
/// Every heavy atom contributes `weight(element) / (1 + distance to center)`;
/// hydrogens contribute nothing. Gradients and relevance are exact for that
/// sum, so removal deltas are additive and relevance is conserved.
#[derive(Debug, Default)]
pub struct CountingScorer {
    score_calls: AtomicUsize,
    gradient_calls: AtomicUsize,
    relevance_calls: AtomicUsize,
    fail_after: Option<usize>,
}

impl CountingScorer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every call after the first `calls` succeed.
    pub fn failing_after(mut self, calls: usize) -> Self {
        self.fail_after = Some(calls);
        self
    }

    pub fn score_calls(&self) -> usize {
        self.score_calls.load(Ordering::SeqCst)
    }

    pub fn gradient_calls(&self) -> usize {
        self.gradient_calls.load(Ordering::SeqCst)
    }

    pub fn relevance_calls(&self) -> usize {
        self.relevance_calls.load(Ordering::SeqCst)
    }

    pub fn total_calls(&self) -> usize {
        self.score_calls() + self.gradient_calls() + self.relevance_calls()
    }

    pub fn weight(element: Element) -> f32 {
        match element {
            Element::H => 0.0,
            Element::C => 1.0,
            Element::N => 2.0,
            Element::O => 3.0,
            _ => 0.5,
        }
    }

    pub fn contribution(atom: &Atom, center: Vec3) -> f32 {
        Self::weight(atom.element) / (1.0 + atom.distance_to(center))
    }

    fn record(&self, counter: &AtomicUsize) -> ligvis_cnn::Result<()> {
        let before = self.total_calls();
        counter.fetch_add(1, Ordering::SeqCst);
        match self.fail_after {
            Some(limit) if before >= limit => Err(CnnError::Inference(format!(
                "scorer failure injected at call {}",
                before + 1
            ))),
            _ => Ok(()),
        }
    }

    fn per_atom<T>(complex: &Complex, f: impl Fn(&Atom) -> T) -> PerAtom<T> {
        PerAtom {
            receptor: complex.receptor.atoms().iter().map(&f).collect(),
            ligand: complex.ligand.atoms().iter().map(&f).collect(),
        }
    }
}

impl PoseScorer for CountingScorer {
    fn score(&self, complex: &Complex, center: Vec3) -> ligvis_cnn::Result<f32> {
        self.record(&self.score_calls)?;
        Ok(complex
            .receptor
            .atoms()
            .iter()
            .chain(complex.ligand.atoms())
            .map(|a| Self::contribution(a, center))
            .sum())
    }

    fn gradients(&self, complex: &Complex, center: Vec3) -> ligvis_cnn::Result<ScoreGradients> {
        self.record(&self.gradient_calls)?;
        let atoms = Self::per_atom(complex, |a| {
            let offset = a.position - center;
            let d = offset.length();
            if d == 0.0 {
                return Vec3::ZERO;
            }
            -Self::weight(a.element) / ((1.0 + d) * (1.0 + d)) * offset / d
        });
        let score = atoms_sum(complex, center);
        Ok(ScoreGradients { score, atoms })
    }

    fn relevance(&self, complex: &Complex, center: Vec3) -> ligvis_cnn::Result<RelevanceMap> {
        self.record(&self.relevance_calls)?;
        Ok(RelevanceMap {
            score: atoms_sum(complex, center),
            atoms: Self::per_atom(complex, |a| Self::contribution(a, center)),
            voxels: None,
        })
    }
}

fn atoms_sum(complex: &Complex, center: Vec3) -> f32 {
    complex
        .receptor
        .atoms()
        .iter()
        .chain(complex.ligand.atoms())
        .map(|a| CountingScorer::contribution(a, center))
        .sum()
}
