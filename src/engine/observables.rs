use nalgebra::{DMatrix, Matrix3, Point3};
use serde::{Deserialize, Serialize};

/// Frequency units understood by the phonon extractor. Factors are the
/// source program's fixed multipliers from its native THz output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FrequencyUnit {
    Wavenumber,
    TeraHertz,
    ElectronVolt,
    MilliElectronVolt,
}

impl FrequencyUnit {
    pub fn factor(&self) -> f64 {
        match self {
            FrequencyUnit::Wavenumber => 0.029_979_245_368_431_4,
            FrequencyUnit::TeraHertz => 1.0,
            FrequencyUnit::ElectronVolt => 241.798_93,
            FrequencyUnit::MilliElectronVolt => 0.241_80,
        }
    }
}

/// Relaxed cell dimensions with the per-field error column reported by the
/// optimiser: three lengths (Å) and three angles (degrees).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatticeGeometry {
    pub abc: [f64; 3],
    pub angles: [f64; 3],
    pub abc_err: [f64; 3],
    pub angles_err: [f64; 3],
}

impl Default for LatticeGeometry {
    fn default() -> Self {
        Self {
            abc: [0.0; 3],
            angles: [0.0; 3],
            abc_err: [0.0; 3],
            angles_err: [0.0; 3],
        }
    }
}

/// Dispersion frequencies as a (bands x q-points) matrix, already scaled
/// into `unit`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhononBands {
    pub frequencies: DMatrix<f64>,
    pub unit: FrequencyUnit,
}

impl PhononBands {
    pub fn num_bands(&self) -> usize {
        self.frequencies.nrows()
    }

    pub fn num_qpoints(&self) -> usize {
        self.frequencies.ncols()
    }
}

/// One atom as read back from simulator output. Charge stays `None` when
/// the output carried no charge section for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AtomRecord {
    pub element: String,
    pub position: Point3<f64>,
    pub charge: Option<f64>,
}

/// One converged structure along a PES scan, with its energy when the
/// extractor recorded one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub atoms: Vec<AtomRecord>,
    pub energy: Option<f64>,
}

impl Snapshot {
    pub fn new() -> Self {
        Self {
            atoms: Vec::new(),
            energy: None,
        }
    }
}

impl Default for Snapshot {
    fn default() -> Self {
        Self::new()
    }
}

/// An input structure for a simulation job: atoms plus an optional lattice
/// (columns are the a, b, c vectors). No lattice means a finite cluster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Structure {
    pub atoms: Vec<AtomRecord>,
    pub lattice: Option<Matrix3<f64>>,
}

impl Structure {
    pub fn new(atoms: Vec<AtomRecord>) -> Self {
        Self {
            atoms,
            lattice: None,
        }
    }

    pub fn with_lattice(mut self, lattice: Matrix3<f64>) -> Self {
        self.lattice = Some(lattice);
        self
    }

    /// Fractional coordinates of `position`, if the lattice is invertible.
    pub fn to_fractional(&self, position: &Point3<f64>) -> Option<Point3<f64>> {
        let lattice = self.lattice.as_ref()?;
        let inverse = lattice.try_inverse()?;
        Some(Point3::from(inverse * position.coords))
    }
}
