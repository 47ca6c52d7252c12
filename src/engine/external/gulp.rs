use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use nalgebra::Matrix6;

use crate::core::error::{FitError, Result};
use crate::engine::observables::{FrequencyUnit, LatticeGeometry, PhononBands, Structure};

/// Number of q-points written per band into a dispersion output file.
pub const QPOINTS_PER_BAND: usize = 100;

/// Relaxation and property options for one GULP run.
#[derive(Debug, Clone, Default)]
pub struct GulpOptions {
    pub relax_atoms: bool,
    pub relax_cell: bool,
    /// Dispersion path endpoints in reciprocal space, e.g. ("0 0 0", "0.5 0.5 0.5").
    pub phonon_dispersion: Option<(String, String)>,
}

/// A single GULP job. Streams input/output via pipes; only the dispersion
/// output (when requested) touches disk.
pub struct GulpJob {
    executable: String,
    outfile: String,
    forcefield: String,
    structure: Structure,
    options: GulpOptions,
    timeout: Option<Duration>,
}

impl GulpJob {
    pub fn new(executable: &str, forcefield: &str, structure: Structure) -> Self {
        Self {
            executable: executable.to_string(),
            outfile: "out.gulp".to_string(),
            forcefield: forcefield.to_string(),
            structure,
            options: GulpOptions::default(),
            timeout: None,
        }
    }

    pub fn with_options(mut self, options: GulpOptions) -> Self {
        self.options = options;
        self
    }

    /// Bounds the simulator invocation; on expiry the process is killed and
    /// the run fails as an evaluation failure.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_outfile(mut self, outfile: &str) -> Self {
        self.outfile = outfile.to_string();
        self
    }

    /// Path of the dispersion side file GULP writes when a phonon path is
    /// requested.
    pub fn dispersion_file(&self) -> PathBuf {
        PathBuf::from(format!("{}.disp", self.outfile))
    }

    /// Constructs the GULP input deck. A periodic structure whose lattice
    /// matrix is not invertible cannot be written fractionally and is
    /// rejected.
    pub fn input_script(&self) -> Result<String> {
        let mut s = String::with_capacity(1024);

        // 1. Header keywords
        let mut header = String::new();
        if self.options.relax_atoms {
            header.push_str("optimise ");
            if self.options.relax_cell {
                header.push_str("conp ");
            } else {
                header.push_str("conv ");
            }
        }
        if self.options.phonon_dispersion.is_some() {
            header.push_str("phonon nofrequency ");
        }
        if header.is_empty() {
            header.push_str("single ");
        }
        header.push_str("comp");
        s.push_str(&header);
        s.push_str("\n\n");

        // 2. Lattice vectors (if periodic), then coordinates
        if let Some(lattice) = &self.structure.lattice {
            s.push_str("vectors\n");
            for col in 0..3 {
                s.push_str(&format!(
                    "{:.9} {:.9} {:.9}\n",
                    lattice[(0, col)],
                    lattice[(1, col)],
                    lattice[(2, col)]
                ));
            }
            s.push_str("fractional\n");
            for atom in &self.structure.atoms {
                let frac = self.structure.to_fractional(&atom.position).ok_or_else(|| {
                    FitError::Validation("lattice matrix is not invertible".into())
                })?;
                s.push_str(&format!(
                    "{:<3} core {:.9} {:.9} {:.9}\n",
                    atom.element, frac.x, frac.y, frac.z
                ));
            }
        } else {
            s.push_str("cartesian\n");
            for atom in &self.structure.atoms {
                let p = atom.position;
                s.push_str(&format!(
                    "{:<3} core {:.9} {:.9} {:.9}\n",
                    atom.element, p.x, p.y, p.z
                ));
            }
        }

        // 3. Force field block
        s.push('\n');
        s.push_str(&self.forcefield);
        s.push('\n');

        // 4. Dispersion request
        if let Some((from, to)) = &self.options.phonon_dispersion {
            s.push_str(&format!("dispersion 1 {}\n", QPOINTS_PER_BAND));
            s.push_str(&format!("{} to {}\n", from, to));
            s.push_str(&format!("output phonon {}\n", self.outfile));
        }

        Ok(s)
    }

    /// Executes GULP via stdin/stdout piping and returns its stdout.
    pub fn run(&self) -> Result<String> {
        let input = self.input_script()?;

        let mut child = Command::new(&self.executable)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| FitError::Evaluation(format!("failed to spawn GULP: {e}")))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(input.as_bytes())
                .map_err(|e| FitError::Evaluation(format!("failed to write GULP stdin: {e}")))?;
        }

        // Drain both pipes on helper threads so a chatty run cannot
        // deadlock against a full pipe while we wait for exit.
        let mut stdout_pipe = child
            .stdout
            .take()
            .ok_or_else(|| FitError::Evaluation("GULP stdout not captured".into()))?;
        let reader = thread::spawn(move || {
            let mut buf = String::new();
            stdout_pipe.read_to_string(&mut buf).map(|_| buf)
        });
        let mut stderr_pipe = child
            .stderr
            .take()
            .ok_or_else(|| FitError::Evaluation("GULP stderr not captured".into()))?;
        let err_reader = thread::spawn(move || {
            let mut buf = String::new();
            let _ = stderr_pipe.read_to_string(&mut buf);
            buf
        });

        let status = match self.timeout {
            None => child
                .wait()
                .map_err(|e| FitError::Evaluation(format!("failed to wait on GULP: {e}")))?,
            Some(limit) => {
                let deadline = Instant::now() + limit;
                loop {
                    match child.try_wait() {
                        Ok(Some(status)) => break status,
                        Ok(None) if Instant::now() >= deadline => {
                            let _ = child.kill();
                            let _ = child.wait();
                            return Err(FitError::Evaluation(format!(
                                "GULP timed out after {:.1}s",
                                limit.as_secs_f64()
                            )));
                        }
                        Ok(None) => thread::sleep(Duration::from_millis(20)),
                        Err(e) => {
                            return Err(FitError::Evaluation(format!(
                                "failed to poll GULP: {e}"
                            )))
                        }
                    }
                }
            }
        };

        let stdout = reader
            .join()
            .map_err(|_| FitError::Evaluation("GULP reader thread panicked".into()))?
            .map_err(|e| FitError::Evaluation(format!("failed to read GULP output: {e}")))?;
        let stderr = err_reader.join().unwrap_or_default();

        if !status.success() {
            let detail = stderr.trim();
            return Err(FitError::Evaluation(if detail.is_empty() {
                format!("GULP exited with status {status}")
            } else {
                format!("GULP exited with status {status}: {detail}")
            }));
        }

        check_errors(&stdout)?;
        Ok(stdout)
    }

    /// Removes dispersion/density side files from a phonon run.
    pub fn cleanup(&self) {
        for suffix in [".disp", ".dens"] {
            let path = PathBuf::from(format!("{}{}", self.outfile, suffix));
            if path.is_file() {
                let _ = fs::remove_file(path);
            }
        }
    }
}

/// Scans stdout for GULP's known failure banners.
pub fn check_errors(output: &str) -> Result<()> {
    if output.contains("Conditions for a minimum have not been satisfied") {
        return Err(FitError::Evaluation("GULP: convergence failure".into()));
    }
    if output.contains("Interatomic distance too small") {
        return Err(FitError::Evaluation("GULP: geometric collapse".into()));
    }
    if output.contains("Dump of error info") {
        return Err(FitError::Evaluation("GULP: internal error".into()));
    }
    Ok(())
}

/// Extracts the total lattice energy in eV.
///
/// GULP prints the energy once per unit; only the line whose final token is
/// exactly `eV` is read. A matched marker with any other unit suffix
/// records no value and returns `Ok(None)`, not an error. When the marker
/// repeats, the last eV line wins. A stream with no marker at all is a
/// parse failure.
pub fn read_energy(output: &str) -> Result<Option<f64>> {
    let mut energy = None;
    let mut saw_marker = false;

    for line in output.lines() {
        if !line.contains("Total lattice energy") {
            continue;
        }
        saw_marker = true;
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.last() != Some(&"eV") {
            continue;
        }
        let value = tokens
            .get(tokens.len() - 2)
            .ok_or_else(|| FitError::Parse("energy line has no value column".into()))?;
        let parsed: f64 = value
            .parse()
            .map_err(|_| FitError::Parse(format!("bad energy value '{value}'")))?;
        energy = Some(parsed);
    }

    if !saw_marker {
        return Err(FitError::Parse(
            "marker 'Total lattice energy' not found before end of stream".into(),
        ));
    }
    Ok(energy)
}

pub fn read_energy_from_path(path: impl AsRef<Path>) -> Result<Option<f64>> {
    let content = fs::read_to_string(path.as_ref())?;
    read_energy(&content)
}

/// Extracts the 6x6 elastic constant matrix in GULP's native units.
pub fn read_elastic_moduli(output: &str) -> Result<Matrix6<f64>> {
    let lines: Vec<&str> = output.lines().collect();

    for (i, line) in lines.iter().enumerate() {
        if !line.contains("Elastic Constant Matrix") {
            continue;
        }
        // Four header lines separate the marker from the first data row.
        let start = i + 5;
        let mut moduli = Matrix6::zeros();
        for row in 0..6 {
            let data = lines.get(start + row).ok_or_else(|| {
                FitError::Parse(format!("elastic matrix truncated at row {row}"))
            })?;
            let tokens: Vec<&str> = data.split_whitespace().collect();
            if tokens.len() < 7 {
                return Err(FitError::Parse(format!(
                    "elastic matrix row {row} has {} columns, expected 7",
                    tokens.len()
                )));
            }
            for col in 0..6 {
                moduli[(row, col)] = tokens[col + 1].parse().map_err(|_| {
                    FitError::Parse(format!(
                        "bad elastic modulus '{}' at ({row}, {col})",
                        tokens[col + 1]
                    ))
                })?;
            }
        }
        return Ok(moduli);
    }

    Err(FitError::Parse(
        "marker 'Elastic Constant Matrix' not found before end of stream".into(),
    ))
}

pub fn read_elastic_moduli_from_path(path: impl AsRef<Path>) -> Result<Matrix6<f64>> {
    let content = fs::read_to_string(path.as_ref())?;
    read_elastic_moduli(&content)
}

/// Extracts relaxed cell lengths and angles with their error columns.
///
/// Reading stops at the first row whose leading token begins with `-`
/// (the section footer); nothing past it is consumed. Rows keyed by other
/// tokens (e.g. the volume line) are skipped.
pub fn read_lattice_constants(output: &str) -> Result<LatticeGeometry> {
    let lines: Vec<&str> = output.lines().collect();

    for (i, line) in lines.iter().enumerate() {
        if !line.contains("Comparison of initial and final") {
            continue;
        }
        let mut geometry = LatticeGeometry::default();
        let mut cursor = i + 5;
        loop {
            let data = lines.get(cursor).ok_or_else(|| {
                FitError::Parse("lattice comparison table truncated".into())
            })?;
            let tokens: Vec<&str> = data.split_whitespace().collect();
            let Some(&key) = tokens.first() else {
                return Err(FitError::Parse(
                    "blank line inside lattice comparison table".into(),
                ));
            };
            if key.starts_with('-') {
                break;
            }
            let slot = match key {
                "a" => Some((0, true)),
                "b" => Some((1, true)),
                "c" => Some((2, true)),
                "alpha" => Some((0, false)),
                "beta" => Some((1, false)),
                "gamma" => Some((2, false)),
                _ => None,
            };
            if let Some((idx, is_length)) = slot {
                let value: f64 = tokens
                    .get(2)
                    .and_then(|t| t.parse().ok())
                    .ok_or_else(|| {
                        FitError::Parse(format!("bad value column in '{key}' row"))
                    })?;
                let err: f64 = tokens
                    .last()
                    .and_then(|t| t.parse().ok())
                    .ok_or_else(|| {
                        FitError::Parse(format!("bad error column in '{key}' row"))
                    })?;
                if is_length {
                    geometry.abc[idx] = value;
                    geometry.abc_err[idx] = err;
                } else {
                    geometry.angles[idx] = value;
                    geometry.angles_err[idx] = err;
                }
            }
            cursor += 1;
        }
        return Ok(geometry);
    }

    Err(FitError::Parse(
        "marker 'Comparison of initial and final' not found before end of stream".into(),
    ))
}

pub fn read_lattice_constants_from_path(path: impl AsRef<Path>) -> Result<LatticeGeometry> {
    let content = fs::read_to_string(path.as_ref())?;
    read_lattice_constants(&content)
}

/// Parses a dispersion output: `#`-prefixed lines are comments, every data
/// line is a `(q, frequency)` pair, grouped by q-point with
/// `QPOINTS_PER_BAND` points per band. Frequencies are scaled into `unit`.
pub fn read_phonon_dispersion(content: &str, unit: FrequencyUnit) -> Result<PhononBands> {
    let mut samples = Vec::new();

    for line in content.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let mut tokens = trimmed.split_whitespace();
        let _q = tokens
            .next()
            .ok_or_else(|| FitError::Parse("empty dispersion line".into()))?;
        let freq: f64 = tokens
            .next()
            .and_then(|t| t.parse().ok())
            .ok_or_else(|| {
                FitError::Parse(format!("bad dispersion line '{trimmed}'"))
            })?;
        samples.push(freq);
    }

    if samples.is_empty() {
        return Err(FitError::Parse("dispersion stream holds no samples".into()));
    }
    if samples.len() % QPOINTS_PER_BAND != 0 {
        return Err(FitError::Parse(format!(
            "{} dispersion samples not divisible by {} q-points",
            samples.len(),
            QPOINTS_PER_BAND
        )));
    }

    let num_bands = samples.len() / QPOINTS_PER_BAND;
    let factor = unit.factor();
    // The file is grouped by q-point: the first `num_bands` samples are the
    // band frequencies at q = 0, and so on.
    let frequencies = nalgebra::DMatrix::from_fn(num_bands, QPOINTS_PER_BAND, |band, q| {
        samples[q * num_bands + band] * factor
    });

    Ok(PhononBands { frequencies, unit })
}

pub fn read_phonon_dispersion_from_path(
    path: impl AsRef<Path>,
    unit: FrequencyUnit,
) -> Result<PhononBands> {
    let content = fs::read_to_string(path.as_ref())?;
    read_phonon_dispersion(&content, unit)
}
