use std::fs;
use std::path::Path;

use nalgebra::Point3;

use crate::core::error::{FitError, Result};
use crate::engine::observables::{AtomRecord, Snapshot};

/// Hartree to electronvolt (CODATA 2018).
pub const HARTREE_TO_EV: f64 = 27.211_386_245_988;

/// Concatenates the stdout of a PES scan split across several files,
/// preserving the given order.
fn concat_files<P: AsRef<Path>>(paths: &[P]) -> Result<String> {
    let mut content = String::new();
    for path in paths {
        content.push_str(&fs::read_to_string(path.as_ref())?);
        content.push('\n');
    }
    Ok(content)
}

/// Reads every converged structure along a PES scan (bond, angle and
/// dihedral scans included). Snapshots from multiple partial output files
/// concatenate in the order given. Each snapshot carries the `Final energy
/// is` value printed since the previous convergence marker, converted to
/// eV, when one was printed.
pub fn read_structure<P: AsRef<Path>>(paths: &[P]) -> Result<Vec<Snapshot>> {
    let content = concat_files(paths)?;
    parse_structures(&content)
}

pub fn parse_structures(content: &str) -> Result<Vec<Snapshot>> {
    let lines: Vec<&str> = content.lines().collect();
    let mut snapshots = Vec::new();
    let mut energy: Option<f64> = None;
    let mut i = 0;

    while i < lines.len() {
        if lines[i].contains("Final energy is") {
            energy = Some(parse_final_energy(lines[i])?);
            i += 1;
        } else if lines[i].contains("OPTIMIZATION CONVERGED") {
            let (mut snapshot, next) = parse_coordinates(&lines, i + 5, None)?;
            snapshot.energy = energy.take();
            snapshots.push(snapshot);
            i = next;
        } else {
            i += 1;
        }
    }

    if snapshots.is_empty() {
        return Err(FitError::Parse(
            "marker 'OPTIMIZATION CONVERGED' not found before end of stream".into(),
        ));
    }
    Ok(snapshots)
}

/// Reads the converged energy of every scan point, converted to eV.
pub fn read_energy<P: AsRef<Path>>(paths: &[P]) -> Result<Vec<f64>> {
    let content = concat_files(paths)?;
    parse_energies(&content)
}

pub fn parse_energies(content: &str) -> Result<Vec<f64>> {
    let mut energies = Vec::new();
    for line in content.lines() {
        if !line.contains("Final energy is") {
            continue;
        }
        energies.push(parse_final_energy(line)?);
    }
    if energies.is_empty() {
        return Err(FitError::Parse(
            "marker 'Final energy is' not found before end of stream".into(),
        ));
    }
    Ok(energies)
}

/// Reads converged structures together with ground-state Mulliken charges.
///
/// The charge table and the coordinate block are separate sections that may
/// appear in either order or not at all. Coordinates seen before any charge
/// table leave `charge` unset on those atoms. The most recent charge table
/// applies to every later snapshot.
pub fn read_atomic_charges<P: AsRef<Path>>(paths: &[P]) -> Result<Vec<Snapshot>> {
    let content = concat_files(paths)?;
    parse_charged_structures(&content)
}

pub fn parse_charged_structures(content: &str) -> Result<Vec<Snapshot>> {
    let lines: Vec<&str> = content.lines().collect();
    let mut snapshots = Vec::new();
    let mut charges: Option<Vec<f64>> = None;
    let mut energy: Option<f64> = None;
    let mut i = 0;

    while i < lines.len() {
        if lines[i].contains("Ground-State Mulliken Net Atomic Charges") {
            let (table, next) = parse_charge_table(&lines, i + 4)?;
            charges = Some(table);
            i = next;
        } else if lines[i].contains("Final energy is") {
            energy = Some(parse_final_energy(lines[i])?);
            i += 1;
        } else if lines[i].contains("OPTIMIZATION CONVERGED") {
            let (mut snapshot, next) = parse_coordinates(&lines, i + 5, charges.as_deref())?;
            snapshot.energy = energy.take();
            snapshots.push(snapshot);
            i = next;
        } else {
            i += 1;
        }
    }

    if snapshots.is_empty() {
        return Err(FitError::Parse(
            "marker 'OPTIMIZATION CONVERGED' not found before end of stream".into(),
        ));
    }
    Ok(snapshots)
}

/// Value of one `Final energy is` line, converted to eV. The caller has
/// already matched the marker.
fn parse_final_energy(line: &str) -> Result<f64> {
    let value = line
        .split_whitespace()
        .last()
        .ok_or_else(|| FitError::Parse("energy line has no value column".into()))?;
    let hartrees: f64 = value
        .parse()
        .map_err(|_| FitError::Parse(format!("bad energy value '{value}'")))?;
    Ok(hartrees * HARTREE_TO_EV)
}

/// Charge rows run from `start` until the first token of a row begins with
/// `-` (the table footer). Charge sits in the third column.
fn parse_charge_table(lines: &[&str], start: usize) -> Result<(Vec<f64>, usize)> {
    let mut charges = Vec::new();
    let mut i = start;
    loop {
        let row = lines
            .get(i)
            .ok_or_else(|| FitError::Parse("charge table truncated".into()))?;
        let tokens: Vec<&str> = row.split_whitespace().collect();
        let Some(&key) = tokens.first() else {
            return Err(FitError::Parse("blank line inside charge table".into()));
        };
        if key.starts_with('-') {
            break;
        }
        let charge: f64 = tokens
            .get(2)
            .and_then(|t| t.parse().ok())
            .ok_or_else(|| FitError::Parse(format!("bad charge row '{row}'")))?;
        charges.push(charge);
        i += 1;
    }
    Ok((charges, i + 1))
}

/// Coordinate rows run from `start` until a blank line. Element sits in the
/// second column, Cartesian coordinates in columns three to five.
fn parse_coordinates(
    lines: &[&str],
    start: usize,
    charges: Option<&[f64]>,
) -> Result<(Snapshot, usize)> {
    let mut snapshot = Snapshot::new();
    let mut i = start;

    while i < lines.len() {
        let row = lines[i].trim();
        if row.is_empty() {
            break;
        }
        let tokens: Vec<&str> = row.split_whitespace().collect();
        if tokens.len() < 5 {
            return Err(FitError::Parse(format!("bad coordinate row '{row}'")));
        }
        let mut coords = [0.0; 3];
        for (k, token) in tokens[2..5].iter().enumerate() {
            coords[k] = token
                .parse()
                .map_err(|_| FitError::Parse(format!("bad coordinate '{token}'")))?;
        }
        let atom_id = snapshot.atoms.len();
        snapshot.atoms.push(AtomRecord {
            element: tokens[1].to_string(),
            position: Point3::new(coords[0], coords[1], coords[2]),
            charge: charges.and_then(|c| c.get(atom_id)).copied(),
        });
        i += 1;
    }

    Ok((snapshot, i))
}
