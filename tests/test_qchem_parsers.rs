use forcefit::core::error::FitError;
use forcefit::engine::external::qchem::{
    parse_charged_structures, parse_energies, parse_structures, read_atomic_charges, read_energy,
    HARTREE_TO_EV,
};

fn convergence_block(atoms: &[(&str, f64, f64, f64)]) -> String {
    let mut s = String::from("         **  OPTIMIZATION CONVERGED  **\n");
    s.push('\n');
    s.push_str("                           Coordinates (Angstroms)\n");
    s.push_str("             ATOM                X               Y               Z\n");
    s.push('\n');
    for (n, (element, x, y, z)) in atoms.iter().enumerate() {
        s.push_str(&format!(
            "    {}  {:<2}   {:14.10}  {:14.10}  {:14.10}\n",
            n + 1,
            element,
            x,
            y,
            z
        ));
    }
    s.push('\n');
    s
}

fn charge_block(charges: &[(&str, f64)]) -> String {
    let mut s = String::from("          Ground-State Mulliken Net Atomic Charges\n");
    s.push('\n');
    s.push_str("     Atom                 Charge (a.u.)\n");
    s.push_str("  ----------------------------------------\n");
    for (n, (element, charge)) in charges.iter().enumerate() {
        s.push_str(&format!("      {} {}            {:9.6}\n", n + 1, element, charge));
    }
    s.push_str("  ----------------------------------------\n");
    s
}

#[test]
fn structures_read_every_converged_snapshot() {
    let mut content = convergence_block(&[("O", 0.0, 0.0, 0.1173), ("H", 0.0, 0.7572, -0.4692)]);
    content.push_str("scan point 2\n");
    content.push_str(&convergence_block(&[
        ("O", 0.0, 0.0, 0.1180),
        ("H", 0.0, 0.7569, -0.4700),
    ]));

    let snapshots = parse_structures(&content).unwrap();
    assert_eq!(snapshots.len(), 2);
    assert_eq!(snapshots[0].atoms.len(), 2);
    assert_eq!(snapshots[0].atoms[0].element, "O");
    assert_eq!(snapshots[0].atoms[1].element, "H");
    assert_eq!(snapshots[0].atoms[1].position.y, 0.7572);
    assert_eq!(snapshots[1].atoms[0].position.z, 0.1180);
    // No charge section anywhere, so no atom carries a charge.
    assert!(snapshots
        .iter()
        .all(|s| s.atoms.iter().all(|a| a.charge.is_none())));
}

#[test]
fn snapshots_carry_their_own_converged_energy() {
    let mut content = String::from(" Final energy is   -76.4259022707\n");
    content.push_str(&convergence_block(&[("O", 0.0, 0.0, 0.0)]));
    content.push_str(" Final energy is   -76.4259104913\n");
    content.push_str(&convergence_block(&[("O", 0.0, 0.0, 0.1)]));
    // Third scan point converged without printing an energy line.
    content.push_str(&convergence_block(&[("O", 0.0, 0.0, 0.2)]));

    let snapshots = parse_structures(&content).unwrap();
    assert_eq!(snapshots.len(), 3);
    let first = snapshots[0].energy.unwrap();
    assert!((first - (-76.4259022707 * HARTREE_TO_EV)).abs() < 1e-9);
    let second = snapshots[1].energy.unwrap();
    assert!((second - (-76.4259104913 * HARTREE_TO_EV)).abs() < 1e-9);
    assert_eq!(snapshots[2].energy, None);
}

#[test]
fn structures_without_the_marker_are_a_parse_error() {
    assert!(matches!(
        parse_structures("no converged geometry in here\n"),
        Err(FitError::Parse(_))
    ));
}

#[test]
fn energies_convert_hartrees_to_electronvolts() {
    let content = "\
 Final energy is   -76.4259022707\n\
 intermediate chatter\n\
 Final energy is   -76.4259104913\n";
    let energies = parse_energies(content).unwrap();
    assert_eq!(energies.len(), 2);
    assert!((energies[0] - (-76.4259022707 * HARTREE_TO_EV)).abs() < 1e-9);
    assert!((energies[1] - (-76.4259104913 * HARTREE_TO_EV)).abs() < 1e-9);
}

#[test]
fn energies_without_the_marker_are_a_parse_error() {
    assert!(matches!(
        parse_energies("SCF chatter only\n"),
        Err(FitError::Parse(_))
    ));
}

#[test]
fn charges_attach_to_later_snapshots() {
    let mut content = charge_block(&[("O", -0.712), ("H", 0.356), ("H", 0.356)]);
    content.push_str(&convergence_block(&[
        ("O", 0.0, 0.0, 0.1173),
        ("H", 0.0, 0.7572, -0.4692),
        ("H", 0.0, -0.7572, -0.4692),
    ]));

    let snapshots = parse_charged_structures(&content).unwrap();
    assert_eq!(snapshots.len(), 1);
    assert_eq!(snapshots[0].atoms[0].charge, Some(-0.712));
    assert_eq!(snapshots[0].atoms[1].charge, Some(0.356));
    assert_eq!(snapshots[0].atoms[2].charge, Some(0.356));
}

#[test]
fn coordinates_before_any_charge_table_stay_unchanged() {
    // First snapshot precedes the charge table; it keeps charge = None.
    let mut content = convergence_block(&[("O", 0.0, 0.0, 0.0)]);
    content.push_str(&charge_block(&[("O", -0.5)]));
    content.push_str(&convergence_block(&[("O", 0.0, 0.0, 0.2)]));

    let snapshots = parse_charged_structures(&content).unwrap();
    assert_eq!(snapshots.len(), 2);
    assert_eq!(snapshots[0].atoms[0].charge, None);
    assert_eq!(snapshots[1].atoms[0].charge, Some(-0.5));
}

#[test]
fn latest_charge_table_applies_to_every_later_snapshot() {
    let mut content = charge_block(&[("H", 0.1)]);
    content.push_str(&convergence_block(&[("H", 0.0, 0.0, 0.0)]));
    content.push_str(&charge_block(&[("H", 0.2)]));
    content.push_str(&convergence_block(&[("H", 0.0, 0.0, 0.5)]));
    content.push_str(&convergence_block(&[("H", 0.0, 0.0, 1.0)]));

    let snapshots = parse_charged_structures(&content).unwrap();
    assert_eq!(snapshots.len(), 3);
    assert_eq!(snapshots[0].atoms[0].charge, Some(0.1));
    assert_eq!(snapshots[1].atoms[0].charge, Some(0.2));
    assert_eq!(snapshots[2].atoms[0].charge, Some(0.2));
}

#[test]
fn split_output_files_concatenate_in_order() {
    let dir = std::env::temp_dir();
    let first = dir.join(format!("forcefit_qchem_a_{}.out", std::process::id()));
    let second = dir.join(format!("forcefit_qchem_b_{}.out", std::process::id()));

    // Charge table lands in the first file, coordinates in the second.
    let mut part_one = charge_block(&[("N", -0.9)]);
    part_one.push_str(" Final energy is   -54.5\n");
    std::fs::write(&first, part_one).unwrap();
    std::fs::write(&second, convergence_block(&[("N", 0.0, 0.0, 0.0)])).unwrap();

    let snapshots = read_atomic_charges(&[&first, &second]).unwrap();
    let energies = read_energy(&[&first, &second]).unwrap();

    let _ = std::fs::remove_file(&first);
    let _ = std::fs::remove_file(&second);

    assert_eq!(snapshots.len(), 1);
    assert_eq!(snapshots[0].atoms[0].charge, Some(-0.9));
    // The energy from the first file attaches to the snapshot in the second.
    let energy = snapshots[0].energy.unwrap();
    assert!((energy - (-54.5 * HARTREE_TO_EV)).abs() < 1e-9);
    assert_eq!(energies.len(), 1);
    assert!((energies[0] - (-54.5 * HARTREE_TO_EV)).abs() < 1e-9);
}
