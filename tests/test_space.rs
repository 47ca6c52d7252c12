use forcefit::core::error::FitError;
use forcefit::core::space::{Candidate, ParameterSpace};

use rand::rngs::StdRng;
use rand::SeedableRng;

#[test]
fn inverted_bounds_are_rejected() {
    let result = ParameterSpace::from_bounds([("x", (1.0, 0.0))]);
    assert!(matches!(result, Err(FitError::Validation(_))));
}

#[test]
fn duplicate_names_are_rejected() {
    let space = ParameterSpace::new()
        .add_range("x", 0.0, 1.0)
        .add_range("x", 2.0, 3.0);
    assert!(matches!(space.validate(), Err(FitError::Validation(_))));
}

#[test]
fn empty_space_is_rejected() {
    assert!(ParameterSpace::new().validate().is_err());
}

#[test]
fn from_bounds_preserves_order() {
    let space =
        ParameterSpace::from_bounds([("x1", (0.0, 1.0)), ("x2", (5.0, 11.0)), ("x3", (0.0, 10.0))])
            .unwrap();
    let names: Vec<&str> = space.names().collect();
    assert_eq!(names, vec!["x1", "x2", "x3"]);
}

#[test]
fn uniform_samples_respect_bounds_and_kinds() {
    let space = ParameterSpace::new()
        .add_range("a", -2.0, 2.0)
        .add_choice("b", vec![0.1, 0.5, 0.9])
        .add_fixed("c", 7.0);
    space.validate().unwrap();

    let mut rng = StdRng::seed_from_u64(7);
    for _ in 0..100 {
        let candidate = space.sample_uniform(&mut rng);
        space.check_candidate(&candidate).unwrap();
        let a = candidate.value(&space, "a").unwrap();
        assert!((-2.0..=2.0).contains(&a));
        let b = candidate.value(&space, "b").unwrap();
        assert!([0.1, 0.5, 0.9].contains(&b));
        assert_eq!(candidate.value(&space, "c"), Some(7.0));
    }
}

#[test]
fn unit_cube_mapping_hits_range_ends() {
    let space = ParameterSpace::new()
        .add_range("a", 0.0, 10.0)
        .add_choice("b", vec![1.0, 2.0])
        .add_fixed("c", -3.0);

    let low = space.candidate_from_unit(&[0.0, 0.0, 0.0]).unwrap();
    assert_eq!(low.values(), &[0.0, 1.0, -3.0]);

    let high = space.candidate_from_unit(&[0.999, 0.999, 0.999]).unwrap();
    assert!((high.values()[0] - 9.99).abs() < 1e-9);
    assert_eq!(high.values()[1], 2.0);
    assert_eq!(high.values()[2], -3.0);
}

#[test]
fn candidate_with_wrong_arity_is_rejected() {
    let space = ParameterSpace::new().add_range("a", 0.0, 1.0);
    let candidate = Candidate::new(vec![0.5, 0.5]);
    assert!(space.check_candidate(&candidate).is_err());
    assert!(space.candidate_from_unit(&[0.5, 0.5]).is_err());
}
