pub mod evaluator;
pub mod external;
pub mod forcefield;
pub mod observables;
