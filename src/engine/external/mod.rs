pub mod gulp;
pub mod qchem;
