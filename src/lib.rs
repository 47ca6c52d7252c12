pub mod core;
pub mod engine;
pub mod solvers;

pub use crate::core::error::{FitError, Result};
pub use crate::solvers::driver::{optimize, parametrize, ParametrizeSpec};
