use crate::core::error::Result;
use crate::core::ledger::Ledger;
use crate::core::space::{Candidate, ParameterSpace};

/// A generic interface for candidate generators.
///
/// The ledger is read-only input: adaptive generators refit on its
/// completed trials before every proposal, exploration generators ignore
/// it. Implementations never mutate run state.
pub trait CandidateGenerator {
    /// Produces the next candidate for `space` given the history so far.
    fn propose(&mut self, space: &ParameterSpace, ledger: &Ledger) -> Result<Candidate>;

    /// Returns the name of the generator (e.g. "quasi-random").
    fn name(&self) -> &str;
}

pub mod driver;
pub mod sobol;
pub mod surrogate;
