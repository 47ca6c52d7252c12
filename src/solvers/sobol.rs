use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::core::error::{FitError, Result};
use crate::core::ledger::Ledger;
use crate::core::space::{Candidate, ParameterSpace};
use crate::solvers::CandidateGenerator;

/// Space-filling exploration sampler for the initialization phase.
///
/// Generates a Halton low-discrepancy sequence (one prime base per
/// dimension) with a seeded Cranley-Patterson rotation, so the same seed
/// always yields the identical candidate stream. Works for any dimension
/// count and never consults the ledger.
pub struct QuasiRandomSampler {
    dims: usize,
    index: u64,
    bases: Vec<u64>,
    shift: Vec<f64>,
}

impl QuasiRandomSampler {
    pub fn new(dims: usize, seed: u64) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let shift = (0..dims).map(|_| rng.gen::<f64>()).collect();
        Self {
            dims,
            index: 0,
            bases: first_primes(dims),
            shift,
        }
    }

    /// Next point on the unit hypercube, one coordinate per dimension.
    pub fn next_unit_point(&mut self) -> Vec<f64> {
        self.index += 1;
        (0..self.dims)
            .map(|d| (radical_inverse(self.index, self.bases[d]) + self.shift[d]).fract())
            .collect()
    }
}

impl CandidateGenerator for QuasiRandomSampler {
    fn propose(&mut self, space: &ParameterSpace, _ledger: &Ledger) -> Result<Candidate> {
        if space.len() != self.dims {
            return Err(FitError::Validation(format!(
                "sampler built for {} dimensions, space has {}",
                self.dims,
                space.len()
            )));
        }
        let point = self.next_unit_point();
        space.candidate_from_unit(&point)
    }

    fn name(&self) -> &str {
        "quasi-random"
    }
}

/// Van der Corput radical inverse of `n` in the given base.
fn radical_inverse(mut n: u64, base: u64) -> f64 {
    let mut inverse = 0.0;
    let mut fraction = 1.0 / base as f64;
    while n > 0 {
        inverse += (n % base) as f64 * fraction;
        n /= base;
        fraction /= base as f64;
    }
    inverse
}

/// The first `count` primes, one Halton base per dimension.
fn first_primes(count: usize) -> Vec<u64> {
    let mut primes = Vec::with_capacity(count);
    let mut n: u64 = 2;
    while primes.len() < count {
        if primes.iter().all(|p| n % p != 0) {
            primes.push(n);
        }
        n += 1;
    }
    primes
}
