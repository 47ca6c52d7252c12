use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::core::error::{FitError, Result};
use crate::core::ledger::Ledger;
use crate::core::space::{Candidate, ParameterKind, ParameterSpace};
use crate::solvers::CandidateGenerator;

/// Exploitation-phase generator guided by the observation history.
///
/// Refits on the entire ledger before every proposal: the incumbent best
/// completed trial anchors a local perturbation move, with a small
/// exploration probability of a uniform draw to keep the search from
/// collapsing onto one basin. A Gaussian-process backend can replace this
/// behind the same [`CandidateGenerator`] seam without touching the driver.
pub struct SurrogateSampler {
    rng: ChaCha8Rng,
    /// Probability of a uniform exploration draw instead of exploitation.
    exploration_weight: f64,
    /// Perturbation half-width as a fraction of each parameter's range.
    perturbation: f64,
}

impl SurrogateSampler {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            exploration_weight: 0.1,
            perturbation: 0.1,
        }
    }

    pub fn with_exploration_weight(mut self, weight: f64) -> Self {
        self.exploration_weight = weight;
        self
    }

    pub fn with_perturbation(mut self, fraction: f64) -> Self {
        self.perturbation = fraction;
        self
    }
}

impl CandidateGenerator for SurrogateSampler {
    fn propose(&mut self, space: &ParameterSpace, ledger: &Ledger) -> Result<Candidate> {
        if ledger.completed_count() == 0 {
            return Err(FitError::Surrogate(
                "no completed trials to fit on".into(),
            ));
        }
        let (incumbent, _) = ledger
            .best()
            .map_err(|e| FitError::Surrogate(e.to_string()))?;

        if self.rng.gen::<f64>() < self.exploration_weight {
            return Ok(space.sample_uniform(&mut self.rng));
        }

        let values = space
            .parameters()
            .iter()
            .zip(incumbent.candidate.values())
            .map(|(param, &base)| match &param.kind {
                ParameterKind::Range { lower, upper } => {
                    let half_width = self.perturbation * (upper - lower);
                    let noise = self.rng.gen_range(-half_width..half_width);
                    (base + noise).clamp(*lower, *upper)
                }
                ParameterKind::Choice { values } => {
                    // Occasionally hop to a different admissible value.
                    if self.rng.gen::<f64>() < self.perturbation {
                        values[self.rng.gen_range(0..values.len())]
                    } else {
                        base
                    }
                }
                ParameterKind::Fixed { value } => *value,
            })
            .collect();

        Ok(Candidate::new(values))
    }

    fn name(&self) -> &str {
        "surrogate"
    }
}
