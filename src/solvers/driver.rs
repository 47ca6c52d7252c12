use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::core::error::{FitError, Result};
use crate::core::ledger::{Direction, Ledger};
use crate::core::space::{Candidate, ParameterSpace};
use crate::engine::evaluator::{ErrorFunction, EvaluationContext, LossEvaluator, SumLoss};
use crate::engine::forcefield::{read_forcefield_template, read_variable_bounds};
use crate::solvers::sobol::QuasiRandomSampler;
use crate::solvers::surrogate::SurrogateSampler;
use crate::solvers::CandidateGenerator;

/// Metric name under which every trial's loss is recorded.
pub const OBJECTIVE_METRIC: &str = "loss";

/// Configuration for one calibration run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriverConfig {
    /// Exploration-phase trial count (quasi-random initialization).
    pub num_sobol_trials: usize,
    /// Exploitation-phase trial count (surrogate-guided).
    pub num_botorch_trials: usize,
    /// Seed for both samplers; same seed, same exploration sequence.
    pub seed: u64,
    pub direction: Direction,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            num_sobol_trials: 5,
            num_botorch_trials: 15,
            seed: 1,
            direction: Direction::Minimize,
        }
    }
}

/// The closed calibration loop: two strictly ordered phases, one trial at
/// a time, everything recorded in an owned [`Ledger`].
///
/// Phase A draws `num_sobol_trials` space-filling candidates; phase B draws
/// `num_botorch_trials` candidates, each proposed only after the full
/// ledger so far has been consulted. Evaluation failures mark their trial
/// failed and the loop continues; generator failures abort the run.
pub struct OptimizationDriver {
    space: ParameterSpace,
    config: DriverConfig,
}

impl OptimizationDriver {
    /// Validates the space before any trial exists.
    pub fn new(space: ParameterSpace, config: DriverConfig) -> Result<Self> {
        space.validate()?;
        Ok(Self { space, config })
    }

    pub fn space(&self) -> &ParameterSpace {
        &self.space
    }

    /// Runs both phases with the default samplers and returns the ledger.
    pub fn run(&self, evaluator: &dyn LossEvaluator) -> Result<Ledger> {
        let mut explorer = QuasiRandomSampler::new(self.space.len(), self.config.seed);
        let mut exploiter = SurrogateSampler::new(self.config.seed);
        self.run_with(evaluator, &mut explorer, &mut exploiter)
    }

    /// Runs both phases with caller-supplied generators. Any generator
    /// backend works behind the [`CandidateGenerator`] seam.
    pub fn run_with(
        &self,
        evaluator: &dyn LossEvaluator,
        explorer: &mut dyn CandidateGenerator,
        exploiter: &mut dyn CandidateGenerator,
    ) -> Result<Ledger> {
        let mut ledger = Ledger::new(OBJECTIVE_METRIC, self.config.direction);
        let total = self.config.num_sobol_trials + self.config.num_botorch_trials;

        log::info!(
            "calibration run: {} exploration + {} exploitation trials ({})",
            self.config.num_sobol_trials,
            self.config.num_botorch_trials,
            evaluator.name()
        );

        for _ in 0..self.config.num_sobol_trials {
            let candidate = explorer.propose(&self.space, &ledger)?;
            self.run_trial(&mut ledger, evaluator, candidate);
        }

        for _ in 0..self.config.num_botorch_trials {
            // The exploiter reads the whole ledger before every proposal;
            // a proposal failure here is fatal to the run.
            let candidate = exploiter.propose(&self.space, &ledger)?;
            let index = self.run_trial(&mut ledger, evaluator, candidate);
            log::debug!("exploitation trial {}/{} done", index + 1, total);
        }

        log::info!(
            "run finished: {} completed, {} failed",
            ledger.completed_count(),
            ledger.failed_count()
        );
        Ok(ledger)
    }

    /// Evaluates one candidate at trial granularity. Failures are recorded
    /// on the trial and never abort the run.
    fn run_trial(
        &self,
        ledger: &mut Ledger,
        evaluator: &dyn LossEvaluator,
        candidate: Candidate,
    ) -> usize {
        let index = ledger.new_trial(candidate.clone());
        ledger.mark_running(index);
        match evaluator.evaluate(&candidate, &self.space) {
            Ok(loss) => {
                ledger.complete(index, loss);
            }
            Err(e) => {
                log::warn!("trial {index} failed: {e}");
                ledger.fail(index, e.to_string());
            }
        }
        index
    }
}

/// Objective-discovery entry point: calibrates over plain `(lower, upper)`
/// bounds with the placeholder sum loss and returns the best observed loss.
pub fn optimize<'a, I>(bounds: I, num_sobol_trials: usize, num_botorch_trials: usize) -> Result<f64>
where
    I: IntoIterator<Item = (&'a str, (f64, f64))>,
{
    let space = ParameterSpace::from_bounds(bounds)?;
    let config = DriverConfig {
        num_sobol_trials,
        num_botorch_trials,
        ..Default::default()
    };
    let driver = OptimizationDriver::new(space, config)?;
    let ledger = driver.run(&SumLoss)?;
    let (_, best_loss) = ledger.best()?;
    Ok(best_loss)
}

/// Inputs for a full force-field parametrization run.
pub struct ParametrizeSpec {
    /// Number of error components the error function folds together.
    /// The sequential driver is single-objective.
    pub num_errors: usize,
    pub error_function: ErrorFunction,
    pub template_file: PathBuf,
    pub variable_bounds_file: PathBuf,
    /// Fan-out hint for the caller's error function; the trial loop itself
    /// stays strictly sequential.
    pub n_jobs: usize,
    pub num_sobol_trials: usize,
    pub num_botorch_trials: usize,
    pub seed: u64,
}

/// Parametrization entry point: reads the template and variable bounds,
/// runs both phases against the caller's error function, and returns the
/// best parameter assignment by name.
pub fn parametrize(spec: ParametrizeSpec) -> Result<HashMap<String, f64>> {
    if spec.num_errors != 1 {
        return Err(FitError::Validation(format!(
            "driver is single-objective; got num_errors = {}",
            spec.num_errors
        )));
    }

    let template = read_forcefield_template(&spec.template_file)?;
    let variables = read_variable_bounds(&spec.variable_bounds_file)?;
    let space = variables.to_space()?;

    let context = EvaluationContext::new(template, spec.error_function);
    let config = DriverConfig {
        num_sobol_trials: spec.num_sobol_trials,
        num_botorch_trials: spec.num_botorch_trials,
        seed: spec.seed,
        direction: Direction::Minimize,
    };
    let driver = OptimizationDriver::new(space.clone(), config)?;
    let ledger = driver.run(&context)?;

    let (best_trial, best_loss) = ledger.best()?;
    log::info!(
        "parametrization done: best loss {best_loss:.6} at trial {}",
        best_trial.index
    );
    Ok(best_trial.candidate.to_map(&space))
}
