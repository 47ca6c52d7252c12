use std::sync::atomic::{AtomicUsize, Ordering};

use forcefit::core::error::{FitError, Result};
use forcefit::core::space::{Candidate, ParameterSpace};
use forcefit::engine::evaluator::LossEvaluator;

/// Scores a candidate as the literal sum of its values, counting calls.
pub struct CountingSumEvaluator {
    pub calls: AtomicUsize,
}

impl CountingSumEvaluator {
    pub fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
        }
    }
}

impl LossEvaluator for CountingSumEvaluator {
    fn evaluate(&self, candidate: &Candidate, _space: &ParameterSpace) -> Result<f64> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(candidate.values().iter().sum())
    }

    fn name(&self) -> &str {
        "counting-sum"
    }
}

/// Fails every `period`-th call (1-based); otherwise sums the values.
/// `period = 1` fails every call.
pub struct FlakyEvaluator {
    pub period: usize,
    calls: AtomicUsize,
}

impl FlakyEvaluator {
    pub fn new(period: usize) -> Self {
        Self {
            period,
            calls: AtomicUsize::new(0),
        }
    }
}

impl LossEvaluator for FlakyEvaluator {
    fn evaluate(&self, candidate: &Candidate, _space: &ParameterSpace) -> Result<f64> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if call % self.period == 0 {
            return Err(FitError::Evaluation(format!(
                "simulator crashed on call {call}"
            )));
        }
        Ok(candidate.values().iter().sum())
    }

    fn name(&self) -> &str {
        "flaky-sum"
    }
}
