use std::collections::HashMap;

use crate::core::error::{FitError, Result};
use crate::core::space::{Candidate, ParameterSpace};
use crate::engine::forcefield::ForceFieldTemplate;

/// A generic interface for scoring one candidate parameter set.
/// Implementations must be thread-safe (Sync).
///
/// Evaluation is assumed expensive: the generalized path launches the
/// external simulator once per candidate and re-evaluating the same
/// candidate re-runs it. Failures propagate as `FitError::Evaluation` and
/// are handled at the trial boundary by the driver.
pub trait LossEvaluator: Send + Sync {
    /// Scores `candidate`, returning the scalar loss.
    fn evaluate(&self, candidate: &Candidate, space: &ParameterSpace) -> Result<f64>;

    /// Returns the name of the loss function (e.g. "sum", "lattice-rmse").
    fn name(&self) -> &str;
}

/// Placeholder objective: the literal sum of all parameter values.
/// Real calibrations supply a domain error function via `EvaluationContext`.
pub struct SumLoss;

impl LossEvaluator for SumLoss {
    fn evaluate(&self, candidate: &Candidate, _space: &ParameterSpace) -> Result<f64> {
        Ok(candidate.values().iter().sum())
    }

    fn name(&self) -> &str {
        "sum"
    }
}

/// Caller-supplied error function: parameter assignment plus the opaque
/// force-field template, producing the scalar loss (typically an RMSE over
/// extracted observables against target data).
pub type ErrorFunction =
    Box<dyn Fn(&HashMap<String, f64>, &ForceFieldTemplate) -> anyhow::Result<f64> + Send + Sync>;

/// Everything a parametrization run needs to score a candidate, owned
/// explicitly rather than captured in per-call closures: the template and
/// the domain error function.
pub struct EvaluationContext {
    template: ForceFieldTemplate,
    error_function: ErrorFunction,
}

impl EvaluationContext {
    pub fn new(template: ForceFieldTemplate, error_function: ErrorFunction) -> Self {
        Self {
            template,
            error_function,
        }
    }

    pub fn template(&self) -> &ForceFieldTemplate {
        &self.template
    }
}

impl LossEvaluator for EvaluationContext {
    fn evaluate(&self, candidate: &Candidate, space: &ParameterSpace) -> Result<f64> {
        let params = candidate.to_map(space);
        let loss = (self.error_function)(&params, &self.template)
            .map_err(|e| FitError::Evaluation(e.to_string()))?;
        if !loss.is_finite() {
            return Err(FitError::Evaluation(format!(
                "error function returned a non-finite loss ({loss})"
            )));
        }
        Ok(loss)
    }

    fn name(&self) -> &str {
        "forcefield-error"
    }
}

/// Root-mean-square error between predicted and reference series, with a
/// weight applied to the result. Helper for domain error functions that
/// combine several observable types.
pub fn rmse(predicted: &[f64], reference: &[f64], weight: f64) -> Result<f64> {
    if predicted.len() != reference.len() || predicted.is_empty() {
        return Err(FitError::Evaluation(format!(
            "rmse over mismatched series ({} vs {})",
            predicted.len(),
            reference.len()
        )));
    }
    let sum_sq: f64 = predicted
        .iter()
        .zip(reference)
        .map(|(p, r)| (p - r) * (p - r))
        .sum();
    Ok(weight * (sum_sq / predicted.len() as f64).sqrt())
}
