use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use crate::core::error::{FitError, Result};

/// How a single tunable parameter may vary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ParameterKind {
    /// Continuous uniform range [lower, upper]. Requires lower < upper.
    Range { lower: f64, upper: f64 },
    /// Enumerated set of admissible values.
    Choice { values: Vec<f64> },
    /// Pinned to a single value; never varied by any sampler.
    Fixed { value: f64 },
}

/// One tunable dimension of the force field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub kind: ParameterKind,
}

impl Parameter {
    /// True if `value` is admissible for this parameter.
    pub fn contains(&self, value: f64) -> bool {
        match &self.kind {
            ParameterKind::Range { lower, upper } => value >= *lower && value <= *upper,
            ParameterKind::Choice { values } => values.iter().any(|v| *v == value),
            ParameterKind::Fixed { value: v } => *v == value,
        }
    }
}

/// The full coordinate system for candidates: an ordered set of uniquely
/// named parameters. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSpace {
    parameters: Vec<Parameter>,
}

impl ParameterSpace {
    pub fn new() -> Self {
        Self {
            parameters: Vec::new(),
        }
    }

    pub fn add_range(mut self, name: impl Into<String>, lower: f64, upper: f64) -> Self {
        self.parameters.push(Parameter {
            name: name.into(),
            kind: ParameterKind::Range { lower, upper },
        });
        self
    }

    pub fn add_choice(mut self, name: impl Into<String>, values: Vec<f64>) -> Self {
        self.parameters.push(Parameter {
            name: name.into(),
            kind: ParameterKind::Choice { values },
        });
        self
    }

    pub fn add_fixed(mut self, name: impl Into<String>, value: f64) -> Self {
        self.parameters.push(Parameter {
            name: name.into(),
            kind: ParameterKind::Fixed { value },
        });
        self
    }

    /// Builds a space of continuous ranges from ordered (name, (lower, upper))
    /// pairs, validating as it goes.
    pub fn from_bounds<'a, I>(bounds: I) -> Result<Self>
    where
        I: IntoIterator<Item = (&'a str, (f64, f64))>,
    {
        let mut space = Self::new();
        for (name, (lower, upper)) in bounds {
            space = space.add_range(name, lower, upper);
        }
        space.validate()?;
        Ok(space)
    }

    /// Checks structural invariants: unique names, ordered bounds,
    /// non-empty choice sets, finite values.
    pub fn validate(&self) -> Result<()> {
        if self.parameters.is_empty() {
            return Err(FitError::Validation("parameter space is empty".into()));
        }
        let mut seen = std::collections::HashSet::new();
        for param in &self.parameters {
            if !seen.insert(param.name.as_str()) {
                return Err(FitError::Validation(format!(
                    "duplicate parameter name '{}'",
                    param.name
                )));
            }
            match &param.kind {
                ParameterKind::Range { lower, upper } => {
                    if !(lower < upper) || !lower.is_finite() || !upper.is_finite() {
                        return Err(FitError::Validation(format!(
                            "parameter '{}' has invalid bounds [{}, {}]",
                            param.name, lower, upper
                        )));
                    }
                }
                ParameterKind::Choice { values } => {
                    if values.is_empty() {
                        return Err(FitError::Validation(format!(
                            "parameter '{}' has an empty choice set",
                            param.name
                        )));
                    }
                }
                ParameterKind::Fixed { value } => {
                    if !value.is_finite() {
                        return Err(FitError::Validation(format!(
                            "parameter '{}' is fixed to a non-finite value",
                            param.name
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.parameters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }

    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.parameters.iter().map(|p| p.name.as_str())
    }

    pub fn get(&self, name: &str) -> Option<&Parameter> {
        self.parameters.iter().find(|p| p.name == name)
    }

    /// Maps a unit-cube coordinate vector (one entry in [0, 1) per
    /// parameter) onto a concrete candidate. Choice dimensions index into
    /// their value set; fixed dimensions ignore the coordinate.
    pub fn candidate_from_unit(&self, unit: &[f64]) -> Result<Candidate> {
        if unit.len() != self.parameters.len() {
            return Err(FitError::Validation(format!(
                "expected {} coordinates, got {}",
                self.parameters.len(),
                unit.len()
            )));
        }
        let values = self
            .parameters
            .iter()
            .zip(unit)
            .map(|(param, u)| match &param.kind {
                ParameterKind::Range { lower, upper } => lower + u * (upper - lower),
                ParameterKind::Choice { values } => {
                    let idx = ((u * values.len() as f64) as usize).min(values.len() - 1);
                    values[idx]
                }
                ParameterKind::Fixed { value } => *value,
            })
            .collect();
        Ok(Candidate::new(values))
    }

    /// Uniform random candidate, used by samplers as a fallback move.
    pub fn sample_uniform<R: Rng + ?Sized>(&self, rng: &mut R) -> Candidate {
        let values = self
            .parameters
            .iter()
            .map(|param| match &param.kind {
                ParameterKind::Range { lower, upper } => rng.gen_range(*lower..*upper),
                ParameterKind::Choice { values } => values[rng.gen_range(0..values.len())],
                ParameterKind::Fixed { value } => *value,
            })
            .collect();
        Candidate::new(values)
    }

    /// Checks a candidate against this space: one value per parameter,
    /// each admissible.
    pub fn check_candidate(&self, candidate: &Candidate) -> Result<()> {
        if candidate.values().len() != self.parameters.len() {
            return Err(FitError::Validation(format!(
                "candidate has {} values for a {}-dimensional space",
                candidate.values().len(),
                self.parameters.len()
            )));
        }
        for (param, value) in self.parameters.iter().zip(candidate.values()) {
            if !param.contains(*value) {
                return Err(FitError::Validation(format!(
                    "value {} out of range for parameter '{}'",
                    value, param.name
                )));
            }
        }
        Ok(())
    }
}

impl Default for ParameterSpace {
    fn default() -> Self {
        Self::new()
    }
}

/// One concrete assignment of a value to every parameter in the space,
/// stored in space order. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: Uuid,
    values: Vec<f64>,
}

impl Candidate {
    pub fn new(values: Vec<f64>) -> Self {
        Self {
            id: Uuid::new_v4(),
            values,
        }
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn value(&self, space: &ParameterSpace, name: &str) -> Option<f64> {
        space
            .parameters()
            .iter()
            .position(|p| p.name == name)
            .map(|i| self.values[i])
    }

    /// Name → value view of this candidate, for caller-facing results and
    /// error functions keyed by parameter name.
    pub fn to_map(&self, space: &ParameterSpace) -> HashMap<String, f64> {
        space
            .parameters()
            .iter()
            .zip(&self.values)
            .map(|(p, v)| (p.name.clone(), *v))
            .collect()
    }
}
