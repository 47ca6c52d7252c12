use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::error::{FitError, Result};
use crate::core::space::ParameterSpace;

/// An opaque force-field template as read from disk. Consumers (the
/// caller's error function) decide how to instantiate it for a candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForceFieldTemplate {
    pub source: String,
}

impl ForceFieldTemplate {
    pub fn from_source(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
        }
    }
}

/// Reads a force-field template file verbatim.
pub fn read_forcefield_template(path: impl AsRef<Path>) -> Result<ForceFieldTemplate> {
    let source = fs::read_to_string(path.as_ref())?;
    Ok(ForceFieldTemplate { source })
}

/// Parallel arrays describing the tunable variables of a template:
/// one name and one (lower, upper) pair per variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableBounds {
    pub names: Vec<String>,
    pub bounds: Vec<(f64, f64)>,
}

impl VariableBounds {
    pub fn num_variables(&self) -> usize {
        self.names.len()
    }

    pub fn to_space(&self) -> Result<ParameterSpace> {
        ParameterSpace::from_bounds(
            self.names
                .iter()
                .map(String::as_str)
                .zip(self.bounds.iter().copied()),
        )
    }
}

/// Reads a variable-bounds file: one `name lower upper` row per variable,
/// blank lines and `#` comments skipped.
pub fn read_variable_bounds(path: impl AsRef<Path>) -> Result<VariableBounds> {
    let content = fs::read_to_string(path.as_ref())?;
    parse_variable_bounds(&content)
}

pub fn parse_variable_bounds(content: &str) -> Result<VariableBounds> {
    let mut names = Vec::new();
    let mut bounds = Vec::new();

    for (lineno, line) in content.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let tokens: Vec<&str> = trimmed.split_whitespace().collect();
        if tokens.len() != 3 {
            return Err(FitError::Parse(format!(
                "variable bounds line {}: expected 'name lower upper', got '{}'",
                lineno + 1,
                trimmed
            )));
        }
        let lower: f64 = tokens[1].parse().map_err(|_| {
            FitError::Parse(format!(
                "variable bounds line {}: bad lower bound '{}'",
                lineno + 1,
                tokens[1]
            ))
        })?;
        let upper: f64 = tokens[2].parse().map_err(|_| {
            FitError::Parse(format!(
                "variable bounds line {}: bad upper bound '{}'",
                lineno + 1,
                tokens[2]
            ))
        })?;
        names.push(tokens[0].to_string());
        bounds.push((lower, upper));
    }

    if names.is_empty() {
        return Err(FitError::Parse(
            "variable bounds file declares no variables".into(),
        ));
    }

    Ok(VariableBounds { names, bounds })
}
