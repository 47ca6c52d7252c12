use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use uuid::Uuid;

use crate::core::error::{FitError, Result};
use crate::core::space::Candidate;

/// Whether lower or higher objective values win.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Minimize,
    Maximize,
}

impl Default for Direction {
    fn default() -> Self {
        Self::Minimize
    }
}

/// Lifecycle state of a single trial.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrialStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

/// One scheduled evaluation of one candidate. Owned by the ledger; nothing
/// mutates it after completion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trial {
    pub index: usize,
    pub candidate: Candidate,
    pub status: TrialStatus,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

/// One recorded metric value for a completed trial.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub trial_index: usize,
    pub candidate_id: Uuid,
    pub metric: String,
    pub value: f64,
    pub sem: Option<f64>,
}

/// Append-only record of every trial and observation in a run.
///
/// Single writer (the driver); candidate generators and the best-selection
/// scan only read. A ledger is owned by exactly one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ledger {
    objective_metric: String,
    direction: Direction,
    trials: Vec<Trial>,
    observations: Vec<Observation>,
}

impl Ledger {
    pub fn new(objective_metric: impl Into<String>, direction: Direction) -> Self {
        Self {
            objective_metric: objective_metric.into(),
            direction,
            trials: Vec::new(),
            observations: Vec::new(),
        }
    }

    pub fn objective_metric(&self) -> &str {
        &self.objective_metric
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn trials(&self) -> &[Trial] {
        &self.trials
    }

    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    pub fn len(&self) -> usize {
        self.trials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trials.is_empty()
    }

    /// Appends a pending trial, assigning the next monotonic index.
    pub fn new_trial(&mut self, candidate: Candidate) -> usize {
        let index = self.trials.len();
        self.trials.push(Trial {
            index,
            candidate,
            status: TrialStatus::Pending,
            error: None,
            created_at: Utc::now(),
            finished_at: None,
        });
        index
    }

    pub fn mark_running(&mut self, index: usize) {
        if let Some(trial) = self.trials.get_mut(index) {
            trial.status = TrialStatus::Running;
        }
    }

    /// Records the objective observation for a trial and marks it completed.
    pub fn complete(&mut self, index: usize, value: f64) {
        let metric = self.objective_metric.clone();
        self.record(index, &metric, value, None);
        if let Some(trial) = self.trials.get_mut(index) {
            trial.status = TrialStatus::Completed;
            trial.finished_at = Some(Utc::now());
        }
    }

    /// Records an auxiliary metric observation for a trial.
    pub fn record(&mut self, index: usize, metric: &str, value: f64, sem: Option<f64>) {
        if let Some(trial) = self.trials.get(index) {
            self.observations.push(Observation {
                trial_index: index,
                candidate_id: trial.candidate.id,
                metric: metric.to_string(),
                value,
                sem,
            });
        }
    }

    pub fn fail(&mut self, index: usize, error: impl Into<String>) {
        if let Some(trial) = self.trials.get_mut(index) {
            trial.status = TrialStatus::Failed;
            trial.error = Some(error.into());
            trial.finished_at = Some(Utc::now());
        }
    }

    /// Objective value recorded for trial `index`, if completed.
    pub fn objective_for(&self, index: usize) -> Option<f64> {
        self.observations
            .iter()
            .find(|o| o.trial_index == index && o.metric == self.objective_metric)
            .map(|o| o.value)
    }

    pub fn completed_count(&self) -> usize {
        self.trials
            .iter()
            .filter(|t| t.status == TrialStatus::Completed)
            .count()
    }

    pub fn failed_count(&self) -> usize {
        self.trials
            .iter()
            .filter(|t| t.status == TrialStatus::Failed)
            .count()
    }

    /// All (trial, objective) pairs for completed trials, in index order.
    /// Failed trials never appear here.
    pub fn completed(&self) -> Vec<(&Trial, f64)> {
        self.trials
            .iter()
            .filter(|t| t.status == TrialStatus::Completed)
            .filter_map(|t| self.objective_for(t.index).map(|v| (t, v)))
            .collect()
    }

    /// The winning trial per the declared direction. Ties resolve to the
    /// lowest trial index (first seen wins).
    pub fn best(&self) -> Result<(&Trial, f64)> {
        let mut best: Option<(&Trial, f64)> = None;
        for (trial, value) in self.completed() {
            let improves = match best {
                None => true,
                Some((_, incumbent)) => match self.direction {
                    Direction::Minimize => value < incumbent,
                    Direction::Maximize => value > incumbent,
                },
            };
            if improves {
                best = Some((trial, value));
            }
        }
        best.ok_or(FitError::EmptyResult)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| FitError::Io(std::io::Error::new(std::io::ErrorKind::Other, e)))
    }

    /// Writes one row per trial: index, status, objective, parameter values.
    pub fn write_csv(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut writer = csv::Writer::from_path(path.as_ref())
            .map_err(|e| FitError::Io(std::io::Error::new(std::io::ErrorKind::Other, e)))?;
        writer
            .write_record(["trial", "status", "objective", "parameters"])
            .map_err(|e| FitError::Io(std::io::Error::new(std::io::ErrorKind::Other, e)))?;
        for trial in &self.trials {
            let objective = self
                .objective_for(trial.index)
                .map(|v| v.to_string())
                .unwrap_or_default();
            let params = trial
                .candidate
                .values()
                .iter()
                .map(|v| v.to_string())
                .collect::<Vec<_>>()
                .join(" ");
            writer
                .write_record([
                    trial.index.to_string(),
                    format!("{:?}", trial.status),
                    objective,
                    params,
                ])
                .map_err(|e| FitError::Io(std::io::Error::new(std::io::ErrorKind::Other, e)))?;
        }
        writer
            .flush()
            .map_err(FitError::Io)?;
        Ok(())
    }
}
