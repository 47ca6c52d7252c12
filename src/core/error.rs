use thiserror::Error;

/// Error taxonomy for a calibration run.
///
/// `Validation` and `Surrogate` are fatal to a run; `Evaluation` is
/// recovered at trial granularity by the driver; `Parse` surfaces from the
/// extractors and becomes an `Evaluation` failure for whichever trial was
/// being scored at the time.
#[derive(Debug, Error)]
pub enum FitError {
    /// Malformed search space or invalid trial counts. Raised before any
    /// trial is created.
    #[error("invalid configuration: {0}")]
    Validation(String),

    /// Expected marker or well-formed data not found in simulator output.
    #[error("parse failure: {0}")]
    Parse(String),

    /// The external simulator failed, timed out, or produced unusable
    /// output while scoring one candidate.
    #[error("evaluation failed: {0}")]
    Evaluation(String),

    /// The exploitation-phase generator could not produce a proposal.
    #[error("surrogate generator failed: {0}")]
    Surrogate(String),

    /// Best-candidate selection over zero completed trials.
    #[error("no completed trials to select a best candidate from")]
    EmptyResult,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, FitError>;
