use thiserror::Error;

/// Possible errors that arise while loading, clustering or scoring the transaction data.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PipelineError {
    /// The source could not be read, or is missing a required column.
    #[error("Data unavailable: {0}")]
    DataUnavailable(String),
    /// A sampling request asked for more rows than the source holds.
    #[error("Insufficient data: requested {requested} rows but only {available} are available")]
    InsufficientData { requested: usize, available: usize },
    #[error("Invalid configuration: {0}")]
    Configuration(String),
    /// A quality metric needs at least two clusters.
    #[error("Degenerate clustering: {0}")]
    DegenerateClustering(String),
    /// Row counts of aligned inputs disagree. Always a programming defect.
    #[error("Invariant violated: {0}")]
    InvariantViolation(String),
}

impl From<std::io::Error> for PipelineError {
    fn from(err: std::io::Error) -> Self {
        PipelineError::DataUnavailable(err.to_string())
    }
}

impl From<csv::Error> for PipelineError {
    fn from(err: csv::Error) -> Self {
        PipelineError::DataUnavailable(err.to_string())
    }
}

pub type PipelineResult<T> = Result<T, PipelineError>;
