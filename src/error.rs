/// Error types for chart preparation.
///
/// Every fallible stage of the pipeline reports through [`ChartError`]. The
/// top-level build wraps whatever went wrong in [`ChartError::PipelineError`]
/// so callers see a single failure signal while the original error stays
/// reachable through [`ChartError::cause`].
use thiserror::Error;

/// The main error type for chart preparation.
#[derive(Error, Debug)]
pub enum ChartError {
    /// A required option is missing or an enumerated option has an invalid value.
    #[error("{0}")]
    ConfigError(String),

    /// A record lacks a field the pipeline needs at group or aggregate time.
    #[error("Field '{field}' {reason}")]
    FieldError {
        /// The field that was read
        field: String,
        /// What was wrong with it
        reason: String,
    },

    /// A raw date value could not be parsed with the configured format.
    #[error("Cannot parse '{value}' as a date with format '{format}'")]
    ParseError {
        /// The raw value taken from the record
        value: String,
        /// The format it was parsed with
        format: String,
    },

    /// A chart build failed; wraps the error that aborted it.
    #[error("Chart build error: {source}")]
    PipelineError {
        /// The error that aborted the build
        #[source]
        source: Box<ChartError>,
    },

    /// Serialization error when converting options or datasets to/from JSON
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl ChartError {
    pub(crate) fn config(message: impl Into<String>) -> Self {
        Self::ConfigError(message.into())
    }

    pub(crate) fn field(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::FieldError {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Wrap this error as the failure of a whole build.
    ///
    /// Already-wrapped errors are returned unchanged.
    pub fn into_pipeline(self) -> Self {
        match self {
            Self::PipelineError { .. } => self,
            other => Self::PipelineError {
                source: Box::new(other),
            },
        }
    }

    /// The innermost error, looking through [`ChartError::PipelineError`].
    pub fn cause(&self) -> &ChartError {
        match self {
            Self::PipelineError { source } => source.cause(),
            other => other,
        }
    }
}

/// Result type alias for chart preparation.
pub type ChartResult<T> = Result<T, ChartError>;
