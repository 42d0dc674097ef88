//! Error types for pipeline construction and execution

use std::path::PathBuf;
use thiserror::Error;

/// Boxed error used to carry a collaborator's original failure
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Error raised by a stage while executing
///
/// Every variant names the stage it came from so failures stay traceable
/// once they are folded into a pipeline result.
#[derive(Debug, Error)]
pub enum StageError {
    #[error("Validation failed in stage '{stage}': {message}")]
    Validation {
        stage: String,
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    #[error("Transformation failed in stage '{stage}': {message}")]
    Transformation {
        stage: String,
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    #[error("Output failed in stage '{stage}': {message}")]
    Output {
        stage: String,
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    #[error("Stage '{stage}' failed: {message}")]
    Failed {
        stage: String,
        message: String,
        #[source]
        source: Option<BoxError>,
    },
}

impl StageError {
    pub fn validation(stage: impl Into<String>, message: impl Into<String>) -> Self {
        StageError::Validation {
            stage: stage.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Wrap a collaborator failure, keeping it as the error source
    pub fn validation_caused_by(stage: impl Into<String>, cause: impl Into<BoxError>) -> Self {
        let cause = cause.into();
        StageError::Validation {
            stage: stage.into(),
            message: cause.to_string(),
            source: Some(cause),
        }
    }

    pub fn transformation(stage: impl Into<String>, cause: impl Into<BoxError>) -> Self {
        let cause = cause.into();
        StageError::Transformation {
            stage: stage.into(),
            message: cause.to_string(),
            source: Some(cause),
        }
    }

    pub fn output(stage: impl Into<String>, message: impl Into<String>) -> Self {
        StageError::Output {
            stage: stage.into(),
            message: message.into(),
            source: None,
        }
    }

    pub fn output_caused_by(stage: impl Into<String>, cause: impl Into<BoxError>) -> Self {
        let cause = cause.into();
        StageError::Output {
            stage: stage.into(),
            message: cause.to_string(),
            source: Some(cause),
        }
    }

    pub fn failed(stage: impl Into<String>, message: impl Into<String>) -> Self {
        StageError::Failed {
            stage: stage.into(),
            message: message.into(),
            source: None,
        }
    }

    pub fn failed_caused_by(stage: impl Into<String>, cause: impl Into<BoxError>) -> Self {
        let cause = cause.into();
        StageError::Failed {
            stage: stage.into(),
            message: cause.to_string(),
            source: Some(cause),
        }
    }

    /// Name of the stage that raised this error
    pub fn stage_name(&self) -> &str {
        match self {
            StageError::Validation { stage, .. }
            | StageError::Transformation { stage, .. }
            | StageError::Output { stage, .. }
            | StageError::Failed { stage, .. } => stage,
        }
    }

    /// The message without the stage prefix
    pub fn message(&self) -> &str {
        match self {
            StageError::Validation { message, .. }
            | StageError::Transformation { message, .. }
            | StageError::Output { message, .. }
            | StageError::Failed { message, .. } => message,
        }
    }
}

/// Errors surfaced by a pipeline run
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Either an input path, XML text, or a prepared context must be provided")]
    MissingInput,

    #[error("Input file not found: {}", .0.display())]
    InputNotFound(PathBuf),

    #[error("Failed to read input {}: {source}", path.display())]
    InputRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse input {}: {message}", path.display())]
    InputParse { path: PathBuf, message: String },

    #[error("Stage '{stage}' input validation failed")]
    PreconditionFailed { stage: String },

    #[error(transparent)]
    Stage(#[from] StageError),

    #[error("Stage '{stage}' failed and was rolled back")]
    RolledBack {
        stage: String,
        #[source]
        source: StageError,
    },
}

/// Errors raised while building a pipeline from configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Pipeline definition not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Failed to read pipeline definition {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid pipeline YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Pipeline definition must be a YAML mapping")]
    NotAMapping,

    #[error("Invalid error_strategy '{value}'. Valid options: {valid}")]
    InvalidErrorStrategy { value: String, valid: String },

    #[error("Pipeline must have at least one stage")]
    NoStages,

    #[error("Failed to load stage {index}: {source}")]
    Stage {
        index: usize,
        #[source]
        source: Box<ConfigError>,
    },

    #[error("Stage must have a 'type' field")]
    MissingStageType,

    #[error("Unknown stage type '{0}'. Valid types: validate, transform, output, custom")]
    UnknownStageType(String),

    #[error("{stage_type} stage requires '{field}' field")]
    MissingField {
        stage_type: &'static str,
        field: &'static str,
    },

    #[error("Transform file not found: {}", .0.display())]
    TransformNotFound(PathBuf),

    #[error("Unsupported format '{format}'. Supported: {supported}")]
    UnsupportedFormat { format: String, supported: String },

    #[error(
        "Custom stages are not supported in pipeline definitions. \
         Use the programmatic API to create custom stages."
    )]
    CustomStageUnsupported,
}
