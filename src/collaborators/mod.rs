//! External subsystems invoked by the built-in stages
//!
//! Each collaborator sits behind a trait so stages can be given a different
//! implementation (or a test double). The defaults here cover what can be
//! done without the wider toolkit: well-formedness checks, `xsltproc`, and
//! a registry that holds whatever publishers the caller provides.

pub mod publisher;
pub mod stylesheet;
pub mod validator;

use std::path::PathBuf;
use thiserror::Error;

pub use publisher::{PublishRequest, Publisher, PublisherRegistry};
pub use stylesheet::{CompiledStylesheet, StylesheetProcessor, XsltprocProcessor};
pub use validator::{
    DocumentValidator, ValidationIssue, ValidationReport, ValidationRequest,
    WellFormednessValidator,
};

/// Failures raised by the default collaborators
#[derive(Debug, Error)]
pub enum CollaboratorError {
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to launch {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} exited with code {code}: {stderr}")]
    Process {
        program: String,
        code: i32,
        stderr: String,
    },

    #[error("Invalid stylesheet {}: {message}", path.display())]
    InvalidStylesheet { path: PathBuf, message: String },

    #[error("No publisher registered for format '{0}'")]
    NoPublisher(String),

    #[error("Output of {program} is not valid UTF-8")]
    InvalidOutput { program: String },
}

impl CollaboratorError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CollaboratorError::Io {
            path: path.into(),
            source,
        }
    }
}
