//! xml-pipeline - declarative XML processing pipelines
//!
//! A pipeline runs validate, transform, output and custom stages in order
//! over one XML document, with a configurable error strategy (fail fast,
//! continue, skip, retry with backoff, or rollback to a snapshot).

pub mod cli;
pub mod collaborators;
pub mod core;
pub mod execution;
pub mod stages;

// Re-export commonly used types
pub use collaborators::{
    DocumentValidator, Publisher, PublisherRegistry, StylesheetProcessor, WellFormednessValidator,
    XsltprocProcessor,
};
pub use core::{
    load_pipeline, ConfigError, ErrorStrategy, Pipeline, PipelineContext, PipelineError,
    PipelineInput, PipelineLoader, PipelineResult, StageError, StageResult, StageState,
};
pub use execution::{ExecutionEvent, RetryPolicy};
pub use stages::{
    CustomStage, OutputFormat, OutputStage, PipelineStage, Stage, TransformStage, ValidateStage,
};
