//! Core domain models for XML pipelines
//!
//! Pipelines, the per-run context, results, snapshots and the YAML loader.

pub mod config;
pub mod context;
pub mod document;
pub mod error;
pub mod pipeline;
pub mod result;
pub mod snapshot;
pub mod state;
pub mod variables;

pub use config::{load_pipeline, PipelineConfig, PipelineLoader};
pub use context::{PipelineContext, PipelineInput};
pub use document::XmlTree;
pub use error::{BoxError, ConfigError, PipelineError, StageError};
pub use pipeline::Pipeline;
pub use result::{PipelineResult, StageResult};
pub use snapshot::{Snapshot, SnapshotHistory};
pub use state::{ErrorStrategy, StageState};
pub use variables::VariableResolver;
