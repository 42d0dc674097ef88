//! Pipeline stages
//!
//! A [`Stage`] is one of four closed variants. Every variant implements
//! [`PipelineStage`], which is what the engine drives.

pub mod custom;
pub mod output;
pub mod transform;
pub mod validate;

use crate::core::{PipelineContext, StageError, StageResult};
use std::fmt;

pub use custom::{CustomStage, PreconditionFn, RollbackFn, StageFn};
pub use output::{OutputFormat, OutputStage};
pub use transform::{Transform, TransformFn, TransformStage};
pub use validate::{ValidateStage, DEFAULT_STREAMING_THRESHOLD};

/// Capability shared by every stage
pub trait PipelineStage {
    /// Name used in results, logs and snapshots
    fn name(&self) -> &str;

    /// Do the stage's work, possibly mutating the document and variables
    fn execute(&self, context: &mut PipelineContext) -> Result<StageResult, StageError>;

    /// Precondition checked before `execute`; must not mutate the context
    fn validate_input(&self, _context: &PipelineContext) -> bool {
        true
    }

    /// Undo hook invoked after the engine restores a snapshot
    fn rollback(&self, _context: &mut PipelineContext) {}
}

/// True when there is a document to work on
pub(crate) fn has_document(context: &PipelineContext) -> bool {
    !context.xml_data.is_empty() || context.xml_tree.is_some()
}

/// A configured pipeline stage
#[derive(Debug, Clone)]
pub enum Stage {
    Validate(ValidateStage),
    Transform(TransformStage),
    Output(OutputStage),
    Custom(CustomStage),
}

impl Stage {
    /// Tag used for this kind of stage in pipeline definitions
    pub fn kind(&self) -> &'static str {
        match self {
            Stage::Validate(_) => "validate",
            Stage::Transform(_) => "transform",
            Stage::Output(_) => "output",
            Stage::Custom(_) => "custom",
        }
    }

    /// Type name reported by `Pipeline::to_dict`
    pub fn type_name(&self) -> &'static str {
        match self {
            Stage::Validate(_) => "ValidateStage",
            Stage::Transform(_) => "TransformStage",
            Stage::Output(_) => "OutputStage",
            Stage::Custom(_) => "CustomStage",
        }
    }

    fn inner(&self) -> &dyn PipelineStage {
        match self {
            Stage::Validate(stage) => stage,
            Stage::Transform(stage) => stage,
            Stage::Output(stage) => stage,
            Stage::Custom(stage) => stage,
        }
    }
}

impl PipelineStage for Stage {
    fn name(&self) -> &str {
        self.inner().name()
    }

    fn execute(&self, context: &mut PipelineContext) -> Result<StageResult, StageError> {
        self.inner().execute(context)
    }

    fn validate_input(&self, context: &PipelineContext) -> bool {
        self.inner().validate_input(context)
    }

    fn rollback(&self, context: &mut PipelineContext) {
        self.inner().rollback(context)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(name='{}')", self.type_name(), self.name())
    }
}

impl From<ValidateStage> for Stage {
    fn from(stage: ValidateStage) -> Self {
        Stage::Validate(stage)
    }
}

impl From<TransformStage> for Stage {
    fn from(stage: TransformStage) -> Self {
        Stage::Transform(stage)
    }
}

impl From<OutputStage> for Stage {
    fn from(stage: OutputStage) -> Self {
        Stage::Output(stage)
    }
}

impl From<CustomStage> for Stage {
    fn from(stage: CustomStage) -> Self {
        Stage::Custom(stage)
    }
}
