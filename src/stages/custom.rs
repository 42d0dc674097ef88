//! Stage backed by caller-supplied closures

use crate::core::{BoxError, PipelineContext, StageError, StageResult};
use crate::stages::PipelineStage;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::error;

/// Work performed by a custom stage
pub type StageFn =
    Arc<dyn Fn(&mut PipelineContext) -> Result<StageResult, BoxError> + Send + Sync>;

/// Cleanup run when a custom stage is rolled back
pub type RollbackFn = Arc<dyn Fn(&mut PipelineContext) + Send + Sync>;

/// Precondition for a custom stage
pub type PreconditionFn = Arc<dyn Fn(&PipelineContext) -> bool + Send + Sync>;

/// Runs arbitrary logic as a pipeline stage
///
/// Any error from the function is reported as a generic stage failure
/// naming this stage.
#[derive(Clone)]
pub struct CustomStage {
    name: String,
    function: StageFn,
    rollback: Option<RollbackFn>,
    precondition: Option<PreconditionFn>,
}

impl CustomStage {
    pub fn new<F>(name: impl Into<String>, function: F) -> Self
    where
        F: Fn(&mut PipelineContext) -> Result<StageResult, BoxError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            function: Arc::new(function),
            rollback: None,
            precondition: None,
        }
    }

    pub fn with_rollback<F>(mut self, rollback: F) -> Self
    where
        F: Fn(&mut PipelineContext) + Send + Sync + 'static,
    {
        self.rollback = Some(Arc::new(rollback));
        self
    }

    pub fn with_precondition<F>(mut self, precondition: F) -> Self
    where
        F: Fn(&PipelineContext) -> bool + Send + Sync + 'static,
    {
        self.precondition = Some(Arc::new(precondition));
        self
    }
}

impl PipelineStage for CustomStage {
    fn name(&self) -> &str {
        &self.name
    }

    fn execute(&self, context: &mut PipelineContext) -> Result<StageResult, StageError> {
        let started = Instant::now();
        match (self.function)(context) {
            Ok(result) => Ok(result.with_duration(started.elapsed().as_secs_f64())),
            Err(e) => {
                error!("Custom stage '{}' failed: {}", self.name, e);
                Err(StageError::failed_caused_by(&self.name, e))
            }
        }
    }

    fn validate_input(&self, context: &PipelineContext) -> bool {
        self.precondition.as_ref().map_or(true, |check| check(context))
    }

    fn rollback(&self, context: &mut PipelineContext) {
        if let Some(rollback) = &self.rollback {
            rollback(context);
        }
    }
}

impl fmt::Debug for CustomStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomStage")
            .field("name", &self.name)
            .field("has_rollback", &self.rollback.is_some())
            .field("has_precondition", &self.precondition.is_some())
            .finish_non_exhaustive()
    }
}
