//! Stage executor - runs a single stage attempt

use crate::core::{PipelineContext, StageError, StageResult};
use crate::stages::{PipelineStage, Stage};
use std::time::Instant;
use tracing::debug;

/// A stage attempt that did not succeed
///
/// Stages can fail by returning an error or by returning a result with
/// `success == false`. Both end up here so the engine handles them the same
/// way; `result` keeps the stage's own report when there was one.
#[derive(Debug)]
pub struct StageFailure {
    pub error: StageError,
    pub result: Option<StageResult>,
}

impl StageFailure {
    /// The result to record for this failure
    ///
    /// Uses the stage's own result if it returned one, otherwise a failed
    /// result carrying the error text and the current document.
    pub fn into_recorded_result(self, context: &PipelineContext) -> StageResult {
        match self.result {
            Some(result) => result,
            None => StageResult::failure(self.error.stage_name(), self.error.to_string())
                .with_data(context.xml_data.clone()),
        }
    }
}

/// Runs stage attempts and normalizes their outcome
#[derive(Debug, Clone, Copy, Default)]
pub struct StageExecutor;

impl StageExecutor {
    pub fn new() -> Self {
        Self
    }

    /// Run one attempt of `stage`
    pub fn attempt(
        &self,
        stage: &Stage,
        context: &mut PipelineContext,
    ) -> Result<StageResult, StageFailure> {
        let started = Instant::now();
        let outcome = stage.execute(context);
        debug!(
            "Stage '{}' attempt finished in {:.3}s",
            stage.name(),
            started.elapsed().as_secs_f64()
        );

        match outcome {
            Ok(result) if result.success => Ok(result),
            Ok(result) => {
                let message = result
                    .error
                    .clone()
                    .unwrap_or_else(|| "stage reported failure".to_string());
                Err(StageFailure {
                    error: StageError::failed(stage.name(), message),
                    result: Some(result),
                })
            }
            Err(error) => Err(StageFailure {
                error,
                result: None,
            }),
        }
    }
}
