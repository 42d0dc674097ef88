//! Main execution engine - runs a pipeline's stages against one context

use crate::{
    core::{
        ErrorStrategy, Pipeline, PipelineContext, PipelineError, PipelineResult, StageResult,
        StageState,
    },
    execution::{StageExecutor, StageFailure},
    stages::{PipelineStage, Stage},
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// Events that can occur during pipeline execution
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionEvent {
    PipelineStarted {
        execution_id: String,
        pipeline_name: String,
        total_stages: usize,
    },
    StageTransition {
        stage: String,
        state: StageState,
    },
    StageRetrying {
        stage: String,
        attempt: usize,
        max_attempts: usize,
        delay: Duration,
    },
    StageRolledBack {
        stage: String,
        /// False when no snapshot existed for the stage
        restored: bool,
    },
    PipelineCompleted {
        execution_id: String,
        success: bool,
    },
}

/// Type for event handlers
pub type EventHandler = Arc<dyn Fn(ExecutionEvent) + Send + Sync>;

/// What the loop should do after a stage finished
enum Flow {
    Next,
    Stop(PipelineError),
}

/// Drives one run of a pipeline
///
/// Stages run strictly in order on the calling thread. Retry backoff blocks
/// the thread.
pub struct ExecutionEngine<'p> {
    pipeline: &'p Pipeline,
    executor: StageExecutor,
}

impl<'p> ExecutionEngine<'p> {
    pub fn new(pipeline: &'p Pipeline) -> Self {
        Self {
            pipeline,
            executor: StageExecutor::new(),
        }
    }

    /// Emit an event to all handlers
    fn emit_event(&self, event: ExecutionEvent) {
        for handler in self.pipeline.event_handlers() {
            handler(event.clone());
        }
    }

    fn transition(&self, stage: &Stage, state: StageState) {
        self.emit_event(ExecutionEvent::StageTransition {
            stage: stage.name().to_string(),
            state,
        });
    }

    /// Execute every stage against `context`
    ///
    /// Stage failures never surface as `Err`; they are folded into the
    /// returned result according to the pipeline's error strategy.
    pub fn run(&self, mut context: PipelineContext) -> PipelineResult {
        let pipeline = self.pipeline;
        info!(
            "Starting pipeline '{}' with {} stages (execution_id={})",
            pipeline.name,
            pipeline.stages().len(),
            context.execution_id
        );
        self.emit_event(ExecutionEvent::PipelineStarted {
            execution_id: context.execution_id.clone(),
            pipeline_name: pipeline.name.clone(),
            total_stages: pipeline.stages().len(),
        });

        let mut stages_executed = 0;
        let mut stages_failed = 0;
        let mut last_error: Option<String> = None;
        let mut cause: Option<PipelineError> = None;

        for stage in pipeline.stages() {
            info!("Executing stage: {}", stage.name());
            self.transition(stage, StageState::Pending);

            self.transition(stage, StageState::ValidatingInput);
            if !stage.validate_input(&context) {
                let err = PipelineError::PreconditionFailed {
                    stage: stage.name().to_string(),
                };
                error!("{}", err);
                self.transition(stage, StageState::Failed);
                cause = Some(err);
                break;
            }

            if pipeline.rollback_enabled {
                context.capture_snapshot(stage.name(), pipeline.max_snapshots);
            }

            self.transition(stage, StageState::Executing);
            let outcome = self.executor.attempt(stage, &mut context);
            stages_executed += 1;

            let failure = match outcome {
                Ok(result) => {
                    self.transition(stage, StageState::Succeeded);
                    context.stage_results.push(result);
                    continue;
                }
                Err(failure) => failure,
            };
            self.transition(stage, StageState::Failed);

            match self.handle_failure(stage, &mut context, failure) {
                (recorded, Flow::Next) => {
                    if let Some(result) = recorded {
                        if !result.success {
                            stages_failed += 1;
                            last_error = result.error.clone();
                        }
                        context.stage_results.push(result);
                    }
                }
                (_, Flow::Stop(err)) => {
                    stages_failed += 1;
                    cause = Some(err);
                    break;
                }
            }
        }

        let success = cause.is_none() && stages_failed == 0;
        let error = match &cause {
            Some(err) => {
                error!("Pipeline '{}' failed: {}", pipeline.name, err);
                Some(err.to_string())
            }
            None => last_error,
        };

        info!(
            "Pipeline '{}' completed: {} executed, {} failed, duration={:.2}s",
            pipeline.name,
            stages_executed,
            stages_failed,
            context.elapsed_seconds()
        );
        self.emit_event(ExecutionEvent::PipelineCompleted {
            execution_id: context.execution_id.clone(),
            success,
        });

        PipelineResult {
            pipeline_name: pipeline.name.clone(),
            success,
            context,
            error,
            cause,
            stages_executed,
            stages_failed,
        }
    }

    /// Apply the error strategy to a failed stage
    ///
    /// Returns the result to record (if any) and whether the run goes on.
    fn handle_failure(
        &self,
        stage: &Stage,
        context: &mut PipelineContext,
        failure: StageFailure,
    ) -> (Option<StageResult>, Flow) {
        let name = stage.name();
        match self.pipeline.error_strategy {
            ErrorStrategy::FailFast => {
                error!("Stage '{}' failed: {}", name, failure.error);
                (None, Flow::Stop(PipelineError::Stage(failure.error)))
            }
            ErrorStrategy::Continue | ErrorStrategy::Skip => {
                warn!(
                    "Stage '{}' failed, {}: {}",
                    name,
                    if self.pipeline.error_strategy == ErrorStrategy::Skip {
                        "skipping"
                    } else {
                        "continuing"
                    },
                    failure.error
                );
                (Some(failure.into_recorded_result(context)), Flow::Next)
            }
            ErrorStrategy::Rollback => {
                warn!("Stage '{}' failed, rolling back: {}", name, failure.error);
                let restored = context.restore_snapshot(name);
                if restored {
                    info!("Rolled back to state before stage '{}'", name);
                } else {
                    warn!("No snapshot found for stage '{}'", name);
                }
                stage.rollback(context);
                self.emit_event(ExecutionEvent::StageRolledBack {
                    stage: name.to_string(),
                    restored,
                });
                (
                    None,
                    Flow::Stop(PipelineError::RolledBack {
                        stage: name.to_string(),
                        source: failure.error,
                    }),
                )
            }
            ErrorStrategy::Retry => {
                warn!("Stage '{}' failed, retrying: {}", name, failure.error);
                (Some(self.retry(stage, context, failure)), Flow::Next)
            }
        }
    }

    /// Re-run a failed stage with exponential backoff
    ///
    /// Exactly one result comes back: the first successful attempt, or a
    /// failure noting how many retries were exhausted.
    fn retry(
        &self,
        stage: &Stage,
        context: &mut PipelineContext,
        failure: StageFailure,
    ) -> StageResult {
        let policy = self.pipeline.retry_policy;
        let name = stage.name();
        let mut last_error = failure.error;

        for attempt in 0..policy.max_attempts {
            let delay = policy.delay_for_attempt(attempt);
            info!(
                "Retry attempt {}/{} for stage '{}' in {:.1}s",
                attempt + 1,
                policy.max_attempts,
                name,
                delay.as_secs_f64()
            );
            self.emit_event(ExecutionEvent::StageRetrying {
                stage: name.to_string(),
                attempt: attempt + 1,
                max_attempts: policy.max_attempts,
                delay,
            });
            if !delay.is_zero() {
                std::thread::sleep(delay);
            }

            self.transition(stage, StageState::Executing);
            match self.executor.attempt(stage, context) {
                Ok(result) => {
                    info!("Stage '{}' succeeded on retry {}", name, attempt + 1);
                    self.transition(stage, StageState::Succeeded);
                    return result;
                }
                Err(failure) => {
                    warn!(
                        "Stage '{}' failed (retry {}/{}): {}",
                        name,
                        attempt + 1,
                        policy.max_attempts,
                        failure.error
                    );
                    self.transition(stage, StageState::Failed);
                    last_error = failure.error;
                }
            }
        }

        error!(
            "Stage '{}' failed after {} attempts",
            name, policy.max_attempts
        );
        StageResult::failure(
            name,
            format!("Failed after {} attempts: {}", policy.max_attempts, last_error),
        )
        .with_data(context.xml_data.clone())
    }
}
