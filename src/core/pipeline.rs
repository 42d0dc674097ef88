//! Pipeline domain model

use crate::{
    core::{ErrorStrategy, PipelineContext, PipelineError, PipelineInput, PipelineResult},
    execution::{EventHandler, ExecutionEngine, ExecutionEvent, RetryPolicy},
    stages::{PipelineStage, Stage},
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// An ordered list of stages plus the policy for running them
///
/// Stages are built once and reused across `execute` calls. A pipeline may
/// run repeatedly, but not concurrently with itself.
#[derive(Clone)]
pub struct Pipeline {
    /// Pipeline name
    pub name: String,

    /// Informational only
    pub description: String,

    pub error_strategy: ErrorStrategy,

    /// Capture a snapshot before each stage
    pub rollback_enabled: bool,

    /// Upper bound on snapshots held by a run
    pub max_snapshots: usize,

    /// Backoff used by the `retry` strategy
    pub retry_policy: RetryPolicy,

    /// Declared variables, seeded into each run's context
    pub variables: HashMap<String, Value>,

    stages: Vec<Stage>,

    event_handlers: Vec<EventHandler>,
}

impl Pipeline {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            error_strategy: ErrorStrategy::default(),
            rollback_enabled: true,
            max_snapshots: 100,
            retry_policy: RetryPolicy::default(),
            variables: HashMap::new(),
            stages: Vec::new(),
            event_handlers: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_error_strategy(mut self, strategy: ErrorStrategy) -> Self {
        self.error_strategy = strategy;
        self
    }

    pub fn with_rollback(mut self, enabled: bool) -> Self {
        self.rollback_enabled = enabled;
        self
    }

    pub fn with_max_snapshots(mut self, max_snapshots: usize) -> Self {
        self.max_snapshots = max_snapshots;
        self
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    pub fn with_variable(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.variables.insert(key.into(), value.into());
        self
    }

    /// Append a stage; returns `self` for chaining
    pub fn add_stage(&mut self, stage: impl Into<Stage>) -> &mut Self {
        self.stages.push(stage.into());
        self
    }

    /// Builder form of [`Pipeline::add_stage`]
    pub fn with_stage(mut self, stage: impl Into<Stage>) -> Self {
        self.add_stage(stage);
        self
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Add an event handler
    pub fn add_event_handler<F>(&mut self, handler: F)
    where
        F: Fn(ExecutionEvent) + Send + Sync + 'static,
    {
        self.event_handlers.push(Arc::new(handler));
    }

    pub(crate) fn event_handlers(&self) -> &[EventHandler] {
        &self.event_handlers
    }

    /// Run every stage in order
    ///
    /// `Err` is only returned when the input cannot be turned into a context.
    /// Stage failures, including terminal ones, are reported in the
    /// [`PipelineResult`]; use [`PipelineResult::into_result`] to propagate
    /// a terminal failure as an error.
    pub fn execute(&self, input: PipelineInput) -> Result<PipelineResult, PipelineError> {
        let mut context = input.into_context()?;
        for (key, value) in &self.variables {
            context
                .variables
                .entry(key.clone())
                .or_insert_with(|| value.clone());
        }
        Ok(ExecutionEngine::new(self).run(context))
    }

    /// Run against an XML file
    pub fn execute_file(&self, path: impl Into<PathBuf>) -> Result<PipelineResult, PipelineError> {
        self.execute(PipelineInput::File(path.into()))
    }

    /// Run against XML text
    pub fn execute_xml(&self, xml: impl Into<String>) -> Result<PipelineResult, PipelineError> {
        self.execute(PipelineInput::Xml(xml.into()))
    }

    /// Run against a prepared context
    pub fn execute_context(
        &self,
        context: PipelineContext,
    ) -> Result<PipelineResult, PipelineError> {
        self.execute(PipelineInput::Context(context))
    }

    /// Names of the stages that would run, in order; nothing is executed
    pub fn dry_run(&self) -> Vec<String> {
        info!("Dry run for pipeline '{}'", self.name);
        let names: Vec<String> = self.stages.iter().map(|s| s.name().to_string()).collect();
        for (i, name) in names.iter().enumerate() {
            info!("  {}. {}", i + 1, name);
        }
        names
    }

    pub fn to_dict(&self) -> Value {
        json!({
            "name": self.name,
            "description": self.description,
            "error_strategy": self.error_strategy.as_str(),
            "rollback_enabled": self.rollback_enabled,
            "max_snapshots": self.max_snapshots,
            "stages": self
                .stages
                .iter()
                .map(|s| json!({ "type": s.type_name(), "name": s.name() }))
                .collect::<Vec<_>>(),
        })
    }
}

impl fmt::Display for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Pipeline(name='{}', stages={}, error_strategy={})",
            self.name,
            self.stages.len(),
            self.error_strategy
        )
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("name", &self.name)
            .field("error_strategy", &self.error_strategy)
            .field("rollback_enabled", &self.rollback_enabled)
            .field("max_snapshots", &self.max_snapshots)
            .field("retry_policy", &self.retry_policy)
            .field("stages", &self.stages)
            .field("event_handlers", &self.event_handlers.len())
            .finish()
    }
}
