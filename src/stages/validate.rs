//! Validation stage - checks the document through a [`DocumentValidator`]

use crate::collaborators::{
    CollaboratorError, DocumentValidator, ValidationReport, ValidationRequest,
    WellFormednessValidator,
};
use crate::core::{BoxError, PipelineContext, StageError, StageResult};
use crate::stages::{has_document, PipelineStage};
use serde_json::Value;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tempfile::TempDir;
use tracing::{debug, error};

/// Documents larger than this are validated with a streaming parse
pub const DEFAULT_STREAMING_THRESHOLD: usize = 10 * 1024 * 1024;

const REPORTED_ISSUES: usize = 10;

#[derive(Clone)]
pub struct ValidateStage {
    name: String,
    schemas_dir: Option<PathBuf>,
    guardrails_dir: Option<PathBuf>,
    /// Warnings fail the stage, and any failure is raised as an error
    strict: bool,
    streaming: bool,
    streaming_threshold: usize,
    validator: Arc<dyn DocumentValidator>,
}

impl ValidateStage {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            schemas_dir: None,
            guardrails_dir: None,
            strict: true,
            streaming: false,
            streaming_threshold: DEFAULT_STREAMING_THRESHOLD,
            validator: Arc::new(WellFormednessValidator::new()),
        }
    }

    pub fn with_schemas_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.schemas_dir = Some(dir.into());
        self
    }

    pub fn with_guardrails_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.guardrails_dir = Some(dir.into());
        self
    }

    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Always use the streaming strategy
    pub fn streaming(mut self, streaming: bool) -> Self {
        self.streaming = streaming;
        self
    }

    pub fn streaming_threshold(mut self, bytes: usize) -> Self {
        self.streaming_threshold = bytes;
        self
    }

    pub fn with_validator(mut self, validator: Arc<dyn DocumentValidator>) -> Self {
        self.validator = validator;
        self
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    pub fn schemas_dir(&self) -> Option<&Path> {
        self.schemas_dir.as_deref()
    }

    pub fn guardrails_dir(&self) -> Option<&Path> {
        self.guardrails_dir.as_deref()
    }

    fn uses_streaming(&self, context: &PipelineContext) -> bool {
        self.streaming || context.xml_data.len() > self.streaming_threshold
    }

    /// Validate the input file's directory if there is one, otherwise a
    /// temporary directory holding the current text
    fn run_validator(
        &self,
        context: &PipelineContext,
        request: &ValidationRequest,
    ) -> Result<ValidationReport, BoxError> {
        if let Some(path) = context.input_path.as_ref().filter(|p| p.exists()) {
            let project_dir = match path.parent() {
                Some(parent) if !parent.as_os_str().is_empty() => parent,
                _ => Path::new("."),
            };
            return self.validator.validate_project(project_dir, request);
        }

        let temp = TempDir::new().map_err(|e| CollaboratorError::io(std::env::temp_dir(), e))?;
        let document = temp.path().join("temp.xml");
        std::fs::write(&document, &context.xml_data)
            .map_err(|e| CollaboratorError::io(&document, e))?;
        self.validator.validate_project(temp.path(), request)
    }
}

fn first_issues<T: ToString>(issues: &[T]) -> Value {
    issues
        .iter()
        .take(REPORTED_ISSUES)
        .map(|issue| Value::from(issue.to_string()))
        .collect()
}

impl PipelineStage for ValidateStage {
    fn name(&self) -> &str {
        &self.name
    }

    fn execute(&self, context: &mut PipelineContext) -> Result<StageResult, StageError> {
        let started = Instant::now();
        let streaming = self.uses_streaming(context);
        let request = ValidationRequest {
            schemas_dir: self.schemas_dir.clone(),
            guardrails_dir: self.guardrails_dir.clone(),
            streaming,
        };

        let report = self.run_validator(context, &request).map_err(|e| {
            error!("Validation stage '{}' failed: {}", self.name, e);
            StageError::validation_caused_by(&self.name, e)
        })?;
        debug!(
            "Stage '{}' validated {} files (streaming={})",
            self.name, report.validated_files, streaming
        );

        let success = if self.strict {
            report.is_valid && report.warnings.is_empty()
        } else {
            report.is_valid
        };
        if self.strict && !success {
            return Err(StageError::validation(
                &self.name,
                format!(
                    "Validation failed: {} errors, {} warnings",
                    report.errors.len(),
                    report.warnings.len()
                ),
            ));
        }

        let result = StageResult {
            success,
            error: (!success).then(|| format!("{} validation errors", report.errors.len())),
            ..StageResult::success(&self.name)
        };
        Ok(result
            .with_data(context.xml_data.clone())
            .with_metadata("errors", first_issues(&report.errors))
            .with_metadata("warnings", first_issues(&report.warnings))
            .with_metadata("streaming", streaming)
            .with_metadata("error_count", report.errors.len())
            .with_metadata("warning_count", report.warnings.len())
            .with_duration(started.elapsed().as_secs_f64()))
    }

    fn validate_input(&self, context: &PipelineContext) -> bool {
        has_document(context)
    }
}

impl fmt::Debug for ValidateStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidateStage")
            .field("name", &self.name)
            .field("schemas_dir", &self.schemas_dir)
            .field("guardrails_dir", &self.guardrails_dir)
            .field("strict", &self.strict)
            .field("streaming", &self.streaming)
            .field("streaming_threshold", &self.streaming_threshold)
            .finish_non_exhaustive()
    }
}
