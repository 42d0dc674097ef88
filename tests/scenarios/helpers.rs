//! Test utility functions for xml-pipeline scenarios

#![allow(dead_code)]

use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use xml_pipeline::collaborators::{
    CompiledStylesheet, DocumentValidator, StylesheetProcessor, ValidationIssue,
    ValidationReport, ValidationRequest,
};
use xml_pipeline::core::BoxError;
use xml_pipeline::{
    CustomStage, ExecutionEvent, Pipeline, PipelineLoader, PipelineResult, StageResult,
};

/// Stage that always succeeds without touching the document
pub fn noop(name: &'static str) -> CustomStage {
    CustomStage::new(name, move |_ctx| Ok(StageResult::success(name)))
}

/// Stage that always raises `message`
pub fn failing(name: &'static str, message: &'static str) -> CustomStage {
    CustomStage::new(name, move |_ctx| Err(message.into()))
}

/// Stage that replaces the document text with `xml`
pub fn rewrite(name: &'static str, xml: &'static str) -> CustomStage {
    CustomStage::new(name, move |ctx| {
        ctx.xml_data = xml.to_string();
        Ok(StageResult::success(name).with_data(xml))
    })
}

/// Stage that counts its invocations
pub fn counted(name: &'static str, calls: Arc<AtomicUsize>) -> CustomStage {
    CustomStage::new(name, move |_ctx| {
        calls.fetch_add(1, Ordering::SeqCst);
        Ok(StageResult::success(name))
    })
}

/// Stage that fails on its first `failures` calls, then succeeds
pub fn flaky(name: &'static str, failures: usize, calls: Arc<AtomicUsize>) -> CustomStage {
    CustomStage::new(name, move |_ctx| {
        let call = calls.fetch_add(1, Ordering::SeqCst);
        if call < failures {
            Err(format!("transient failure {}", call + 1).into())
        } else {
            Ok(StageResult::success(name))
        }
    })
}

/// Collect every event the pipeline emits
pub fn record_events(pipeline: &mut Pipeline) -> Arc<Mutex<Vec<ExecutionEvent>>> {
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = events.clone();
    pipeline.add_event_handler(move |event| sink.lock().push(event));
    events
}

/// Load a pipeline from YAML, resolving paths against `base_dir`
pub fn pipeline_from_yaml(yaml: &str, base_dir: &Path) -> Pipeline {
    PipelineLoader::new()
        .load_str(yaml, base_dir)
        .expect("pipeline YAML should load")
}

/// Names of the stages that recorded a result, in order
pub fn recorded_stages(result: &PipelineResult) -> Vec<&str> {
    result
        .context
        .stage_results
        .iter()
        .map(|r| r.stage.as_str())
        .collect()
}

pub fn stage_result<'a>(result: &'a PipelineResult, stage: &str) -> &'a StageResult {
    result
        .context
        .stage_results
        .iter()
        .find(|r| r.stage == stage)
        .unwrap_or_else(|| panic!("no result recorded for stage '{}'", stage))
}

pub fn assert_pipeline_completed(result: &PipelineResult) {
    assert!(
        result.success,
        "Expected pipeline to succeed, got error: {:?}",
        result.error
    );
    assert_eq!(result.stages_failed, 0);
    assert!(result.cause.is_none());
}

pub fn assert_pipeline_failed(result: &PipelineResult) {
    assert!(!result.success, "Expected pipeline to fail");
    assert!(result.error.is_some(), "A failed run should carry an error");
}

pub fn assert_stage_failed(result: &PipelineResult, stage: &str, expected_error: &str) {
    let recorded = stage_result(result, stage);
    assert!(!recorded.success, "Expected stage '{}' to fail", stage);
    let error = recorded.error.as_deref().unwrap_or_default();
    assert!(
        error.contains(expected_error),
        "Stage '{}' error '{}' does not contain '{}'",
        stage,
        error,
        expected_error
    );
}

/// Stylesheet processor that wraps the document instead of running XSLT
#[derive(Default)]
pub struct WrappingProcessor {
    pub compiled: AtomicUsize,
}

struct WrappingStylesheet {
    root: String,
}

impl CompiledStylesheet for WrappingStylesheet {
    fn apply(&self, source: &str, params: &BTreeMap<String, String>) -> Result<String, BoxError> {
        let attrs: String = params
            .iter()
            .map(|(k, v)| format!(" {}=\"{}\"", k, v))
            .collect();
        Ok(format!("<{}{}>{}</{}>", self.root, attrs, source, self.root))
    }
}

impl StylesheetProcessor for WrappingProcessor {
    fn compile(&self, path: &Path) -> Result<Arc<dyn CompiledStylesheet>, BoxError> {
        self.compiled.fetch_add(1, Ordering::SeqCst);
        let root = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .ok_or("stylesheet path has no file name")?;
        Ok(Arc::new(WrappingStylesheet { root }))
    }
}

/// Validator returning a fixed report and remembering what it was asked
pub struct ScriptedValidator {
    pub report: ValidationReport,
    pub requests: Mutex<Vec<ValidationRequest>>,
}

impl ScriptedValidator {
    pub fn valid() -> Self {
        Self::with_report(ValidationReport {
            is_valid: true,
            validated_files: 1,
            ..ValidationReport::default()
        })
    }

    pub fn with_warning(message: &str) -> Self {
        Self::with_report(ValidationReport {
            is_valid: true,
            warnings: vec![ValidationIssue::new(message)],
            validated_files: 1,
            ..ValidationReport::default()
        })
    }

    pub fn with_report(report: ValidationReport) -> Self {
        Self {
            report,
            requests: Mutex::new(Vec::new()),
        }
    }
}

impl DocumentValidator for ScriptedValidator {
    fn validate_project(
        &self,
        _project_dir: &Path,
        request: &ValidationRequest,
    ) -> Result<ValidationReport, BoxError> {
        self.requests.lock().push(request.clone());
        Ok(self.report.clone())
    }
}
