//! Test: built-in stage behavior inside a running pipeline

use crate::helpers::*;
use parking_lot::Mutex;
use std::sync::Arc;
use tempfile::TempDir;
use xml_pipeline::collaborators::PublishRequest;
use xml_pipeline::core::{BoxError, ConfigError};
use xml_pipeline::{
    ErrorStrategy, OutputFormat, OutputStage, Pipeline, PublisherRegistry, TransformStage,
    ValidateStage,
};

#[test]
fn test_output_rejects_unknown_format_at_construction() {
    let err = OutputStage::new("write", "pdf", "out.pdf").unwrap_err();
    assert!(matches!(err, ConfigError::UnsupportedFormat { .. }));
    assert_eq!(
        err.to_string(),
        "Unsupported format 'pdf'. Supported: html, pptx, php, json, xml, assertions"
    );
}

#[test]
fn test_json_output_writes_context_summary() {
    let dir = TempDir::new().unwrap();
    let target = dir.path().join("nested").join("summary.json");
    let pipeline = Pipeline::new("summarize")
        .with_stage(noop("prepare"))
        .with_stage(OutputStage::new("write", "json", &target).unwrap());

    let result = pipeline.execute_xml("<doc/>").unwrap();

    assert_pipeline_completed(&result);
    let written: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&target).unwrap()).unwrap();
    assert_eq!(written["execution_id"], result.context.execution_id.as_str());
    let write = stage_result(&result, "write");
    assert_eq!(write.metadata["format"], "json");
}

#[test]
fn test_delegated_format_uses_registered_publisher() {
    let dir = TempDir::new().unwrap();
    let seen: Arc<Mutex<Vec<String>>> = Arc::default();
    let sink = seen.clone();
    let publishers = PublisherRegistry::new().register(
        OutputFormat::Html,
        move |request: &PublishRequest<'_>| -> Result<(), BoxError> {
            sink.lock().push(request.xml_data.to_string());
            std::fs::write(request.output_path, "<html/>")?;
            Ok(())
        },
    );
    let target = dir.path().join("site").join("index.html");
    let pipeline = Pipeline::new("site").with_stage(
        OutputStage::new("render", "html", &target)
            .unwrap()
            .with_publishers(publishers),
    );

    let result = pipeline.execute_xml("<page/>").unwrap();

    assert_pipeline_completed(&result);
    assert_eq!(*seen.lock(), vec!["<page/>".to_string()]);
    assert_eq!(std::fs::read_to_string(&target).unwrap(), "<html/>");
}

#[test]
fn test_delegated_format_without_publisher_fails_the_stage() {
    let dir = TempDir::new().unwrap();
    let pipeline = Pipeline::new("slides")
        .with_error_strategy(ErrorStrategy::Continue)
        .with_stage(OutputStage::new("deck", "pptx", dir.path().join("deck.pptx")).unwrap());

    let result = pipeline.execute_xml("<slides/>").unwrap();

    assert_pipeline_failed(&result);
    let deck = stage_result(&result, "deck");
    assert!(deck.error.as_deref().unwrap_or_default().contains("deck"));
    assert!(!dir.path().join("deck.pptx").exists());
}

#[test]
fn test_strict_validation_fails_on_warnings() {
    let validator = Arc::new(ScriptedValidator::with_warning("no schema"));
    let pipeline = Pipeline::new("strict")
        .with_stage(ValidateStage::new("check").with_validator(validator.clone()));

    let result = pipeline.execute_xml("<doc/>").unwrap();

    assert_pipeline_failed(&result);
    assert_eq!(
        result.error.as_deref(),
        Some("Validation failed in stage 'check': Validation failed: 0 errors, 1 warnings")
    );
}

#[test]
fn test_lenient_validation_tolerates_warnings() {
    let validator = Arc::new(ScriptedValidator::with_warning("no schema"));
    let pipeline = Pipeline::new("lenient").with_stage(
        ValidateStage::new("check")
            .strict(false)
            .streaming(true)
            .with_validator(validator.clone()),
    );

    let result = pipeline.execute_xml("<doc/>").unwrap();

    assert_pipeline_completed(&result);
    let check = stage_result(&result, "check");
    assert_eq!(check.metadata["warning_count"], 1);
    assert_eq!(check.metadata["streaming"], true);
    assert!(validator.requests.lock()[0].streaming);
}

#[test]
fn test_function_transform_updates_document_and_tree() {
    let pipeline = Pipeline::new("rename").with_stage(TransformStage::function(
        "rename",
        |xml, _ctx| Ok(xml.replace("old", "new")),
    ));

    let result = pipeline.execute_xml("<old/>").unwrap();

    assert_pipeline_completed(&result);
    assert_eq!(result.context.xml_data, "<new/>");
    assert_eq!(
        result.context.xml_tree.as_ref().map(|tree| tree.name.as_str()),
        Some("new")
    );
    let rename = stage_result(&result, "rename");
    assert_eq!(rename.metadata["transform_type"], "function");
    assert_eq!(rename.metadata["tree_parsed"], true);
}

#[test]
fn test_transform_output_that_is_not_xml_still_succeeds() {
    let pipeline = Pipeline::new("flatten").with_stage(TransformStage::function(
        "flatten",
        |_xml, _ctx| Ok("plain text".to_string()),
    ));

    let result = pipeline.execute_xml("<doc/>").unwrap();

    assert_pipeline_completed(&result);
    assert_eq!(result.context.xml_data, "plain text");
    assert!(result.context.xml_tree.is_none());
}
