//! Test: rollback - a failed stage restores the document it started from

use crate::helpers::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use xml_pipeline::{
    CustomStage, ErrorStrategy, ExecutionEvent, Pipeline, PipelineError, StageResult,
};

const INPUT: &str = "<?xml version=\"1.0\"?>\n<catalog>\n  <book id=\"1\">  spaced  </book>\n</catalog>\n";
const AFTER_FIRST: &str = "<catalog><book id=\"1\" reviewed=\"yes\"/></catalog>";

/// Rewrites the document, then fails
fn corrupting(name: &'static str) -> CustomStage {
    CustomStage::new(name, move |ctx| {
        ctx.xml_data = "<partial".to_string();
        ctx.xml_tree = None;
        Err("write interrupted".into())
    })
}

#[test]
fn test_rollback_restores_document_byte_for_byte() {
    let pipeline = Pipeline::new("guarded")
        .with_error_strategy(ErrorStrategy::Rollback)
        .with_stage(corrupting("edit"));

    let result = pipeline.execute_xml(INPUT).unwrap();

    assert_pipeline_failed(&result);
    assert_eq!(result.context.xml_data, INPUT);
    assert!(result.context.xml_tree.is_some());
}

#[test]
fn test_rollback_restores_state_before_failing_stage_only() {
    let pipeline = Pipeline::new("guarded")
        .with_error_strategy(ErrorStrategy::Rollback)
        .with_stage(rewrite("review", AFTER_FIRST))
        .with_stage(corrupting("publish"))
        .with_stage(noop("never"));

    let result = pipeline.execute_xml(INPUT).unwrap();

    assert_eq!(result.context.xml_data, AFTER_FIRST);
    assert_eq!(result.stages_executed, 2);
    assert_eq!(result.stages_failed, 1);
    assert_eq!(recorded_stages(&result), vec!["review"]);
    // The restored snapshot and everything after it are discarded
    assert_eq!(result.context.snapshots.stage_names(), vec!["review"]);
    assert!(matches!(
        result.cause,
        Some(PipelineError::RolledBack { ref stage, .. }) if stage == "publish"
    ));
}

#[test]
fn test_rollback_hook_runs_after_restore() {
    let seen = Arc::new(parking_lot::Mutex::new(None));
    let hook_saw = seen.clone();
    let stage = corrupting("edit").with_rollback(move |ctx| {
        *hook_saw.lock() = Some(ctx.xml_data.clone());
        ctx.set_variable("cleaned_up", true);
    });
    let pipeline = Pipeline::new("hooked")
        .with_error_strategy(ErrorStrategy::Rollback)
        .with_stage(stage);

    let result = pipeline.execute_xml(INPUT).unwrap();

    assert_eq!(seen.lock().as_deref(), Some(INPUT));
    assert_eq!(
        result.context.get_variable("cleaned_up"),
        Some(&serde_json::json!(true))
    );
}

#[test]
fn test_rollback_without_snapshots_still_fails() {
    let hook_calls = Arc::new(AtomicUsize::new(0));
    let calls = hook_calls.clone();
    let mut pipeline = Pipeline::new("unguarded")
        .with_error_strategy(ErrorStrategy::Rollback)
        .with_rollback(false)
        .with_stage(corrupting("edit").with_rollback(move |_ctx| {
            calls.fetch_add(1, Ordering::SeqCst);
        }));
    let events = record_events(&mut pipeline);

    let result = pipeline.execute_xml(INPUT).unwrap();

    assert_pipeline_failed(&result);
    assert_eq!(result.context.xml_data, "<partial");
    assert!(result.context.snapshots.is_empty());
    assert_eq!(hook_calls.load(Ordering::SeqCst), 1);
    assert!(events.lock().contains(&ExecutionEvent::StageRolledBack {
        stage: "edit".to_string(),
        restored: false,
    }));
}

#[test]
fn test_rolled_back_error_keeps_stage_error_as_source() {
    use std::error::Error as _;

    let pipeline = Pipeline::new("guarded")
        .with_error_strategy(ErrorStrategy::Rollback)
        .with_stage(CustomStage::new("soft", |_ctx| {
            Ok(StageResult::failure("soft", "not allowed"))
        }));

    let err = pipeline.execute_xml("<doc/>").unwrap().into_result().unwrap_err();

    assert_eq!(err.to_string(), "Stage 'soft' failed and was rolled back");
    let source = err.source().map(|s| s.to_string());
    assert_eq!(source.as_deref(), Some("Stage 'soft' failed: not allowed"));
}
