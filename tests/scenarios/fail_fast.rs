//! Test: fail_fast - the first failure stops the run

use crate::helpers::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use xml_pipeline::{ErrorStrategy, Pipeline, PipelineError, PipelineStage, TransformStage};

#[test]
fn test_first_failure_stops_the_run() {
    let later = Arc::new(AtomicUsize::new(0));
    let pipeline = Pipeline::new("strict")
        .with_stage(noop("prepare"))
        .with_stage(failing("explode", "boom"))
        .with_stage(counted("never", later.clone()));

    let result = pipeline.execute_xml("<doc/>").unwrap();

    assert_pipeline_failed(&result);
    assert_eq!(result.stages_executed, 2);
    assert_eq!(result.stages_failed, 1);
    assert_eq!(later.load(Ordering::SeqCst), 0);
    // The failing stage leaves no result behind
    assert_eq!(recorded_stages(&result), vec!["prepare"]);
    assert_eq!(result.error.as_deref(), Some("Stage 'explode' failed: boom"));
}

#[test]
fn test_terminal_failure_propagates_through_into_result() {
    let pipeline = Pipeline::new("strict").with_stage(failing("explode", "boom"));

    let err = pipeline.execute_xml("<doc/>").unwrap().into_result().unwrap_err();

    match err {
        PipelineError::Stage(stage_error) => {
            assert_eq!(stage_error.stage_name(), "explode");
            assert_eq!(stage_error.message(), "boom");
        }
        other => panic!("unexpected error: {}", other),
    }
}

#[test]
fn test_transform_error_names_the_stage() {
    let pipeline = Pipeline::new("transforming")
        .with_error_strategy(ErrorStrategy::FailFast)
        .with_stage(TransformStage::function("enrich", |_xml, _ctx| {
            Err("unknown element <foo>".into())
        }));

    let result = pipeline.execute_xml("<doc/>").unwrap();

    assert_pipeline_failed(&result);
    let error = result.error.unwrap();
    assert!(error.contains("enrich"), "error should name the stage: {}", error);
    assert!(error.contains("unknown element <foo>"));
}

#[test]
fn test_precondition_failure_is_fatal_under_every_strategy() {
    for strategy in ErrorStrategy::ALL {
        let body = Arc::new(AtomicUsize::new(0));
        let guarded = {
            let body = body.clone();
            xml_pipeline::CustomStage::new("guarded", move |_ctx| {
                body.fetch_add(1, Ordering::SeqCst);
                Ok(xml_pipeline::StageResult::success("guarded"))
            })
            .with_precondition(|ctx| ctx.get_variable("ready").is_some())
        };
        let pipeline = Pipeline::new("guarded")
            .with_error_strategy(strategy)
            .with_stage(guarded);

        let result = pipeline.execute_xml("<doc/>").unwrap();

        assert!(!result.success, "{} should stop on a precondition", strategy);
        assert_eq!(result.stages_executed, 0);
        assert_eq!(body.load(Ordering::SeqCst), 0);
        assert!(matches!(
            result.cause,
            Some(PipelineError::PreconditionFailed { ref stage }) if stage == "guarded"
        ));
    }
}

#[test]
fn test_builtin_stage_without_document_fails_precondition() {
    let stage = TransformStage::function("noop", |xml, _ctx| Ok(xml.to_string()));
    let context = xml_pipeline::PipelineContext::from_xml("<doc/>");
    assert!(stage.validate_input(&context));

    let mut empty = context.clone();
    empty.xml_data.clear();
    empty.xml_tree = None;
    assert!(!stage.validate_input(&empty));
}
