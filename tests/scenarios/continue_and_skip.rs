//! Test: continue and skip - failures are recorded and the run goes on

use crate::helpers::*;
use xml_pipeline::{ErrorStrategy, ExecutionEvent, Pipeline, StageResult, StageState};

fn tolerant(strategy: ErrorStrategy) -> Pipeline {
    Pipeline::new("tolerant")
        .with_error_strategy(strategy)
        .with_stage(noop("first"))
        .with_stage(failing("second", "broken input"))
        .with_stage(noop("third"))
}

#[test]
fn test_continue_records_failure_and_runs_remaining_stages() {
    let result = tolerant(ErrorStrategy::Continue).execute_xml("<doc/>").unwrap();

    assert!(!result.success);
    assert!(result.cause.is_none());
    assert_eq!(result.stages_executed, 3);
    assert_eq!(result.stages_failed, 1);
    assert_eq!(recorded_stages(&result), vec!["first", "second", "third"]);
    assert_stage_failed(&result, "second", "broken input");
    assert_eq!(result.error.as_deref(), Some("Stage 'second' failed: broken input"));
}

#[test]
fn test_skip_behaves_like_continue() {
    let skipped = tolerant(ErrorStrategy::Skip).execute_xml("<doc/>").unwrap();
    let continued = tolerant(ErrorStrategy::Continue).execute_xml("<doc/>").unwrap();

    assert_eq!(skipped.success, continued.success);
    assert_eq!(skipped.stages_executed, continued.stages_executed);
    assert_eq!(skipped.stages_failed, continued.stages_failed);
    assert_eq!(recorded_stages(&skipped), recorded_stages(&continued));
    assert_eq!(skipped.error, continued.error);
}

#[test]
fn test_returned_failure_is_treated_like_a_raised_one() {
    let pipeline = Pipeline::new("soft")
        .with_error_strategy(ErrorStrategy::Continue)
        .with_stage(xml_pipeline::CustomStage::new("soft", |_ctx| {
            Ok(StageResult::failure("soft", "quota exceeded").with_metadata("quota", 10))
        }))
        .with_stage(noop("after"));

    let result = pipeline.execute_xml("<doc/>").unwrap();

    assert_eq!(result.stages_failed, 1);
    let soft = stage_result(&result, "soft");
    assert_eq!(soft.error.as_deref(), Some("quota exceeded"));
    assert_eq!(soft.metadata["quota"], 10);
    assert!(stage_result(&result, "after").success);
}

#[test]
fn test_failed_stage_transitions() {
    let mut pipeline = tolerant(ErrorStrategy::Continue);
    let events = record_events(&mut pipeline);

    pipeline.execute_xml("<doc/>").unwrap();

    let second: Vec<StageState> = events
        .lock()
        .iter()
        .filter_map(|event| match event {
            ExecutionEvent::StageTransition { stage, state } if stage == "second" => Some(*state),
            _ => None,
        })
        .collect();
    assert_eq!(
        second,
        vec![
            StageState::Pending,
            StageState::ValidatingInput,
            StageState::Executing,
            StageState::Failed,
        ]
    );
}
