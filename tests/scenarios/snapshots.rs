//! Test: snapshot history stays bounded

use crate::helpers::*;
use xml_pipeline::{ErrorStrategy, Pipeline};

#[test]
fn test_snapshot_history_keeps_most_recent() {
    let pipeline = Pipeline::new("bounded")
        .with_max_snapshots(2)
        .with_stage(noop("s1"))
        .with_stage(noop("s2"))
        .with_stage(noop("s3"))
        .with_stage(noop("s4"))
        .with_stage(noop("s5"));

    let result = pipeline.execute_xml("<doc/>").unwrap();

    assert_pipeline_completed(&result);
    assert_eq!(result.context.snapshots.len(), 2);
    assert_eq!(result.context.snapshots.stage_names(), vec!["s4", "s5"]);
}

#[test]
fn test_no_snapshots_when_rollback_disabled() {
    let pipeline = Pipeline::new("unguarded")
        .with_rollback(false)
        .with_stage(noop("s1"))
        .with_stage(noop("s2"));

    let result = pipeline.execute_xml("<doc/>").unwrap();

    assert!(result.context.snapshots.is_empty());
}

#[test]
fn test_evicted_snapshot_cannot_be_restored() {
    let pipeline = Pipeline::new("tiny")
        .with_error_strategy(ErrorStrategy::Rollback)
        .with_max_snapshots(1)
        .with_stage(rewrite("edit", "<edited/>"))
        .with_stage(failing("check", "rejected"));

    let result = pipeline.execute_xml("<doc/>").unwrap();

    // Only the snapshot taken before "check" survives, so that is what is restored
    assert_eq!(result.context.xml_data, "<edited/>");
    assert!(result.context.snapshots.is_empty());
}

#[test]
fn test_snapshots_capture_document_before_each_stage() {
    let pipeline = Pipeline::new("history")
        .with_stage(rewrite("first", "<one/>"))
        .with_stage(rewrite("second", "<two/>"));

    let result = pipeline.execute_xml("<zero/>").unwrap();

    let captured: Vec<(&str, &str)> = result
        .context
        .snapshots
        .iter()
        .map(|s| (s.stage.as_str(), s.xml_data.as_str()))
        .collect();
    assert_eq!(captured, vec![("first", "<zero/>"), ("second", "<one/>")]);
}
