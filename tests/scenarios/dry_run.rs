//! Test: dry run lists stages without side effects

use crate::helpers::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;
use xml_pipeline::{OutputStage, Pipeline};

#[test]
fn test_dry_run_executes_nothing() {
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("out").join("report.xml");
    let calls = Arc::new(AtomicUsize::new(0));
    let mut pipeline = Pipeline::new("preview")
        .with_stage(counted("prepare", calls.clone()))
        .with_stage(OutputStage::new("write", "xml", &output).unwrap());
    let events = record_events(&mut pipeline);

    let names = pipeline.dry_run();

    assert_eq!(names, vec!["prepare", "write"]);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert!(!output.exists());
    assert!(!dir.path().join("out").exists());
    assert!(events.lock().is_empty());
}

#[test]
fn test_dry_run_on_loaded_pipeline() {
    let dir = TempDir::new().unwrap();
    let pipeline = pipeline_from_yaml(
        r#"
name: preview
stages:
  - type: validate
    name: check
  - type: output
    name: publish
    format: json
    output_path: out/report.json
"#,
        dir.path(),
    );

    assert_eq!(pipeline.dry_run(), vec!["check", "publish"]);
    assert!(!dir.path().join("out").exists());
}
