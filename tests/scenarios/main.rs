//! Scenario-based tests for xml-pipeline
//!
//! Each module covers one family of behavior through the public API.

mod helpers;

mod continue_and_skip;
mod dry_run;
mod fail_fast;
mod rollback;
mod snapshots;
mod stages;
