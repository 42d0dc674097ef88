//! CLI output formatting

use crate::{
    core::{Pipeline, PipelineResult, StageResult, StageState},
    execution::ExecutionEvent,
    stages::PipelineStage,
};
use console::Emoji;
use indicatif::{ProgressBar, ProgressStyle};
use std::fmt::Write as _;
use std::time::Duration;

// Re-export style
pub use console::style;

// Emojis for output
pub static CHECK: Emoji<'_, '_> = Emoji("✅ ", "✓ ");
pub static CROSS: Emoji<'_, '_> = Emoji("❌ ", "✗ ");
pub static SPINNER: Emoji<'_, '_> = Emoji("⏳ ", "~ ");
pub static INFO: Emoji<'_, '_> = Emoji("ℹ️  ", "i ");
pub static WARN: Emoji<'_, '_> = Emoji("⚠️  ", "! ");
pub static ROCKET: Emoji<'_, '_> = Emoji("🔄 ", "> ");
pub static SEARCH: Emoji<'_, '_> = Emoji("🔍 ", "? ");
pub static LIST: Emoji<'_, '_> = Emoji("📋 ", "# ");

const MAX_SEPARATOR_WIDTH: usize = 60;

/// A horizontal rule sized to the terminal, capped at 60 columns
pub fn separator() -> String {
    let width = term_size::dimensions()
        .map(|(w, _)| w.min(MAX_SEPARATOR_WIDTH))
        .unwrap_or(MAX_SEPARATOR_WIDTH);
    "=".repeat(width)
}

/// Create a progress bar with one tick per stage
pub fn create_progress_bar(total: usize) -> ProgressBar {
    let progress = ProgressBar::new(total as u64);
    let style = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        .map(|style| style.progress_chars("#>-"))
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    progress.set_style(style);
    progress.enable_steady_tick(Duration::from_millis(100));
    progress
}

/// Event handler that drives `progress` and prints stage outcomes above it
pub fn progress_handler(progress: ProgressBar) -> impl Fn(ExecutionEvent) + Send + Sync + 'static {
    move |event| {
        match &event {
            // Pending fires once per stage; the other states repeat on retry
            ExecutionEvent::StageTransition {
                stage,
                state: StageState::Pending,
            } => {
                progress.set_message(stage.clone());
                progress.inc(1);
            }
            ExecutionEvent::PipelineCompleted { .. } => progress.finish_and_clear(),
            _ => {}
        }
        if let Some(line) = format_execution_event(&event) {
            progress.println(line);
        }
    }
}

/// Format a stage state for display
pub fn format_stage_state(state: StageState) -> String {
    match state {
        StageState::Pending => style("PENDING").dim().to_string(),
        StageState::ValidatingInput => style("CHECKING INPUT").dim().to_string(),
        StageState::Executing => style("RUNNING").yellow().to_string(),
        StageState::Succeeded => style("SUCCEEDED").green().to_string(),
        StageState::Failed => style("FAILED").red().to_string(),
    }
}

/// Format an execution event for display
///
/// Returns `None` for events that only move the progress bar.
pub fn format_execution_event(event: &ExecutionEvent) -> Option<String> {
    match event {
        ExecutionEvent::PipelineStarted {
            execution_id,
            pipeline_name,
            total_stages,
        } => Some(format!(
            "{} Starting pipeline {} with {} stages ({})",
            ROCKET,
            style(pipeline_name).bold(),
            total_stages,
            style(short_id(execution_id)).dim()
        )),
        ExecutionEvent::StageTransition { stage, state } => match state {
            StageState::Succeeded => Some(format!("{} {}", CHECK, style(stage).green())),
            StageState::Failed => Some(format!(
                "{} {} {}",
                CROSS,
                style(stage).red(),
                format_stage_state(*state)
            )),
            _ => None,
        },
        ExecutionEvent::StageRetrying {
            stage,
            attempt,
            max_attempts,
            delay,
        } => Some(format!(
            "{} {} (retry {}/{} in {:.1}s)",
            WARN,
            style(stage).yellow(),
            attempt,
            max_attempts,
            delay.as_secs_f64()
        )),
        ExecutionEvent::StageRolledBack { stage, restored } => Some(if *restored {
            format!("{} Rolled back {}", INFO, style(stage).yellow())
        } else {
            format!("{} No snapshot to roll back {}", WARN, style(stage).yellow())
        }),
        ExecutionEvent::PipelineCompleted { .. } => None,
    }
}

fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}

/// One line per stage result, with the error underneath when there is one
pub fn format_stage_result(result: &StageResult) -> String {
    let icon = if result.success { CHECK } else { CROSS };
    let mut line = format!(
        "  {}{} ({:.2}s)",
        icon,
        result.stage,
        result.duration_seconds
    );
    if let Some(error) = &result.error {
        let _ = write!(line, "\n     Error: {}", style(error).red());
    }
    line
}

/// Text summary printed after `run`
pub fn format_run_summary(result: &PipelineResult, verbose: bool) -> String {
    let rule = separator();
    let status = if result.success {
        format!("{}SUCCESS", CHECK)
    } else {
        format!("{}FAILED", CROSS)
    };

    let mut out = String::new();
    let _ = writeln!(out, "{}", rule);
    let _ = writeln!(out, "Pipeline: {}", style(&result.pipeline_name).bold());
    let _ = writeln!(out, "Status: {}", status);
    let _ = writeln!(out, "Duration: {:.2}s", result.duration_seconds());
    let _ = writeln!(out, "Stages executed: {}", result.stages_executed);
    let _ = writeln!(out, "Stages failed: {}", result.stages_failed);
    let _ = write!(out, "{}", rule);

    if let Some(error) = &result.error {
        let _ = write!(out, "\nError: {}", style(error).red());
    }

    if verbose || !result.success {
        let _ = write!(out, "\n\nStage Results:");
        for stage_result in &result.context.stage_results {
            let _ = write!(out, "\n{}", format_stage_result(stage_result));
        }
    }
    out
}

/// Text printed by `dry-run`
pub fn format_dry_run(pipeline: &Pipeline) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Pipeline: {}", style(&pipeline.name).bold());
    let _ = writeln!(out, "Error Strategy: {}", pipeline.error_strategy);
    let _ = writeln!(
        out,
        "Rollback: {}",
        if pipeline.rollback_enabled {
            "Enabled"
        } else {
            "Disabled"
        }
    );
    let _ = write!(out, "\nStages ({}):\n", pipeline.stages().len());
    for (i, stage) in pipeline.stages().iter().enumerate() {
        let _ = write!(
            out,
            "\n  {}. {} {}",
            i + 1,
            style(stage.name()).cyan(),
            style(format!("[{}]", stage.kind())).dim()
        );
    }
    out
}
