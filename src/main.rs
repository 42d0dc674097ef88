use anyhow::{Context, Result};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;
use xml_pipeline::cli::commands::{
    find_definitions, DefinitionSummary, DryRunCommand, ListCommand, ReportFormat, RunCommand,
    ValidateCommand,
};
use xml_pipeline::cli::output::*;
use xml_pipeline::cli::{Cli, Command};
use xml_pipeline::PipelineLoader;

fn main() -> Result<()> {
    let cli = Cli::from_args();

    // Initialize logging
    let log_level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set logging subscriber")?;

    let success = match &cli.command {
        Command::Run(cmd) => run_pipeline(cmd, cli.verbose)?,
        Command::DryRun(cmd) => dry_run(cmd)?,
        Command::Validate(cmd) => validate_pipeline(cmd)?,
        Command::List(cmd) => list_pipelines(cmd)?,
    };

    if !success {
        std::process::exit(1);
    }
    Ok(())
}

fn run_pipeline(cmd: &RunCommand, verbose: bool) -> Result<bool> {
    let text = cmd.format == ReportFormat::Text;
    if text {
        println!(
            "{} Running pipeline: {}",
            ROCKET,
            style(cmd.pipeline_file.display()).bold()
        );
        println!("   Input: {}", cmd.input_xml.display());
    }

    let mut loader = PipelineLoader::new();
    for (key, value) in &cmd.vars {
        if text {
            println!(
                "{} Variable override: {} = {}",
                INFO,
                style(key).cyan(),
                style(value).dim()
            );
        }
        loader = loader.with_variable_override(key.clone(), value.clone());
    }

    let mut pipeline = loader
        .load(&cmd.pipeline_file)
        .with_context(|| format!("Failed to load pipeline {}", cmd.pipeline_file.display()))?;

    if text {
        pipeline.add_event_handler(progress_handler(create_progress_bar(
            pipeline.stages().len(),
        )));
    }

    let result = pipeline
        .execute_file(&cmd.input_xml)
        .with_context(|| format!("Pipeline '{}' could not start", pipeline.name))?;

    match cmd.format {
        ReportFormat::Json => println!("{}", serde_json::to_string_pretty(&result.to_dict())?),
        ReportFormat::Text => println!("\n{}", format_run_summary(&result, verbose)),
    }
    Ok(result.success)
}

fn dry_run(cmd: &DryRunCommand) -> Result<bool> {
    println!("{} Dry run: {}\n", SEARCH, cmd.pipeline_file.display());

    let pipeline = PipelineLoader::new()
        .load(&cmd.pipeline_file)
        .with_context(|| format!("Failed to load pipeline {}", cmd.pipeline_file.display()))?;
    pipeline.dry_run();

    println!("{}", format_dry_run(&pipeline));
    Ok(true)
}

fn validate_pipeline(cmd: &ValidateCommand) -> Result<bool> {
    if !cmd.json {
        println!("{} Validating pipeline...", INFO);
    }

    match PipelineLoader::new().load(&cmd.pipeline_file) {
        Ok(pipeline) => {
            if cmd.json {
                let report = serde_json::json!({ "valid": true, "pipeline": pipeline.to_dict() });
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("{} Pipeline definition is valid!", CHECK);
                println!("  Name: {}", style(&pipeline.name).bold());
                println!("  Stages: {}", style(pipeline.stages().len()).cyan());
                println!("  Variables: {}", style(pipeline.variables.len()).cyan());
            }
            Ok(true)
        }
        Err(e) => {
            if cmd.json {
                let report = serde_json::json!({ "valid": false, "error": e.to_string() });
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("{} Validation failed:", CROSS);
                println!("  {}", style(e).red());
            }
            Ok(false)
        }
    }
}

fn list_pipelines(cmd: &ListCommand) -> Result<bool> {
    let dir = &cmd.templates_dir;
    if !dir.is_dir() {
        println!(
            "{} Templates directory not found: {}",
            CROSS,
            dir.display()
        );
        return Ok(false);
    }

    println!("{} Available pipelines:\n", LIST);

    let files = find_definitions(dir)
        .with_context(|| format!("Failed to read {}", dir.display()))?;
    if files.is_empty() {
        println!("   No pipelines found in {}", dir.display());
        return Ok(true);
    }

    for file in &files {
        match DefinitionSummary::from_file(file) {
            Ok(summary) => {
                println!("  • {}", style(&summary.file_name).bold());
                println!("    Name: {}", summary.name);
                println!("    Description: {}", summary.description);
                println!("    Stages: {}", style(summary.stage_count).cyan());
            }
            Err(e) => {
                println!(
                    "  • {} {}",
                    file.display(),
                    style(format!("(error loading: {})", e)).red()
                );
            }
        }
        println!();
    }
    Ok(true)
}
