//! CLI command definitions

use crate::core::{ConfigError, PipelineConfig};
use clap::Args;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Execute a pipeline
#[derive(Debug, Args, Clone)]
pub struct RunCommand {
    /// Path to pipeline YAML file
    pub pipeline_file: PathBuf,

    /// XML document to process
    pub input_xml: PathBuf,

    /// Variable overrides (KEY=VALUE)
    #[arg(long = "var", value_parser = parse_key_value)]
    pub vars: Vec<(String, String)>,

    /// Report format
    #[arg(long, value_enum, default_value_t = ReportFormat::Text)]
    pub format: ReportFormat,
}

/// Show pipeline stages without executing
#[derive(Debug, Args, Clone)]
pub struct DryRunCommand {
    /// Path to pipeline YAML file
    pub pipeline_file: PathBuf,
}

/// Validate a pipeline definition
#[derive(Debug, Args, Clone)]
pub struct ValidateCommand {
    /// Path to pipeline YAML file
    pub pipeline_file: PathBuf,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// List pipeline definitions
#[derive(Debug, Args, Clone)]
pub struct ListCommand {
    /// Directory holding `*.yaml` definitions
    #[arg(long, default_value = "templates/pipelines")]
    pub templates_dir: PathBuf,
}

/// How `run` reports its result
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ReportFormat {
    Text,
    Json,
}

/// Parse key=value pairs
pub fn parse_key_value(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("Invalid variable format: {} (expected KEY=VALUE)", s)),
    }
}

/// One entry in the `list` output
#[derive(Debug, Clone, Serialize)]
pub struct DefinitionSummary {
    pub file_name: String,
    pub name: String,
    pub description: String,
    pub stage_count: usize,
}

impl DefinitionSummary {
    /// Read the summary fields from a definition without building stages
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let config = PipelineConfig::from_file(path)?;
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Self {
            file_name: path
                .file_name()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default(),
            name: config.name.unwrap_or(stem),
            description: if config.description.is_empty() {
                "No description".to_string()
            } else {
                config.description
            },
            stage_count: config.stages.len(),
        })
    }
}

/// `*.yaml` files directly under `dir`, sorted by name
pub fn find_definitions(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext == "yaml"))
        .collect();
    files.sort();
    Ok(files)
}
