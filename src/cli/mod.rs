//! Command-line interface

pub mod commands;
pub mod output;

use clap::{Parser, Subcommand};
use commands::{DryRunCommand, ListCommand, RunCommand, ValidateCommand};
use std::ffi::OsString;

/// Declarative XML processing pipelines
#[derive(Debug, Parser, Clone)]
#[command(name = "xml-pipeline")]
#[command(version)]
#[command(
    about = "Run declarative XML pipelines: validate, transform and publish documents",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Available commands
#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Execute a pipeline against an XML file
    Run(RunCommand),

    /// Show the stages a pipeline would run, without running them
    DryRun(DryRunCommand),

    /// Check that a pipeline definition loads
    Validate(ValidateCommand),

    /// List pipeline definitions in a directory
    List(ListCommand),
}

impl Cli {
    /// Parse CLI arguments from environment
    pub fn from_args() -> Self {
        Self::parse()
    }

    /// Parse CLI arguments from a slice
    pub fn try_parse_from<I, T>(itr: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        <Self as Parser>::try_parse_from(itr)
    }
}
