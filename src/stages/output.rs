//! Output stage - writes the document in one of a fixed set of formats

use crate::collaborators::{CollaboratorError, PublishRequest, PublisherRegistry};
use crate::core::{document, BoxError, ConfigError, PipelineContext, StageError, StageResult};
use crate::stages::{has_document, PipelineStage};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Instant;
use tracing::{error, info};

/// Supported output formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Html,
    Pptx,
    Php,
    /// Context summary as pretty-printed JSON
    Json,
    /// The document itself, pretty-printed when a tree is available
    Xml,
    Assertions,
}

impl OutputFormat {
    pub const ALL: [OutputFormat; 6] = [
        OutputFormat::Html,
        OutputFormat::Pptx,
        OutputFormat::Php,
        OutputFormat::Json,
        OutputFormat::Xml,
        OutputFormat::Assertions,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Html => "html",
            OutputFormat::Pptx => "pptx",
            OutputFormat::Php => "php",
            OutputFormat::Json => "json",
            OutputFormat::Xml => "xml",
            OutputFormat::Assertions => "assertions",
        }
    }

    /// Whether the format is rendered by a registered publisher
    pub fn is_delegated(&self) -> bool {
        !matches!(self, OutputFormat::Json | OutputFormat::Xml)
    }

    fn supported() -> String {
        Self::ALL
            .iter()
            .map(|f| f.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|format| format.as_str() == s)
            .ok_or_else(|| ConfigError::UnsupportedFormat {
                format: s.to_string(),
                supported: Self::supported(),
            })
    }
}

/// Writes the current document to `output_path`
#[derive(Debug, Clone)]
pub struct OutputStage {
    name: String,
    format: OutputFormat,
    output_path: PathBuf,
    template: Option<PathBuf>,
    options: HashMap<String, Value>,
    publishers: PublisherRegistry,
}

impl OutputStage {
    /// Create an output stage
    ///
    /// An unknown `format` is rejected here, before any pipeline runs.
    pub fn new(
        name: impl Into<String>,
        format: &str,
        output_path: impl Into<PathBuf>,
    ) -> Result<Self, ConfigError> {
        Ok(Self::with_format(name, format.parse()?, output_path))
    }

    pub fn with_format(
        name: impl Into<String>,
        format: OutputFormat,
        output_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            name: name.into(),
            format,
            output_path: output_path.into(),
            template: None,
            options: HashMap::new(),
            publishers: PublisherRegistry::default(),
        }
    }

    pub fn with_template(mut self, template: impl Into<PathBuf>) -> Self {
        self.template = Some(template.into());
        self
    }

    /// Format-specific options handed to the publisher
    pub fn with_options(mut self, options: HashMap<String, Value>) -> Self {
        self.options = options;
        self
    }

    pub fn with_publishers(mut self, publishers: PublisherRegistry) -> Self {
        self.publishers = publishers;
        self
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    pub fn template(&self) -> Option<&Path> {
        self.template.as_deref()
    }

    pub fn options(&self) -> &HashMap<String, Value> {
        &self.options
    }

    fn write(&self, context: &PipelineContext) -> Result<(), BoxError> {
        if let Some(parent) = self.output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| CollaboratorError::io(parent, e))?;
        }

        match self.format {
            OutputFormat::Json => {
                let text = serde_json::to_string_pretty(&context.to_dict())?;
                self.write_text(&text)
            }
            OutputFormat::Xml => match &context.xml_tree {
                Some(tree) => self.write_text(&document::pretty_print(tree)?),
                None => self.write_text(&context.xml_data),
            },
            format => {
                let publisher = self
                    .publishers
                    .get(format)
                    .ok_or_else(|| CollaboratorError::NoPublisher(format.to_string()))?;
                publisher.publish(&PublishRequest {
                    tree: context.xml_tree.as_ref(),
                    xml_data: &context.xml_data,
                    output_path: &self.output_path,
                    template: self.template.as_deref(),
                    options: &self.options,
                })
            }
        }
    }

    fn write_text(&self, text: &str) -> Result<(), BoxError> {
        std::fs::write(&self.output_path, text)
            .map_err(|e| CollaboratorError::io(&self.output_path, e).into())
    }
}

impl PipelineStage for OutputStage {
    fn name(&self) -> &str {
        &self.name
    }

    fn execute(&self, context: &mut PipelineContext) -> Result<StageResult, StageError> {
        let started = Instant::now();

        self.write(context).map_err(|e| {
            error!("Output stage '{}' failed: {}", self.name, e);
            StageError::output_caused_by(&self.name, e)
        })?;

        let file_size = std::fs::metadata(&self.output_path)
            .map(|m| m.len())
            .unwrap_or(0);
        info!(
            "Wrote {} output to {} ({} bytes)",
            self.format,
            self.output_path.display(),
            file_size
        );

        Ok(StageResult::success(&self.name)
            .with_data(context.xml_data.clone())
            .with_metadata("format", self.format.as_str())
            .with_metadata("output_path", self.output_path.display().to_string())
            .with_metadata("file_size", file_size)
            .with_duration(started.elapsed().as_secs_f64()))
    }

    fn validate_input(&self, context: &PipelineContext) -> bool {
        has_document(context)
    }
}
