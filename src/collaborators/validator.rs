//! Document validation collaborator

use crate::collaborators::CollaboratorError;
use crate::core::{document, BoxError};
use serde::Serialize;
use std::fmt;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing::debug;
use xml::reader::EventReader;

/// What the validator is asked to check
#[derive(Debug, Clone, Default)]
pub struct ValidationRequest {
    /// Directory holding schema definitions
    pub schemas_dir: Option<PathBuf>,
    /// Directory holding guardrail rules
    pub guardrails_dir: Option<PathBuf>,
    /// Use an event-stream parse instead of building a tree
    pub streaming: bool,
}

/// A single finding reported by a validator
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationIssue {
    pub file: Option<PathBuf>,
    pub message: String,
    /// Identifier of the rule that produced the finding
    pub rule: Option<String>,
}

impl ValidationIssue {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            file: None,
            message: message.into(),
            rule: None,
        }
    }

    pub fn in_file(mut self, file: impl Into<PathBuf>) -> Self {
        self.file = Some(file.into());
        self
    }

    pub fn with_rule(mut self, rule: impl Into<String>) -> Self {
        self.rule = Some(rule.into());
        self
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(file) = &self.file {
            write!(f, "{}: ", file.display())?;
        }
        write!(f, "{}", self.message)?;
        if let Some(rule) = &self.rule {
            write!(f, " [{}]", rule)?;
        }
        Ok(())
    }
}

/// Outcome of validating a project directory
#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationReport {
    pub is_valid: bool,
    pub errors: Vec<ValidationIssue>,
    pub warnings: Vec<ValidationIssue>,
    pub validated_files: usize,
}

/// Checks a project-like directory of XML documents
pub trait DocumentValidator: Send + Sync {
    fn validate_project(
        &self,
        project_dir: &Path,
        request: &ValidationRequest,
    ) -> Result<ValidationReport, BoxError>;
}

/// Default validator: checks every XML file in the directory is well-formed
///
/// Schema files and guardrail definitions are skipped. Schema and guardrail
/// semantics are left to richer validators.
#[derive(Debug, Clone, Copy, Default)]
pub struct WellFormednessValidator;

impl WellFormednessValidator {
    pub fn new() -> Self {
        Self
    }

    fn collect_documents(
        root: &Path,
        dir: &Path,
        found: &mut Vec<PathBuf>,
    ) -> Result<(), CollaboratorError> {
        let entries = std::fs::read_dir(dir).map_err(|e| CollaboratorError::io(dir, e))?;
        for entry in entries {
            let path = entry.map_err(|e| CollaboratorError::io(dir, e))?.path();
            if path.is_dir() {
                Self::collect_documents(root, &path, found)?;
            } else if Self::is_candidate(root, &path) {
                found.push(path);
            }
        }
        Ok(())
    }

    fn is_candidate(root: &Path, path: &Path) -> bool {
        let relative = path.strip_prefix(root).unwrap_or(path);
        let is_xml = path.extension().is_some_and(|ext| ext == "xml");
        let in_schema = relative.to_string_lossy().contains("schema");
        let in_guardrails = path
            .parent()
            .and_then(Path::file_name)
            .is_some_and(|name| name == "guardrails");
        is_xml && !in_schema && !in_guardrails
    }

    fn check_tree(path: &Path) -> Result<Option<String>, CollaboratorError> {
        let text = std::fs::read_to_string(path).map_err(|e| CollaboratorError::io(path, e))?;
        Ok(document::parse(&text).err().map(|e| e.to_string()))
    }

    fn check_stream(path: &Path) -> Result<Option<String>, CollaboratorError> {
        let file = File::open(path).map_err(|e| CollaboratorError::io(path, e))?;
        for event in EventReader::new(BufReader::new(file)) {
            if let Err(e) = event {
                return Ok(Some(format!("XML parse error: {}", e)));
            }
        }
        Ok(None)
    }
}

impl DocumentValidator for WellFormednessValidator {
    fn validate_project(
        &self,
        project_dir: &Path,
        request: &ValidationRequest,
    ) -> Result<ValidationReport, BoxError> {
        let mut report = ValidationReport::default();

        for (label, dir) in [
            ("Schemas", &request.schemas_dir),
            ("Guardrails", &request.guardrails_dir),
        ] {
            if let Some(dir) = dir.as_ref().filter(|d| !d.exists()) {
                report.warnings.push(ValidationIssue::new(format!(
                    "{} directory not found: {}",
                    label,
                    dir.display()
                )));
            }
        }

        let mut documents = Vec::new();
        Self::collect_documents(project_dir, project_dir, &mut documents)?;
        documents.sort();

        if documents.is_empty() {
            report
                .warnings
                .push(ValidationIssue::new("No XML files found").in_file(project_dir));
        }

        for path in &documents {
            let problem = if request.streaming {
                Self::check_stream(path)?
            } else {
                Self::check_tree(path)?
            };
            if let Some(message) = problem {
                report.errors.push(
                    ValidationIssue::new(message)
                        .in_file(path)
                        .with_rule("well-formed"),
                );
            }
        }

        report.validated_files = documents.len();
        report.is_valid = report.errors.is_empty();
        debug!(
            "Validated {} files in {}: {} errors, {} warnings",
            report.validated_files,
            project_dir.display(),
            report.errors.len(),
            report.warnings.len()
        );
        Ok(report)
    }
}
