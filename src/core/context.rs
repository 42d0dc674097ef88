//! Pipeline context - document state and variables shared across stages

use crate::core::{
    document::{self, XmlTree},
    PipelineError, Snapshot, SnapshotHistory, StageResult,
};
use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use uuid::Uuid;

/// Execution state for one pipeline run
///
/// Created once per `execute()` call and owned exclusively by it; stages
/// receive it by mutable reference and must not hold on to it.
#[derive(Debug, Clone)]
pub struct PipelineContext {
    /// Current document text
    pub xml_data: String,

    /// Parse of `xml_data` as of the last stage boundary; absent when the
    /// text is not well-formed
    pub xml_tree: Option<XmlTree>,

    pub input_path: Option<PathBuf>,

    pub output_path: Option<PathBuf>,

    /// Working directory when the context was created
    pub working_dir: PathBuf,

    /// One entry per completed stage attempt, in order
    pub stage_results: Vec<StageResult>,

    /// Scratch space shared between stages
    pub variables: HashMap<String, Value>,

    /// Pre-stage document copies kept for rollback
    pub snapshots: SnapshotHistory,

    pub start_time: DateTime<Utc>,

    /// Unique token for correlating logs and artifacts of this run
    pub execution_id: String,
}

impl PipelineContext {
    /// Create a context from XML text
    ///
    /// Malformed XML is accepted; the tree is simply left absent.
    pub fn from_xml(xml: impl Into<String>) -> Self {
        let xml_data = xml.into();
        let xml_tree = match document::parse(&xml_data) {
            Ok(tree) => Some(tree),
            Err(e) => {
                debug!("Input is not well-formed, continuing without a tree: {}", e);
                None
            }
        };

        Self::with_document(xml_data, xml_tree)
    }

    fn with_document(xml_data: String, xml_tree: Option<XmlTree>) -> Self {
        Self {
            xml_data,
            xml_tree,
            input_path: None,
            output_path: None,
            working_dir: std::env::current_dir().unwrap_or_default(),
            stage_results: Vec::new(),
            variables: HashMap::new(),
            snapshots: SnapshotHistory::new(),
            start_time: Utc::now(),
            execution_id: Uuid::new_v4().to_string(),
        }
    }

    /// Create a context by reading and parsing a file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, PipelineError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(PipelineError::InputNotFound(path.to_path_buf()));
        }

        let xml_data = std::fs::read_to_string(path).map_err(|source| PipelineError::InputRead {
            path: path.to_path_buf(),
            source,
        })?;
        let tree = document::parse(&xml_data).map_err(|e| PipelineError::InputParse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        let mut context = Self::with_document(xml_data, Some(tree));
        context.input_path = Some(path.to_path_buf());
        Ok(context)
    }

    /// Seconds since the context was created
    pub fn elapsed_seconds(&self) -> f64 {
        let elapsed = Utc::now() - self.start_time;
        elapsed.num_microseconds().unwrap_or(i64::MAX) as f64 / 1_000_000.0
    }

    pub fn last_result(&self) -> Option<&StageResult> {
        self.stage_results.last()
    }

    /// True when every recorded stage succeeded (vacuously true when none ran)
    pub fn all_successful(&self) -> bool {
        self.stage_results.iter().all(|r| r.success)
    }

    pub fn get_variable(&self, key: &str) -> Option<&Value> {
        self.variables.get(key)
    }

    pub fn get_variable_or(&self, key: &str, default: Value) -> Value {
        self.variables.get(key).cloned().unwrap_or(default)
    }

    pub fn set_variable(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.variables.insert(key.into(), value.into());
    }

    /// Save the current document state before `stage` runs, keeping at most
    /// `max_snapshots` entries
    pub fn capture_snapshot(&mut self, stage: &str, max_snapshots: usize) {
        let xml_tree = match self.xml_tree.as_ref().map(document::serialize).transpose() {
            Ok(tree) => tree,
            Err(e) => {
                warn!("Could not serialize tree for snapshot of '{}': {}", stage, e);
                None
            }
        };

        self.snapshots.push(
            Snapshot {
                stage: stage.to_string(),
                xml_data: self.xml_data.clone(),
                xml_tree,
            },
            max_snapshots,
        );
        debug!(
            "Captured snapshot before stage '{}' ({} held)",
            stage,
            self.snapshots.len()
        );
    }

    /// Restore the document to the latest snapshot taken before `stage`
    ///
    /// That snapshot and every later one are discarded. Returns false when no
    /// snapshot exists for the stage.
    pub fn restore_snapshot(&mut self, stage: &str) -> bool {
        let Some(snapshot) = self.snapshots.take_latest_for(stage) else {
            return false;
        };

        self.xml_data = snapshot.xml_data;
        self.xml_tree = snapshot
            .xml_tree
            .as_deref()
            .and_then(|text| document::parse(text).ok());
        true
    }

    /// Serializable view of the context
    pub fn to_dict(&self) -> Value {
        json!({
            "execution_id": self.execution_id,
            "input_path": self.input_path.as_ref().map(|p| p.display().to_string()),
            "output_path": self.output_path.as_ref().map(|p| p.display().to_string()),
            "working_dir": self.working_dir.display().to_string(),
            "variables": self.variables,
            "stage_results": self.stage_results.iter().map(StageResult::to_dict).collect::<Vec<_>>(),
            "elapsed_seconds": self.elapsed_seconds(),
            "start_time": self.start_time.to_rfc3339(),
            "xml_size": self.xml_data.len(),
            "has_tree": self.xml_tree.is_some(),
        })
    }
}

/// What a pipeline run starts from
#[derive(Debug)]
pub enum PipelineInput {
    /// Read and parse an XML file
    File(PathBuf),
    /// Use XML text directly
    Xml(String),
    /// Continue from a prepared context
    Context(PipelineContext),
}

impl PipelineInput {
    /// Build the run's context
    pub fn into_context(self) -> Result<PipelineContext, PipelineError> {
        match self {
            PipelineInput::File(path) if path.as_os_str().is_empty() => {
                Err(PipelineError::MissingInput)
            }
            PipelineInput::File(path) => PipelineContext::from_file(path),
            PipelineInput::Xml(xml) if xml.is_empty() => Err(PipelineError::MissingInput),
            PipelineInput::Xml(xml) => Ok(PipelineContext::from_xml(xml)),
            PipelineInput::Context(context) => Ok(context),
        }
    }
}

impl From<PipelineContext> for PipelineInput {
    fn from(context: PipelineContext) -> Self {
        PipelineInput::Context(context)
    }
}
