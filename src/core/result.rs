//! Stage and pipeline outcome records

use crate::core::{PipelineContext, PipelineError};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::HashMap;

/// Outcome of one stage execution attempt
#[derive(Debug, Clone, Serialize)]
pub struct StageResult {
    /// Name of the stage that produced this result
    pub stage: String,

    pub success: bool,

    /// Document text the stage produced, if it kept a copy
    #[serde(skip)]
    pub data: Option<String>,

    pub error: Option<String>,

    /// Free-form details reported by the stage
    pub metadata: HashMap<String, Value>,

    pub duration_seconds: f64,

    pub timestamp: DateTime<Utc>,
}

impl StageResult {
    /// A successful result with no data or metadata
    pub fn success(stage: impl Into<String>) -> Self {
        Self {
            stage: stage.into(),
            success: true,
            data: None,
            error: None,
            metadata: HashMap::new(),
            duration_seconds: 0.0,
            timestamp: Utc::now(),
        }
    }

    /// A failed result carrying an error message
    pub fn failure(stage: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            ..Self::success(stage)
        }
    }

    pub fn with_data(mut self, data: impl Into<String>) -> Self {
        self.data = Some(data.into());
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn with_duration(mut self, seconds: f64) -> Self {
        self.duration_seconds = seconds;
        self
    }

    /// Serializable view of this result; `data` is left out
    pub fn to_dict(&self) -> Value {
        json!({
            "stage": self.stage,
            "success": self.success,
            "error": self.error,
            "metadata": self.metadata,
            "duration_seconds": self.duration_seconds,
            "timestamp": self.timestamp.to_rfc3339(),
        })
    }
}

/// Outcome of a whole pipeline run
#[derive(Debug)]
pub struct PipelineResult {
    pub pipeline_name: String,

    /// True iff no stage ultimately failed
    pub success: bool,

    /// Context as it stood when the run ended
    pub context: PipelineContext,

    /// Terminal error message, if the run failed
    pub error: Option<String>,

    /// Typed terminal error for callers that want to propagate it
    pub cause: Option<PipelineError>,

    pub stages_executed: usize,

    pub stages_failed: usize,
}

impl PipelineResult {
    pub fn duration_seconds(&self) -> f64 {
        self.context.elapsed_seconds()
    }

    /// Turn a run that ended on a terminal error into `Err`
    ///
    /// Runs that completed with recorded (non-terminal) failures stay `Ok`;
    /// inspect `success` and `stages_failed` for those.
    pub fn into_result(mut self) -> Result<Self, PipelineError> {
        match self.cause.take() {
            Some(cause) => Err(cause),
            None => Ok(self),
        }
    }

    pub fn to_dict(&self) -> Value {
        json!({
            "pipeline_name": self.pipeline_name,
            "success": self.success,
            "error": self.error,
            "stages_executed": self.stages_executed,
            "stages_failed": self.stages_failed,
            "duration_seconds": self.duration_seconds(),
            "context": self.context.to_dict(),
        })
    }
}
