//! Pipeline configuration from YAML

use crate::collaborators::{
    DocumentValidator, PublisherRegistry, StylesheetProcessor, WellFormednessValidator,
    XsltprocProcessor,
};
use crate::core::{ConfigError, ErrorStrategy, Pipeline, VariableResolver};
use crate::execution::RetryPolicy;
use crate::stages::{
    OutputStage, Stage, TransformStage, ValidateStage, DEFAULT_STREAMING_THRESHOLD,
};
use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// Top-level pipeline configuration loaded from YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Pipeline name (defaults to the file stem)
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub description: String,

    /// One of fail_fast, continue, rollback, retry, skip
    #[serde(default)]
    pub error_strategy: Option<Value>,

    #[serde(default = "default_rollback_enabled")]
    pub rollback_enabled: bool,

    #[serde(default = "default_max_snapshots")]
    pub max_snapshots: usize,

    /// Retries for the `retry` strategy (global default)
    #[serde(default)]
    pub max_retries: Option<usize>,

    /// Backoff multiplier for the `retry` strategy
    #[serde(default)]
    pub backoff_factor: Option<f64>,

    /// Declared variables available to `${NAME}` substitution
    #[serde(default)]
    pub variables: BTreeMap<String, Value>,

    /// Stage definitions, kept raw until variables are substituted
    #[serde(default)]
    pub stages: Vec<Value>,
}

fn default_rollback_enabled() -> bool {
    true
}

fn default_max_snapshots() -> usize {
    100
}

/// Validate stage configuration as defined in YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidateStageConfig {
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub schemas_dir: Option<PathBuf>,

    #[serde(default)]
    pub guardrails_dir: Option<PathBuf>,

    #[serde(default = "default_strict")]
    pub strict: bool,

    #[serde(default)]
    pub streaming: bool,

    #[serde(default = "default_streaming_threshold")]
    pub streaming_threshold: usize,
}

fn default_strict() -> bool {
    true
}

fn default_streaming_threshold() -> usize {
    DEFAULT_STREAMING_THRESHOLD
}

/// Transform stage configuration as defined in YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransformStageConfig {
    #[serde(default)]
    pub name: Option<String>,

    /// Stylesheet path, relative to the definition file
    #[serde(default)]
    pub transform: Option<String>,

    #[serde(default)]
    pub params: BTreeMap<String, Value>,
}

/// Output stage configuration as defined in YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputStageConfig {
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub format: Option<String>,

    #[serde(default)]
    pub output_path: Option<String>,

    #[serde(default)]
    pub template: Option<String>,

    #[serde(default)]
    pub options: BTreeMap<String, Value>,
}

impl PipelineConfig {
    /// Parse pipeline configuration from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let document: Value = serde_yaml::from_str(yaml)?;
        if !document.is_mapping() {
            return Err(ConfigError::NotAMapping);
        }
        Ok(serde_yaml::from_value(document)?)
    }

    /// Load pipeline configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&content)
    }

    /// The configured error strategy, defaulting to fail_fast
    pub fn error_strategy(&self) -> Result<ErrorStrategy, ConfigError> {
        match &self.error_strategy {
            None | Some(Value::Null) => Ok(ErrorStrategy::default()),
            Some(value) => scalar_to_string(value).parse(),
        }
    }

    fn retry_policy(&self) -> RetryPolicy {
        let defaults = RetryPolicy::default();
        RetryPolicy {
            max_attempts: self.max_retries.unwrap_or(defaults.max_attempts),
            backoff_factor: self.backoff_factor.unwrap_or(defaults.backoff_factor),
            ..defaults
        }
    }
}

/// Render a YAML scalar the way it would appear in text
fn scalar_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Null => String::new(),
        Value::Tagged(tagged) => scalar_to_string(&tagged.value),
        other => serde_yaml::to_string(other)
            .map(|s| s.trim_end().to_string())
            .unwrap_or_default(),
    }
}

/// Convert a YAML value into JSON, stringifying non-string mapping keys
fn yaml_to_json(value: &Value) -> serde_json::Value {
    match value {
        Value::Null => serde_json::Value::Null,
        Value::Bool(b) => serde_json::Value::Bool(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                serde_json::Value::from(i)
            } else if let Some(u) = n.as_u64() {
                serde_json::Value::from(u)
            } else {
                n.as_f64()
                    .and_then(serde_json::Number::from_f64)
                    .map_or(serde_json::Value::Null, serde_json::Value::Number)
            }
        }
        Value::String(s) => serde_json::Value::String(s.clone()),
        Value::Sequence(items) => items.iter().map(yaml_to_json).collect(),
        Value::Mapping(map) => serde_json::Value::Object(
            map.iter()
                .map(|(k, v)| (scalar_to_string(k), yaml_to_json(v)))
                .collect(),
        ),
        Value::Tagged(tagged) => yaml_to_json(&tagged.value),
    }
}

/// Builds [`Pipeline`]s from YAML definitions
///
/// The collaborators handed to the built stages can be replaced before
/// loading.
#[derive(Clone)]
pub struct PipelineLoader {
    validator: Arc<dyn DocumentValidator>,
    processor: Arc<dyn StylesheetProcessor>,
    publishers: PublisherRegistry,
    overrides: HashMap<String, String>,
}

impl PipelineLoader {
    pub fn new() -> Self {
        Self {
            validator: Arc::new(WellFormednessValidator::new()),
            processor: Arc::new(XsltprocProcessor::default()),
            publishers: PublisherRegistry::default(),
            overrides: HashMap::new(),
        }
    }

    pub fn with_validator(mut self, validator: Arc<dyn DocumentValidator>) -> Self {
        self.validator = validator;
        self
    }

    pub fn with_stylesheet_processor(mut self, processor: Arc<dyn StylesheetProcessor>) -> Self {
        self.processor = processor;
        self
    }

    pub fn with_publishers(mut self, publishers: PublisherRegistry) -> Self {
        self.publishers = publishers;
        self
    }

    /// Replace (or add) a declared variable before substitution
    pub fn with_variable_override(
        mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.overrides.insert(key.into(), value.into());
        self
    }

    /// Load a pipeline from a YAML file
    ///
    /// Relative paths in stage definitions resolve against the file's
    /// directory.
    pub fn load<P: AsRef<Path>>(&self, path: P) -> Result<Pipeline, ConfigError> {
        let path = path.as_ref();
        info!("Loading pipeline from {}", path.display());
        let config = PipelineConfig::from_file(path)?;

        let default_name = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "pipeline".to_string());
        let base_dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        self.build(config, &default_name, base_dir)
    }

    /// Load a pipeline from YAML text, resolving paths against `base_dir`
    pub fn load_str(&self, yaml: &str, base_dir: &Path) -> Result<Pipeline, ConfigError> {
        let config = PipelineConfig::from_yaml(yaml)?;
        self.build(config, "pipeline", base_dir)
    }

    fn build(
        &self,
        config: PipelineConfig,
        default_name: &str,
        base_dir: &Path,
    ) -> Result<Pipeline, ConfigError> {
        let error_strategy = config.error_strategy()?;

        let mut declared = config.variables.clone();
        for (key, value) in &self.overrides {
            declared.insert(key.clone(), Value::String(value.clone()));
        }
        let resolver = VariableResolver::new().with_variables(
            declared
                .iter()
                .map(|(key, value)| (key.clone(), scalar_to_string(value))),
        );

        if config.stages.is_empty() {
            return Err(ConfigError::NoStages);
        }

        let name = config
            .name
            .clone()
            .unwrap_or_else(|| default_name.to_string());
        let mut pipeline = Pipeline::new(name)
            .with_description(config.description.clone())
            .with_error_strategy(error_strategy)
            .with_rollback(config.rollback_enabled)
            .with_max_snapshots(config.max_snapshots)
            .with_retry_policy(config.retry_policy());

        for (key, value) in &declared {
            let value = match value {
                Value::String(_) => serde_json::Value::String(
                    resolver.variables().get(key).cloned().unwrap_or_default(),
                ),
                other => yaml_to_json(other),
            };
            pipeline.variables.insert(key.clone(), value);
        }

        for (i, raw) in config.stages.iter().enumerate() {
            let stage = self
                .load_stage(raw, &resolver, base_dir)
                .map_err(|e| ConfigError::Stage {
                    index: i + 1,
                    source: Box::new(e),
                })?;
            pipeline.add_stage(stage);
        }

        info!(
            "Loaded pipeline '{}' with {} stages: {}",
            pipeline.name,
            pipeline.stages().len(),
            pipeline.dry_run().join(", ")
        );
        Ok(pipeline)
    }

    fn load_stage(
        &self,
        raw: &Value,
        resolver: &VariableResolver,
        base_dir: &Path,
    ) -> Result<Stage, ConfigError> {
        let stage_type = raw
            .get("type")
            .and_then(Value::as_str)
            .filter(|t| !t.is_empty())
            .ok_or(ConfigError::MissingStageType)?;

        let resolved = resolver.resolve_value(raw);
        match stage_type {
            "validate" => self.load_validate_stage(serde_yaml::from_value(resolved)?, base_dir),
            "transform" => self.load_transform_stage(serde_yaml::from_value(resolved)?, base_dir),
            "output" => self.load_output_stage(serde_yaml::from_value(resolved)?, base_dir),
            "custom" => Err(ConfigError::CustomStageUnsupported),
            other => Err(ConfigError::UnknownStageType(other.to_string())),
        }
    }

    fn load_validate_stage(
        &self,
        config: ValidateStageConfig,
        base_dir: &Path,
    ) -> Result<Stage, ConfigError> {
        let name = config.name.unwrap_or_else(|| "ValidateStage".to_string());
        let mut stage = ValidateStage::new(name)
            .strict(config.strict)
            .streaming(config.streaming)
            .streaming_threshold(config.streaming_threshold)
            .with_validator(self.validator.clone());
        if let Some(dir) = config.schemas_dir {
            stage = stage.with_schemas_dir(base_dir.join(dir));
        }
        if let Some(dir) = config.guardrails_dir {
            stage = stage.with_guardrails_dir(base_dir.join(dir));
        }
        Ok(stage.into())
    }

    fn load_transform_stage(
        &self,
        config: TransformStageConfig,
        base_dir: &Path,
    ) -> Result<Stage, ConfigError> {
        let transform = config
            .transform
            .filter(|t| !t.is_empty())
            .ok_or(ConfigError::MissingField {
                stage_type: "TransformStage",
                field: "transform",
            })?;

        let path = base_dir.join(transform);
        if !path.exists() {
            return Err(ConfigError::TransformNotFound(path));
        }

        let params = config
            .params
            .iter()
            .map(|(k, v)| (k.clone(), scalar_to_string(v)));
        let stage = TransformStage::stylesheet(
            config.name.unwrap_or_else(|| "TransformStage".to_string()),
            path,
        )
        .with_params(params)
        .with_processor(self.processor.clone());
        Ok(stage.into())
    }

    fn load_output_stage(
        &self,
        config: OutputStageConfig,
        base_dir: &Path,
    ) -> Result<Stage, ConfigError> {
        let missing = |field| ConfigError::MissingField {
            stage_type: "OutputStage",
            field,
        };
        let format = config
            .format
            .filter(|f| !f.is_empty())
            .ok_or_else(|| missing("format"))?;
        let output_path = config
            .output_path
            .filter(|p| !p.is_empty())
            .ok_or_else(|| missing("output_path"))?;

        let options = config
            .options
            .iter()
            .map(|(k, v)| (k.clone(), yaml_to_json(v)))
            .collect();
        let mut stage = OutputStage::new(
            config.name.unwrap_or_else(|| "OutputStage".to_string()),
            &format,
            base_dir.join(output_path),
        )?
        .with_options(options)
        .with_publishers(self.publishers.clone());
        if let Some(template) = config.template.filter(|t| !t.is_empty()) {
            stage = stage.with_template(base_dir.join(template));
        }
        Ok(stage.into())
    }
}

impl Default for PipelineLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Load a pipeline from YAML with the default collaborators
pub fn load_pipeline<P: AsRef<Path>>(path: P) -> Result<Pipeline, ConfigError> {
    PipelineLoader::new().load(path)
}
