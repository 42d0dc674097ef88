//! Transformation stage - XSLT stylesheet or a plain function

use crate::collaborators::{CompiledStylesheet, StylesheetProcessor, XsltprocProcessor};
use crate::core::{document, BoxError, PipelineContext, StageError, StageResult};
use crate::stages::{has_document, PipelineStage};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, warn};

/// Function transform: `(xml_data, context) -> new xml_data`
pub type TransformFn =
    Arc<dyn Fn(&str, &PipelineContext) -> Result<String, BoxError> + Send + Sync>;

/// What a transform stage applies
#[derive(Clone)]
pub enum Transform {
    /// Stylesheet file, compiled on first use
    Stylesheet(PathBuf),
    Function(TransformFn),
}

impl Transform {
    fn kind(&self) -> &'static str {
        match self {
            Transform::Stylesheet(_) => "xslt",
            Transform::Function(_) => "function",
        }
    }
}

impl fmt::Debug for Transform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transform::Stylesheet(path) => f.debug_tuple("Stylesheet").field(path).finish(),
            Transform::Function(_) => f.write_str("Function(..)"),
        }
    }
}

/// Rewrites the document, then reparses it into the tree
///
/// A result that does not parse leaves the tree absent; the stage still
/// succeeds.
#[derive(Clone)]
pub struct TransformStage {
    name: String,
    transform: Transform,
    params: BTreeMap<String, String>,
    processor: Arc<dyn StylesheetProcessor>,
    compiled: Arc<Mutex<Option<Arc<dyn CompiledStylesheet>>>>,
}

impl TransformStage {
    fn with_transform(name: impl Into<String>, transform: Transform) -> Self {
        Self {
            name: name.into(),
            transform,
            params: BTreeMap::new(),
            processor: Arc::new(XsltprocProcessor::default()),
            compiled: Arc::new(Mutex::new(None)),
        }
    }

    /// Transform with the stylesheet at `path`
    pub fn stylesheet(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self::with_transform(name, Transform::Stylesheet(path.into()))
    }

    /// Transform with a function of the current text and context
    pub fn function<F>(name: impl Into<String>, function: F) -> Self
    where
        F: Fn(&str, &PipelineContext) -> Result<String, BoxError> + Send + Sync + 'static,
    {
        Self::with_transform(name, Transform::Function(Arc::new(function)))
    }

    /// Stylesheet parameters
    pub fn with_params<I, K, V>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.params
            .extend(params.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Use a different stylesheet processor
    pub fn with_processor(mut self, processor: Arc<dyn StylesheetProcessor>) -> Self {
        self.processor = processor;
        self.compiled = Arc::new(Mutex::new(None));
        self
    }

    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    pub fn params(&self) -> &BTreeMap<String, String> {
        &self.params
    }

    fn compiled_stylesheet(&self, path: &Path) -> Result<Arc<dyn CompiledStylesheet>, BoxError> {
        let mut cached = self.compiled.lock();
        if let Some(compiled) = &*cached {
            return Ok(compiled.clone());
        }
        let compiled = self.processor.compile(path)?;
        *cached = Some(compiled.clone());
        Ok(compiled)
    }

    fn apply(&self, context: &PipelineContext) -> Result<String, BoxError> {
        match &self.transform {
            Transform::Stylesheet(path) => self
                .compiled_stylesheet(path)?
                .apply(&context.xml_data, &self.params),
            Transform::Function(function) => function(&context.xml_data, context),
        }
    }
}

impl PipelineStage for TransformStage {
    fn name(&self) -> &str {
        &self.name
    }

    fn execute(&self, context: &mut PipelineContext) -> Result<StageResult, StageError> {
        let started = Instant::now();

        let transformed = self.apply(context).map_err(|e| {
            error!("Transform stage '{}' failed: {}", self.name, e);
            StageError::transformation(&self.name, e)
        })?;

        context.xml_data = transformed;
        context.xml_tree = match document::parse(&context.xml_data) {
            Ok(tree) => Some(tree),
            Err(e) => {
                warn!("Failed to parse transformed XML in '{}': {}", self.name, e);
                None
            }
        };

        Ok(StageResult::success(&self.name)
            .with_data(context.xml_data.clone())
            .with_metadata("transform_type", self.transform.kind())
            .with_metadata("output_size", context.xml_data.len())
            .with_metadata("tree_parsed", context.xml_tree.is_some())
            .with_duration(started.elapsed().as_secs_f64()))
    }

    fn validate_input(&self, context: &PipelineContext) -> bool {
        has_document(context)
    }
}

impl fmt::Debug for TransformStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransformStage")
            .field("name", &self.name)
            .field("transform", &self.transform)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}
