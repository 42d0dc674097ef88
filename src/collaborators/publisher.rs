//! Publisher collaborators for the delegated output formats

use crate::core::{BoxError, XmlTree};
use crate::stages::OutputFormat;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// Everything a publisher gets to render one document
#[derive(Debug, Clone, Copy)]
pub struct PublishRequest<'a> {
    pub tree: Option<&'a XmlTree>,
    pub xml_data: &'a str,
    /// Destination; its parent directory already exists
    pub output_path: &'a Path,
    pub template: Option<&'a Path>,
    pub options: &'a HashMap<String, Value>,
}

/// Renders a document into one external representation
pub trait Publisher: Send + Sync {
    fn publish(&self, request: &PublishRequest<'_>) -> Result<(), BoxError>;
}

impl<F> Publisher for F
where
    F: Fn(&PublishRequest<'_>) -> Result<(), BoxError> + Send + Sync,
{
    fn publish(&self, request: &PublishRequest<'_>) -> Result<(), BoxError> {
        self(request)
    }
}

/// Maps output formats to the publisher that handles them
#[derive(Clone, Default)]
pub struct PublisherRegistry {
    publishers: HashMap<OutputFormat, Arc<dyn Publisher>>,
}

impl PublisherRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `publisher` for `format`, replacing any previous one
    pub fn register(mut self, format: OutputFormat, publisher: impl Publisher + 'static) -> Self {
        self.publishers.insert(format, Arc::new(publisher));
        self
    }

    pub fn get(&self, format: OutputFormat) -> Option<Arc<dyn Publisher>> {
        self.publishers.get(&format).cloned()
    }

    /// Formats that currently have a publisher
    pub fn formats(&self) -> Vec<OutputFormat> {
        let mut formats: Vec<_> = self.publishers.keys().copied().collect();
        formats.sort_by_key(|f| f.as_str());
        formats
    }
}

impl fmt::Debug for PublisherRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PublisherRegistry")
            .field("formats", &self.formats())
            .finish()
    }
}
