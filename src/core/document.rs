//! XML document helpers
//!
//! The pipeline keeps the document as text (the canonical form) and as a
//! parsed [`XmlTree`]. These helpers are the only place that talks to the
//! XML library directly.

use thiserror::Error;
use xmltree::{Element, EmitterConfig};

/// Parsed representation of an XML document
pub type XmlTree = Element;

/// Failure to parse or serialize an XML document
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("XML parse error: {0}")]
    Parse(String),

    #[error("XML serialization error: {0}")]
    Serialize(String),
}

/// Parse XML text into a tree
pub fn parse(text: &str) -> Result<XmlTree, DocumentError> {
    Element::parse(text.as_bytes()).map_err(|e| DocumentError::Parse(e.to_string()))
}

/// Serialize a tree compactly, without an XML declaration
///
/// Used for snapshots, where the text only needs to round-trip through
/// [`parse`].
pub fn serialize(tree: &XmlTree) -> Result<String, DocumentError> {
    let config = EmitterConfig::new()
        .perform_indent(false)
        .write_document_declaration(false);
    write_with(tree, config)
}

/// Serialize a tree with indentation and an XML declaration
pub fn pretty_print(tree: &XmlTree) -> Result<String, DocumentError> {
    let config = EmitterConfig::new()
        .perform_indent(true)
        .write_document_declaration(true);
    let mut text = write_with(tree, config)?;
    if !text.ends_with('\n') {
        text.push('\n');
    }
    Ok(text)
}

fn write_with(tree: &XmlTree, config: EmitterConfig) -> Result<String, DocumentError> {
    let mut buffer = Vec::new();
    tree.write_with_config(&mut buffer, config)
        .map_err(|e| DocumentError::Serialize(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| DocumentError::Serialize(e.to_string()))
}
