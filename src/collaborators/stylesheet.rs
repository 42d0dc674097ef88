//! Stylesheet (XSLT) collaborator - runs `xsltproc` as a subprocess

use crate::collaborators::CollaboratorError;
use crate::core::{document, BoxError};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;
use tracing::{debug, warn};

/// A stylesheet ready to be applied repeatedly
pub trait CompiledStylesheet: Send + Sync {
    /// Transform `source` text, passing `params` as stylesheet parameters
    fn apply(&self, source: &str, params: &BTreeMap<String, String>) -> Result<String, BoxError>;
}

/// Compiles stylesheets from files
pub trait StylesheetProcessor: Send + Sync {
    fn compile(&self, path: &Path) -> Result<Arc<dyn CompiledStylesheet>, BoxError>;
}

/// Processor backed by the `xsltproc` command-line tool
#[derive(Debug, Clone)]
pub struct XsltprocProcessor {
    /// Path to the xsltproc executable
    program: String,
}

impl XsltprocProcessor {
    /// Create a processor using `program` (e.g. "xsltproc", "/usr/bin/xsltproc")
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }
}

impl Default for XsltprocProcessor {
    fn default() -> Self {
        Self::new("xsltproc")
    }
}

impl StylesheetProcessor for XsltprocProcessor {
    /// Checks the stylesheet is readable, well-formed XML
    ///
    /// xsltproc itself only sees the stylesheet when it is applied.
    fn compile(&self, path: &Path) -> Result<Arc<dyn CompiledStylesheet>, BoxError> {
        let text = std::fs::read_to_string(path).map_err(|e| CollaboratorError::io(path, e))?;
        document::parse(&text).map_err(|e| CollaboratorError::InvalidStylesheet {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        debug!("Compiled stylesheet {}", path.display());
        Ok(Arc::new(XsltprocStylesheet {
            program: self.program.clone(),
            path: path.to_path_buf(),
        }))
    }
}

#[derive(Debug)]
struct XsltprocStylesheet {
    program: String,
    path: PathBuf,
}

impl CompiledStylesheet for XsltprocStylesheet {
    fn apply(&self, source: &str, params: &BTreeMap<String, String>) -> Result<String, BoxError> {
        let mut input = tempfile::Builder::new()
            .suffix(".xml")
            .tempfile()
            .map_err(|e| CollaboratorError::io(std::env::temp_dir(), e))?;
        input
            .write_all(source.as_bytes())
            .map_err(|e| CollaboratorError::io(input.path(), e))?;

        let mut command = Command::new(&self.program);
        for (key, value) in params {
            command.arg("--stringparam").arg(key).arg(value);
        }
        command.arg(&self.path).arg(input.path());

        debug!(
            "Running {} on {} with {} params",
            self.program,
            self.path.display(),
            params.len()
        );
        let output = command.output().map_err(|source| CollaboratorError::Spawn {
            program: self.program.clone(),
            source,
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let code = output.status.code().unwrap_or(-1);
            warn!("{} exited with code {}: {}", self.program, code, stderr);
            return Err(CollaboratorError::Process {
                program: self.program.clone(),
                code,
                stderr,
            }
            .into());
        }

        let text = String::from_utf8(output.stdout).map_err(|_| CollaboratorError::InvalidOutput {
            program: self.program.clone(),
        })?;
        Ok(text)
    }
}
