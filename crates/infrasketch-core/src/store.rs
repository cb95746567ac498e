//! File-backed persistence for graphs and scan reports.
//!
//! The hosted database is out of reach of the core, so persistence is a
//! small CRUD trait. [`FileStore`] keeps one JSON document per graph in a
//! directory, which is also what the MCP server and tests use.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::security::SecurityReport;
use crate::{Graph, GraphError};

const GRAPH_EXT: &str = ".sketch";
const REPORT_EXT: &str = ".report.json";

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("graph '{0}' not found")]
    NotFound(String),

    #[error("invalid graph name '{0}': use letters, digits, '-', '_' or '.'")]
    InvalidName(String),

    #[error("{0}")]
    Graph(#[from] GraphError),

    #[error("failed to encode JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// CRUD interface to wherever graphs live.
pub trait GraphStore {
    /// All graph names, sorted.
    fn list(&self) -> Result<Vec<String>, StoreError>;
    fn read(&self, name: &str) -> Result<Graph, StoreError>;
    fn write(&self, name: &str, graph: &Graph) -> Result<(), StoreError>;
    /// Deleting a graph that does not exist is not an error.
    fn delete(&self, name: &str) -> Result<(), StoreError>;
    fn write_report(&self, name: &str, report: &SecurityReport) -> Result<(), StoreError>;
    /// The last report saved for a graph, if any.
    fn read_report(&self, name: &str) -> Result<Option<SecurityReport>, StoreError>;
}

/// Graphs stored as `<name>.sketch` files under a root directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Store rooted at `$INFRASKETCH_HOME`, falling back to `~/.infrasketch`.
    pub fn from_env() -> Self {
        Self::new(default_root())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn graph_path(&self, name: &str) -> Result<PathBuf, StoreError> {
        validate_name(name)?;
        Ok(self.root.join(format!("{}{}", name, GRAPH_EXT)))
    }

    fn report_path(&self, name: &str) -> Result<PathBuf, StoreError> {
        validate_name(name)?;
        Ok(self.root.join(format!("{}{}", name, REPORT_EXT)))
    }

    /// Write via temp file + rename so readers never see a half-written graph.
    fn write_atomic(&self, path: &Path, data: &str) -> Result<(), StoreError> {
        fs::create_dir_all(&self.root)?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let tmp = self.root.join(format!(".{}.tmp", file_name));
        fs::write(&tmp, data)?;
        fs::rename(&tmp, path)?;
        Ok(())
    }
}

impl GraphStore for FileStore {
    fn list(&self) -> Result<Vec<String>, StoreError> {
        if !self.root.exists() {
            return Ok(vec![]);
        }
        let mut names: Vec<String> = fs::read_dir(&self.root)?
            .filter_map(|entry| {
                let entry = entry.ok()?;
                let name = entry.file_name().to_string_lossy().to_string();
                name.strip_suffix(GRAPH_EXT)
                    .filter(|n| !n.starts_with('.'))
                    .map(|n| n.to_string())
            })
            .collect();
        names.sort();
        Ok(names)
    }

    fn read(&self, name: &str) -> Result<Graph, StoreError> {
        let path = self.graph_path(name)?;
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StoreError::NotFound(name.to_string()))
            }
            Err(e) => return Err(e.into()),
        };
        Ok(Graph::from_json(&raw)?)
    }

    fn write(&self, name: &str, graph: &Graph) -> Result<(), StoreError> {
        graph.validate()?;
        let path = self.graph_path(name)?;
        let json = serde_json::to_string_pretty(graph)?;
        self.write_atomic(&path, &json)?;
        tracing::debug!(name, nodes = graph.nodes.len(), path = %path.display(), "graph saved");
        Ok(())
    }

    fn delete(&self, name: &str) -> Result<(), StoreError> {
        for path in [self.graph_path(name)?, self.report_path(name)?] {
            if path.exists() {
                fs::remove_file(&path)?;
            }
        }
        Ok(())
    }

    fn write_report(&self, name: &str, report: &SecurityReport) -> Result<(), StoreError> {
        let path = self.report_path(name)?;
        let json = serde_json::to_string_pretty(report)?;
        self.write_atomic(&path, &json)
    }

    fn read_report(&self, name: &str) -> Result<Option<SecurityReport>, StoreError> {
        let path = self.report_path(name)?;
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        match serde_json::from_str(&raw) {
            Ok(report) => Ok(Some(report)),
            Err(e) => {
                tracing::warn!(name, error = %e, "ignoring unreadable scan report");
                Ok(None)
            }
        }
    }
}

/// Resolve the default store directory.
pub fn default_root() -> PathBuf {
    if let Some(dir) = std::env::var_os("INFRASKETCH_HOME") {
        return PathBuf::from(dir);
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".infrasketch")
}

/// Names become file names, so keep them to a safe character set.
fn validate_name(name: &str) -> Result<(), StoreError> {
    let ok = !name.is_empty()
        && !name.starts_with('.')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if ok {
        Ok(())
    } else {
        Err(StoreError::InvalidName(name.to_string()))
    }
}
