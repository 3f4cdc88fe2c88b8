//! YAML loading and saving
//!
//! Graph documents are `{nodes: [...], links: [...]}`. A directory of graph
//! documents can be loaded as one graph: every `.yaml`/`.yml` file directly
//! inside it is read in file-name order and the results are merged.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, span, trace, Level};

use crate::core::{Graph, LoadError};
use crate::mermaid::MermaidSettings;
use crate::query::Query;

fn is_blank(content: &str) -> bool {
    content
        .lines()
        .all(|line| line.trim().is_empty() || line.trim_start().starts_with('#'))
}

/// Parse a graph document
///
/// A blank document yields an empty graph.
pub fn parse_graph(content: &str) -> Result<Graph, LoadError> {
    if is_blank(content) {
        return Ok(Graph::new());
    }
    let graph: Graph =
        serde_yaml::from_str(content).map_err(|e| LoadError::yaml("graph", e))?;
    trace!(
        node_count = graph.node_count(),
        link_count = graph.link_count(),
        "Parsed graph document"
    );
    Ok(graph)
}

/// Parse a query document
///
/// A blank document yields a query without filters.
pub fn parse_query(content: &str) -> Result<Query, LoadError> {
    if is_blank(content) {
        return Ok(Query::default());
    }
    serde_yaml::from_str(content).map_err(|e| LoadError::yaml("query", e))
}

/// Parse a diagram settings document
///
/// A blank document, or a blank `direction`, falls back to the defaults.
pub fn parse_settings(content: &str) -> Result<MermaidSettings, LoadError> {
    if is_blank(content) {
        return Ok(MermaidSettings::default());
    }
    let mut settings: MermaidSettings =
        serde_yaml::from_str(content).map_err(|e| LoadError::yaml("mermaid", e))?;
    if settings.direction.is_empty() {
        settings.direction = MermaidSettings::default().direction;
    }
    Ok(settings)
}

fn read(path: &Path) -> Result<String, LoadError> {
    fs::read_to_string(path).map_err(|e| LoadError::io(path, e))
}

/// Load a graph document from a file
pub fn load_graph(path: impl AsRef<Path>) -> Result<Graph, LoadError> {
    let path = path.as_ref();
    debug!(path = %path.display(), "Loading graph");
    parse_graph(&read(path)?)
}

/// Load a query document from a file
pub fn load_query(path: impl AsRef<Path>) -> Result<Query, LoadError> {
    parse_query(&read(path.as_ref())?)
}

/// Load a diagram settings document from a file
pub fn load_settings(path: impl AsRef<Path>) -> Result<MermaidSettings, LoadError> {
    parse_settings(&read(path.as_ref())?)
}

fn is_yaml(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext == "yaml" || ext == "yml")
        .unwrap_or(false)
}

/// Load and merge every graph document in a directory
///
/// Subdirectories are not descended into. A node id defined in more than one
/// file is an error.
pub fn load_folder(dir: impl AsRef<Path>) -> Result<Graph, LoadError> {
    let dir = dir.as_ref();
    let folder_span = span!(Level::INFO, "load_folder", path = %dir.display());
    let _enter = folder_span.enter();

    let metadata = fs::metadata(dir).map_err(|e| LoadError::io(dir, e))?;
    if !metadata.is_dir() {
        return Err(LoadError::NotADirectory {
            path: dir.to_path_buf(),
        });
    }

    let mut files: Vec<PathBuf> = fs::read_dir(dir)
        .map_err(|e| LoadError::io(dir, e))?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && is_yaml(path))
        .collect();
    files.sort();
    debug!(file_count = files.len(), "Found graph documents");

    let graphs = files
        .iter()
        .map(|path| {
            load_graph(path).map_err(|e| LoadError::InvalidFile {
                path: path.clone(),
                cause: Box::new(e),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let merged = Graph::merge(&graphs)?;
    info!(
        file_count = files.len(),
        node_count = merged.node_count(),
        link_count = merged.link_count(),
        "Merged graph documents"
    );
    Ok(merged)
}

impl Graph {
    /// Serialize the graph as a YAML document
    ///
    /// Nodes are written in insertion order; unset parents and empty
    /// attribute maps are omitted.
    pub fn to_yaml(&self) -> Result<String, LoadError> {
        serde_yaml::to_string(self).map_err(|cause| LoadError::Serialize {
            document: "graph",
            cause,
        })
    }
}
