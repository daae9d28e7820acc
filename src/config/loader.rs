// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::config::model::{GraphDocument, RawGraphDocument, RunnerConfig};
use crate::config::validate::validate_settings;
use crate::dag::Graph;
use crate::errors::{DepjobsError, Result};
use crate::types::ROOT_ID;

/// Serialisation format of a graph document, chosen by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Yaml,
    Json,
}

impl DocumentFormat {
    /// `.json` is JSON; everything else (`.yaml`, `.yml`, no extension) is YAML.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => DocumentFormat::Json,
            _ => DocumentFormat::Yaml,
        }
    }
}

/// Parse a graph document from a string without validating it.
pub fn parse_document(contents: &str, format: DocumentFormat) -> Result<RawGraphDocument> {
    let parsed = match format {
        DocumentFormat::Yaml => serde_yaml::from_str(contents).map_err(|e| e.to_string()),
        DocumentFormat::Json => serde_json::from_str(contents).map_err(|e| e.to_string()),
    };
    parsed.map_err(|e| DepjobsError::GraphLoad(format!("malformed {format:?} document: {e}")))
}

/// Load a graph document from `path` and return the raw `RawGraphDocument`.
///
/// This only performs deserialisation; use [`load_and_validate`] for the
/// structural checks.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawGraphDocument> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)
        .map_err(|e| DepjobsError::GraphLoad(format!("reading {}: {e}", path.display())))?;

    parse_document(&contents, DocumentFormat::from_path(path))
}

/// Load a graph document from `path` and validate it.
///
/// - Reads YAML or JSON.
/// - Checks for:
///   - a `root` entry,
///   - unknown `deps` references,
///   - cycles.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<GraphDocument> {
    let raw = load_from_path(&path)?;
    let doc = GraphDocument::try_from(raw)?;
    debug!(path = %path.as_ref().display(), jobs = doc.len(), "graph document loaded");
    Ok(doc)
}

/// Load, validate and build a graph in one step.
pub fn load_graph(path: impl AsRef<Path>) -> Result<Graph> {
    let doc = load_and_validate(&path)?;
    let graph = build_graph(&doc)?;
    info!(path = %path.as_ref().display(), jobs = graph.len(), "graph built");
    Ok(graph)
}

/// Wire a [`Graph`] from a validated document.
///
/// For every entry: `num_upstream` is the number of other entries listing it
/// in their `deps` (root is always 0). All jobs are added first so that
/// `add_dependents` only ever references registered ids; cadences come last.
pub fn build_graph(doc: &GraphDocument) -> Result<Graph> {
    let mut graph = Graph::new();

    for (id, entry) in doc.jobs() {
        let num_upstream = if id == ROOT_ID { 0 } else { doc.num_upstream(id) };
        graph.add(id.clone(), entry.name.clone(), num_upstream)?;
    }

    for (id, entry) in doc.jobs() {
        if !entry.deps.is_empty() {
            graph.add_dependents(id, entry.deps.iter().cloned())?;
        }
    }

    for (id, entry) in doc.jobs() {
        if let Some(every) = entry.cadence() {
            graph.add_periodic(id, every)?;
        }
    }

    Ok(graph)
}

/// Render a graph as a document string.
pub fn render_document(graph: &Graph, format: DocumentFormat) -> Result<String> {
    let doc = GraphDocument::from_graph(graph);
    let rendered = match format {
        DocumentFormat::Yaml => serde_yaml::to_string(&doc).map_err(|e| e.to_string()),
        DocumentFormat::Json => serde_json::to_string_pretty(&doc).map_err(|e| e.to_string()),
    };
    rendered.map_err(|e| DepjobsError::GraphLoad(format!("serialising {format:?} document: {e}")))
}

/// Store a graph at `path`; the format follows the file extension.
pub fn store_document(graph: &Graph, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let rendered = render_document(graph, DocumentFormat::from_path(path))?;
    fs::write(path, rendered)?;
    info!(path = %path.display(), jobs = graph.len(), "graph document stored");
    Ok(())
}

/// Load runner settings from a TOML file and validate them.
pub fn load_settings(path: impl AsRef<Path>) -> Result<RunnerConfig> {
    let contents = fs::read_to_string(path)?;
    let cfg: RunnerConfig = toml::from_str(&contents)?;
    validate_settings(&cfg)?;
    Ok(cfg)
}

/// Helper to resolve a default settings path.
///
/// Currently this just returns `Depjobs.toml` in the current working
/// directory.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("Depjobs.toml")
}
