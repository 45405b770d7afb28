//! Schema loaders.
//!
//! Loaders sit outside the core: they read OpenAPI or JSON Schema documents
//! (JSON or YAML) and build the immutable [`SchemaGraph`] the pipeline runs on.
//! Each document is loaded under a caller-supplied base [`NamespaceScope`].

mod jsonschema;
mod openapi;

pub use jsonschema::load_schema_files;
pub use openapi::load_openapi;

use crate::graph::{NamespaceScope, SchemaGraph, TypeId};
use serde_json::Value;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("{}: {message}", path.display())]
    Document { path: PathBuf, message: String },

    #[error("unsupported document: {0}")]
    Unsupported(String),

    #[error("schema '{schema}': {message}")]
    Invalid { schema: String, message: String },

    #[error("type '{0}' is defined more than once")]
    Duplicate(TypeId),
}

impl LoadError {
    /// Attach the file a parse error came from.
    fn in_file(self, path: &Path) -> Self {
        match self {
            LoadError::Json(_) | LoadError::Yaml(_) | LoadError::Unsupported(_) => {
                LoadError::Document {
                    path: path.to_path_buf(),
                    message: self.to_string(),
                }
            }
            other => other,
        }
    }
}

/// Text encoding of a schema document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DocumentFormat {
    Json,
    Yaml,
    /// JSON when the text starts with `{`, YAML otherwise.
    #[default]
    Auto,
}

impl DocumentFormat {
    /// Pick the format from a file extension.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => DocumentFormat::Json,
            Some("yaml" | "yml") => DocumentFormat::Yaml,
            _ => DocumentFormat::Auto,
        }
    }
}

/// Parse document text into a JSON value.
pub fn parse_document(text: &str, format: DocumentFormat) -> Result<Value, LoadError> {
    let format = match format {
        DocumentFormat::Auto if text.trim_start().starts_with('{') => DocumentFormat::Json,
        DocumentFormat::Auto => DocumentFormat::Yaml,
        other => other,
    };
    match format {
        DocumentFormat::Json => Ok(serde_json::from_str(text)?),
        _ => Ok(serde_yaml::from_str(text)?),
    }
}

pub(crate) fn read_document(path: &Path) -> Result<Value, LoadError> {
    let text = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_document(&text, DocumentFormat::from_path(path)).map_err(|e| e.in_file(path))
}

/// Whether a document is a definitions container rather than a single schema.
fn is_definitions_document(doc: &Value) -> bool {
    doc.get("openapi").is_some()
        || doc.get("swagger").is_some()
        || doc.get("components").is_some()
        || ((doc.get("$defs").is_some() || doc.get("definitions").is_some())
            && doc.get("type").is_none()
            && doc.get("properties").is_none()
            && doc.get("enum").is_none())
}

/// Load a file or a directory of schema files.
///
/// OpenAPI documents and `$defs` bundles are loaded on their own; standalone
/// JSON Schema files (one type per file, linked by relative `$ref`s) are
/// loaded together so that shared files are read once.
pub fn load_path(path: &Path, scope: &NamespaceScope) -> Result<SchemaGraph, LoadError> {
    let files = if path.is_dir() {
        schema_files_in(path)?
    } else {
        vec![path.to_path_buf()]
    };

    let mut graph = SchemaGraph::new();
    let mut standalone = Vec::new();
    for file in files {
        let doc = read_document(&file)?;
        if is_definitions_document(&doc) {
            let loaded = load_openapi(&doc, scope).map_err(|e| e.in_file(&file))?;
            merge_into(&mut graph, loaded)?;
        } else {
            standalone.push(file);
        }
    }
    if !standalone.is_empty() {
        merge_into(&mut graph, load_schema_files(&standalone, scope)?)?;
    }
    tracing::debug!(path = %path.display(), scope = %scope, types = graph.len(), "loaded schemas");
    Ok(graph)
}

/// Merge `other` into `graph`, failing on the first id defined in both.
pub fn merge_into(graph: &mut SchemaGraph, other: SchemaGraph) -> Result<(), LoadError> {
    match graph.merge(other).into_iter().next() {
        Some(duplicate) => Err(LoadError::Duplicate(duplicate)),
        None => Ok(()),
    }
}

fn schema_files_in(dir: &Path) -> Result<Vec<PathBuf>, LoadError> {
    let entries = std::fs::read_dir(dir).map_err(|source| LoadError::Io {
        path: dir.to_path_buf(),
        source,
    })?;
    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| LoadError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        if path.is_file()
            && matches!(
                path.extension().and_then(|e| e.to_str()),
                Some("json" | "yaml" | "yml")
            )
        {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn auto_detects_json_and_yaml() {
        let json = parse_document(r#"{"a": 1}"#, DocumentFormat::Auto).unwrap();
        let yaml = parse_document("a: 1\n", DocumentFormat::Auto).unwrap();
        assert_eq!(json, yaml);
    }

    #[test]
    fn parse_errors_name_the_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.json");
        fs::write(&path, "{ not json").unwrap();
        let err = load_path(&path, &NamespaceScope::root()).unwrap_err();
        assert!(err.to_string().contains("broken.json"));
    }

    #[test]
    fn directory_loads_every_schema_file() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("api.yaml"),
            "openapi: 3.0.3\ncomponents:\n  schemas:\n    Status:\n      type: string\n      enum: [A, B]\n",
        )
        .unwrap();
        fs::write(
            dir.path().join("TagV1.json"),
            r#"{"type": "object", "properties": {"label": {"type": "string"}}}"#,
        )
        .unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let graph = load_path(dir.path(), &NamespaceScope::parse("shop")).unwrap();
        assert_eq!(graph.len(), 2);
        assert!(graph.contains(&TypeId::new("shop/Status")));
        assert!(graph.contains(&TypeId::new("shop/TagV1")));
    }
}
