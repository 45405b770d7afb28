//! Output sinks for rendered units.

use crate::traits::RenderedUnit;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum EmitError {
    #[error("failed to write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("two units map to the output path {}", path.display())]
    PathCollision { path: PathBuf },

    #[error("unit {0} was produced more than once")]
    DuplicateUnit(String),
}

/// Receives rendered units. Called once per unit.
pub trait Emitter {
    fn write(&mut self, unit: &RenderedUnit) -> Result<(), EmitError>;
}

/// Writes units below a root directory, creating package directories.
#[derive(Debug, Clone)]
pub struct FsEmitter {
    root: PathBuf,
    written: Vec<PathBuf>,
}

impl FsEmitter {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            written: Vec::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Files written so far, in write order.
    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }
}

impl Emitter for FsEmitter {
    fn write(&mut self, unit: &RenderedUnit) -> Result<(), EmitError> {
        let path = self.root.join(&unit.path);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| EmitError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        std::fs::write(&path, &unit.source).map_err(|source| EmitError::Io {
            path: path.clone(),
            source,
        })?;
        tracing::debug!(path = %path.display(), "wrote unit");
        self.written.push(path);
        Ok(())
    }
}

/// Collects `(path, source)` pairs in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryEmitter {
    pub files: BTreeMap<PathBuf, String>,
}

impl MemoryEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, path: impl AsRef<Path>) -> Option<&str> {
        self.files.get(path.as_ref()).map(String::as_str)
    }
}

impl Emitter for MemoryEmitter {
    fn write(&mut self, unit: &RenderedUnit) -> Result<(), EmitError> {
        if self.files.contains_key(&unit.path) {
            return Err(EmitError::PathCollision {
                path: unit.path.clone(),
            });
        }
        self.files.insert(unit.path.clone(), unit.source.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::NamespaceScope;
    use crate::traits::{TargetLanguage, UnitKey};
    use tempfile::tempdir;

    fn unit(path: &str, source: &str) -> RenderedUnit {
        RenderedUnit {
            key: UnitKey {
                scope: NamespaceScope::parse("order"),
                type_name: "OrderV1Dto".into(),
                language: TargetLanguage::Java,
            },
            path: PathBuf::from(path),
            source: source.into(),
        }
    }

    #[test]
    fn fs_emitter_creates_package_dirs() {
        let dir = tempdir().unwrap();
        let mut emitter = FsEmitter::new(dir.path());
        emitter
            .write(&unit("model/order/OrderV1Dto.java", "record"))
            .unwrap();

        let written = dir.path().join("model/order/OrderV1Dto.java");
        assert_eq!(std::fs::read_to_string(&written).unwrap(), "record");
        assert_eq!(emitter.written(), &[written]);
    }

    #[test]
    fn memory_emitter_rejects_collisions() {
        let mut emitter = MemoryEmitter::new();
        emitter.write(&unit("a/B.java", "1")).unwrap();
        assert!(matches!(
            emitter.write(&unit("a/B.java", "2")),
            Err(EmitError::PathCollision { .. })
        ));
        assert_eq!(emitter.get("a/B.java"), Some("1"));
    }
}
