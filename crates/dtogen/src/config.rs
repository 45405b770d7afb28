//! Per-run generator configuration.
//!
//! Example `dtogen.toml`:
//! ```toml
//! targets = ["java", "kotlin"]
//! root_package = "com.acme.model"
//! records = true
//! indent = { spaces = 4 }
//!
//! [naming]
//! type_case = "pascal"
//! field_case = "camel"
//! type_suffix = "Dto"
//!
//! [annotations]
//! json_property = true
//! ```

use crate::naming::CasingPolicy;
use crate::traits::TargetLanguage;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Which annotation families renderers emit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnotationConfig {
    /// Documentation annotations (`@Schema`) and doc comments.
    pub schema_docs: bool,
    /// Property-name mapping annotations (`@JsonProperty`).
    pub json_property: bool,
    /// Validation annotations, or JSDoc validation tags.
    pub validation: bool,
}

impl Default for AnnotationConfig {
    fn default() -> Self {
        Self {
            schema_docs: true,
            json_property: false,
            validation: true,
        }
    }
}

/// Indentation unit of generated code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Indent {
    Spaces(usize),
    Tab,
}

impl Default for Indent {
    fn default() -> Self {
        Self::Spaces(4)
    }
}

impl Indent {
    /// Text of `depth` indentation levels.
    pub fn repeat(&self, depth: usize) -> String {
        match self {
            Self::Spaces(n) => " ".repeat(n * depth),
            Self::Tab => "\t".repeat(depth),
        }
    }
}

/// Immutable configuration of one generation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub targets: Vec<TargetLanguage>,
    /// Package prefixed to every scope (`com.acme.model`).
    pub root_package: String,
    pub naming: CasingPolicy,
    pub annotations: AnnotationConfig,
    pub indent: Indent,
    /// Java `record`s and `@JvmRecord` Kotlin data classes. When false, Java
    /// gets classes with public fields and constructors, and Kotlin plain data classes.
    pub records: bool,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            targets: vec![TargetLanguage::Java],
            root_package: "model".to_string(),
            naming: CasingPolicy::default(),
            annotations: AnnotationConfig::default(),
            indent: Indent::default(),
            records: true,
        }
    }
}

impl GeneratorConfig {
    /// Load a TOML config file. Missing keys take their defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    pub fn with_targets(mut self, targets: impl IntoIterator<Item = TargetLanguage>) -> Self {
        self.targets = targets.into_iter().collect();
        self
    }
}
