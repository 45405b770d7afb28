//! The renderer capability and its output unit.

use crate::config::GeneratorConfig;
use crate::constraint::ConstraintTable;
use crate::error::RenderError;
use crate::graph::NamespaceScope;
use crate::naming::{CanonicalName, NameTable};
use crate::resolve::{DescriptorTree, ResolvedType};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// A target language a renderer emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetLanguage {
    Java,
    Kotlin,
    TypeScript,
}

impl TargetLanguage {
    pub const ALL: [TargetLanguage; 3] = [Self::Java, Self::Kotlin, Self::TypeScript];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Java => "java",
            Self::Kotlin => "kotlin",
            Self::TypeScript => "typescript",
        }
    }
}

impl fmt::Display for TargetLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TargetLanguage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "java" => Ok(Self::Java),
            "kotlin" | "kt" => Ok(Self::Kotlin),
            "typescript" | "ts" => Ok(Self::TypeScript),
            other => Err(format!("unknown target language: {}", other)),
        }
    }
}

/// Identity of a rendered unit: one per (scope, type, language) per run.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UnitKey {
    pub scope: NamespaceScope,
    pub type_name: String,
    pub language: TargetLanguage,
}

/// Rendered source for one data-holder type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedUnit {
    pub key: UnitKey,
    /// Output path relative to the emitter's root.
    pub path: PathBuf,
    pub source: String,
}

/// Everything a renderer reads. All of it is finalized before the first
/// renderer runs and shared read-only between renderers.
#[derive(Clone, Copy)]
pub struct RenderContext<'a> {
    pub tree: &'a DescriptorTree,
    pub constraints: &'a ConstraintTable,
    pub names: &'a NameTable,
    pub config: &'a GeneratorConfig,
}

/// A per-language renderer.
///
/// Renderers turn one resolved record or enum into source text. They never
/// resolve references, interpret facets, or pick names: those decisions
/// arrive in the [`RenderContext`].
///
/// # Implementing Custom Renderers
///
/// ```ignore
/// use dtogen::{Renderer, RenderContext, RenderedUnit, TargetLanguage};
///
/// struct MyRenderer;
///
/// impl Renderer for MyRenderer {
///     fn language(&self) -> TargetLanguage { TargetLanguage::Kotlin }
///     fn extension(&self) -> &'static str { "kt" }
///     fn render(&self, node: &ResolvedType, ctx: &RenderContext<'_>)
///         -> Result<RenderedUnit, RenderError> { /* ... */ }
/// }
/// ```
pub trait Renderer: Send + Sync {
    /// Target language of this renderer.
    fn language(&self) -> TargetLanguage;

    /// File extension for generated code (e.g., "java", "kt", "ts").
    fn extension(&self) -> &'static str;

    /// Render one record or enum node.
    fn render(&self, node: &ResolvedType, ctx: &RenderContext<'_>)
    -> Result<RenderedUnit, RenderError>;

    /// Output path of a type: package directories, then `<Name>.<ext>`.
    fn output_path(&self, name: &CanonicalName, names: &NameTable) -> PathBuf {
        let mut path: PathBuf = names.package_segments(&name.scope).into_iter().collect();
        path.push(format!("{}.{}", name.simple, self.extension()));
        path
    }

    /// Build the unit key and path for a finished source text.
    fn unit(&self, name: &CanonicalName, names: &NameTable, source: String) -> RenderedUnit {
        RenderedUnit {
            key: UnitKey {
                scope: name.scope.clone(),
                type_name: name.simple.clone(),
                language: self.language(),
            },
            path: self.output_path(name, names),
            source,
        }
    }
}
