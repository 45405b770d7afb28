//! Per-language renderers.
//!
//! Each renderer takes one resolved record or enum plus the finalized
//! constraint and name tables and produces a single source file. All of them
//! implement the [`Renderer`](crate::traits::Renderer) trait and are selected
//! through the [`registry`](crate::registry).

use crate::config::Indent;
use crate::error::RenderError;
use crate::resolve::ResolvedType;
use crate::traits::TargetLanguage;

// Java and Kotlin share the annotation model
#[cfg(any(feature = "backend-java", feature = "backend-kotlin"))]
mod jvm;

// Java
#[cfg(feature = "backend-java")]
pub mod java;

#[cfg(feature = "backend-java")]
pub use java::{JAVA_RENDERER, JavaRenderer};

// Kotlin
#[cfg(feature = "backend-kotlin")]
pub mod kotlin;

#[cfg(feature = "backend-kotlin")]
pub use kotlin::{KOTLIN_RENDERER, KotlinRenderer};

// TypeScript
#[cfg(feature = "backend-typescript")]
pub mod typescript;

#[cfg(feature = "backend-typescript")]
pub use typescript::{TYPESCRIPT_RENDERER, TypeScriptRenderer};

/// Line-oriented source buffer.
pub(crate) struct SourceWriter {
    output: String,
    indent: Indent,
}

impl SourceWriter {
    pub(crate) fn new(indent: Indent) -> Self {
        Self {
            output: String::new(),
            indent,
        }
    }

    /// Write `text` at `depth` levels of indentation, then a newline.
    pub(crate) fn line(&mut self, depth: usize, text: &str) {
        if !text.is_empty() {
            self.output.push_str(&self.indent.repeat(depth));
            self.output.push_str(text);
        }
        self.output.push('\n');
    }

    pub(crate) fn blank(&mut self) {
        self.output.push('\n');
    }

    pub(crate) fn finish(self) -> String {
        self.output
    }
}

/// Escape text for a double-quoted Java/Kotlin/TypeScript string literal.
pub(crate) fn escape_quoted(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out
}

/// Escape `$` where Kotlin would start a string template.
#[cfg(any(feature = "backend-java", feature = "backend-kotlin"))]
pub(crate) fn escape_kotlin(text: &str) -> String {
    let escaped = escape_quoted(text);
    let mut out = String::with_capacity(escaped.len());
    let mut chars = escaped.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '$'
            && chars
                .peek()
                .is_some_and(|n| n.is_alphabetic() || *n == '_' || *n == '{')
        {
            out.push_str("\\$");
        } else {
            out.push(c);
        }
    }
    out
}

/// `[A-Za-z_$][A-Za-z0-9_$]*`
pub(crate) fn is_identifier(text: &str) -> bool {
    let mut chars = text.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

/// Build the error for a shape a renderer cannot express.
pub(crate) fn unsupported(
    node: &ResolvedType,
    language: TargetLanguage,
    reason: impl Into<String>,
) -> RenderError {
    RenderError::UnsupportedTargetMapping {
        type_id: node.id.clone(),
        scope: node.scope.clone(),
        language,
        reason: reason.into(),
    }
}

/// Split a description into trimmed doc-comment lines.
pub(crate) fn doc_lines(text: &str) -> Vec<&str> {
    text.lines().map(str::trim_end).collect()
}
