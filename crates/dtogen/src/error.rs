//! Error types for the generation pipeline.
//!
//! [`GenerateError`]s are structural: they describe a malformed or ambiguous
//! schema, are detected before any rendering begins, and abort the run.
//! [`RenderError`]s are scoped to one (type, language) pair and never abort
//! the run.

use crate::graph::{NamespaceScope, TypeId};
use crate::traits::TargetLanguage;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GenerateError {
    #[error("{type_id} ({scope}): reference to undefined type '{target}'")]
    UnresolvedReference {
        type_id: TypeId,
        scope: NamespaceScope,
        target: TypeId,
    },

    #[error("{type_id} ({scope}): cyclic composition through required references: {}", format_path(.path))]
    CyclicComposition {
        type_id: TypeId,
        scope: NamespaceScope,
        path: Vec<TypeId>,
    },

    #[error("{type_id} ({scope}): field '{field}': unsupported facet {facet}: {reason}")]
    UnsupportedFacet {
        type_id: TypeId,
        scope: NamespaceScope,
        field: String,
        facet: String,
        reason: String,
    },

    #[error("{type_id} ({scope}): duplicate definition of '{name}'")]
    DuplicateDefinition {
        type_id: TypeId,
        scope: NamespaceScope,
        name: String,
    },

    #[error("{type_id} ({scope}): field '{field}' declares an anonymous object or enum; define it as a named type")]
    AnonymousComposite {
        type_id: TypeId,
        scope: NamespaceScope,
        field: String,
    },
}

impl GenerateError {
    /// The type the error was reported against.
    pub fn type_id(&self) -> &TypeId {
        match self {
            Self::UnresolvedReference { type_id, .. }
            | Self::CyclicComposition { type_id, .. }
            | Self::UnsupportedFacet { type_id, .. }
            | Self::DuplicateDefinition { type_id, .. }
            | Self::AnonymousComposite { type_id, .. } => type_id,
        }
    }

    pub fn scope(&self) -> &NamespaceScope {
        match self {
            Self::UnresolvedReference { scope, .. }
            | Self::CyclicComposition { scope, .. }
            | Self::UnsupportedFacet { scope, .. }
            | Self::DuplicateDefinition { scope, .. }
            | Self::AnonymousComposite { scope, .. } => scope,
        }
    }
}

fn format_path(path: &[TypeId]) -> String {
    path.iter()
        .map(TypeId::as_str)
        .collect::<Vec<_>>()
        .join(" -> ")
}

/// A renderer could not express a resolved type in its target language.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RenderError {
    #[error("{type_id} ({scope}): cannot map to {language}: {reason}")]
    UnsupportedTargetMapping {
        type_id: TypeId,
        scope: NamespaceScope,
        language: TargetLanguage,
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cycle_message_lists_path() {
        let err = GenerateError::CyclicComposition {
            type_id: TypeId::new("A"),
            scope: NamespaceScope::root(),
            path: vec![TypeId::new("A"), TypeId::new("B"), TypeId::new("A")],
        };
        assert_eq!(
            err.to_string(),
            "A (<root>): cyclic composition through required references: A -> B -> A"
        );
        assert_eq!(err.type_id().as_str(), "A");
    }
}
