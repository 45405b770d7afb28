//! Normalized schema model.
//!
//! A [`SchemaGraph`] is the immutable input of a generation run: every type
//! definition keyed by a unique [`TypeId`], each attached to the
//! [`NamespaceScope`] it was declared in. Loaders build it once; no pipeline
//! stage mutates it.

use crate::constraint::Constraint;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Unique identifier of a type definition within one graph.
///
/// Loaders qualify identifiers with their scope (`customer.profile/UserTypeV1`),
/// so equal simple names in different scopes never share an id.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TypeId(String);

impl TypeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Build the conventional scope-qualified id for a simple name.
    pub fn scoped(scope: &NamespaceScope, name: &str) -> Self {
        if scope.is_root() {
            Self(name.to_string())
        } else {
            Self(format!("{}/{}", scope, name))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The simple name: everything after the last `/`.
    pub fn simple_name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }
}

impl fmt::Display for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Module/version grouping that disambiguates same-named types.
///
/// Each scope is rendered into its own package or module.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NamespaceScope {
    /// Originating package path, outermost first (e.g. `["customer", "profile"]`).
    pub package: Vec<String>,
    /// API version segment, rendered after the package path.
    pub version: Option<String>,
}

impl NamespaceScope {
    /// The scope with no package and no version.
    pub fn root() -> Self {
        Self::default()
    }

    /// Parse a dotted package path, optionally followed by `@version`.
    ///
    /// `"customer.profile@v1"` has package `customer.profile` and version `v1`.
    pub fn parse(text: &str) -> Self {
        let (package, version) = match text.split_once('@') {
            Some((p, v)) => (p, Some(v.trim().to_string()).filter(|v| !v.is_empty())),
            None => (text, None),
        };
        Self {
            package: split_segments(package),
            version,
        }
    }

    pub fn is_root(&self) -> bool {
        self.package.is_empty() && self.version.is_none()
    }

    /// Package segments followed by the version, if any.
    pub fn segments(&self) -> Vec<&str> {
        self.package
            .iter()
            .map(String::as_str)
            .chain(self.version.as_deref())
            .collect()
    }

    /// A child scope with `subdir` segments appended to the package path.
    ///
    /// Segments may be separated by `/` or `.`.
    pub fn join(&self, subdir: &str) -> Self {
        let mut package = self.package.clone();
        package.extend(split_segments(subdir));
        Self {
            package,
            version: self.version.clone(),
        }
    }
}

fn split_segments(text: &str) -> Vec<String> {
    text.split(['.', '/'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

impl fmt::Display for NamespaceScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_root() {
            return f.write_str("<root>");
        }
        f.write_str(&self.package.join("."))?;
        if let Some(version) = &self.version {
            write!(f, "@{}", version)?;
        }
        Ok(())
    }
}

/// JSON primitive kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrimitiveKind {
    String,
    Integer,
    Number,
    Boolean,
}

/// A schema type: what a definition or a field is declared as.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SchemaType {
    Primitive {
        kind: PrimitiveKind,
        /// Schema `format` keyword (`date-time`, `int64`, `email`, ...).
        format: Option<String>,
    },
    Object(ObjectType),
    Enum(EnumType),
    Array(ArrayType),
    /// String-keyed map (`additionalProperties: <schema>`).
    Map(Box<SchemaType>),
    Reference(TypeId),
}

/// A record-like composite.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ObjectType {
    pub name: String,
    pub description: Option<String>,
    /// Deprecation message, present when the type is deprecated.
    pub deprecated: Option<String>,
    pub fields: Vec<Field>,
}

/// An enumeration. Variant order is the declaration order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EnumType {
    pub name: String,
    pub description: Option<String>,
    pub deprecated: Option<String>,
    pub variants: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArrayType {
    pub element: Box<SchemaType>,
    pub min_items: Option<u64>,
    pub max_items: Option<u64>,
    /// `uniqueItems: true`; rendered as a set.
    pub unique: bool,
}

/// A field of an [`ObjectType`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    /// Field name as it appears in the schema.
    pub name: String,
    pub ty: SchemaType,
    pub required: bool,
    /// Explicitly declared nullable (`nullable: true`, `x-nullable`, or a `null` type arm).
    pub nullable: bool,
    pub default: Option<Value>,
    pub description: Option<String>,
    pub deprecated: Option<String>,
    /// Declared constraints in source order.
    pub constraints: Vec<Constraint>,
    /// Fully-qualified custom serializer class (`x-json-serializer`).
    pub serializer: Option<String>,
}

impl Field {
    pub fn required(name: impl Into<String>, ty: SchemaType) -> Self {
        Self {
            name: name.into(),
            ty,
            required: true,
            nullable: false,
            default: None,
            description: None,
            deprecated: None,
            constraints: Vec::new(),
            serializer: None,
        }
    }

    pub fn optional(name: impl Into<String>, ty: SchemaType) -> Self {
        Self {
            required: false,
            ..Self::required(name, ty)
        }
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    pub fn with_docs(mut self, docs: impl Into<String>) -> Self {
        self.description = Some(docs.into());
        self
    }

    pub fn with_constraint(mut self, constraint: Constraint) -> Self {
        self.constraints.push(constraint);
        self
    }

    pub fn with_serializer(mut self, class: impl Into<String>) -> Self {
        self.serializer = Some(class.into());
        self
    }
}

impl SchemaType {
    pub fn string() -> Self {
        Self::Primitive {
            kind: PrimitiveKind::String,
            format: None,
        }
    }

    pub fn integer() -> Self {
        Self::Primitive {
            kind: PrimitiveKind::Integer,
            format: None,
        }
    }

    pub fn boolean() -> Self {
        Self::Primitive {
            kind: PrimitiveKind::Boolean,
            format: None,
        }
    }

    pub fn formatted(kind: PrimitiveKind, format: impl Into<String>) -> Self {
        Self::Primitive {
            kind,
            format: Some(format.into()),
        }
    }

    pub fn array_of(element: SchemaType) -> Self {
        Self::Array(ArrayType {
            element: Box::new(element),
            min_items: None,
            max_items: None,
            unique: false,
        })
    }

    pub fn reference(id: impl Into<String>) -> Self {
        Self::Reference(TypeId::new(id))
    }

    /// Short human-readable kind, for diagnostics.
    pub fn describe(&self) -> &'static str {
        match self {
            Self::Primitive { .. } => "primitive",
            Self::Object(_) => "object",
            Self::Enum(_) => "enum",
            Self::Array(_) => "array",
            Self::Map(_) => "map",
            Self::Reference(_) => "reference",
        }
    }
}

/// One top-level definition: its declared type and scope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeDefinition {
    pub ty: SchemaType,
    pub scope: NamespaceScope,
    /// Description of a non-object, non-enum definition (aliases).
    pub description: Option<String>,
    /// Facets declared on an alias definition; inherited by fields that inline it.
    pub constraints: Vec<Constraint>,
    /// Alias-level nullability, inherited by fields that inline it.
    pub nullable: bool,
    /// Alias-level custom serializer, inherited like `constraints`.
    pub serializer: Option<String>,
}

impl TypeDefinition {
    pub fn new(ty: SchemaType, scope: NamespaceScope) -> Self {
        Self {
            ty,
            scope,
            description: None,
            constraints: Vec::new(),
            nullable: false,
            serializer: None,
        }
    }

    /// Object and enum definitions are rendered; everything else is an alias.
    pub fn is_named_composite(&self) -> bool {
        matches!(self.ty, SchemaType::Object(_) | SchemaType::Enum(_))
    }
}

/// All type definitions of a generation run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchemaGraph {
    definitions: BTreeMap<TypeId, TypeDefinition>,
}

impl SchemaGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a definition. Returns the previous definition for `id`, if any.
    pub fn insert(&mut self, id: TypeId, definition: TypeDefinition) -> Option<TypeDefinition> {
        self.definitions.insert(id, definition)
    }

    /// Convenience for tests and programmatic construction.
    pub fn define(&mut self, id: impl Into<String>, ty: SchemaType, scope: NamespaceScope) {
        self.definitions
            .insert(TypeId::new(id), TypeDefinition::new(ty, scope));
    }

    pub fn get(&self, id: &TypeId) -> Option<&TypeDefinition> {
        self.definitions.get(id)
    }

    pub fn contains(&self, id: &TypeId) -> bool {
        self.definitions.contains_key(id)
    }

    /// Definitions in identifier order.
    pub fn iter(&self) -> impl Iterator<Item = (&TypeId, &TypeDefinition)> {
        self.definitions.iter()
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Merge another graph into this one, returning the ids defined in both.
    pub fn merge(&mut self, other: SchemaGraph) -> Vec<TypeId> {
        let mut duplicates = Vec::new();
        for (id, def) in other.definitions {
            if self.definitions.contains_key(&id) {
                duplicates.push(id);
            } else {
                self.definitions.insert(id, def);
            }
        }
        duplicates
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scope_parse_and_display() {
        let scope = NamespaceScope::parse("customer.profile@v1");
        assert_eq!(scope.package, vec!["customer", "profile"]);
        assert_eq!(scope.version.as_deref(), Some("v1"));
        assert_eq!(scope.segments(), vec!["customer", "profile", "v1"]);
        assert_eq!(scope.to_string(), "customer.profile@v1");
        assert_eq!(NamespaceScope::root().to_string(), "<root>");
    }

    #[test]
    fn scope_join_accepts_dir_paths() {
        let scope = NamespaceScope::parse("order").join("common/types");
        assert_eq!(scope.package, vec!["order", "common", "types"]);
    }

    #[test]
    fn scoped_ids_differ_across_scopes() {
        let a = TypeId::scoped(&NamespaceScope::parse("customer"), "UserTypeV1");
        let b = TypeId::scoped(&NamespaceScope::parse("order"), "UserTypeV1");
        assert_ne!(a, b);
        assert_eq!(a.simple_name(), "UserTypeV1");
        assert_eq!(TypeId::scoped(&NamespaceScope::root(), "X").as_str(), "X");
    }

    #[test]
    fn merge_reports_duplicates() {
        let mut a = SchemaGraph::new();
        a.define("A", SchemaType::string(), NamespaceScope::root());
        let mut b = SchemaGraph::new();
        b.define("A", SchemaType::integer(), NamespaceScope::root());
        b.define("B", SchemaType::integer(), NamespaceScope::root());

        let dups = a.merge(b);
        assert_eq!(dups, vec![TypeId::new("A")]);
        assert_eq!(a.len(), 2);
    }
}
