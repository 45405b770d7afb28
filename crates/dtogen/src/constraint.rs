//! Validation facets and their mapping onto resolved fields.
//!
//! The [`ConstraintMapper`] turns the facets declared on a field (plus the
//! ones implied by its type) into an ordered, language-neutral constraint
//! list. Renderers only decide how a constraint is spelled.

use crate::error::GenerateError;
use crate::graph::TypeId;
use crate::resolve::{BaseKind, DescriptorTree, ResolvedField, ResolvedType};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::Number;
use std::collections::BTreeMap;
use std::fmt;

/// Recognized string/number formats.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FormatKind {
    Email,
    Uri,
    Uuid,
    Date,
    DateTime,
    Duration,
    Binary,
    Int32,
    Int64,
    Float,
    Double,
    /// Any other format keyword, kept verbatim.
    Other(String),
}

impl FormatKind {
    pub fn parse(text: &str) -> Self {
        match text {
            "email" => Self::Email,
            "uri" => Self::Uri,
            "uuid" => Self::Uuid,
            "date" => Self::Date,
            "date-time" => Self::DateTime,
            "duration" => Self::Duration,
            "binary" => Self::Binary,
            "int32" => Self::Int32,
            "int64" => Self::Int64,
            "float" => Self::Float,
            "double" => Self::Double,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Email => "email",
            Self::Uri => "uri",
            Self::Uuid => "uuid",
            Self::Date => "date",
            Self::DateTime => "date-time",
            Self::Duration => "duration",
            Self::Binary => "binary",
            Self::Int32 => "int32",
            Self::Int64 => "int64",
            Self::Float => "float",
            Self::Double => "double",
            Self::Other(s) => s.as_str(),
        }
    }

    fn is_numeric(&self) -> bool {
        matches!(self, Self::Int32 | Self::Int64 | Self::Float | Self::Double)
    }

    /// Whether a field of `base` can carry this format.
    fn applies_to(&self, base: &BaseKind) -> bool {
        match self {
            Self::Other(_) => !matches!(base, BaseKind::Reference { .. }),
            f if f.is_numeric() => base.is_numeric(),
            _ => base.is_string_like(),
        }
    }
}

impl fmt::Display for FormatKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single validation rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Constraint {
    NotBlank,
    /// Non-empty binary or collection.
    NotEmpty,
    Pattern { regex: String },
    /// Length of a string or binary, or item count of a collection.
    Size { min: Option<u64>, max: Option<u64> },
    /// Numeric bounds, inclusive.
    Range {
        min: Option<Number>,
        max: Option<Number>,
    },
    Format { format: FormatKind },
    /// An externally defined constraint, by fully-qualified name.
    Custom {
        name: String,
        params: Vec<(String, String)>,
    },
}

/// Kinds in canonical grouping order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ConstraintKind {
    NotBlank,
    NotEmpty,
    Pattern,
    Size,
    Range,
    Format,
    Custom,
}

impl Constraint {
    pub fn pattern(regex: impl Into<String>) -> Self {
        Self::Pattern {
            regex: regex.into(),
        }
    }

    pub fn format(format: FormatKind) -> Self {
        Self::Format { format }
    }

    pub fn custom(name: impl Into<String>) -> Self {
        Self::Custom {
            name: name.into(),
            params: Vec::new(),
        }
    }

    pub fn kind(&self) -> ConstraintKind {
        match self {
            Self::NotBlank => ConstraintKind::NotBlank,
            Self::NotEmpty => ConstraintKind::NotEmpty,
            Self::Pattern { .. } => ConstraintKind::Pattern,
            Self::Size { .. } => ConstraintKind::Size,
            Self::Range { .. } => ConstraintKind::Range,
            Self::Format { .. } => ConstraintKind::Format,
            Self::Custom { .. } => ConstraintKind::Custom,
        }
    }

    /// Facet name used in diagnostics.
    pub fn facet_name(&self) -> String {
        match self {
            Self::NotBlank => "notBlank".into(),
            Self::NotEmpty => "notEmpty".into(),
            Self::Pattern { .. } => "pattern".into(),
            Self::Size { .. } => "size".into(),
            Self::Range { .. } => "range".into(),
            Self::Format { format } => format!("format({})", format),
            Self::Custom { name, .. } => format!("custom({})", name),
        }
    }

    /// Identity used for duplicate detection: custom constraints are distinct by name.
    fn identity(&self) -> (ConstraintKind, Option<&str>) {
        match self {
            Self::Custom { name, .. } => (ConstraintKind::Custom, Some(name.as_str())),
            other => (other.kind(), None),
        }
    }
}

/// Maps declared facets onto fields of resolved types.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConstraintMapper;

impl ConstraintMapper {
    pub fn new() -> Self {
        Self
    }

    /// Constraints of one field, grouped by kind, source order kept within a kind.
    ///
    /// Fails when a facet is declared twice or does not fit the field's type.
    pub fn map(
        &self,
        owner: &ResolvedType,
        field: &ResolvedField,
    ) -> Result<Vec<Constraint>, GenerateError> {
        let descriptor = &field.descriptor;
        let fail = |constraint: &Constraint, reason: String| GenerateError::UnsupportedFacet {
            type_id: owner.id.clone(),
            scope: owner.scope.clone(),
            field: field.name.clone(),
            facet: constraint.facet_name(),
            reason,
        };

        let mut out: Vec<Constraint> = Vec::with_capacity(field.facets.len() + 2);
        for constraint in &field.facets {
            if out.iter().any(|c| c.identity() == constraint.identity()) {
                return Err(fail(constraint, "duplicate declaration".into()));
            }
            out.push(constraint.clone());
        }

        let scalar = !descriptor.is_collection();
        let declared_format = descriptor
            .format
            .as_deref()
            .map(FormatKind::parse)
            .filter(|f| !matches!(f, FormatKind::Other(_)));
        // Email and unknown formats stay plain strings and are still implied non-blank.
        if scalar
            && !descriptor.nullable
            && descriptor.base == BaseKind::String
            && !has_kind(&out, ConstraintKind::NotBlank)
        {
            out.push(Constraint::NotBlank);
        }
        if scalar
            && !descriptor.nullable
            && descriptor.base == BaseKind::Binary
            && !has_kind(&out, ConstraintKind::NotEmpty)
        {
            out.push(Constraint::NotEmpty);
        }
        if let Some(format) = declared_format
            && !has_kind(&out, ConstraintKind::Format)
        {
            out.push(Constraint::format(format));
        }

        for constraint in &out {
            check_applicable(constraint, descriptor.base.clone(), descriptor.is_collection())
                .map_err(|reason| fail(constraint, reason))?;
        }

        out.sort_by_key(Constraint::kind);
        Ok(out)
    }
}

fn has_kind(list: &[Constraint], kind: ConstraintKind) -> bool {
    list.iter().any(|c| c.kind() == kind)
}

fn check_applicable(
    constraint: &Constraint,
    base: BaseKind,
    collection: bool,
) -> Result<(), String> {
    let expected = |what: &str| {
        Err(format!(
            "requires {} but field is {}{}",
            what,
            if collection { "a collection of " } else { "" },
            base.name()
        ))
    };
    match constraint {
        Constraint::NotBlank | Constraint::Pattern { .. } => {
            if collection || !base.is_string_like() {
                return expected("a string");
            }
        }
        Constraint::NotEmpty => {
            if !collection && !base.is_string_like() {
                return expected("a string, binary or collection");
            }
        }
        Constraint::Size { min, max } => {
            if !collection && !base.is_string_like() {
                return expected("a string, binary or collection");
            }
            if let (Some(min), Some(max)) = (min, max)
                && min > max
            {
                return Err(format!("min {} exceeds max {}", min, max));
            }
        }
        Constraint::Range { min, max } => {
            if collection || !base.is_numeric() {
                return expected("a number");
            }
            if let (Some(min), Some(max)) = (min, max)
                && let (Some(lo), Some(hi)) = (min.as_f64(), max.as_f64())
                && lo > hi
            {
                return Err(format!("min {} exceeds max {}", min, max));
            }
        }
        Constraint::Format { format } => {
            if !format.applies_to(&base) {
                return Err(format!("format {} does not apply to {}", format, base.name()));
            }
        }
        Constraint::Custom { .. } => {}
    }
    Ok(())
}

/// Constraint lists for every record field, indexed by type and field position.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConstraintTable {
    by_type: BTreeMap<TypeId, Vec<Vec<Constraint>>>,
}

impl ConstraintTable {
    /// Map every record of `tree` in parallel.
    ///
    /// Reports the failure of the first type in identifier order, so the
    /// error is the same on every run.
    pub fn build(tree: &DescriptorTree, mapper: &ConstraintMapper) -> Result<Self, GenerateError> {
        let records: Vec<&ResolvedType> = tree.renderable().collect();
        let mapped: Vec<Result<(TypeId, Vec<Vec<Constraint>>), GenerateError>> = records
            .par_iter()
            .map(|node| {
                let fields = node
                    .fields()
                    .iter()
                    .map(|field| mapper.map(node, field))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok((node.id.clone(), fields))
            })
            .collect();

        let mut by_type = BTreeMap::new();
        for entry in mapped {
            let (id, fields) = entry?;
            by_type.insert(id, fields);
        }
        Ok(Self { by_type })
    }

    /// Constraints of field `index` of type `id`; empty when unknown.
    pub fn field(&self, id: &TypeId, index: usize) -> &[Constraint] {
        self.by_type
            .get(id)
            .and_then(|fields| fields.get(index))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Field, NamespaceScope, ObjectType, PrimitiveKind, SchemaGraph, SchemaType};
    use crate::resolve::resolve;

    fn map_single(field: Field) -> Result<Vec<Constraint>, GenerateError> {
        let mut graph = SchemaGraph::new();
        graph.define(
            "Customer",
            SchemaType::Object(ObjectType {
                name: "Customer".into(),
                fields: vec![field],
                ..Default::default()
            }),
            NamespaceScope::root(),
        );
        let tree = resolve(&graph)?;
        let node = tree.get(&TypeId::new("Customer")).unwrap();
        ConstraintMapper::new().map(node, &node.fields()[0])
    }

    #[test]
    fn mobile_number_keeps_declared_order() {
        let constraints = map_single(
            Field::required("mobileNumber", SchemaType::string())
                .with_constraint(Constraint::pattern("^[0-9]{10,15}$")),
        )
        .unwrap();
        assert_eq!(
            constraints,
            vec![Constraint::NotBlank, Constraint::pattern("^[0-9]{10,15}$")]
        );
    }

    #[test]
    fn pattern_on_integer_is_rejected() {
        let err = map_single(
            Field::required("count", SchemaType::integer())
                .with_constraint(Constraint::pattern("^[0-9]+$")),
        )
        .unwrap_err();
        let GenerateError::UnsupportedFacet { field, facet, .. } = err else {
            panic!("expected UnsupportedFacet, got {err:?}");
        };
        assert_eq!(field, "count");
        assert_eq!(facet, "pattern");
    }

    #[test]
    fn duplicate_kind_is_rejected() {
        let err = map_single(
            Field::required("code", SchemaType::string())
                .with_constraint(Constraint::pattern("a"))
                .with_constraint(Constraint::pattern("b")),
        )
        .unwrap_err();
        assert!(err.to_string().contains("duplicate declaration"));
    }

    #[test]
    fn distinct_custom_constraints_coexist() {
        let constraints = map_single(
            Field::optional("iban", SchemaType::string())
                .with_constraint(Constraint::custom("com.acme.Iban"))
                .with_constraint(Constraint::custom("com.acme.Checksum")),
        )
        .unwrap();
        assert_eq!(constraints.len(), 2);
    }

    #[test]
    fn nullable_string_gets_no_not_blank() {
        let constraints = map_single(Field::optional("nickname", SchemaType::string())).unwrap();
        assert!(constraints.is_empty());
    }

    #[test]
    fn required_email_is_not_blank() {
        let constraints = map_single(Field::required(
            "email",
            SchemaType::formatted(PrimitiveKind::String, "email"),
        ))
        .unwrap();
        assert_eq!(
            constraints,
            vec![Constraint::NotBlank, Constraint::format(FormatKind::Email)]
        );
    }

    #[test]
    fn optional_email_keeps_only_format() {
        let constraints = map_single(Field::optional(
            "email",
            SchemaType::formatted(PrimitiveKind::String, "email"),
        ))
        .unwrap();
        assert_eq!(constraints, vec![Constraint::format(FormatKind::Email)]);
    }

    #[test]
    fn required_binary_is_not_empty() {
        let constraints = map_single(Field::required(
            "attachment",
            SchemaType::formatted(PrimitiveKind::String, "binary"),
        ))
        .unwrap();
        assert_eq!(
            constraints,
            vec![Constraint::NotEmpty, Constraint::format(FormatKind::Binary)]
        );
    }

    #[test]
    fn facets_apply_to_formatted_strings() {
        for format in ["uri", "uuid", "date", "date-time"] {
            let constraints = map_single(
                Field::required("value", SchemaType::formatted(PrimitiveKind::String, format))
                    .with_constraint(Constraint::Size {
                        min: None,
                        max: Some(2048),
                    })
                    .with_constraint(Constraint::pattern("^[a-z].*$")),
            )
            .unwrap_or_else(|err| panic!("{format}: {err}"));
            let kinds: Vec<_> = constraints.iter().map(Constraint::kind).collect();
            assert_eq!(
                kinds,
                vec![ConstraintKind::Pattern, ConstraintKind::Size, ConstraintKind::Format],
                "{format}"
            );
        }
    }

    #[test]
    fn grouped_by_kind_in_canonical_order() {
        let constraints = map_single(
            Field::required("code", SchemaType::string())
                .with_constraint(Constraint::custom("com.acme.Code"))
                .with_constraint(Constraint::Size {
                    min: Some(2),
                    max: Some(8),
                })
                .with_constraint(Constraint::pattern("^[A-Z]+$")),
        )
        .unwrap();
        let kinds: Vec<_> = constraints.iter().map(Constraint::kind).collect();
        assert_eq!(
            kinds,
            vec![
                ConstraintKind::NotBlank,
                ConstraintKind::Pattern,
                ConstraintKind::Size,
                ConstraintKind::Custom
            ]
        );
    }

    #[test]
    fn inverted_bounds_are_rejected() {
        let err = map_single(Field::required("n", SchemaType::integer()).with_constraint(
            Constraint::Range {
                min: Some(10.into()),
                max: Some(1.into()),
            },
        ))
        .unwrap_err();
        assert!(matches!(err, GenerateError::UnsupportedFacet { .. }));
    }

    #[test]
    fn size_applies_to_collections() {
        let constraints = map_single(Field::required(
            "tags",
            SchemaType::array_of(SchemaType::integer()),
        ).with_constraint(Constraint::Size { min: Some(1), max: None }))
        .unwrap();
        assert_eq!(constraints.len(), 1);
    }
}
