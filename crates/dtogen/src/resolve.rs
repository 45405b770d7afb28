//! Type resolution.
//!
//! Walks the [`SchemaGraph`] depth-first and produces a [`DescriptorTree`]: an
//! arena of resolved types indexed by [`TypeId`]. References to records and
//! enums stay named links (looked up by id at render time), so self- and
//! mutually-referential schemas resolve without inlining. References to
//! primitive, array and map definitions are aliases and are inlined.

use crate::constraint::Constraint;
use crate::error::GenerateError;
use crate::graph::{
    NamespaceScope, PrimitiveKind, SchemaGraph, SchemaType, TypeDefinition, TypeId,
};
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use tracing::debug;

/// Language-neutral scalar kind of a field (after peeling collections).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BaseKind {
    String,
    Int32,
    Int64,
    Float,
    Double,
    Decimal,
    Boolean,
    Date,
    DateTime,
    Duration,
    Uuid,
    Uri,
    Binary,
    /// Named link to another record or enum.
    Reference { target: TypeId, link: LinkKind },
}

/// What a named link points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkKind {
    Record,
    Enum,
}

impl BaseKind {
    fn from_primitive(kind: PrimitiveKind, format: Option<&str>) -> Self {
        match (kind, format) {
            (PrimitiveKind::String, Some("date")) => Self::Date,
            (PrimitiveKind::String, Some("date-time")) => Self::DateTime,
            (PrimitiveKind::String, Some("duration")) => Self::Duration,
            (PrimitiveKind::String, Some("uuid")) => Self::Uuid,
            (PrimitiveKind::String, Some("uri")) => Self::Uri,
            (PrimitiveKind::String, Some("binary")) => Self::Binary,
            (PrimitiveKind::String, _) => Self::String,
            (PrimitiveKind::Integer, Some("int64")) => Self::Int64,
            (PrimitiveKind::Integer, _) => Self::Int32,
            (PrimitiveKind::Number, Some("float")) => Self::Float,
            (PrimitiveKind::Number, Some("double")) => Self::Double,
            (PrimitiveKind::Number, _) => Self::Decimal,
            (PrimitiveKind::Boolean, _) => Self::Boolean,
        }
    }

    /// Declared as a JSON string (whatever its format).
    pub fn is_string_like(&self) -> bool {
        matches!(
            self,
            Self::String
                | Self::Date
                | Self::DateTime
                | Self::Duration
                | Self::Uuid
                | Self::Uri
                | Self::Binary
        )
    }

    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            Self::Int32 | Self::Int64 | Self::Float | Self::Double | Self::Decimal
        )
    }

    pub fn is_integer(&self) -> bool {
        matches!(self, Self::Int32 | Self::Int64)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Int32 => "int32",
            Self::Int64 => "int64",
            Self::Float => "float",
            Self::Double => "double",
            Self::Decimal => "decimal",
            Self::Boolean => "boolean",
            Self::Date => "date",
            Self::DateTime => "date-time",
            Self::Duration => "duration",
            Self::Uuid => "uuid",
            Self::Uri => "uri",
            Self::Binary => "binary",
            Self::Reference {
                link: LinkKind::Record,
                ..
            } => "record reference",
            Self::Reference {
                link: LinkKind::Enum,
                ..
            } => "enum reference",
        }
    }
}

/// One collection layer around a base kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionKind {
    List,
    Set,
    /// String-keyed map.
    Map,
}

/// Resolved shape of one field.
#[derive(Debug, Clone, PartialEq)]
pub struct TargetTypeDescriptor {
    pub base: BaseKind,
    /// Whether the field may be absent. See [`compute_nullable`].
    pub nullable: bool,
    /// Schema default, kept even when the field is not nullable (for documentation).
    pub default: Option<Value>,
    /// Collection layers, outermost first. Empty for scalars.
    pub collections: Vec<CollectionKind>,
    /// Schema `format` of the innermost primitive, if declared.
    pub format: Option<String>,
}

impl TargetTypeDescriptor {
    /// The referenced record or enum, if this field is a named link.
    pub fn referenced_type(&self) -> Option<&TypeId> {
        match &self.base {
            BaseKind::Reference { target, .. } => Some(target),
            _ => None,
        }
    }

    pub fn is_collection(&self) -> bool {
        !self.collections.is_empty()
    }

    /// The value a renderer should initialize the field with.
    ///
    /// Only nullable fields carry initializers.
    pub fn initializer(&self) -> Option<&Value> {
        if self.nullable {
            self.default.as_ref()
        } else {
            None
        }
    }

    /// Required, non-nullable, non-collection reference to a record: a value
    /// that must be embedded, which makes a cycle through it infinite.
    fn is_strong_link(&self) -> Option<&TypeId> {
        match &self.base {
            BaseKind::Reference {
                target,
                link: LinkKind::Record,
            } if !self.nullable && self.collections.is_empty() => Some(target),
            _ => None,
        }
    }
}

/// Nullability rule shared by every stage.
///
/// A required field is nullable only when the schema says so explicitly.
/// An optional field is nullable unless it has a default.
pub fn compute_nullable(required: bool, nullable_by_schema: bool, has_default: bool) -> bool {
    if required {
        nullable_by_schema
    } else {
        !has_default
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedField {
    /// Field name as it appears in the schema.
    pub name: String,
    pub required: bool,
    pub descriptor: TargetTypeDescriptor,
    pub description: Option<String>,
    pub deprecated: Option<String>,
    /// Declared facets: alias facets first, then the field's own, in source order.
    pub facets: Vec<Constraint>,
    /// Custom serializer class; the field's own wins over an inlined alias's.
    pub serializer: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedKind {
    Record { fields: Vec<ResolvedField> },
    Enum { variants: Vec<String> },
    /// Primitive, array or map definition; inlined where used, never rendered.
    Alias(TargetTypeDescriptor),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedType {
    pub id: TypeId,
    pub scope: NamespaceScope,
    /// Schema name of the definition.
    pub name: String,
    pub description: Option<String>,
    pub deprecated: Option<String>,
    pub kind: ResolvedKind,
}

impl ResolvedType {
    pub fn is_renderable(&self) -> bool {
        !matches!(self.kind, ResolvedKind::Alias(_))
    }

    pub fn fields(&self) -> &[ResolvedField] {
        match &self.kind {
            ResolvedKind::Record { fields } => fields,
            _ => &[],
        }
    }

    /// Named links held by this node, in field order.
    fn links(&self) -> Vec<TypeId> {
        match &self.kind {
            ResolvedKind::Record { fields } => fields
                .iter()
                .filter_map(|f| f.descriptor.referenced_type().cloned())
                .collect(),
            ResolvedKind::Alias(d) => d.referenced_type().cloned().into_iter().collect(),
            ResolvedKind::Enum { .. } => Vec::new(),
        }
    }
}

/// Arena of resolved types, one node per declared type.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DescriptorTree {
    nodes: BTreeMap<TypeId, ResolvedType>,
}

impl DescriptorTree {
    pub fn get(&self, id: &TypeId) -> Option<&ResolvedType> {
        self.nodes.get(id)
    }

    /// All nodes in identifier order.
    pub fn nodes(&self) -> impl Iterator<Item = &ResolvedType> {
        self.nodes.values()
    }

    /// Records and enums, in identifier order.
    pub fn renderable(&self) -> impl Iterator<Item = &ResolvedType> {
        self.nodes.values().filter(|n| n.is_renderable())
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Resolve every definition of `graph`.
///
/// Fails on the first unresolved reference, anonymous composite, alias cycle,
/// or cycle of required record links.
pub fn resolve(graph: &SchemaGraph) -> Result<DescriptorTree, GenerateError> {
    let mut resolver = Resolver {
        graph,
        visited: HashSet::new(),
        nodes: BTreeMap::new(),
    };
    for (id, _) in graph.iter() {
        resolver.visit(id)?;
    }
    let tree = DescriptorTree {
        nodes: resolver.nodes,
    };
    check_composition_cycles(&tree)?;
    debug!(types = tree.len(), "resolved schema graph");
    Ok(tree)
}

struct Resolver<'g> {
    graph: &'g SchemaGraph,
    visited: HashSet<TypeId>,
    nodes: BTreeMap<TypeId, ResolvedType>,
}

/// Intermediate result of resolving a type expression.
struct Shape {
    base: BaseKind,
    collections: Vec<CollectionKind>,
    format: Option<String>,
    inherited: Vec<Constraint>,
    nullable: bool,
    serializer: Option<String>,
}

impl<'g> Resolver<'g> {
    /// Depth-first from `root`; linked types are resolved before returning.
    fn visit(&mut self, root: &TypeId) -> Result<(), GenerateError> {
        let mut stack = vec![root.clone()];
        while let Some(id) = stack.pop() {
            if !self.visited.insert(id.clone()) {
                continue;
            }
            // Links are checked during resolution, so every id on the stack exists.
            let Some(def) = self.graph.get(&id) else {
                continue;
            };
            let node = self.resolve_definition(&id, def)?;
            debug!(type_id = %id, scope = %def.scope, "resolved type");
            let links = node.links();
            self.nodes.insert(id, node);
            stack.extend(links.into_iter().rev());
        }
        Ok(())
    }

    fn resolve_definition(
        &self,
        id: &TypeId,
        def: &TypeDefinition,
    ) -> Result<ResolvedType, GenerateError> {
        match &def.ty {
            SchemaType::Object(obj) => {
                let fields = obj
                    .fields
                    .iter()
                    .map(|field| {
                        let shape = self.resolve_expr(id, def, &field.name, &field.ty, &mut vec![])?;
                        let nullable = compute_nullable(
                            field.required,
                            field.nullable || shape.nullable,
                            field.default.is_some(),
                        );
                        let mut facets = shape.inherited;
                        facets.extend(field.constraints.iter().cloned());
                        Ok(ResolvedField {
                            name: field.name.clone(),
                            required: field.required,
                            descriptor: TargetTypeDescriptor {
                                base: shape.base,
                                nullable,
                                default: field.default.clone(),
                                collections: shape.collections,
                                format: shape.format,
                            },
                            description: field.description.clone(),
                            deprecated: field.deprecated.clone(),
                            facets,
                            serializer: field.serializer.clone().or(shape.serializer),
                        })
                    })
                    .collect::<Result<Vec<_>, GenerateError>>()?;
                Ok(ResolvedType {
                    id: id.clone(),
                    scope: def.scope.clone(),
                    name: obj.name.clone(),
                    description: obj.description.clone(),
                    deprecated: obj.deprecated.clone(),
                    kind: ResolvedKind::Record { fields },
                })
            }
            SchemaType::Enum(e) => Ok(ResolvedType {
                id: id.clone(),
                scope: def.scope.clone(),
                name: e.name.clone(),
                description: e.description.clone(),
                deprecated: e.deprecated.clone(),
                kind: ResolvedKind::Enum {
                    variants: e.variants.clone(),
                },
            }),
            other => {
                let shape = self.resolve_expr(id, def, "", other, &mut vec![id.clone()])?;
                Ok(ResolvedType {
                    id: id.clone(),
                    scope: def.scope.clone(),
                    name: id.simple_name().to_string(),
                    description: def.description.clone(),
                    deprecated: None,
                    kind: ResolvedKind::Alias(TargetTypeDescriptor {
                        base: shape.base,
                        nullable: def.nullable || shape.nullable,
                        default: None,
                        collections: shape.collections,
                        format: shape.format,
                    }),
                })
            }
        }
    }

    /// Resolve a field-position type expression.
    ///
    /// `aliases` is the chain of alias definitions currently being inlined.
    fn resolve_expr(
        &self,
        owner: &TypeId,
        owner_def: &TypeDefinition,
        field: &str,
        ty: &SchemaType,
        aliases: &mut Vec<TypeId>,
    ) -> Result<Shape, GenerateError> {
        match ty {
            SchemaType::Primitive { kind, format } => Ok(Shape {
                base: BaseKind::from_primitive(*kind, format.as_deref()),
                collections: Vec::new(),
                format: format.clone(),
                inherited: Vec::new(),
                nullable: false,
                serializer: None,
            }),
            SchemaType::Array(array) => {
                let mut shape = self.resolve_expr(owner, owner_def, field, &array.element, aliases)?;
                let kind = if array.unique {
                    CollectionKind::Set
                } else {
                    CollectionKind::List
                };
                shape.collections.insert(0, kind);
                // Item bounds of inner layers describe elements and are not carried.
                shape.inherited.retain(|c| !matches!(c, Constraint::Size { .. }));
                if array.min_items.is_some() || array.max_items.is_some() {
                    shape.inherited.push(Constraint::Size {
                        min: array.min_items,
                        max: array.max_items,
                    });
                }
                Ok(shape)
            }
            SchemaType::Map(value) => {
                let mut shape = self.resolve_expr(owner, owner_def, field, value, aliases)?;
                shape.collections.insert(0, CollectionKind::Map);
                shape.inherited.retain(|c| !matches!(c, Constraint::Size { .. }));
                Ok(shape)
            }
            SchemaType::Reference(target) => {
                let Some(target_def) = self.graph.get(target) else {
                    return Err(GenerateError::UnresolvedReference {
                        type_id: owner.clone(),
                        scope: owner_def.scope.clone(),
                        target: target.clone(),
                    });
                };
                let link = match &target_def.ty {
                    SchemaType::Object(_) => Some(LinkKind::Record),
                    SchemaType::Enum(_) => Some(LinkKind::Enum),
                    _ => None,
                };
                if let Some(link) = link {
                    return Ok(Shape {
                        base: BaseKind::Reference {
                            target: target.clone(),
                            link,
                        },
                        collections: Vec::new(),
                        format: None,
                        inherited: Vec::new(),
                        nullable: false,
                        serializer: None,
                    });
                }
                if let Some(pos) = aliases.iter().position(|a| a == target) {
                    let mut path = aliases[pos..].to_vec();
                    path.push(target.clone());
                    return Err(GenerateError::CyclicComposition {
                        type_id: owner.clone(),
                        scope: owner_def.scope.clone(),
                        path,
                    });
                }
                aliases.push(target.clone());
                let mut shape = self.resolve_expr(owner, owner_def, field, &target_def.ty, aliases)?;
                aliases.pop();
                let mut inherited = target_def.constraints.clone();
                inherited.append(&mut shape.inherited);
                shape.inherited = inherited;
                shape.nullable |= target_def.nullable;
                if target_def.serializer.is_some() {
                    shape.serializer = target_def.serializer.clone();
                }
                Ok(shape)
            }
            SchemaType::Object(_) | SchemaType::Enum(_) => Err(GenerateError::AnonymousComposite {
                type_id: owner.clone(),
                scope: owner_def.scope.clone(),
                field: field.to_string(),
            }),
        }
    }
}

/// Reject records that contain themselves through required, non-collection
/// record links.
fn check_composition_cycles(tree: &DescriptorTree) -> Result<(), GenerateError> {
    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        Active,
        Done,
    }

    let strong_links = |id: &TypeId| -> Vec<TypeId> {
        tree.get(id)
            .map(|node| {
                node.fields()
                    .iter()
                    .filter_map(|f| f.descriptor.is_strong_link().cloned())
                    .collect()
            })
            .unwrap_or_default()
    };

    let mut marks: BTreeMap<TypeId, Mark> = BTreeMap::new();
    for root in tree.nodes.keys() {
        if marks.contains_key(root) {
            continue;
        }
        // (node, its strong links, index of the next link to follow)
        let mut stack: Vec<(TypeId, Vec<TypeId>, usize)> =
            vec![(root.clone(), strong_links(root), 0)];
        marks.insert(root.clone(), Mark::Active);

        while let Some((_, links, next)) = stack.last_mut() {
            let Some(target) = links.get(*next).cloned() else {
                if let Some((id, _, _)) = stack.pop() {
                    marks.insert(id, Mark::Done);
                }
                continue;
            };
            *next += 1;
            match marks.get(&target) {
                Some(Mark::Done) => {}
                Some(Mark::Active) => {
                    let start = stack
                        .iter()
                        .position(|(id, _, _)| *id == target)
                        .unwrap_or(0);
                    let mut path: Vec<TypeId> =
                        stack[start..].iter().map(|(id, _, _)| id.clone()).collect();
                    path.push(target.clone());
                    let scope = tree
                        .get(&target)
                        .map(|n| n.scope.clone())
                        .unwrap_or_default();
                    return Err(GenerateError::CyclicComposition {
                        type_id: target,
                        scope,
                        path,
                    });
                }
                None => {
                    marks.insert(target.clone(), Mark::Active);
                    let links = strong_links(&target);
                    stack.push((target, links, 0));
                }
            }
        }
    }
    Ok(())
}
