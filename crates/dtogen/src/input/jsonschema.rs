//! JSON Schema conversion.
//!
//! [`Converter`] turns one schema node into a [`TypeDefinition`]; it is shared
//! by the OpenAPI loader and by [`load_schema_files`], which reads one type
//! per file and follows relative `$ref`s to sibling files.
//!
//! Supported keywords:
//! - `type` (string or array with `null`), `format`, `enum`, `properties`, `required`
//! - `items`, `minItems`, `maxItems`, `uniqueItems`, `additionalProperties`
//! - `allOf` (merged), `oneOf`/`anyOf` with a single non-null arm
//! - `pattern`, `minLength`, `maxLength`, `minimum`, `maximum`, `default`
//! - `description`, `deprecated`, `nullable`
//! - extensions: `x-nullable`, `x-model-subdir`, `x-validation-constraint`,
//!   `x-deprecation-message`, `x-json-serializer`

use super::{LoadError, read_document};
use crate::constraint::Constraint;
use crate::graph::{
    ArrayType, EnumType, Field, NamespaceScope, ObjectType, PrimitiveKind, SchemaGraph,
    SchemaType, TypeDefinition, TypeId,
};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};

/// Resolves `$ref` strings to a type id and the raw target schema.
pub(crate) trait RefLookup {
    fn lookup(&self, reference: &str) -> Option<(TypeId, &Value)>;
}

pub(crate) struct Converter<'a> {
    lookup: &'a dyn RefLookup,
}

impl<'a> Converter<'a> {
    pub(crate) fn new(lookup: &'a dyn RefLookup) -> Self {
        Self { lookup }
    }

    /// Convert a top-level definition.
    pub(crate) fn definition(
        &self,
        name: &str,
        schema: &Value,
        scope: NamespaceScope,
    ) -> Result<TypeDefinition, LoadError> {
        let (inner, null_arm) = unwrap_schema(schema);
        let description = text(schema, "description").or_else(|| text(inner, "description"));
        let deprecated = deprecation(schema).or_else(|| deprecation(inner));

        if let Some(values) = inner.get("enum") {
            let variants = enum_values(name, values)?;
            return Ok(TypeDefinition::new(
                SchemaType::Enum(EnumType {
                    name: name.to_string(),
                    description,
                    deprecated,
                    variants,
                }),
                scope,
            ));
        }
        if is_object(inner) && !is_map(inner) {
            let mut object = self.object(name, inner)?;
            object.description = description;
            object.deprecated = deprecated;
            return Ok(TypeDefinition::new(SchemaType::Object(object), scope));
        }

        let mut constraints = facets(name, schema)?;
        if !std::ptr::eq(schema, inner) {
            constraints.extend(facets(name, inner)?);
        }
        Ok(TypeDefinition {
            ty: self.schema_type(name, inner)?,
            scope,
            description,
            constraints,
            nullable: null_arm || declares_nullable(schema) || declares_nullable(inner),
            serializer: serializer(schema).or_else(|| serializer(inner)),
        })
    }

    fn object(&self, name: &str, schema: &Value) -> Result<ObjectType, LoadError> {
        let mut object = ObjectType {
            name: name.to_string(),
            ..Default::default()
        };
        let mut visited = HashSet::new();
        self.collect_properties(name, schema, &mut object.fields, &mut visited)?;
        Ok(object)
    }

    /// Gather properties of `schema` and of every `allOf` component, in order.
    fn collect_properties(
        &self,
        owner: &str,
        schema: &Value,
        fields: &mut Vec<Field>,
        visited: &mut HashSet<String>,
    ) -> Result<(), LoadError> {
        if let Some(parts) = schema.get("allOf").and_then(Value::as_array) {
            for part in parts {
                match part.get("$ref").and_then(Value::as_str) {
                    Some(reference) => {
                        if !visited.insert(reference.to_string()) {
                            continue;
                        }
                        let (_, target) = self.lookup.lookup(reference).ok_or_else(|| {
                            invalid(owner, format!("allOf references unknown schema '{}'", reference))
                        })?;
                        self.collect_properties(owner, target, fields, visited)?;
                    }
                    None => self.collect_properties(owner, part, fields, visited)?,
                }
            }
        }

        let required: Vec<&str> = schema
            .get("required")
            .and_then(Value::as_array)
            .map(|names| names.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default();

        if let Some(properties) = schema.get("properties").and_then(Value::as_object) {
            for (name, property) in properties {
                let field = self.field(owner, name, property, required.contains(&name.as_str()))?;
                match fields.iter_mut().find(|f| f.name == *name) {
                    Some(existing) => *existing = field,
                    None => fields.push(field),
                }
            }
        }
        for name in required {
            if let Some(field) = fields.iter_mut().find(|f| f.name == name) {
                field.required = true;
            }
        }
        Ok(())
    }

    fn field(
        &self,
        owner: &str,
        name: &str,
        schema: &Value,
        required: bool,
    ) -> Result<Field, LoadError> {
        let path = format!("{}.{}", owner, name);
        let (inner, null_arm) = unwrap_schema(schema);
        let mut constraints = facets(&path, schema)?;
        if !std::ptr::eq(schema, inner) {
            constraints.extend(facets(&path, inner)?);
        }
        Ok(Field {
            name: name.to_string(),
            ty: self.schema_type(&path, inner)?,
            required,
            nullable: null_arm || declares_nullable(schema) || declares_nullable(inner),
            default: schema.get("default").or_else(|| inner.get("default")).cloned(),
            description: text(schema, "description").or_else(|| text(inner, "description")),
            deprecated: deprecation(schema).or_else(|| deprecation(inner)),
            constraints,
            serializer: serializer(schema).or_else(|| serializer(inner)),
        })
    }

    /// The type of a field, array element or map value.
    ///
    /// Inline objects come back as [`SchemaType::Object`]; resolution rejects them.
    fn schema_type(&self, path: &str, schema: &Value) -> Result<SchemaType, LoadError> {
        let (schema, _) = unwrap_schema(schema);
        if let Some(reference) = schema.get("$ref").and_then(Value::as_str) {
            return Ok(SchemaType::Reference(self.reference_id(reference)));
        }
        let format = text(schema, "format");
        let primitive = |kind: PrimitiveKind| -> Result<SchemaType, LoadError> {
            Ok(SchemaType::Primitive {
                kind,
                format: format.clone(),
            })
        };

        match primary_type(schema) {
            Some("string") => primitive(PrimitiveKind::String),
            Some("integer") => primitive(PrimitiveKind::Integer),
            Some("number") => primitive(PrimitiveKind::Number),
            Some("boolean") => primitive(PrimitiveKind::Boolean),
            // Inline enums carry no name of their own.
            None if schema.get("enum").is_some() => primitive(PrimitiveKind::String),
            Some("array") => {
                let items = schema
                    .get("items")
                    .ok_or_else(|| invalid(path, "array without 'items'"))?;
                Ok(SchemaType::Array(ArrayType {
                    element: Box::new(self.schema_type(&format!("{}[]", path), items)?),
                    min_items: count(path, schema, "minItems")?,
                    max_items: count(path, schema, "maxItems")?,
                    unique: schema.get("uniqueItems").and_then(Value::as_bool) == Some(true),
                }))
            }
            _ if is_map(schema) => {
                let values = schema.get("additionalProperties").unwrap_or(&Value::Null);
                Ok(SchemaType::Map(Box::new(
                    self.schema_type(&format!("{}{{}}", path), values)?,
                )))
            }
            _ if is_object(schema) => Ok(SchemaType::Object(self.object(path, schema)?)),
            Some(other) => Err(invalid(path, format!("unsupported type '{}'", other))),
            None => Err(invalid(path, "schema declares no type")),
        }
    }

    fn reference_id(&self, reference: &str) -> TypeId {
        match self.lookup.lookup(reference) {
            Some((id, _)) => id,
            None => TypeId::new(reference_name(reference)),
        }
    }
}

/// Peel single-element `allOf` wrappers and `oneOf`/`anyOf` null unions.
///
/// Returns the effective schema and whether a `null` arm was removed.
fn unwrap_schema(mut schema: &Value) -> (&Value, bool) {
    let mut nullable = false;
    loop {
        if schema.get("properties").is_none()
            && let Some([only]) = schema.get("allOf").and_then(Value::as_array).map(Vec::as_slice)
        {
            schema = only;
            continue;
        }
        let union = schema
            .get("oneOf")
            .or_else(|| schema.get("anyOf"))
            .and_then(Value::as_array);
        if let Some(arms) = union {
            let (nulls, rest): (Vec<&Value>, Vec<&Value>) = arms.iter().partition(|arm| is_null(arm));
            if let [only] = rest.as_slice()
                && !nulls.is_empty()
            {
                schema = only;
                nullable = true;
                continue;
            }
        }
        return (schema, nullable);
    }
}

fn is_null(schema: &Value) -> bool {
    schema.get("type").and_then(Value::as_str) == Some("null")
}

/// The declared type, ignoring a `null` member of a type array.
fn primary_type(schema: &Value) -> Option<&str> {
    match schema.get("type")? {
        Value::String(ty) => Some(ty.as_str()),
        Value::Array(types) => types
            .iter()
            .filter_map(Value::as_str)
            .find(|ty| *ty != "null"),
        _ => None,
    }
}

fn declares_nullable(schema: &Value) -> bool {
    schema.get("nullable").and_then(Value::as_bool) == Some(true)
        || schema.get("x-nullable").and_then(Value::as_bool) == Some(true)
        || schema
            .get("type")
            .and_then(Value::as_array)
            .is_some_and(|types| types.iter().any(|t| t.as_str() == Some("null")))
}

fn is_object(schema: &Value) -> bool {
    primary_type(schema) == Some("object")
        || schema.get("properties").is_some()
        || schema
            .get("allOf")
            .and_then(Value::as_array)
            .is_some_and(|parts| parts.len() > 1)
}

/// A string-keyed map: an object whose only shape is `additionalProperties: <schema>`.
fn is_map(schema: &Value) -> bool {
    schema.get("properties").is_none()
        && schema.get("allOf").is_none()
        && schema
            .get("additionalProperties")
            .is_some_and(Value::is_object)
}

fn text(schema: &Value, key: &str) -> Option<String> {
    schema.get(key).and_then(Value::as_str).map(String::from)
}

fn serializer(schema: &Value) -> Option<String> {
    text(schema, "x-json-serializer").filter(|class| !class.trim().is_empty())
}

fn deprecation(schema: &Value) -> Option<String> {
    let message = text(schema, "x-deprecation-message");
    if schema.get("deprecated").and_then(Value::as_bool) == Some(true) || message.is_some() {
        Some(message.unwrap_or_else(|| "Deprecated".to_string()))
    } else {
        None
    }
}

fn enum_values(name: &str, values: &Value) -> Result<Vec<String>, LoadError> {
    let values = values
        .as_array()
        .ok_or_else(|| invalid(name, "'enum' must be an array"))?;
    values
        .iter()
        .filter(|v| !v.is_null())
        .map(|v| match v {
            Value::String(s) => Ok(s.clone()),
            other => Err(invalid(
                name,
                format!("enum value {} is not a string", other),
            )),
        })
        .collect()
}

/// Declared facets in source order: pattern, length, bounds, custom.
fn facets(path: &str, schema: &Value) -> Result<Vec<Constraint>, LoadError> {
    let mut out = Vec::new();
    if let Some(regex) = text(schema, "pattern") {
        out.push(Constraint::pattern(regex));
    }
    let min = count(path, schema, "minLength")?;
    let max = count(path, schema, "maxLength")?;
    if min.is_some() || max.is_some() {
        out.push(Constraint::Size { min, max });
    }
    let min = bound(path, schema, "minimum")?;
    let max = bound(path, schema, "maximum")?;
    if min.is_some() || max.is_some() {
        out.push(Constraint::Range { min, max });
    }
    match schema.get("x-validation-constraint") {
        None => {}
        Some(Value::String(name)) => out.push(Constraint::custom(name)),
        Some(Value::Array(names)) => {
            for name in names {
                let name = name.as_str().ok_or_else(|| {
                    invalid(path, "x-validation-constraint entries must be strings")
                })?;
                out.push(Constraint::custom(name));
            }
        }
        Some(_) => {
            return Err(invalid(
                path,
                "x-validation-constraint must be a string or an array of strings",
            ));
        }
    }
    Ok(out)
}

fn count(path: &str, schema: &Value, key: &str) -> Result<Option<u64>, LoadError> {
    match schema.get(key) {
        None => Ok(None),
        Some(value) => value
            .as_u64()
            .map(Some)
            .ok_or_else(|| invalid(path, format!("'{}' must be a non-negative integer", key))),
    }
}

fn bound(path: &str, schema: &Value, key: &str) -> Result<Option<serde_json::Number>, LoadError> {
    match schema.get(key) {
        None => Ok(None),
        Some(Value::Number(n)) => Ok(Some(n.clone())),
        Some(_) => Err(invalid(path, format!("'{}' must be a number", key))),
    }
}

pub(crate) fn invalid(schema: &str, message: impl Into<String>) -> LoadError {
    LoadError::Invalid {
        schema: schema.to_string(),
        message: message.into(),
    }
}

/// Type name a `$ref` points at: the last path segment, without extension.
///
/// `"#/components/schemas/OrderV1"` and `"common/OrderV1.json"` both name `OrderV1`.
pub(crate) fn reference_name(reference: &str) -> &str {
    let segment = reference
        .rsplit(['/', '#'])
        .find(|s| !s.is_empty())
        .unwrap_or(reference);
    segment.split('.').next().unwrap_or(segment)
}

/// `$defs` (or legacy `definitions`) of a document.
pub(crate) fn local_definitions(doc: &Value) -> Option<&Map<String, Value>> {
    doc.get("$defs")
        .or_else(|| doc.get("definitions"))
        .and_then(Value::as_object)
}

/// `base` joined with the schema's `x-model-subdir`, if any.
pub(crate) fn subdir_scope(base: &NamespaceScope, schema: &Value) -> NamespaceScope {
    match schema.get("x-model-subdir").and_then(Value::as_str) {
        Some(subdir) => base.join(subdir),
        None => base.clone(),
    }
}

struct SchemaFile {
    id: TypeId,
    scope: NamespaceScope,
    doc: Value,
}

/// Lookup for a standalone schema file: relative file refs and local `$defs`.
struct FileLookup<'a> {
    path: &'a Path,
    files: &'a BTreeMap<PathBuf, SchemaFile>,
}

impl RefLookup for FileLookup<'_> {
    fn lookup(&self, reference: &str) -> Option<(TypeId, &Value)> {
        let (file_part, fragment) = reference.split_once('#').unwrap_or((reference, ""));
        let file = if file_part.is_empty() {
            self.files.get(self.path)?
        } else {
            let target = referenced_file(self.path, file_part)?;
            self.files.get(&std::fs::canonicalize(target).ok()?)?
        };
        let fragment = fragment.trim_start_matches('/');
        if fragment.is_empty() {
            return Some((file.id.clone(), &file.doc));
        }
        let key = fragment
            .strip_prefix("$defs/")
            .or_else(|| fragment.strip_prefix("definitions/"))?;
        let schema = local_definitions(&file.doc)?.get(key)?;
        Some((TypeId::scoped(&file.scope, key), schema))
    }
}

/// Path of a file `$ref`, relative to the referencing file. Remote refs are not followed.
fn referenced_file(from: &Path, file_part: &str) -> Option<PathBuf> {
    if file_part.contains("://") {
        return None;
    }
    Some(from.parent().unwrap_or(Path::new("")).join(file_part))
}

fn collect_refs<'v>(value: &'v Value, out: &mut Vec<&'v str>) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                match (key.as_str(), child) {
                    ("$ref", Value::String(reference)) => out.push(reference),
                    _ => collect_refs(child, out),
                }
            }
        }
        Value::Array(items) => items.iter().for_each(|item| collect_refs(item, out)),
        _ => {}
    }
}

/// Type name of a standalone schema file: its file name up to the first `.`.
fn file_type_name(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .and_then(|n| n.split('.').next())
        .unwrap_or_default()
        .to_string()
}

fn canonical(path: &Path) -> Result<PathBuf, LoadError> {
    std::fs::canonicalize(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Load standalone JSON Schema files, one type per file.
///
/// Files reachable through relative `$ref`s are loaded too. Each file's type
/// is named after the file, and lives in `scope` joined with its
/// `x-model-subdir`. Definitions under `$defs` become types of the same scope.
pub fn load_schema_files(
    paths: &[PathBuf],
    scope: &NamespaceScope,
) -> Result<SchemaGraph, LoadError> {
    let mut files: BTreeMap<PathBuf, SchemaFile> = BTreeMap::new();
    let mut queue: VecDeque<PathBuf> = paths
        .iter()
        .map(|p| canonical(p))
        .collect::<Result<_, _>>()?;

    while let Some(path) = queue.pop_front() {
        if files.contains_key(&path) {
            continue;
        }
        let doc = read_document(&path)?;
        let mut refs = Vec::new();
        collect_refs(&doc, &mut refs);
        for reference in refs {
            let file_part = reference.split('#').next().unwrap_or_default();
            if !file_part.is_empty()
                && let Some(target) = referenced_file(&path, file_part)
            {
                queue.push_back(canonical(&target)?);
            }
        }
        let file_scope = subdir_scope(scope, &doc);
        let id = TypeId::scoped(&file_scope, &file_type_name(&path));
        tracing::trace!(path = %path.display(), id = %id, "discovered schema file");
        files.insert(
            path,
            SchemaFile {
                id,
                scope: file_scope,
                doc,
            },
        );
    }

    let mut graph = SchemaGraph::new();
    for (path, file) in &files {
        let lookup = FileLookup { path, files: &files };
        let converter = Converter::new(&lookup);

        let mut definitions = vec![(file.id.clone(), file.doc.clone(), file.scope.clone())];
        if let Some(defs) = local_definitions(&file.doc) {
            for (key, schema) in defs {
                definitions.push((
                    TypeId::scoped(&file.scope, key),
                    schema.clone(),
                    file.scope.clone(),
                ));
            }
        }
        for (id, schema, def_scope) in definitions {
            let definition = converter.definition(id.simple_name(), &schema, def_scope)?;
            if graph.insert(id.clone(), definition).is_some() {
                return Err(LoadError::Duplicate(id));
            }
        }
    }
    Ok(graph)
}
