//! Annotation model shared by the Java and Kotlin renderers.
//!
//! Both targets use the same annotation families (MicroProfile OpenAPI
//! `@Schema`, Jakarta validation, Jackson) and differ only in type names,
//! annotation use-site targets and import layout.

use super::{SourceWriter, escape_kotlin, escape_quoted, unsupported};
use crate::constraint::{Constraint, FormatKind};
use crate::error::RenderError;
use crate::graph::TypeId;
use crate::naming::{CanonicalName, NameTable};
use crate::resolve::{BaseKind, CollectionKind, LinkKind, ResolvedField, ResolvedKind, ResolvedType, TargetTypeDescriptor};
use crate::traits::{RenderContext, TargetLanguage};
use serde_json::{Number, Value};
use std::collections::BTreeSet;

const SCHEMA: &str = "org.eclipse.microprofile.openapi.annotations.media.Schema";
const JSON_FORMAT: &str = "com.fasterxml.jackson.annotation.JsonFormat";
const JSON_PROPERTY: &str = "com.fasterxml.jackson.annotation.JsonProperty";
const JSON_SERIALIZE: &str = "com.fasterxml.jackson.databind.annotation.JsonSerialize";
const VALIDATION: &str = "jakarta.validation";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Flavor {
    Java,
    Kotlin,
}

impl Flavor {
    pub(super) fn language(self) -> TargetLanguage {
        match self {
            Flavor::Java => TargetLanguage::Java,
            Flavor::Kotlin => TargetLanguage::Kotlin,
        }
    }

    /// Use-site target for field annotations.
    fn field_target(self) -> &'static str {
        match self {
            Flavor::Java => "",
            Flavor::Kotlin => "field:",
        }
    }

    /// Double-quoted string literal body.
    fn quote(self, text: &str) -> String {
        match self {
            Flavor::Java => escape_quoted(text),
            Flavor::Kotlin => escape_kotlin(text),
        }
    }

    fn terminator(self) -> &'static str {
        match self {
            Flavor::Java => ";",
            Flavor::Kotlin => "",
        }
    }
}

/// Imports of one compilation unit.
pub(super) struct Imports {
    package: String,
    paths: BTreeSet<String>,
    /// Referenced types written fully qualified: importing them would shadow
    /// or duplicate a simple name already used in the unit.
    qualified: BTreeSet<TypeId>,
}

impl Imports {
    /// Imports of the unit declaring `node` in `package`.
    pub(super) fn for_type(node: &ResolvedType, package: &str, names: &NameTable) -> Self {
        let targets = node
            .fields()
            .iter()
            .filter_map(|f| f.descriptor.referenced_type());
        Self {
            package: package.to_string(),
            paths: BTreeSet::new(),
            qualified: names.clashing_references(&node.id, targets),
        }
    }

    /// Name to write for a referenced type, importing it when it can be
    /// written by its simple name.
    pub(super) fn reference(&mut self, target: &TypeId, name: &CanonicalName, names: &NameTable) -> String {
        let package = names.package(&name.scope);
        let qualified = if package.is_empty() {
            name.simple.clone()
        } else {
            format!("{}.{}", package, name.simple)
        };
        if self.qualified.contains(target) {
            qualified
        } else {
            self.add(qualified);
            name.simple.clone()
        }
    }

    /// Add a fully-qualified name. Names in the unit's own package are skipped.
    pub(super) fn add(&mut self, path: impl Into<String>) {
        let path = path.into();
        let package = path.rsplit_once('.').map(|(p, _)| p).unwrap_or("");
        if package != self.package {
            self.paths.insert(path);
        }
    }

    fn validation(&mut self, simple: &str) {
        let group = if simple == "Valid" {
            VALIDATION.to_string()
        } else {
            format!("{}.constraints", VALIDATION)
        };
        self.add(format!("{}.{}", group, simple));
    }

    /// Write `package` and import lines, each block followed by a blank line.
    ///
    /// Java puts `java.*` imports in a trailing group; Kotlin keeps one sorted block.
    pub(super) fn write_header(&self, w: &mut SourceWriter, flavor: Flavor) {
        let end = flavor.terminator();
        if !self.package.is_empty() {
            w.line(0, &format!("package {}{}", self.package, end));
            w.blank();
        }
        if self.paths.is_empty() {
            return;
        }
        match flavor {
            Flavor::Java => {
                let (platform, other): (Vec<&String>, Vec<&String>) =
                    self.paths.iter().partition(|p| p.starts_with("java."));
                for path in &other {
                    w.line(0, &format!("import {};", path));
                }
                if !other.is_empty() && !platform.is_empty() {
                    w.blank();
                }
                for path in &platform {
                    w.line(0, &format!("import {};", path));
                }
            }
            Flavor::Kotlin => {
                for path in &self.paths {
                    w.line(0, &format!("import {}", path));
                }
            }
        }
        w.blank();
    }
}

/// Everything a renderer needs to write one field.
pub(super) struct JvmField {
    /// Comment lines written above the annotations.
    pub doc: Vec<String>,
    pub annotations: Vec<String>,
    /// Type expression, without Kotlin's `?`.
    pub ty: String,
    pub nullable: bool,
    pub name: String,
}

/// Annotations of a record or enum declaration.
pub(super) fn type_annotations(
    node: &ResolvedType,
    schema_name: &str,
    ctx: &RenderContext<'_>,
    flavor: Flavor,
    imports: &mut Imports,
) -> (Vec<String>, Vec<String>) {
    let mut doc = Vec::new();
    let mut annotations = Vec::new();
    if let Some(message) = &node.deprecated {
        deprecation(message, flavor, &mut doc, &mut annotations);
    }
    if ctx.config.annotations.schema_docs {
        imports.add(SCHEMA);
        let mut params = vec![
            format!("name = \"{}\"", flavor.quote(schema_name)),
            format!("description = \"{}\"", description(node.description.as_deref(), flavor)),
        ];
        if node.deprecated.is_some() {
            params.push("deprecated = true".to_string());
        }
        annotations.push(format!("@Schema({})", params.join(", ")));
    }
    (doc, annotations)
}

fn deprecation(message: &str, flavor: Flavor, doc: &mut Vec<String>, annotations: &mut Vec<String>) {
    let message = if message.trim().is_empty() {
        "Deprecated"
    } else {
        message.trim()
    };
    match flavor {
        Flavor::Java => {
            doc.push(format!("/// @deprecated {}", message));
            annotations.push("@Deprecated".to_string());
        }
        Flavor::Kotlin => {
            annotations.push(format!("@Deprecated(\"{}\")", flavor.quote(message)));
        }
    }
}

fn description(text: Option<&str>, flavor: Flavor) -> String {
    match text.map(str::trim) {
        Some(text) if !text.is_empty() => flavor.quote(text),
        _ => "TBD".to_string(),
    }
}

/// Build the annotations and type of field `index` of `node`.
pub(super) fn field(
    node: &ResolvedType,
    index: usize,
    field: &ResolvedField,
    ctx: &RenderContext<'_>,
    flavor: Flavor,
    imports: &mut Imports,
) -> Result<JvmField, RenderError> {
    let descriptor = &field.descriptor;
    let constraints = ctx.constraints.field(&node.id, index);
    let validation = ctx.config.annotations.validation;
    let target = flavor.field_target();
    let name = ctx
        .names
        .field(&node.id, index)
        .ok_or_else(|| unsupported(node, flavor.language(), format!("field '{}' has no name", field.name)))?
        .to_string();

    let mut doc = Vec::new();
    let mut annotations = Vec::new();
    if let Some(message) = &field.deprecated {
        deprecation(message, flavor, &mut doc, &mut annotations);
    }

    if ctx.config.annotations.schema_docs {
        imports.add(SCHEMA);
        annotations.push(format!(
            "@{}Schema({})",
            target,
            schema_params(field, constraints, flavor).join(", ")
        ));
    }
    if ctx.config.annotations.json_property {
        imports.add(JSON_PROPERTY);
        annotations.push(format!(
            "@{}JsonProperty(\"{}\")",
            target,
            flavor.quote(&field.name)
        ));
    }

    if validation {
        if matches!(
            descriptor.base,
            BaseKind::Reference {
                link: LinkKind::Record,
                ..
            }
        ) {
            imports.validation("Valid");
            annotations.push(format!("@{}Valid", target));
        }
        let implied_present = constraints
            .iter()
            .any(|c| matches!(c, Constraint::NotBlank | Constraint::NotEmpty));
        if !descriptor.nullable && !implied_present {
            imports.validation("NotNull");
            annotations.push(format!("@{}NotNull", target));
        }
        for constraint in constraints.iter().filter(|c| validates(c, descriptor)) {
            for annotation in constraint_annotations(constraint, flavor, imports) {
                annotations.push(format!("@{}{}", target, annotation));
            }
        }
    }

    if let Some(class) = &field.serializer {
        imports.add(JSON_SERIALIZE);
        imports.add(class.clone());
        let simple = class.rsplit('.').next().unwrap_or(class);
        let literal = match flavor {
            Flavor::Java => format!("{}.class", simple),
            Flavor::Kotlin => format!("{}::class", simple),
        };
        annotations.push(format!("@{}JsonSerialize(using = {})", target, literal));
    }

    let json_format = match descriptor.base {
        BaseKind::DateTime => Some("yyyy-MM-dd'T'HH:mm:ss"),
        BaseKind::Date => Some("yyyy-MM-dd"),
        _ => None,
    };
    if let Some(pattern) = json_format {
        imports.add(JSON_FORMAT);
        annotations.push(format!("@{}JsonFormat(pattern = \"{}\")", target, pattern));
    }

    Ok(JvmField {
        doc,
        annotations,
        ty: type_expr(node, descriptor, ctx, flavor, imports)?,
        nullable: descriptor.nullable,
        name,
    })
}

/// Whether Jakarta validation can check `constraint` on the field's JVM type.
///
/// Length and pattern checks exist for `String`, `byte[]` and collections
/// only; on `URI`, `UUID` or `java.time` fields they are documented in
/// `@Schema` instead.
fn validates(constraint: &Constraint, descriptor: &TargetTypeDescriptor) -> bool {
    let collection = descriptor.is_collection();
    match constraint {
        Constraint::NotBlank | Constraint::Pattern { .. } => {
            !collection && descriptor.base == BaseKind::String
        }
        Constraint::NotEmpty | Constraint::Size { .. } => {
            collection || matches!(descriptor.base, BaseKind::String | BaseKind::Binary)
        }
        _ => true,
    }
}

fn schema_params(field: &ResolvedField, constraints: &[Constraint], flavor: Flavor) -> Vec<String> {
    let mut params = vec![format!(
        "description = \"{}\"",
        description(field.description.as_deref(), flavor)
    )];
    if !field.descriptor.nullable {
        params.push("required = true".to_string());
    }
    if let Some(default) = &field.descriptor.default {
        params.push(format!(
            "defaultValue = \"{}\"",
            flavor.quote(&default_text(default))
        ));
    }
    for constraint in constraints {
        match constraint {
            Constraint::Format { format } => {
                params.push(format!("format = \"{}\"", flavor.quote(format.as_str())));
            }
            Constraint::Pattern { regex } => {
                params.push(format!("pattern = \"{}\"", flavor.quote(regex)));
            }
            Constraint::Size { min, max } if !validates(constraint, &field.descriptor) => {
                if let Some(min) = min {
                    params.push(format!("minLength = {}", min));
                }
                if let Some(max) = max {
                    params.push(format!("maxLength = {}", max));
                }
            }
            _ => {}
        }
    }
    if field.deprecated.is_some() {
        params.push("deprecated = true".to_string());
    }
    params
}

/// A default value as documentation text: strings unquoted, everything else as JSON.
fn default_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn constraint_annotations(
    constraint: &Constraint,
    flavor: Flavor,
    imports: &mut Imports,
) -> Vec<String> {
    match constraint {
        Constraint::NotBlank => {
            imports.validation("NotBlank");
            vec!["NotBlank".to_string()]
        }
        Constraint::NotEmpty => {
            imports.validation("NotEmpty");
            vec!["NotEmpty".to_string()]
        }
        Constraint::Pattern { regex } => {
            imports.validation("Pattern");
            vec![format!("Pattern(regexp = \"{}\")", flavor.quote(regex))]
        }
        Constraint::Size { min, max } => {
            imports.validation("Size");
            let mut params = Vec::new();
            if let Some(min) = min {
                params.push(format!("min = {}", min));
            }
            if let Some(max) = max {
                params.push(format!("max = {}", max));
            }
            vec![format!("Size({})", params.join(", "))]
        }
        Constraint::Range { min, max } => {
            let mut bounds = Vec::new();
            if let Some(min) = min {
                bounds.push(bound("Min", min, imports));
            }
            if let Some(max) = max {
                bounds.push(bound("Max", max, imports));
            }
            bounds
        }
        Constraint::Format {
            format: FormatKind::Email,
        } => {
            imports.validation("Email");
            vec!["Email".to_string()]
        }
        Constraint::Format { .. } => Vec::new(),
        Constraint::Custom { name, params } => {
            imports.add(name.clone());
            let simple = name.rsplit('.').next().unwrap_or(name);
            if params.is_empty() {
                vec![simple.to_string()]
            } else {
                let params: Vec<String> = params
                    .iter()
                    .map(|(k, v)| format!("{} = {}", k, v))
                    .collect();
                vec![format!("{}({})", simple, params.join(", "))]
            }
        }
    }
}

/// `Min(5)` for integral bounds, `DecimalMin("0.5")` otherwise.
fn bound(kind: &str, value: &Number, imports: &mut Imports) -> String {
    if let Some(n) = value.as_i64() {
        imports.validation(kind);
        format!("{}({})", kind, n)
    } else {
        let decimal = format!("Decimal{}", kind);
        imports.validation(&decimal);
        format!("{}(\"{}\")", decimal, value)
    }
}

/// Type expression of a field, registering the imports it needs.
fn type_expr(
    node: &ResolvedType,
    descriptor: &TargetTypeDescriptor,
    ctx: &RenderContext<'_>,
    flavor: Flavor,
    imports: &mut Imports,
) -> Result<String, RenderError> {
    let mut ty = base_type(node, &descriptor.base, ctx, flavor, imports)?;
    for layer in descriptor.collections.iter().rev() {
        let element = if ctx.config.annotations.validation {
            imports.validation("NotNull");
            format!("@NotNull {}", ty)
        } else {
            ty
        };
        ty = match (layer, flavor) {
            (CollectionKind::List, Flavor::Java) => {
                imports.add("java.util.List");
                format!("List<{}>", element)
            }
            (CollectionKind::Set, Flavor::Java) => {
                imports.add("java.util.Set");
                format!("Set<{}>", element)
            }
            (CollectionKind::Map, Flavor::Java) => {
                imports.add("java.util.Map");
                format!("Map<String, {}>", element)
            }
            (CollectionKind::List, Flavor::Kotlin) => format!("List<{}>", element),
            (CollectionKind::Set, Flavor::Kotlin) => format!("Set<{}>", element),
            (CollectionKind::Map, Flavor::Kotlin) => format!("Map<String, {}>", element),
        };
    }
    Ok(ty)
}

fn base_type(
    node: &ResolvedType,
    base: &BaseKind,
    ctx: &RenderContext<'_>,
    flavor: Flavor,
    imports: &mut Imports,
) -> Result<String, RenderError> {
    let java = flavor == Flavor::Java;
    let name = match base {
        BaseKind::String => "String",
        BaseKind::Int32 if java => "Integer",
        BaseKind::Int32 => "Int",
        BaseKind::Int64 => "Long",
        BaseKind::Float => "Float",
        BaseKind::Double => "Double",
        BaseKind::Boolean => "Boolean",
        BaseKind::Binary if java => "byte[]",
        BaseKind::Binary => "ByteArray",
        BaseKind::Decimal => {
            imports.add("java.math.BigDecimal");
            "BigDecimal"
        }
        BaseKind::Date => {
            imports.add("java.time.LocalDate");
            "LocalDate"
        }
        BaseKind::DateTime => {
            imports.add("java.time.LocalDateTime");
            "LocalDateTime"
        }
        BaseKind::Duration => {
            imports.add("java.time.Duration");
            "Duration"
        }
        BaseKind::Uuid => {
            imports.add("java.util.UUID");
            "UUID"
        }
        BaseKind::Uri => {
            imports.add("java.net.URI");
            "URI"
        }
        BaseKind::Reference { target, .. } => {
            let Some(name) = ctx.names.type_name(target) else {
                return Err(unsupported(
                    node,
                    flavor.language(),
                    format!("referenced type '{}' is not named", target),
                ));
            };
            return Ok(imports.reference(target, name, ctx.names));
        }
    };
    Ok(name.to_string())
}

/// Enum constant lines, written one indentation level in.
///
/// A constant whose name differs from its schema value carries
/// `@JsonProperty("<value>")`, and then every constant gets its own line.
pub(super) fn enum_constants(
    node: &ResolvedType,
    ctx: &RenderContext<'_>,
    flavor: Flavor,
    imports: &mut Imports,
    is_valid: fn(&str) -> bool,
) -> Result<Vec<String>, RenderError> {
    let ResolvedKind::Enum { variants } = &node.kind else {
        return Ok(Vec::new());
    };
    let mut constants = Vec::with_capacity(variants.len());
    let mut renamed = false;
    for (index, value) in variants.iter().enumerate() {
        let constant = ctx.names.variant(&node.id, index).unwrap_or_default();
        if !is_valid(constant) {
            return Err(unsupported(
                node,
                flavor.language(),
                format!("'{}' is not a valid enum constant", constant),
            ));
        }
        if constant == value {
            constants.push(constant.to_string());
        } else {
            renamed = true;
            constants.push(format!("@JsonProperty(\"{}\") {}", flavor.quote(value), constant));
        }
    }
    if !renamed {
        return Ok(vec![constants.join(", ")]);
    }
    imports.add(JSON_PROPERTY);
    let last = constants.len() - 1;
    Ok(constants
        .into_iter()
        .enumerate()
        .map(|(i, c)| if i == last { c } else { format!("{},", c) })
        .collect())
}

/// Expression for a default value at collection depth `depth`.
pub(super) fn literal(
    value: &Value,
    descriptor: &TargetTypeDescriptor,
    depth: usize,
    ctx: &RenderContext<'_>,
    flavor: Flavor,
    imports: &mut Imports,
) -> Option<String> {
    if value.is_null() {
        return Some("null".to_string());
    }
    if let Some(layer) = descriptor.collections.get(depth) {
        return match (layer, value) {
            (CollectionKind::List | CollectionKind::Set, Value::Array(items)) => {
                let items = items
                    .iter()
                    .map(|item| literal(item, descriptor, depth + 1, ctx, flavor, imports))
                    .collect::<Option<Vec<_>>>()?;
                let builder = match (layer, flavor, items.is_empty()) {
                    (CollectionKind::List, Flavor::Java, _) => "List.of",
                    (_, Flavor::Java, _) => "Set.of",
                    (CollectionKind::List, Flavor::Kotlin, true) => "emptyList",
                    (CollectionKind::List, Flavor::Kotlin, false) => "listOf",
                    (_, Flavor::Kotlin, true) => "emptySet",
                    (_, Flavor::Kotlin, false) => "setOf",
                };
                Some(format!("{}({})", builder, items.join(", ")))
            }
            (CollectionKind::Map, Value::Object(entries)) => {
                let entries = entries
                    .iter()
                    .map(|(k, v)| {
                        let v = literal(v, descriptor, depth + 1, ctx, flavor, imports)?;
                        let k = flavor.quote(k);
                        Some(match flavor {
                            Flavor::Java => format!("Map.entry(\"{}\", {})", k, v),
                            Flavor::Kotlin => format!("\"{}\" to {}", k, v),
                        })
                    })
                    .collect::<Option<Vec<_>>>()?;
                Some(match (flavor, entries.is_empty()) {
                    (Flavor::Java, true) => "Map.of()".to_string(),
                    (Flavor::Java, false) => format!("Map.ofEntries({})", entries.join(", ")),
                    (Flavor::Kotlin, true) => "emptyMap()".to_string(),
                    (Flavor::Kotlin, false) => format!("mapOf({})", entries.join(", ")),
                })
            }
            _ => None,
        };
    }

    let parsed = |factory: &str, import: &str, imports: &mut Imports| {
        imports.add(import);
        value
            .as_str()
            .map(|s| format!("{}(\"{}\")", factory, flavor.quote(s)))
    };
    match &descriptor.base {
        BaseKind::String => value.as_str().map(|s| format!("\"{}\"", flavor.quote(s))),
        BaseKind::Boolean => value.as_bool().map(|b| b.to_string()),
        BaseKind::Int32 => value.as_i64().map(|n| n.to_string()),
        BaseKind::Int64 => value.as_i64().map(|n| format!("{}L", n)),
        BaseKind::Float => value.as_f64().map(|n| format!("{}f", float_text(n))),
        BaseKind::Double => value.as_f64().map(float_text),
        BaseKind::Decimal => {
            imports.add("java.math.BigDecimal");
            let constructor = match flavor {
                Flavor::Java => "new BigDecimal",
                Flavor::Kotlin => "BigDecimal",
            };
            value
                .as_number()
                .map(|n| format!("{}(\"{}\")", constructor, n))
        }
        BaseKind::Date => parsed("LocalDate.parse", "java.time.LocalDate", imports),
        BaseKind::DateTime => parsed("LocalDateTime.parse", "java.time.LocalDateTime", imports),
        BaseKind::Duration => parsed("Duration.parse", "java.time.Duration", imports),
        BaseKind::Uuid => parsed("UUID.fromString", "java.util.UUID", imports),
        BaseKind::Uri => parsed("URI.create", "java.net.URI", imports),
        BaseKind::Binary => None,
        BaseKind::Reference {
            target,
            link: LinkKind::Enum,
        } => {
            let variant = value.as_str()?;
            let ResolvedKind::Enum { variants } = &ctx.tree.get(target)?.kind else {
                return None;
            };
            let index = variants.iter().position(|v| v == variant)?;
            let type_name = ctx.names.type_name(target)?;
            let written = imports.reference(target, type_name, ctx.names);
            Some(format!("{}.{}", written, ctx.names.variant(target, index)?))
        }
        BaseKind::Reference {
            link: LinkKind::Record,
            ..
        } => None,
    }
}

/// Decimal text that always reads as a floating-point literal.
fn float_text(n: f64) -> String {
    let text = n.to_string();
    if text.contains(['.', 'e', 'E']) || !n.is_finite() {
        text
    } else {
        format!("{}.0", text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn float_literals() {
        assert_eq!(float_text(2.0), "2.0");
        assert_eq!(float_text(0.5), "0.5");
    }
}
