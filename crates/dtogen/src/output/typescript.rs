//! TypeScript renderer: interfaces and string-literal union enums.
//!
//! Validation facets have no runtime form in TypeScript types; they are
//! documented as JSDoc tags so that schema-driven validators can pick them up.

use super::{SourceWriter, doc_lines, is_identifier, unsupported};
use crate::constraint::Constraint;
use crate::error::RenderError;
use crate::graph::{NamespaceScope, TypeId};
use crate::naming::{Casing, NameTable};
use crate::resolve::{BaseKind, CollectionKind, ResolvedField, ResolvedKind, ResolvedType};
use crate::traits::{RenderContext, RenderedUnit, Renderer, TargetLanguage};
use std::collections::{BTreeMap, BTreeSet};

/// Static instance of the TypeScript renderer for the registry.
pub static TYPESCRIPT_RENDERER: TypeScriptRenderer = TypeScriptRenderer;

#[derive(Debug, Clone, Copy, Default)]
pub struct TypeScriptRenderer;

const RESERVED_TYPE_NAMES: &[&str] = &[
    "string", "number", "boolean", "any", "unknown", "never", "object", "void", "null",
    "undefined", "symbol", "bigint", "Record", "Array",
];

impl Renderer for TypeScriptRenderer {
    fn language(&self) -> TargetLanguage {
        TargetLanguage::TypeScript
    }

    fn extension(&self) -> &'static str {
        "ts"
    }

    fn render(
        &self,
        node: &ResolvedType,
        ctx: &RenderContext<'_>,
    ) -> Result<RenderedUnit, RenderError> {
        let lang = TargetLanguage::TypeScript;
        let name = ctx
            .names
            .type_name(&node.id)
            .ok_or_else(|| unsupported(node, lang, "type has no canonical name"))?;
        if !is_identifier(&name.simple) || RESERVED_TYPE_NAMES.contains(&name.simple.as_str()) {
            return Err(unsupported(
                node,
                lang,
                format!("'{}' is not a valid TypeScript type name", name.simple),
            ));
        }

        let mut imports = ModuleImports {
            clauses: BTreeMap::new(),
            aliased: ctx.names.clashing_references(
                &node.id,
                node.fields().iter().filter_map(|f| f.descriptor.referenced_type()),
            ),
        };
        let mut body = SourceWriter::new(ctx.config.indent);

        let mut doc: Vec<String> = Vec::new();
        if ctx.config.annotations.schema_docs
            && let Some(description) = &node.description
        {
            doc.extend(doc_lines(description).into_iter().map(String::from));
        }
        if let Some(message) = &node.deprecated {
            doc.push(deprecated_tag(message));
        }
        write_jsdoc(&mut body, 0, &doc);

        match &node.kind {
            ResolvedKind::Record { fields } => {
                body.line(0, &format!("export interface {} {{", name.simple));
                for (index, field) in fields.iter().enumerate() {
                    let line = field_line(node, index, field, ctx, &name.scope, &mut imports)?;
                    write_jsdoc(&mut body, 1, &field_doc(node, index, field, ctx)?);
                    body.line(1, &line);
                }
                body.line(0, "}");
            }
            ResolvedKind::Enum { variants } => {
                let members: Vec<String> = variants
                    .iter()
                    .map(|variant| format!("'{}'", escape_single(variant)))
                    .collect();
                let union = if members.is_empty() {
                    "never".to_string()
                } else {
                    members.join(" | ")
                };
                body.line(0, &format!("export type {} = {};", name.simple, union));
            }
            ResolvedKind::Alias(_) => {
                return Err(unsupported(node, lang, "aliases are inlined, not rendered"));
            }
        }

        let mut out = SourceWriter::new(ctx.config.indent);
        for (path, clause) in &imports.clauses {
            out.line(0, &format!("import type {{ {} }} from '{}';", clause, path));
        }
        if !imports.clauses.is_empty() {
            out.blank();
        }
        let source = out.finish() + &body.finish();
        Ok(self.unit(name, ctx.names, source))
    }
}

/// `import type` clauses of one module, keyed by module specifier.
struct ModuleImports {
    clauses: BTreeMap<String, String>,
    /// Referenced types imported under a scope-qualified alias.
    aliased: BTreeSet<TypeId>,
}

fn deprecated_tag(message: &str) -> String {
    if message.trim().is_empty() {
        "@deprecated".to_string()
    } else {
        format!("@deprecated {}", message.trim())
    }
}

fn write_jsdoc(w: &mut SourceWriter, depth: usize, lines: &[String]) {
    if lines.is_empty() {
        return;
    }
    w.line(depth, "/**");
    for line in lines {
        let line = line.replace("*/", "*\\/");
        if line.is_empty() {
            w.line(depth, " *");
        } else {
            w.line(depth, &format!(" * {}", line));
        }
    }
    w.line(depth, " */");
}

/// Property declaration of field `index`, registering its imports.
fn field_line(
    node: &ResolvedType,
    index: usize,
    field: &ResolvedField,
    ctx: &RenderContext<'_>,
    scope: &NamespaceScope,
    imports: &mut ModuleImports,
) -> Result<String, RenderError> {
    let lang = TargetLanguage::TypeScript;
    let descriptor = &field.descriptor;
    if descriptor.initializer().is_some() {
        return Err(unsupported(
            node,
            lang,
            format!(
                "field '{}' is nullable with a default; interfaces have no initializers",
                field.name
            ),
        ));
    }
    let name = ctx.names.field(&node.id, index).unwrap_or(field.name.as_str());
    let key = if is_identifier(name) {
        name.to_string()
    } else {
        format!("'{}'", escape_single(name))
    };

    let mut ty = match &descriptor.base {
        BaseKind::Reference { target, .. } => {
            let target_name = ctx.names.type_name(target).ok_or_else(|| {
                unsupported(node, lang, format!("referenced type '{}' is not named", target))
            })?;
            if target == &node.id {
                target_name.simple.clone()
            } else {
                let path = relative_import(ctx.names, scope, &target_name.scope, &target_name.simple);
                if imports.aliased.contains(target) {
                    let alias = scoped_alias(&target_name.scope, &target_name.simple);
                    imports
                        .clauses
                        .insert(path, format!("{} as {}", target_name.simple, alias));
                    alias
                } else {
                    imports.clauses.insert(path, target_name.simple.clone());
                    target_name.simple.clone()
                }
            }
        }
        base if base.is_numeric() => "number".to_string(),
        BaseKind::Boolean => "boolean".to_string(),
        _ => "string".to_string(),
    };
    for layer in descriptor.collections.iter().rev() {
        ty = match layer {
            CollectionKind::List | CollectionKind::Set => format!("{}[]", ty),
            CollectionKind::Map => format!("Record<string, {}>", ty),
        };
    }

    Ok(if descriptor.nullable {
        format!("{}?: {} | null;", key, ty)
    } else {
        format!("{}: {};", key, ty)
    })
}

/// Local name of a clashing import: scope segments in Pascal case, then the
/// type name (`customer.profile` + `UserTypeV1Dto` is `CustomerProfileUserTypeV1Dto`).
fn scoped_alias(scope: &NamespaceScope, simple: &str) -> String {
    let prefix: String = scope.segments().iter().map(|s| Casing::Pascal.apply(s)).collect();
    format!("{}{}", prefix, simple)
}

/// JSDoc lines of a field: description, deprecation, validation tags.
fn field_doc(
    node: &ResolvedType,
    index: usize,
    field: &ResolvedField,
    ctx: &RenderContext<'_>,
) -> Result<Vec<String>, RenderError> {
    let mut lines: Vec<String> = Vec::new();
    if ctx.config.annotations.schema_docs
        && let Some(description) = &field.description
    {
        lines.extend(doc_lines(description).into_iter().map(String::from));
    }
    if let Some(message) = &field.deprecated {
        lines.push(deprecated_tag(message));
    }
    if !ctx.config.annotations.validation {
        return Ok(lines);
    }

    let collection = field.descriptor.is_collection();
    for constraint in ctx.constraints.field(&node.id, index) {
        match constraint {
            Constraint::NotBlank => lines.push("@notBlank".to_string()),
            Constraint::NotEmpty => lines.push("@notEmpty".to_string()),
            Constraint::Pattern { regex } => lines.push(format!("@pattern {}", regex)),
            Constraint::Size { min, max } => {
                let (lo, hi) = if collection {
                    ("@minItems", "@maxItems")
                } else {
                    ("@minLength", "@maxLength")
                };
                if let Some(min) = min {
                    lines.push(format!("{} {}", lo, min));
                }
                if let Some(max) = max {
                    lines.push(format!("{} {}", hi, max));
                }
            }
            Constraint::Range { min, max } => {
                if let Some(min) = min {
                    lines.push(format!("@minimum {}", min));
                }
                if let Some(max) = max {
                    lines.push(format!("@maximum {}", max));
                }
            }
            Constraint::Format { format } => lines.push(format!("@format {}", format)),
            Constraint::Custom { name, .. } => {
                return Err(unsupported(
                    node,
                    TargetLanguage::TypeScript,
                    format!(
                        "field '{}': constraint {} has no TypeScript representation",
                        field.name, name
                    ),
                ));
            }
        }
    }
    if let Some(default) = &field.descriptor.default {
        lines.push(format!("@default {}", default));
    }
    Ok(lines)
}

/// Module specifier of `target` seen from a file in scope `from`.
fn relative_import(
    names: &NameTable,
    from: &NamespaceScope,
    to: &NamespaceScope,
    type_name: &str,
) -> String {
    let from = names.package_segments(from);
    let to = names.package_segments(to);
    let common = from.iter().zip(&to).take_while(|(a, b)| a == b).count();

    let mut parts: Vec<&str> = Vec::new();
    if common == from.len() {
        parts.push(".");
    } else {
        parts.extend(std::iter::repeat_n("..", from.len() - common));
    }
    parts.extend(to[common..].iter().map(String::as_str));
    parts.push(type_name);
    parts.join("/")
}

fn escape_single(text: &str) -> String {
    text.replace('\\', "\\\\").replace('\'', "\\'")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::naming::CasingPolicy;
    use crate::resolve::DescriptorTree;

    #[test]
    fn relative_paths_between_scopes() {
        let names = NameTable::build(&DescriptorTree::default(), &CasingPolicy::default(), "model")
            .unwrap();
        let order = NamespaceScope::parse("order");
        let common = NamespaceScope::parse("order.common");
        let customer = NamespaceScope::parse("customer.profile");

        assert_eq!(
            relative_import(&names, &order, &order, "OrderV1Dto"),
            "./OrderV1Dto"
        );
        assert_eq!(
            relative_import(&names, &order, &common, "AddressV1Dto"),
            "./common/AddressV1Dto"
        );
        assert_eq!(
            relative_import(&names, &customer, &order, "OrderV1Dto"),
            "../../order/OrderV1Dto"
        );
    }

    #[test]
    fn aliases_carry_the_scope() {
        assert_eq!(
            scoped_alias(&NamespaceScope::parse("customer.profile"), "UserTypeV1Dto"),
            "CustomerProfileUserTypeV1Dto"
        );
        assert_eq!(
            scoped_alias(&NamespaceScope::parse("billing-api"), "UserTypeV1Dto"),
            "BillingApiUserTypeV1Dto"
        );
    }
}
