//! Kotlin renderer: `data class` records and `enum class`es.

use super::jvm::{self, Flavor, Imports};
use super::{SourceWriter, is_identifier, unsupported};
use crate::error::RenderError;
use crate::resolve::{ResolvedKind, ResolvedType};
use crate::traits::{RenderContext, RenderedUnit, Renderer, TargetLanguage};

/// Static instance of the Kotlin renderer for the registry.
pub static KOTLIN_RENDERER: KotlinRenderer = KotlinRenderer;

/// Renders records as `data class`es, `@JvmRecord` unless `records = false`,
/// and enums as `enum class`.
#[derive(Debug, Clone, Copy, Default)]
pub struct KotlinRenderer;

const HARD_KEYWORDS: &[&str] = &[
    "as", "break", "class", "continue", "do", "else", "false", "for", "fun", "if", "in",
    "interface", "is", "null", "object", "package", "return", "super", "this", "throw", "true",
    "try", "typealias", "typeof", "val", "var", "when", "while",
];

fn is_keyword(name: &str) -> bool {
    HARD_KEYWORDS.contains(&name)
}

fn is_kotlin_name(name: &str) -> bool {
    is_identifier(name) && !is_keyword(name)
}

/// Property name, backtick-quoted when it collides with a keyword.
fn property_name(name: &str) -> Option<String> {
    if !is_identifier(name) || name.contains('$') {
        return None;
    }
    if is_keyword(name) {
        Some(format!("`{}`", name))
    } else {
        Some(name.to_string())
    }
}

impl Renderer for KotlinRenderer {
    fn language(&self) -> TargetLanguage {
        TargetLanguage::Kotlin
    }

    fn extension(&self) -> &'static str {
        "kt"
    }

    fn render(
        &self,
        node: &ResolvedType,
        ctx: &RenderContext<'_>,
    ) -> Result<RenderedUnit, RenderError> {
        let lang = TargetLanguage::Kotlin;
        let name = ctx
            .names
            .type_name(&node.id)
            .ok_or_else(|| unsupported(node, lang, "type has no canonical name"))?;
        if !is_kotlin_name(&name.simple) {
            return Err(unsupported(
                node,
                lang,
                format!("'{}' is not a valid Kotlin type name", name.simple),
            ));
        }

        let package = ctx.names.package(&name.scope);
        let mut imports = Imports::for_type(node, &package, ctx.names);
        let (_, annotations) =
            jvm::type_annotations(node, &name.schema_name, ctx, Flavor::Kotlin, &mut imports);

        let mut body = SourceWriter::new(ctx.config.indent);
        for line in &annotations {
            body.line(0, line);
        }
        match &node.kind {
            ResolvedKind::Record { fields } => {
                if fields.is_empty() {
                    return Err(unsupported(
                        node,
                        lang,
                        "a data class needs at least one property",
                    ));
                }
                let mut rendered = Vec::with_capacity(fields.len());
                for (index, field) in fields.iter().enumerate() {
                    let initializer = match field.descriptor.initializer() {
                        Some(value) => Some(
                            jvm::literal(value, &field.descriptor, 0, ctx, Flavor::Kotlin, &mut imports)
                                .ok_or_else(|| {
                                    unsupported(
                                        node,
                                        lang,
                                        format!(
                                            "default of field '{}' has no Kotlin literal form",
                                            field.name
                                        ),
                                    )
                                })?,
                        ),
                        None => None,
                    };
                    let jvm_field = jvm::field(node, index, field, ctx, Flavor::Kotlin, &mut imports)?;
                    let property = property_name(&jvm_field.name).ok_or_else(|| {
                        unsupported(
                            node,
                            lang,
                            format!("'{}' is not a valid Kotlin property name", jvm_field.name),
                        )
                    })?;
                    let declaration = if jvm_field.nullable {
                        format!(
                            "val {}: {}? = {}",
                            property,
                            jvm_field.ty,
                            initializer.as_deref().unwrap_or("null")
                        )
                    } else {
                        format!("val {}: {}", property, jvm_field.ty)
                    };
                    rendered.push((jvm_field.annotations, declaration));
                }

                if ctx.config.records {
                    body.line(0, "@JvmRecord");
                }
                body.line(0, &format!("data class {} (", name.simple));
                let last = rendered.len() - 1;
                for (i, (annotations, declaration)) in rendered.iter().enumerate() {
                    body.blank();
                    for line in annotations {
                        body.line(1, line);
                    }
                    let separator = if i == last { "" } else { "," };
                    body.line(1, &format!("{}{}", declaration, separator));
                }
                body.line(0, ")");
            }
            ResolvedKind::Enum { .. } => {
                let constants =
                    jvm::enum_constants(node, ctx, Flavor::Kotlin, &mut imports, is_kotlin_name)?;
                body.line(0, &format!("enum class {} {{", name.simple));
                for constant in &constants {
                    body.line(1, constant);
                }
                body.line(0, "}");
            }
            ResolvedKind::Alias(_) => {
                return Err(unsupported(node, lang, "aliases are inlined, not rendered"));
            }
        }

        let mut out = SourceWriter::new(ctx.config.indent);
        imports.write_header(&mut out, Flavor::Kotlin);
        let source = out.finish() + &body.finish();
        Ok(self.unit(name, ctx.names, source))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keywords_are_escaped() {
        assert_eq!(property_name("when").as_deref(), Some("`when`"));
        assert_eq!(property_name("type").as_deref(), Some("type"));
        assert_eq!(property_name("first-name"), None);
    }
}
