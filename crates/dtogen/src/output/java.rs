//! Java renderer: `record` types and `enum`s.

use super::jvm::{self, Flavor, Imports, JvmField};
use super::{SourceWriter, is_identifier, unsupported};
use crate::error::RenderError;
use crate::resolve::{ResolvedKind, ResolvedType};
use crate::traits::{RenderContext, RenderedUnit, Renderer, TargetLanguage};

/// Static instance of the Java renderer for the registry.
pub static JAVA_RENDERER: JavaRenderer = JavaRenderer;

/// Renders records as `public record` (or, with `records = false`, a
/// `public class` with public fields and constructors) and enums as `public enum`.
///
/// Records have no field initializers, so a nullable field with a default
/// cannot be expressed and is reported instead of silently dropping the default.
#[derive(Debug, Clone, Copy, Default)]
pub struct JavaRenderer;

const KEYWORDS: &[&str] = &[
    "abstract", "assert", "boolean", "break", "byte", "case", "catch", "char", "class", "const",
    "continue", "default", "do", "double", "else", "enum", "extends", "final", "finally",
    "float", "for", "goto", "if", "implements", "import", "instanceof", "int", "interface",
    "long", "native", "new", "package", "private", "protected", "public", "return", "short",
    "static", "strictfp", "super", "switch", "synchronized", "this", "throw", "throws",
    "transient", "try", "void", "volatile", "while", "true", "false", "null", "_", "record",
    "yield", "var",
];

fn is_java_name(name: &str) -> bool {
    is_identifier(name) && !KEYWORDS.contains(&name)
}

impl Renderer for JavaRenderer {
    fn language(&self) -> TargetLanguage {
        TargetLanguage::Java
    }

    fn extension(&self) -> &'static str {
        "java"
    }

    fn render(
        &self,
        node: &ResolvedType,
        ctx: &RenderContext<'_>,
    ) -> Result<RenderedUnit, RenderError> {
        let name = ctx
            .names
            .type_name(&node.id)
            .ok_or_else(|| unsupported(node, TargetLanguage::Java, "type has no canonical name"))?;
        if !is_java_name(&name.simple) {
            return Err(unsupported(
                node,
                TargetLanguage::Java,
                format!("'{}' is not a valid Java type name", name.simple),
            ));
        }

        let package = ctx.names.package(&name.scope);
        let mut imports = Imports::for_type(node, &package, ctx.names);
        let (doc, annotations) =
            jvm::type_annotations(node, &name.schema_name, ctx, Flavor::Java, &mut imports);

        // The body is built first so that the header knows every import.
        let mut body = SourceWriter::new(ctx.config.indent);
        for line in doc.iter().chain(&annotations) {
            body.line(0, line);
        }
        match &node.kind {
            ResolvedKind::Record { fields } => {
                let mut rendered = Vec::with_capacity(fields.len());
                for (index, field) in fields.iter().enumerate() {
                    let initializer = match field.descriptor.initializer() {
                        Some(_) if ctx.config.records => {
                            return Err(unsupported(
                                node,
                                TargetLanguage::Java,
                                format!(
                                    "field '{}' is nullable with a default; records have no initializers",
                                    field.name
                                ),
                            ));
                        }
                        Some(value) => Some(
                            jvm::literal(value, &field.descriptor, 0, ctx, Flavor::Java, &mut imports)
                                .ok_or_else(|| {
                                    unsupported(
                                        node,
                                        TargetLanguage::Java,
                                        format!(
                                            "default of field '{}' has no Java literal form",
                                            field.name
                                        ),
                                    )
                                })?,
                        ),
                        None => None,
                    };
                    let field = jvm::field(node, index, field, ctx, Flavor::Java, &mut imports)?;
                    if !is_java_name(&field.name) {
                        return Err(unsupported(
                            node,
                            TargetLanguage::Java,
                            format!("'{}' is not a valid Java field name", field.name),
                        ));
                    }
                    rendered.push((field, initializer));
                }
                if ctx.config.records {
                    write_record(&mut body, &name.simple, &rendered);
                } else {
                    write_class(&mut body, &name.simple, &rendered);
                }
            }
            ResolvedKind::Enum { .. } => {
                let constants =
                    jvm::enum_constants(node, ctx, Flavor::Java, &mut imports, is_java_name)?;
                body.line(0, &format!("public enum {} {{", name.simple));
                for constant in &constants {
                    body.line(1, constant);
                }
                body.line(0, "}");
            }
            ResolvedKind::Alias(_) => {
                return Err(unsupported(
                    node,
                    TargetLanguage::Java,
                    "aliases are inlined, not rendered",
                ));
            }
        }

        let mut out = SourceWriter::new(ctx.config.indent);
        imports.write_header(&mut out, Flavor::Java);
        let source = out.finish() + &body.finish();
        Ok(self.unit(name, ctx.names, source))
    }
}

fn write_annotations(body: &mut SourceWriter, field: &JvmField) {
    for line in field.doc.iter().chain(&field.annotations) {
        body.line(1, line);
    }
}

fn write_record(body: &mut SourceWriter, name: &str, fields: &[(JvmField, Option<String>)]) {
    if fields.is_empty() {
        body.line(0, &format!("public record {} () {{", name));
    } else {
        body.line(0, &format!("public record {} (", name));
        let last = fields.len() - 1;
        for (i, (field, _)) in fields.iter().enumerate() {
            body.blank();
            write_annotations(body, field);
            let separator = if i == last { "" } else { "," };
            body.line(1, &format!("{} {}{}", field.ty, field.name, separator));
        }
        body.line(0, ") {");
    }
    body.blank();
    body.line(0, "}");
}

/// Public fields, a no-arg constructor and an all-fields constructor.
fn write_class(body: &mut SourceWriter, name: &str, fields: &[(JvmField, Option<String>)]) {
    body.line(0, &format!("public class {} {{", name));
    for (field, initializer) in fields {
        body.blank();
        write_annotations(body, field);
        match initializer {
            Some(value) => body.line(1, &format!("public {} {} = {};", field.ty, field.name, value)),
            None => body.line(1, &format!("public {} {};", field.ty, field.name)),
        }
    }
    body.blank();
    body.line(1, &format!("public {}() {{", name));
    body.line(1, "}");
    if !fields.is_empty() {
        let params: Vec<String> = fields
            .iter()
            .map(|(field, _)| format!("{} {}", field.ty, field.name))
            .collect();
        body.blank();
        body.line(1, &format!("public {}({}) {{", name, params.join(", ")));
        for (field, _) in fields {
            body.line(2, &format!("this.{} = {};", field.name, field.name));
        }
        body.line(1, "}");
    }
    body.line(0, "}");
}
