//! OpenAPI 3.x and `$defs` bundle loader.

use super::LoadError;
use super::jsonschema::{Converter, RefLookup, local_definitions, subdir_scope};
use crate::graph::{NamespaceScope, SchemaGraph, TypeId};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

const REF_PREFIXES: &[&str] = &["#/components/schemas/", "#/$defs/", "#/definitions/"];

/// Local `#/...` refs of one document, by definition name.
struct DocumentLookup<'a> {
    definitions: BTreeMap<&'a str, (TypeId, &'a Value)>,
}

impl RefLookup for DocumentLookup<'_> {
    fn lookup(&self, reference: &str) -> Option<(TypeId, &Value)> {
        let name = REF_PREFIXES
            .iter()
            .find_map(|prefix| reference.strip_prefix(prefix))?;
        self.definitions
            .get(name)
            .map(|(id, schema)| (id.clone(), *schema))
    }
}

fn schemas(doc: &Value) -> Option<&Map<String, Value>> {
    doc.pointer("/components/schemas")
        .and_then(Value::as_object)
        .or_else(|| local_definitions(doc))
}

fn check_version(doc: &Value) -> Result<(), LoadError> {
    if let Some(version) = doc.get("swagger") {
        return Err(LoadError::Unsupported(format!(
            "Swagger {} document; only OpenAPI 3.x is supported",
            version
        )));
    }
    match doc.get("openapi") {
        None => Ok(()),
        Some(Value::String(version)) if version.starts_with("3.") => Ok(()),
        Some(other) => Err(LoadError::Unsupported(format!(
            "OpenAPI version {}; only 3.x is supported",
            other
        ))),
    }
}

/// Load every schema under `components/schemas` (or `$defs`/`definitions`).
///
/// Each definition is placed in `scope` joined with its `x-model-subdir`, and
/// keyed by [`TypeId::scoped`]. Paths, operations and other components are ignored.
pub fn load_openapi(doc: &Value, scope: &NamespaceScope) -> Result<SchemaGraph, LoadError> {
    check_version(doc)?;
    let mut graph = SchemaGraph::new();
    let Some(schemas) = schemas(doc) else {
        tracing::debug!(scope = %scope, "document has no schema definitions");
        return Ok(graph);
    };

    let mut scopes = Vec::with_capacity(schemas.len());
    let mut lookup = DocumentLookup {
        definitions: BTreeMap::new(),
    };
    for (name, schema) in schemas {
        let def_scope = subdir_scope(scope, schema);
        let id = TypeId::scoped(&def_scope, name);
        lookup.definitions.insert(name.as_str(), (id.clone(), schema));
        scopes.push((id, name, schema, def_scope));
    }

    let converter = Converter::new(&lookup);
    for (id, name, schema, def_scope) in scopes {
        let definition = converter.definition(name, schema, def_scope)?;
        if graph.insert(id.clone(), definition).is_some() {
            return Err(LoadError::Duplicate(id));
        }
    }
    Ok(graph)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraint::Constraint;
    use crate::graph::{Field, SchemaType};
    use serde_json::json;

    fn fields<'g>(graph: &'g SchemaGraph, id: &str) -> &'g [Field] {
        match &graph.get(&TypeId::new(id)).unwrap().ty {
            SchemaType::Object(object) => &object.fields,
            other => panic!("{} is a {}", id, other.describe()),
        }
    }

    #[test]
    fn rejects_swagger_and_old_openapi() {
        let scope = NamespaceScope::root();
        assert!(matches!(
            load_openapi(&json!({"swagger": "2.0"}), &scope),
            Err(LoadError::Unsupported(_))
        ));
        assert!(matches!(
            load_openapi(&json!({"openapi": "2.1"}), &scope),
            Err(LoadError::Unsupported(_))
        ));
    }

    #[test]
    fn subdirs_scope_definitions_and_refs() {
        let doc = json!({
            "openapi": "3.0.3",
            "components": {"schemas": {
                "OrderV1": {
                    "type": "object",
                    "required": ["status"],
                    "properties": {
                        "status": {"$ref": "#/components/schemas/OrderStatusV1"},
                        "note": {"type": "string", "maxLength": 200}
                    }
                },
                "OrderStatusV1": {
                    "type": "string",
                    "enum": ["Created", "Processing", "Dispatched"],
                    "x-model-subdir": "common"
                }
            }}
        });
        let graph = load_openapi(&doc, &NamespaceScope::parse("order")).unwrap();
        let order = fields(&graph, "order/OrderV1");

        assert_eq!(
            order[0].ty,
            SchemaType::reference("order.common/OrderStatusV1")
        );
        assert!(order[0].required);
        assert!(!order[1].required);
        assert_eq!(
            order[1].constraints,
            vec![Constraint::Size {
                min: None,
                max: Some(200)
            }]
        );
    }

    #[test]
    fn all_of_merges_properties_in_order() {
        let doc = json!({
            "openapi": "3.1.0",
            "components": {"schemas": {
                "Base": {
                    "type": "object",
                    "required": ["id"],
                    "properties": {"id": {"type": "string", "format": "uuid"}}
                },
                "Child": {
                    "allOf": [
                        {"$ref": "#/components/schemas/Base"},
                        {"type": "object", "properties": {"name": {"type": "string"}}}
                    ]
                }
            }}
        });
        let graph = load_openapi(&doc, &NamespaceScope::root()).unwrap();
        let names: Vec<&str> = fields(&graph, "Child")
            .iter()
            .map(|f| f.name.as_str())
            .collect();
        assert_eq!(names, vec!["id", "name"]);
        assert!(fields(&graph, "Child")[0].required);
    }

    #[test]
    fn unknown_refs_keep_their_name() {
        let doc = json!({
            "openapi": "3.0.0",
            "components": {"schemas": {
                "A": {"type": "object", "properties": {"b": {"$ref": "#/components/schemas/Missing"}}}
            }}
        });
        let graph = load_openapi(&doc, &NamespaceScope::root()).unwrap();
        assert_eq!(fields(&graph, "A")[0].ty, SchemaType::reference("Missing"));
    }

    #[test]
    fn alias_definitions_carry_facets() {
        let doc = json!({
            "$defs": {
                "MobileNo": {
                    "type": ["string", "null"],
                    "pattern": "^[0-9]{8}$",
                    "description": "Mobile number"
                }
            }
        });
        let graph = load_openapi(&doc, &NamespaceScope::root()).unwrap();
        let alias = graph.get(&TypeId::new("MobileNo")).unwrap();
        assert!(alias.nullable);
        assert_eq!(alias.constraints, vec![Constraint::pattern("^[0-9]{8}$")]);
        assert_eq!(alias.description.as_deref(), Some("Mobile number"));
    }
}
