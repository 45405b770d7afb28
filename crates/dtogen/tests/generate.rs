//! End-to-end generation from OpenAPI documents.
//!
//! Run `cargo insta review` to update inline snapshots after intentional changes.

use dtogen::input::{DocumentFormat, parse_document};
use dtogen::{
    Casing, FsEmitter, GenerateError, Generation, GeneratorConfig, NamespaceScope, RenderError,
    SchemaGraph, TargetLanguage, analyze, generate, load_openapi, load_path, load_schema_files,
};
use std::fs;
use std::path::Path;

const ORDER_API: &str = r##"
openapi: 3.0.3
info:
  title: Orders
  version: "1"
components:
  schemas:
    OrderStatusV1:
      type: string
      description: Status of an order
      enum: [Created, Processing, Dispatched]
    UserTypeV1:
      type: string
      description: User type
      enum: [PRIVATE, BUSINESS]
    OrderV1:
      type: object
      required: [orderNo, status]
      properties:
        orderNo:
          type: string
          description: Order number
        status:
          $ref: "#/components/schemas/OrderStatusV1"
        placedBy:
          $ref: "#/components/schemas/UserTypeV1"
        comment:
          type: string
          maxLength: 500
"##;

const PROFILE_API: &str = r#"
openapi: 3.1.0
components:
  schemas:
    UserTypeV1:
      type: string
      description: Type of user
      enum: [CUSTOMER, EMPLOYEE]
    UserProfileV1:
      type: object
      required: [mobileNumber]
      properties:
        mobileNumber:
          type: string
          description: Mobile number
          pattern: "^[0-9]{8}$"
"#;

fn load(text: &str, scope: &str) -> SchemaGraph {
    let doc = parse_document(text, DocumentFormat::Yaml).unwrap();
    load_openapi(&doc, &NamespaceScope::parse(scope)).unwrap()
}

fn all_languages() -> GeneratorConfig {
    GeneratorConfig::default().with_targets(TargetLanguage::ALL)
}

fn source<'g>(generation: &'g Generation, type_name: &str, language: TargetLanguage) -> &'g str {
    generation
        .units
        .iter()
        .find(|u| u.key.type_name == type_name && u.key.language == language)
        .map(|u| u.source.as_str())
        .unwrap_or_else(|| panic!("no {} unit for {}", language, type_name))
}

#[test]
fn enum_order_is_declaration_order() {
    let generation = generate(&load(ORDER_API, "order"), &all_languages()).unwrap();
    assert!(generation.is_complete());

    insta::assert_snapshot!(source(&generation, "OrderStatusV1Dto", TargetLanguage::Java), @r#"
package model.order;

import org.eclipse.microprofile.openapi.annotations.media.Schema;

@Schema(name = "OrderStatusV1", description = "Status of an order")
public enum OrderStatusV1Dto {
    Created, Processing, Dispatched
}
"#);
    insta::assert_snapshot!(source(&generation, "OrderStatusV1Dto", TargetLanguage::Kotlin), @r#"
package model.order

import org.eclipse.microprofile.openapi.annotations.media.Schema

@Schema(name = "OrderStatusV1", description = "Status of an order")
enum class OrderStatusV1Dto {
    Created, Processing, Dispatched
}
"#);
    insta::assert_snapshot!(source(&generation, "OrderStatusV1Dto", TargetLanguage::TypeScript), @r#"
/**
 * Status of an order
 */
export type OrderStatusV1Dto = 'Created' | 'Processing' | 'Dispatched';
"#);
}

#[test]
fn same_name_in_two_scopes_stays_apart() {
    let mut graph = load(ORDER_API, "order");
    assert!(graph.merge(load(PROFILE_API, "customer.profile")).is_empty());

    let generation = generate(&graph, &all_languages()).unwrap();
    let user_types: Vec<_> = generation
        .units
        .iter()
        .filter(|u| u.key.type_name == "UserTypeV1Dto" && u.key.language == TargetLanguage::Java)
        .collect();
    assert_eq!(user_types.len(), 2);

    let profile = user_types
        .iter()
        .find(|u| u.path == Path::new("model/customer/profile/UserTypeV1Dto.java"))
        .unwrap();
    let order = user_types
        .iter()
        .find(|u| u.path == Path::new("model/order/UserTypeV1Dto.java"))
        .unwrap();
    assert!(profile.source.contains("description = \"Type of user\""));
    assert!(profile.source.contains("CUSTOMER, EMPLOYEE"));
    assert!(order.source.contains("description = \"User type\""));
    assert!(order.source.contains("PRIVATE, BUSINESS"));
}

#[test]
fn clashing_foreign_reference_is_qualified() {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir(dir.path().join("profile")).unwrap();
    fs::write(
        dir.path().join("OrderV1.json"),
        r#"{
            "x-model-subdir": "order",
            "type": "object",
            "properties": {
                "placedBy": {"$ref": "UserTypeV1.json"},
                "customerType": {"$ref": "profile/UserTypeV1.json"}
            }
        }"#,
    )
    .unwrap();
    fs::write(
        dir.path().join("UserTypeV1.json"),
        r#"{"x-model-subdir": "order", "type": "string", "enum": ["PRIVATE", "BUSINESS"]}"#,
    )
    .unwrap();
    fs::write(
        dir.path().join("profile/UserTypeV1.json"),
        r#"{"x-model-subdir": "customer.profile", "type": "string", "enum": ["CUSTOMER", "EMPLOYEE"]}"#,
    )
    .unwrap();

    let graph =
        load_schema_files(&[dir.path().join("OrderV1.json")], &NamespaceScope::root()).unwrap();
    let generation = generate(&graph, &all_languages()).unwrap();
    assert!(generation.is_complete());

    let java = source(&generation, "OrderV1Dto", TargetLanguage::Java);
    assert!(java.contains("    UserTypeV1Dto placedBy,"));
    assert!(java.contains("    model.customer.profile.UserTypeV1Dto customerType\n"));
    assert!(!java.contains("import model.customer.profile"));

    let kotlin = source(&generation, "OrderV1Dto", TargetLanguage::Kotlin);
    assert!(kotlin.contains("val placedBy: UserTypeV1Dto? = null,"));
    assert!(kotlin.contains("val customerType: model.customer.profile.UserTypeV1Dto? = null"));

    let typescript = source(&generation, "OrderV1Dto", TargetLanguage::TypeScript);
    insta::assert_snapshot!(typescript, @r#"
import type { UserTypeV1Dto as CustomerProfileUserTypeV1Dto } from '../customer/profile/UserTypeV1Dto';
import type { UserTypeV1Dto } from './UserTypeV1Dto';

export interface OrderV1Dto {
    placedBy?: UserTypeV1Dto | null;
    customerType?: CustomerProfileUserTypeV1Dto | null;
}
"#);
}

#[test]
fn renamed_enum_constants_keep_their_wire_value() {
    let graph = load(
        r#"
components:
  schemas:
    StageV1:
      type: string
      enum: [in-progress, done]
"#,
        "workflow",
    );
    let mut config = all_languages();
    config.naming.variant_case = Casing::ScreamingSnake;
    let generation = generate(&graph, &config).unwrap();
    assert!(generation.is_complete());

    insta::assert_snapshot!(source(&generation, "StageV1Dto", TargetLanguage::Java), @r#"
package model.workflow;

import com.fasterxml.jackson.annotation.JsonProperty;
import org.eclipse.microprofile.openapi.annotations.media.Schema;

@Schema(name = "StageV1", description = "TBD")
public enum StageV1Dto {
    @JsonProperty("in-progress") IN_PROGRESS,
    @JsonProperty("done") DONE
}
"#);
    let kotlin = source(&generation, "StageV1Dto", TargetLanguage::Kotlin);
    assert!(kotlin.contains("    @JsonProperty(\"in-progress\") IN_PROGRESS,\n    @JsonProperty(\"done\") DONE\n"));

    let typescript = source(&generation, "StageV1Dto", TargetLanguage::TypeScript);
    assert!(typescript.contains("export type StageV1Dto = 'in-progress' | 'done';"));
}

#[test]
fn custom_serializer_follows_validation() {
    let graph = load(
        r#"
components:
  schemas:
    ProductV1:
      type: object
      required: [productNo]
      properties:
        productNo:
          type: string
          description: Product number
          x-json-serializer: com.acme.serde.ProductNoSerializer
"#,
        "product",
    );
    let generation = generate(&graph, &all_languages()).unwrap();

    insta::assert_snapshot!(source(&generation, "ProductV1Dto", TargetLanguage::Java), @r#"
package model.product;

import com.acme.serde.ProductNoSerializer;
import com.fasterxml.jackson.databind.annotation.JsonSerialize;
import jakarta.validation.constraints.NotBlank;
import org.eclipse.microprofile.openapi.annotations.media.Schema;

@Schema(name = "ProductV1", description = "TBD")
public record ProductV1Dto (

    @Schema(description = "Product number", required = true)
    @NotBlank
    @JsonSerialize(using = ProductNoSerializer.class)
    String productNo
) {

}
"#);
    let kotlin = source(&generation, "ProductV1Dto", TargetLanguage::Kotlin);
    assert!(kotlin.contains("import com.acme.serde.ProductNoSerializer\n"));
    assert!(kotlin.contains(
        "    @field:NotBlank\n    @field:JsonSerialize(using = ProductNoSerializer::class)\n"
    ));
}

#[test]
fn class_mode_writes_fields_and_constructors() {
    let graph = load(
        r#"
components:
  schemas:
    PageV1:
      type: object
      required: [size]
      properties:
        size:
          type: integer
          nullable: true
          default: 20
        cursor:
          type: string
"#,
        "paging",
    );
    let mut config = all_languages();
    config.records = false;
    let generation = generate(&graph, &config).unwrap();

    let failed: Vec<TargetLanguage> = generation
        .failures
        .iter()
        .map(|RenderError::UnsupportedTargetMapping { language, .. }| *language)
        .collect();
    assert_eq!(failed, vec![TargetLanguage::TypeScript]);

    let java = source(&generation, "PageV1Dto", TargetLanguage::Java);
    assert!(java.contains("public class PageV1Dto {"));
    assert!(java.contains("    public Integer size = 20;\n"));
    assert!(java.contains("    public String cursor;\n"));
    assert!(java.contains("    public PageV1Dto() {\n    }\n"));
    assert!(java.contains(
        "    public PageV1Dto(Integer size, String cursor) {\n        this.size = size;\n        this.cursor = cursor;\n    }\n"
    ));
    assert!(!java.contains("record"));

    let kotlin = source(&generation, "PageV1Dto", TargetLanguage::Kotlin);
    assert!(!kotlin.contains("@JvmRecord"));
    assert!(kotlin.contains("data class PageV1Dto ("));
}

#[test]
fn formatted_strings_keep_their_facets() {
    let graph = load(
        r#"
components:
  schemas:
    ContactV1:
      type: object
      required: [href, email]
      properties:
        href:
          type: string
          format: uri
          maxLength: 2048
        email:
          type: string
          format: email
"#,
        "contact",
    );
    let generation = generate(&graph, &all_languages()).unwrap();
    assert!(generation.is_complete());

    let java = source(&generation, "ContactV1Dto", TargetLanguage::Java);
    assert!(java.contains("maxLength = 2048"));
    assert!(!java.contains("@Size"));
    assert!(java.contains("    @NotNull\n    URI href,"));
    assert!(java.contains("    @NotBlank\n    @Email\n    String email\n"));

    let typescript = source(&generation, "ContactV1Dto", TargetLanguage::TypeScript);
    assert!(typescript.contains("     * @maxLength 2048\n     * @format uri\n"));
    assert!(typescript.contains("     * @notBlank\n     * @format email\n"));
}

#[test]
fn implied_not_blank_precedes_pattern() {
    let generation = generate(&load(PROFILE_API, "customer.profile"), &all_languages()).unwrap();

    insta::assert_snapshot!(source(&generation, "UserProfileV1Dto", TargetLanguage::Java), @r#"
package model.customer.profile;

import jakarta.validation.constraints.NotBlank;
import jakarta.validation.constraints.Pattern;
import org.eclipse.microprofile.openapi.annotations.media.Schema;

@Schema(name = "UserProfileV1", description = "TBD")
public record UserProfileV1Dto (

    @Schema(description = "Mobile number", required = true, pattern = "^[0-9]{8}$")
    @NotBlank
    @Pattern(regexp = "^[0-9]{8}$")
    String mobileNumber
) {

}
"#);

    let kotlin = source(&generation, "UserProfileV1Dto", TargetLanguage::Kotlin);
    let not_blank = kotlin.find("@field:NotBlank").unwrap();
    let pattern = kotlin.find("@field:Pattern(regexp = \"^[0-9]{8}$\")").unwrap();
    assert!(not_blank < pattern);
    assert!(kotlin.contains("val mobileNumber: String\n"));

    let typescript = source(&generation, "UserProfileV1Dto", TargetLanguage::TypeScript);
    assert!(typescript.contains("     * @notBlank\n     * @pattern ^[0-9]{8}$"));
    assert!(typescript.contains("mobileNumber: string;"));
}

#[test]
fn pattern_on_integer_is_rejected() {
    let graph = load(
        r#"
components:
  schemas:
    CounterV1:
      type: object
      properties:
        count:
          type: integer
          pattern: "^[0-9]+$"
"#,
        "",
    );
    let err = generate(&graph, &all_languages()).unwrap_err();
    assert!(matches!(err, GenerateError::UnsupportedFacet { .. }), "{err}");
}

#[test]
fn optional_fields_are_nullable() {
    let generation = generate(&load(ORDER_API, "order"), &all_languages()).unwrap();

    let java = source(&generation, "OrderV1Dto", TargetLanguage::Java);
    assert!(java.contains("    @NotNull\n    OrderStatusV1Dto status,"));
    assert!(java.contains("    @Size(max = 500)\n    String comment\n"));

    let kotlin = source(&generation, "OrderV1Dto", TargetLanguage::Kotlin);
    assert!(kotlin.contains("val status: OrderStatusV1Dto,"));
    assert!(kotlin.contains("val placedBy: UserTypeV1Dto? = null,"));
    assert!(kotlin.contains("val comment: String? = null\n"));

    let typescript = source(&generation, "OrderV1Dto", TargetLanguage::TypeScript);
    assert!(typescript.contains("import type { OrderStatusV1Dto } from './OrderStatusV1Dto';"));
    assert!(typescript.contains("placedBy?: UserTypeV1Dto | null;"));
}

#[test]
fn self_reference_renders() {
    let graph = load(
        r##"
components:
  schemas:
    CategoryV1:
      type: object
      required: [name]
      properties:
        name:
          type: string
        parent:
          $ref: "#/components/schemas/CategoryV1"
        children:
          type: array
          items:
            $ref: "#/components/schemas/CategoryV1"
"##,
        "catalog",
    );
    let generation = generate(&graph, &all_languages()).unwrap();
    assert!(generation.is_complete());

    let java = source(&generation, "CategoryV1Dto", TargetLanguage::Java);
    assert!(java.contains("CategoryV1Dto parent,"));
    assert!(java.contains("List<@NotNull CategoryV1Dto> children"));
    assert!(!java.contains("import model.catalog."));

    let typescript = source(&generation, "CategoryV1Dto", TargetLanguage::TypeScript);
    assert!(!typescript.contains("import"));
    assert!(typescript.contains("children?: CategoryV1Dto[] | null;"));
}

#[test]
fn nullable_default_fails_only_where_inexpressible() {
    let graph = load(
        r#"
components:
  schemas:
    PageV1:
      type: object
      required: [size]
      properties:
        size:
          type: integer
          nullable: true
          default: 20
"#,
        "paging",
    );
    let generation = generate(&graph, &all_languages()).unwrap();

    let failed: Vec<TargetLanguage> = generation
        .failures
        .iter()
        .map(|RenderError::UnsupportedTargetMapping { language, .. }| *language)
        .collect();
    assert_eq!(failed, vec![TargetLanguage::Java, TargetLanguage::TypeScript]);

    let kotlin = source(&generation, "PageV1Dto", TargetLanguage::Kotlin);
    assert!(kotlin.contains("val size: Int? = 20"));
}

#[test]
fn every_language_lists_fields_in_schema_order() {
    let mut graph = load(ORDER_API, "order");
    graph.merge(load(PROFILE_API, "customer.profile"));
    let config = all_languages();
    let analysis = analyze(&graph, &config).unwrap();
    let generation = generate(&graph, &config).unwrap();

    for node in analysis.tree.renderable() {
        let name = analysis.names.type_name(&node.id).unwrap();
        let fields: Vec<&str> = (0..node.fields().len())
            .map(|i| analysis.names.field(&node.id, i).unwrap())
            .collect();
        for language in TargetLanguage::ALL {
            let unit = generation
                .units
                .iter()
                .find(|u| {
                    u.key.type_name == name.simple
                        && u.key.scope == name.scope
                        && u.key.language == language
                })
                .unwrap();
            let mut cursor = unit.source.find(&name.simple).unwrap();
            for field in &fields {
                let at = unit.source[cursor..]
                    .find(field)
                    .unwrap_or_else(|| panic!("{} {}: {} out of order", language, name.simple, field));
                cursor += at + field.len();
            }
        }
    }
}

#[test]
fn output_is_deterministic() {
    let mut graph = load(ORDER_API, "order");
    graph.merge(load(PROFILE_API, "customer.profile"));
    let config = all_languages();

    let first = generate(&graph, &config).unwrap();
    for _ in 0..5 {
        assert_eq!(generate(&graph, &config).unwrap().units, first.units);
    }
}

#[test]
fn files_land_in_package_directories() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    let api = input.path().join("orders.yaml");
    fs::write(&api, ORDER_API).unwrap();

    let graph = load_path(&api, &NamespaceScope::parse("order")).unwrap();
    let generation = generate(&graph, &all_languages()).unwrap();
    let mut emitter = FsEmitter::new(output.path());
    generation.emit(&mut emitter).unwrap();

    assert_eq!(emitter.written().len(), 9);
    for file in ["OrderV1Dto.java", "OrderV1Dto.kt", "OrderV1Dto.ts"] {
        assert!(output.path().join("model/order").join(file).is_file(), "{file}");
    }
}
