//! Schema-driven data-transfer-object generation.
//!
//! `dtogen` turns OpenAPI and JSON Schema definitions into DTO source files
//! for several target languages: one file per record or enum, per language.
//!
//! # Architecture
//!
//! ```text
//! Input                 Core (immutable tables)                     Output
//! ─────────────     ─────────────────────────────────────     ─────────────────
//! OpenAPI 3.x   ─┐                                          ┌─> Java records
//! $defs bundle  ─┼─> SchemaGraph ─> DescriptorTree ─┬─> ... ├─> Kotlin data classes
//! Schema files  ─┘   (graph.rs)     (resolve.rs)    │       └─> TypeScript interfaces
//!                                   ConstraintTable ┤
//!                                   NameTable ──────┘
//! ```
//!
//! Resolution runs once, sequentially. Constraint mapping and rendering read
//! only finalized tables and fan out over rayon's pool; results are sorted by
//! [`UnitKey`] so output never depends on scheduling.
//!
//! # Example
//!
//! ```
//! use dtogen::{GeneratorConfig, NamespaceScope, TargetLanguage, generate, load_openapi};
//!
//! let doc = serde_json::json!({
//!     "openapi": "3.0.3",
//!     "components": { "schemas": {
//!         "OrderStatusV1": { "type": "string", "enum": ["Created", "Dispatched"] }
//!     }}
//! });
//!
//! let graph = load_openapi(&doc, &NamespaceScope::parse("order")).unwrap();
//! let config = GeneratorConfig::default().with_targets([TargetLanguage::TypeScript]);
//! let generation = generate(&graph, &config).unwrap();
//!
//! assert!(generation.units[0]
//!     .source
//!     .contains("export type OrderStatusV1Dto = 'Created' | 'Dispatched';"));
//! ```
//!
//! # Feature Flags
//!
//! Backend flags (use `backend-*` prefix), all enabled by default:
//! - `backend-java` - Java records with Jakarta validation
//! - `backend-kotlin` - Kotlin data classes with Jakarta validation
//! - `backend-typescript` - TypeScript interfaces and union types

pub mod config;
pub mod constraint;
pub mod emit;
pub mod error;
pub mod generate;
pub mod graph;
pub mod input;
pub mod naming;
pub mod output;
pub mod registry;
pub mod resolve;
pub mod traits;

pub use config::{AnnotationConfig, ConfigError, GeneratorConfig, Indent};
pub use constraint::{Constraint, ConstraintMapper, ConstraintTable, FormatKind};
pub use emit::{EmitError, Emitter, FsEmitter, MemoryEmitter};
pub use error::{GenerateError, RenderError};
pub use generate::{Analysis, Generation, analyze, generate, render_all};
pub use graph::{
    ArrayType, EnumType, Field, NamespaceScope, ObjectType, PrimitiveKind, SchemaGraph,
    SchemaType, TypeDefinition, TypeId,
};
pub use input::{LoadError, load_openapi, load_path, load_schema_files};
pub use naming::{CanonicalName, Casing, CasingPolicy, NameTable};
pub use resolve::{DescriptorTree, TargetTypeDescriptor, resolve};
pub use traits::{RenderContext, RenderedUnit, Renderer, TargetLanguage, UnitKey};

// Re-export registry functions
pub use registry::{available_languages, renderer_for, renderers};
