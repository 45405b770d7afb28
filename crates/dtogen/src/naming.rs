//! Canonical identifiers for generated code.
//!
//! The [`NameTable`] is built once per run, before any renderer starts, and
//! holds the final name of every type, field and enum variant. Renderers look
//! names up; they never derive them.

use crate::error::GenerateError;
use crate::graph::{NamespaceScope, TypeId};
use crate::resolve::{DescriptorTree, ResolvedKind};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Casing transform applied to a schema identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Casing {
    /// Leave the identifier as written.
    #[default]
    Preserve,
    /// `OrderStatus`
    Pascal,
    /// `orderStatus`
    Camel,
    /// `order_status`
    Snake,
    /// `ORDER_STATUS`
    ScreamingSnake,
}

impl Casing {
    pub fn apply(&self, ident: &str) -> String {
        if *self == Casing::Preserve {
            return ident.to_string();
        }
        let words = split_words(ident);
        match self {
            Casing::Preserve => ident.to_string(),
            Casing::Pascal => words.iter().map(|w| capitalize(w)).collect(),
            Casing::Camel => {
                let mut out = String::new();
                for (i, word) in words.iter().enumerate() {
                    if i == 0 {
                        out.push_str(&word.to_lowercase());
                    } else {
                        out.push_str(&capitalize(word));
                    }
                }
                out
            }
            Casing::Snake => words
                .iter()
                .map(|w| w.to_lowercase())
                .collect::<Vec<_>>()
                .join("_"),
            Casing::ScreamingSnake => words
                .iter()
                .map(|w| w.to_uppercase())
                .collect::<Vec<_>>()
                .join("_"),
        }
    }
}

/// Split an identifier at separators and case boundaries.
///
/// `"HTTPServer_v2-id"` splits into `HTTP`, `Server`, `v2`, `id`.
fn split_words(ident: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let chars: Vec<char> = ident.chars().collect();

    for (i, &c) in chars.iter().enumerate() {
        if matches!(c, '_' | '-' | '.' | ' ') {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            continue;
        }
        if c.is_uppercase() && !current.is_empty() {
            let prev = chars[i - 1];
            let next_is_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            // fooBar | HTTPServer (boundary before 'S')
            if prev.is_lowercase() || prev.is_ascii_digit() || (prev.is_uppercase() && next_is_lower)
            {
                words.push(std::mem::take(&mut current));
            }
        }
        current.push(c);
    }
    if !current.is_empty() {
        words.push(current);
    }
    words
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Casing policy table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CasingPolicy {
    pub type_case: Casing,
    pub field_case: Casing,
    pub variant_case: Casing,
    /// Appended to every type name.
    pub type_suffix: String,
}

impl Default for CasingPolicy {
    fn default() -> Self {
        Self {
            type_case: Casing::Pascal,
            field_case: Casing::Camel,
            variant_case: Casing::Preserve,
            type_suffix: "Dto".to_string(),
        }
    }
}

/// Final name of a generated type.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CanonicalName {
    /// Simple name in the target code (`OrderV1Dto`).
    pub simple: String,
    pub scope: NamespaceScope,
    /// Name as declared in the schema (`OrderV1`).
    pub schema_name: String,
}

/// Derives canonical names from schema identifiers.
#[derive(Debug, Clone, Copy)]
pub struct NamingStrategy<'a> {
    policy: &'a CasingPolicy,
}

impl<'a> NamingStrategy<'a> {
    pub fn new(policy: &'a CasingPolicy) -> Self {
        Self { policy }
    }

    pub fn name(&self, schema_id: &TypeId, scope: &NamespaceScope) -> CanonicalName {
        let schema_name = schema_id.simple_name();
        CanonicalName {
            simple: format!(
                "{}{}",
                self.policy.type_case.apply(schema_name),
                self.policy.type_suffix
            ),
            scope: scope.clone(),
            schema_name: schema_name.to_string(),
        }
    }

    pub fn field(&self, schema_name: &str) -> String {
        self.policy.field_case.apply(schema_name)
    }

    pub fn variant(&self, schema_name: &str) -> String {
        self.policy.variant_case.apply(schema_name)
    }
}

/// Every canonical name of a run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NameTable {
    types: BTreeMap<TypeId, CanonicalName>,
    fields: BTreeMap<TypeId, Vec<String>>,
    variants: BTreeMap<TypeId, Vec<String>>,
    root_package: Vec<String>,
}

impl NameTable {
    /// Name every renderable type of `tree`.
    ///
    /// Fails when two types end up with the same name in one package (scopes
    /// that differ only in characters a package name cannot hold share a
    /// package), or when two fields of one record or two variants of one enum
    /// end up with the same name.
    pub fn build(
        tree: &DescriptorTree,
        policy: &CasingPolicy,
        root_package: &str,
    ) -> Result<Self, GenerateError> {
        let strategy = NamingStrategy::new(policy);
        let mut table = NameTable {
            root_package: root_package
                .split('.')
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect(),
            ..Default::default()
        };
        let mut taken: BTreeSet<(Vec<String>, String)> = BTreeSet::new();

        for node in tree.renderable() {
            let name = strategy.name(&node.id, &node.scope);
            let package = table.package_segments(&node.scope);
            if !taken.insert((package, name.simple.clone())) {
                return Err(GenerateError::DuplicateDefinition {
                    type_id: node.id.clone(),
                    scope: node.scope.clone(),
                    name: name.simple,
                });
            }

            let (members, slot) = match &node.kind {
                ResolvedKind::Record { fields } => (
                    fields.iter().map(|f| strategy.field(&f.name)).collect::<Vec<_>>(),
                    &mut table.fields,
                ),
                ResolvedKind::Enum { variants } => (
                    variants.iter().map(|v| strategy.variant(v)).collect(),
                    &mut table.variants,
                ),
                ResolvedKind::Alias(_) => continue,
            };
            let mut seen = BTreeSet::new();
            for member in &members {
                if !seen.insert(member.as_str()) {
                    return Err(GenerateError::DuplicateDefinition {
                        type_id: node.id.clone(),
                        scope: node.scope.clone(),
                        name: member.clone(),
                    });
                }
            }
            slot.insert(node.id.clone(), members);
            table.types.insert(node.id.clone(), name);
        }
        Ok(table)
    }

    pub fn type_name(&self, id: &TypeId) -> Option<&CanonicalName> {
        self.types.get(id)
    }

    /// Canonical name of field `index` of record `id`.
    pub fn field(&self, id: &TypeId, index: usize) -> Option<&str> {
        self.fields.get(id)?.get(index).map(String::as_str)
    }

    /// Canonical name of variant `index` of enum `id`.
    pub fn variant(&self, id: &TypeId, index: usize) -> Option<&str> {
        self.variants.get(id)?.get(index).map(String::as_str)
    }

    /// Package/module path of a scope: root package, then scope segments.
    ///
    /// Segments are lowercased; characters that cannot appear in a package
    /// name become `_`.
    pub fn package_segments(&self, scope: &NamespaceScope) -> Vec<String> {
        self.root_package
            .iter()
            .map(String::as_str)
            .chain(scope.segments())
            .map(|segment| {
                segment
                    .chars()
                    .map(|c| {
                        if c.is_ascii_alphanumeric() {
                            c.to_ascii_lowercase()
                        } else {
                            '_'
                        }
                    })
                    .collect()
            })
            .collect()
    }

    /// Referenced types of `owner` whose simple name is already taken in the
    /// owner's file: by the owner itself, or by another referenced type.
    ///
    /// Types from the owner's own package keep their simple name, so only
    /// types from other packages are returned.
    pub fn clashing_references<'t>(
        &self,
        owner: &TypeId,
        targets: impl IntoIterator<Item = &'t TypeId>,
    ) -> BTreeSet<TypeId> {
        let Some(own) = self.types.get(owner) else {
            return BTreeSet::new();
        };
        let own_package = self.package_segments(&own.scope);
        let mut by_simple: BTreeMap<&str, BTreeSet<Vec<String>>> = BTreeMap::new();
        by_simple
            .entry(own.simple.as_str())
            .or_default()
            .insert(own_package.clone());
        let mut foreign = Vec::new();
        for target in targets {
            let Some(name) = self.types.get(target) else {
                continue;
            };
            let package = self.package_segments(&name.scope);
            by_simple
                .entry(name.simple.as_str())
                .or_default()
                .insert(package.clone());
            if package != own_package {
                foreign.push((target, name.simple.as_str()));
            }
        }
        foreign
            .into_iter()
            .filter(|(_, simple)| by_simple.get(simple).is_some_and(|p| p.len() > 1))
            .map(|(target, _)| target.clone())
            .collect()
    }

    /// Dotted package of a scope (`model.customer.profile`).
    pub fn package(&self, scope: &NamespaceScope) -> String {
        self.package_segments(scope).join(".")
    }

    /// Number of named types.
    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}
