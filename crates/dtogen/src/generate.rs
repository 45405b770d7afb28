//! Pipeline orchestration.
//!
//! ```text
//! SchemaGraph ─> resolve ─> ConstraintTable ─> NameTable ─> render (type × language) ─> Generation
//! ```
//!
//! Every stage after resolution reads only finalized, immutable tables, so
//! constraint mapping and rendering run on rayon's pool without locks.
//! Results are ordered by key before they leave this module.

use crate::config::GeneratorConfig;
use crate::constraint::{ConstraintMapper, ConstraintTable};
use crate::emit::{EmitError, Emitter};
use crate::error::{GenerateError, RenderError};
use crate::graph::SchemaGraph;
use crate::naming::NameTable;
use crate::registry;
use crate::resolve::{DescriptorTree, ResolvedKind, ResolvedType, resolve};
use crate::traits::{RenderContext, RenderedUnit, Renderer, TargetLanguage};
use rayon::prelude::*;
use std::collections::BTreeSet;
use tracing::{debug, info, warn};

/// Outcome of a run: every unit that rendered, and every one that could not.
#[derive(Debug, Clone, Default)]
pub struct Generation {
    /// Rendered units, sorted by key.
    pub units: Vec<RenderedUnit>,
    /// Per-(type, language) failures, in type order.
    pub failures: Vec<RenderError>,
    /// Requested languages with no compiled-in renderer.
    pub missing_languages: Vec<TargetLanguage>,
}

impl Generation {
    /// Whether every requested unit was rendered.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty() && self.missing_languages.is_empty()
    }

    /// Hand every unit to `emitter`, once each.
    ///
    /// Keys and output paths are checked first; on a collision nothing is written.
    pub fn emit(&self, emitter: &mut dyn Emitter) -> Result<(), EmitError> {
        let mut keys = BTreeSet::new();
        let mut paths = BTreeSet::new();
        for unit in &self.units {
            if !keys.insert(&unit.key) {
                return Err(EmitError::DuplicateUnit(format!(
                    "{} ({}, {})",
                    unit.key.type_name, unit.key.scope, unit.key.language
                )));
            }
            if !paths.insert(&unit.path) {
                return Err(EmitError::PathCollision {
                    path: unit.path.clone(),
                });
            }
        }
        for unit in &self.units {
            emitter.write(unit)?;
        }
        Ok(())
    }
}

/// Structural stages of a run, without rendering.
#[derive(Debug, Clone)]
pub struct Analysis {
    pub tree: DescriptorTree,
    pub constraints: ConstraintTable,
    pub names: NameTable,
}

/// Resolve, map constraints and name every type.
///
/// Fails with the first structural error; nothing is rendered.
pub fn analyze(graph: &SchemaGraph, config: &GeneratorConfig) -> Result<Analysis, GenerateError> {
    let tree = resolve(graph)?;
    let constraints = ConstraintTable::build(&tree, &ConstraintMapper::new())?;
    let names = NameTable::build(&tree, &config.naming, &config.root_package)?;
    debug!(
        types = tree.len(),
        named = names.len(),
        "analysis complete"
    );
    Ok(Analysis {
        tree,
        constraints,
        names,
    })
}

/// Run the whole pipeline for the configured target languages.
pub fn generate(graph: &SchemaGraph, config: &GeneratorConfig) -> Result<Generation, GenerateError> {
    let analysis = analyze(graph, config)?;
    let (renderers, missing_languages) = registry::renderers(&config.targets);
    for language in &missing_languages {
        warn!(%language, "no renderer compiled in for language");
    }
    let mut generation = render_all(&analysis, &renderers, config);
    generation.missing_languages = missing_languages;
    Ok(generation)
}

/// Render every record and enum with every renderer, in parallel.
pub fn render_all(
    analysis: &Analysis,
    renderers: &[&'static dyn Renderer],
    config: &GeneratorConfig,
) -> Generation {
    let ctx = RenderContext {
        tree: &analysis.tree,
        constraints: &analysis.constraints,
        names: &analysis.names,
        config,
    };
    let jobs: Vec<(&ResolvedType, &'static dyn Renderer)> = analysis
        .tree
        .renderable()
        .flat_map(|node| renderers.iter().map(move |r| (node, *r)))
        .collect();

    let results: Vec<Result<RenderedUnit, RenderError>> = jobs
        .par_iter()
        .map(|(node, renderer)| {
            let result = renderer.render(node, &ctx);
            match &result {
                Ok(unit) => debug!(
                    type_id = %node.id,
                    language = %renderer.language(),
                    path = %unit.path.display(),
                    "rendered unit"
                ),
                Err(err) => warn!(error = %err, "unit not rendered"),
            }
            result
        })
        .collect();

    let mut generation = Generation::default();
    for result in results {
        match result {
            Ok(unit) => generation.units.push(unit),
            Err(err) => generation.failures.push(err),
        }
    }
    generation.units.sort_by(|a, b| a.key.cmp(&b.key));

    let (records, enums): (Vec<_>, Vec<_>) = analysis
        .tree
        .renderable()
        .partition(|n| matches!(n.kind, ResolvedKind::Record { .. }));
    info!(
        records = records.len(),
        enums = enums.len(),
        units = generation.units.len(),
        failures = generation.failures.len(),
        "generation finished"
    );
    generation
}
