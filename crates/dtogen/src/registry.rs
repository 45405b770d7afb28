//! Registry of built-in renderers.
//!
//! Renderers are stateless statics; selecting one is a lookup by
//! [`TargetLanguage`]. Which ones exist depends on the `backend-*` features.

use crate::traits::{Renderer, TargetLanguage};

/// Every renderer compiled into this build.
fn builtin() -> Vec<&'static dyn Renderer> {
    #[allow(unused_mut)]
    let mut renderers: Vec<&'static dyn Renderer> = Vec::new();

    #[cfg(feature = "backend-java")]
    {
        renderers.push(&crate::output::java::JAVA_RENDERER);
    }

    #[cfg(feature = "backend-kotlin")]
    {
        renderers.push(&crate::output::kotlin::KOTLIN_RENDERER);
    }

    #[cfg(feature = "backend-typescript")]
    {
        renderers.push(&crate::output::typescript::TYPESCRIPT_RENDERER);
    }

    renderers
}

/// Get the renderer for a language, if it was compiled in.
pub fn renderer_for(language: TargetLanguage) -> Option<&'static dyn Renderer> {
    builtin().into_iter().find(|r| r.language() == language)
}

/// Renderers for the requested languages, in request order, skipping repeats.
///
/// Languages without a renderer are returned separately.
pub fn renderers(
    languages: &[TargetLanguage],
) -> (Vec<&'static dyn Renderer>, Vec<TargetLanguage>) {
    let mut found: Vec<&'static dyn Renderer> = Vec::new();
    let mut missing = Vec::new();
    for &language in languages {
        if found.iter().any(|r| r.language() == language) || missing.contains(&language) {
            continue;
        }
        match renderer_for(language) {
            Some(renderer) => found.push(renderer),
            None => missing.push(language),
        }
    }
    (found, missing)
}

/// Languages with a compiled-in renderer.
pub fn available_languages() -> Vec<TargetLanguage> {
    builtin().iter().map(|r| r.language()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_by_language() {
        for language in available_languages() {
            let renderer = renderer_for(language).expect("registered renderer");
            assert_eq!(renderer.language(), language);
        }
    }

    #[test]
    #[cfg(all(feature = "backend-java", feature = "backend-kotlin"))]
    fn repeats_are_dropped() {
        let (found, missing) = renderers(&[
            TargetLanguage::Kotlin,
            TargetLanguage::Java,
            TargetLanguage::Kotlin,
        ]);
        let languages: Vec<_> = found.iter().map(|r| r.language()).collect();
        assert_eq!(languages, vec![TargetLanguage::Kotlin, TargetLanguage::Java]);
        assert!(missing.is_empty());
    }

    #[test]
    #[cfg(feature = "default")]
    fn default_features_cover_all_languages() {
        assert_eq!(available_languages(), TargetLanguage::ALL.to_vec());
    }
}
