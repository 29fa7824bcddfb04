//! The bundled blueprint and document loading.

use std::path::Path;

use annotator_markup::parse_document;
use annotator_shared::{AnnotatorError, DocumentConfig, Result, Section, SubsectionMode};
use tracing::{info, instrument};

/// The blueprint shipped with the binary.
pub const BUNDLED_DOCUMENT: &str = include_str!("../assets/blueprint.tex");

/// Read the document at `path`, or return the bundled one.
pub fn load_document(path: Option<&Path>) -> Result<String> {
    match path {
        Some(path) => std::fs::read_to_string(path).map_err(|e| AnnotatorError::io(path, e)),
        None => Ok(BUNDLED_DOCUMENT.to_string()),
    }
}

/// Load and parse the configured document.
#[instrument(skip_all, fields(path = ?config.path, mode = ?config.subsections))]
pub fn load_sections(config: &DocumentConfig) -> Result<Vec<Section>> {
    let raw = load_document(config.path.as_deref().map(Path::new))?;
    let sections = parse_document(&raw, config.subsections);
    info!(count = sections.len(), "document loaded");
    Ok(sections)
}

/// Parse the bundled document.
pub fn bundled_sections(mode: SubsectionMode) -> Vec<Section> {
    parse_document(BUNDLED_DOCUMENT, mode)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundled_document_separate_mode() {
        let sections = bundled_sections(SubsectionMode::Separate);
        assert_eq!(sections.len(), 13);

        assert_eq!(sections[0].id, "abstract");
        assert_eq!(sections[0].title, "Abstract");
        assert_eq!(sections[1].id, "foundational-manifold-and-unified-potential");
        assert_eq!(sections[1].level, 1);
        assert_eq!(sections[2].level, 2);
        assert!(
            sections[2]
                .id
                .starts_with("foundational-manifold-and-unified-potential-")
        );

        let last = sections.last().unwrap();
        assert_eq!(last.title, "Computational and Functional Equivalence");
        assert_eq!(last.level, 1);
    }

    #[test]
    fn bundled_document_folded_mode() {
        let sections = bundled_sections(SubsectionMode::Folded);
        assert_eq!(sections.len(), 5);
        assert!(sections.iter().all(|s| s.level == 1));
        assert!(sections[1].content.contains("\\subsection{"));
    }

    #[test]
    fn bundled_ids_are_unique() {
        let sections = bundled_sections(SubsectionMode::Separate);
        let mut ids: Vec<_> = sections.iter().map(|s| s.id.as_str()).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), sections.len());
    }

    #[test]
    fn load_sections_from_file() {
        let path = std::env::temp_dir().join(format!("annotator-doc-{}.tex", std::process::id()));
        std::fs::write(&path, "\\section{Only}\nBody text.").unwrap();

        let config = DocumentConfig {
            path: Some(path.to_string_lossy().into_owned()),
            subsections: SubsectionMode::Separate,
        };
        let sections = load_sections(&config).unwrap();
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].id, "only");

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn missing_document_is_io_error() {
        let err = load_document(Some(Path::new("/no/such/document.tex"))).unwrap_err();
        assert!(matches!(err, AnnotatorError::Io { .. }));
    }
}
