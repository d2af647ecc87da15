//! Catalog and reference links compiled into the binary.

use std::collections::BTreeMap;

use super::CatalogDocument;

/// Embedded migration guide (Partial/CNAME setup transitioning to Full setup)
const STEPS_JSON: &str = include_str!("builtin/steps.json");

/// Embedded documentation links grouped by topic
const DOCUMENTATION_JSON: &str = include_str!("builtin/documentation.json");

/// Topic name to reference links. Opaque to the progress engine.
pub type DocumentationIndex = BTreeMap<String, Vec<String>>;

/// Parse the embedded catalog document
pub fn document() -> Result<CatalogDocument, serde_json::Error> {
    CatalogDocument::from_json(STEPS_JSON)
}

/// Parse the embedded documentation index
pub fn documentation() -> Result<DocumentationIndex, serde_json::Error> {
    serde_json::from_str(DOCUMENTATION_JSON)
}
