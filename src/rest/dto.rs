//! Data Transfer Objects for the catalog API.
//!
//! Step bodies keep the catalog wire format so any client can decode
//! `/api/steps` straight into a [`crate::catalog::CatalogDocument`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::catalog::{Checkpoint, DocumentationIndex, Step, StepCatalog};

/// Health check response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// A checkpoint within a step
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CheckpointResponse {
    pub id: String,
    pub label: String,
    pub optional: bool,
}

impl From<&Checkpoint> for CheckpointResponse {
    fn from(c: &Checkpoint) -> Self {
        Self {
            id: c.id.clone(),
            label: c.label.clone(),
            optional: c.optional,
        }
    }
}

/// A single step
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StepResponse {
    pub id: String,
    pub title: String,
    pub description: String,
    pub checkpoints: Vec<CheckpointResponse>,
    pub documentation: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dashboard_link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commands: Option<String>,
    /// Informational; clients recompute it from the checkpoints
    pub progress_exempt: bool,
}

impl From<&Step> for StepResponse {
    fn from(s: &Step) -> Self {
        Self {
            id: s.id.clone(),
            title: s.title.clone(),
            description: s.description.clone(),
            checkpoints: s.checkpoints.iter().map(CheckpointResponse::from).collect(),
            documentation: s.documentation.clone(),
            images: s.images.clone(),
            dashboard_link: s.dashboard_link.clone(),
            notice: s.notice.clone(),
            commands: s.commands.clone(),
            progress_exempt: s.is_progress_exempt(),
        }
    }
}

/// The whole catalog
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct StepsResponse {
    pub steps: Vec<StepResponse>,
}

impl From<&StepCatalog> for StepsResponse {
    fn from(catalog: &StepCatalog) -> Self {
        Self {
            steps: catalog.iter().map(StepResponse::from).collect(),
        }
    }
}

/// Reference links grouped by topic
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct DocumentationResponse(pub BTreeMap<String, Vec<String>>);

impl From<&DocumentationIndex> for DocumentationResponse {
    fn from(index: &DocumentationIndex) -> Self {
        Self(index.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::tests::three_step_catalog;
    use crate::catalog::CatalogDocument;

    #[test]
    fn test_steps_response_decodes_as_catalog() {
        let catalog = three_step_catalog();
        let json = serde_json::to_string(&StepsResponse::from(&catalog)).unwrap();
        assert!(json.contains("\"progressExempt\":true"));

        let doc = CatalogDocument::from_json(&json).unwrap();
        assert_eq!(doc, catalog.to_document());
    }

    #[test]
    fn test_optional_fields_omitted() {
        let catalog = three_step_catalog();
        let json = serde_json::to_string(&StepResponse::from(&catalog.steps()[0])).unwrap();
        assert!(!json.contains("dashboardLink"));
        assert!(!json.contains("notice"));
        assert!(!json.contains("images"));
    }

    #[test]
    fn test_documentation_is_flat_map() {
        let mut index = DocumentationIndex::new();
        index.insert("ssl".to_string(), vec!["https://example.com/ssl/".to_string()]);
        let json = serde_json::to_string(&DocumentationResponse::from(&index)).unwrap();
        assert_eq!(json, r#"{"ssl":["https://example.com/ssl/"]}"#);
    }
}
