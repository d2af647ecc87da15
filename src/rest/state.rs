//! Shared state for the catalog server.

use std::sync::Arc;

use crate::catalog::{self, CatalogSource, DocumentationIndex, StepCatalog};
use crate::error::ProgressError;

/// Read-only data served by every handler
#[derive(Clone)]
pub struct ApiState {
    pub catalog: Arc<StepCatalog>,
    pub documentation: Arc<DocumentationIndex>,
}

impl ApiState {
    pub fn new(catalog: StepCatalog, documentation: DocumentationIndex) -> Self {
        Self {
            catalog: Arc::new(catalog),
            documentation: Arc::new(documentation),
        }
    }

    /// Load and validate the catalog to serve; fails if it would be rejected by clients
    pub async fn from_source(source: &dyn CatalogSource) -> Result<Self, ProgressError> {
        let catalog = catalog::load(source).await?;
        let documentation =
            catalog::builtin::documentation().map_err(ProgressError::catalog_unavailable)?;
        Ok(Self::new(catalog, documentation))
    }
}
