//! All-or-nothing catalog loading.

use tracing::{debug, info};

use super::source::CatalogSource;
use super::StepCatalog;
use crate::error::ProgressError;

/// Fetch, validate and freeze the catalog.
///
/// Any failure (unreachable source, undecodable payload, structural problem)
/// yields [`ProgressError::CatalogUnavailable`]; a partial catalog is never
/// returned.
pub async fn load(source: &dyn CatalogSource) -> Result<StepCatalog, ProgressError> {
    let origin = source.describe();
    debug!(source = %origin, "fetching step catalog");

    let document = source
        .fetch()
        .await
        .map_err(|e| ProgressError::catalog_unavailable(format!("{e:#}")))?;

    let catalog = StepCatalog::from_document(document).map_err(|issues| {
        let msgs: Vec<String> = issues.iter().map(ToString::to_string).collect();
        ProgressError::catalog_unavailable(format!("{origin}: {}", msgs.join("; ")))
    })?;

    info!(
        source = %origin,
        steps = catalog.len(),
        digest = %&catalog.digest()[..12],
        "step catalog loaded"
    );
    Ok(catalog)
}
