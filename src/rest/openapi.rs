//! OpenAPI specification builder using utoipa.

use axum::Json;
use utoipa::OpenApi;

use crate::rest::dto::{
    CheckpointResponse, DocumentationResponse, HealthResponse, StepResponse, StepsResponse,
};
use crate::rest::error::ErrorResponse;

/// OpenAPI documentation for the catalog API
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Cutover Catalog API",
        description = "Serves the migration step catalog and reference links."
    ),
    paths(
        crate::rest::routes::health::health,
        crate::rest::routes::steps::list,
        crate::rest::routes::steps::get_one,
        crate::rest::routes::documentation::index,
    ),
    components(
        schemas(
            HealthResponse,
            StepsResponse,
            StepResponse,
            CheckpointResponse,
            DocumentationResponse,
            ErrorResponse,
        )
    ),
    tags(
        (name = "Health", description = "Health check"),
        (name = "Steps", description = "Step catalog"),
        (name = "Documentation", description = "Reference links by topic"),
    )
)]
pub struct ApiDoc;

impl ApiDoc {
    /// Generate the OpenAPI specification as a JSON string
    pub fn json() -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&Self::openapi())
    }
}

/// Serve the OpenAPI document
pub async fn spec() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
