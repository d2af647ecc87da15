//! Documentation index endpoint.

use axum::{extract::State, Json};

use crate::rest::dto::DocumentationResponse;
use crate::rest::state::ApiState;

/// Reference links grouped by topic
#[utoipa::path(
    get,
    path = "/api/documentation",
    tag = "Documentation",
    responses(
        (status = 200, description = "Topic to links", body = DocumentationResponse)
    )
)]
pub async fn index(State(state): State<ApiState>) -> Json<DocumentationResponse> {
    Json(DocumentationResponse::from(state.documentation.as_ref()))
}
