//! Step catalog endpoints.

use axum::{
    extract::{Path, State},
    Json,
};

use crate::rest::dto::{StepResponse, StepsResponse};
use crate::rest::error::{ApiError, ErrorResponse};
use crate::rest::state::ApiState;

/// List every step in catalog order
#[utoipa::path(
    get,
    path = "/api/steps",
    tag = "Steps",
    responses(
        (status = 200, description = "The full step catalog", body = StepsResponse)
    )
)]
pub async fn list(State(state): State<ApiState>) -> Json<StepsResponse> {
    Json(StepsResponse::from(state.catalog.as_ref()))
}

/// Get a single step by id
#[utoipa::path(
    get,
    path = "/api/steps/{id}",
    tag = "Steps",
    params(
        ("id" = String, Path, description = "Step id")
    ),
    responses(
        (status = 200, description = "Step details", body = StepResponse),
        (status = 404, description = "Step not found", body = ErrorResponse)
    )
)]
pub async fn get_one(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<Json<StepResponse>, ApiError> {
    let step = state
        .catalog
        .step(&id)
        .ok_or_else(|| ApiError::NotFound(format!("Step '{id}' not found")))?;

    Ok(Json(StepResponse::from(step)))
}
