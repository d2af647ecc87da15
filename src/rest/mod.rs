//! HTTP server for the step catalog.
//!
//! Serves the catalog wire format at `/api/steps` so other instances can use
//! it as an `http` catalog source.

use std::net::{IpAddr, SocketAddr};

use anyhow::{Context, Result};
use axum::{routing::get, Router};
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub mod dto;
pub mod error;
pub mod openapi;
pub mod routes;
pub mod state;

pub use openapi::ApiDoc;
pub use state::ApiState;

/// Default port for the catalog server
pub const DEFAULT_PORT: u16 = 7008;

/// Build the API router with all routes
pub fn build_router(state: ApiState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/v1/health", get(routes::health::health))
        .route("/api/steps", get(routes::steps::list))
        .route("/api/steps/:id", get(routes::steps::get_one))
        .route("/api/documentation", get(routes::documentation::index))
        .route("/api/openapi.json", get(openapi::spec))
        .fallback(error::not_found)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Serve on an already bound listener until Ctrl-C
pub async fn serve_on(listener: TcpListener, state: ApiState) -> Result<()> {
    let addr = listener.local_addr()?;
    tracing::info!("Catalog API listening on http://{}", addr);

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Catalog API server failed")?;

    tracing::info!("Catalog API stopped");
    Ok(())
}

/// Bind `bind:port` and serve
pub async fn serve(state: ApiState, bind: IpAddr, port: u16) -> Result<()> {
    let addr = SocketAddr::new(bind, port);
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    serve_on(listener, state).await
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rest::error::ErrorResponse;
    use crate::rest::state::tests::builtin_state;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    async fn get_json(router: Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = router
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_steps_route() {
        let router = build_router(builtin_state().await);
        let (status, body) = get_json(router, "/api/steps").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["steps"].as_array().unwrap().len(), 14);
    }

    #[tokio::test]
    async fn test_single_step_route() {
        let router = build_router(builtin_state().await);
        let (status, body) = get_json(router, "/api/steps/change-nameservers").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["id"], "change-nameservers");
        assert!(body["notice"].is_string());
    }

    #[tokio::test]
    async fn test_unknown_route_is_json_404() {
        let router = build_router(builtin_state().await);
        let (status, body) = get_json(router, "/api/nothing").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let err: ErrorResponse = serde_json::from_value(body).unwrap();
        assert_eq!(err.error, "not_found");
    }

    #[tokio::test]
    async fn test_openapi_route() {
        let router = build_router(builtin_state().await);
        let (status, body) = get_json(router, "/api/openapi.json").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["paths"]["/api/steps"].is_object());
    }

    #[tokio::test]
    async fn test_cors_allows_any_origin() {
        let router = build_router(builtin_state().await);
        let response = router
            .oneshot(
                Request::builder()
                    .uri("/api/v1/health")
                    .header("origin", "http://example.com")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.headers()["access-control-allow-origin"], "*");
    }
}
