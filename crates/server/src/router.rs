//! HTTP router construction.
//!
//! Assembles all Axum routes, middleware, and OpenAPI docs into a single `Router`.

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

use crate::api;
use crate::state::AppState;

/// Build the complete application router with all routes and middleware.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(api::health))
        .route("/auth/login", post(api::login))
        .route("/auth/register", post(api::register))
        .route("/auth/verify-token", get(api::verify_token))
        .route("/auth/me", get(api::me))
        .route(
            "/databases",
            get(api::databases_list).post(api::databases_create),
        )
        .route(
            "/databases/{id}",
            axum::routing::delete(api::databases_delete),
        )
        .route("/databases/{id}/connection", get(api::databases_connection))
        .route("/execute-sql", post(api::execute_sql))
        .route("/direct-sql", post(api::direct_sql))
        .route("/sync-databases", get(api::sync_databases))
        .route("/user/usage", get(api::usage))
        .layer(CorsLayer::permissive())
        .with_state(state)
        .merge(Scalar::with_url("/docs", api::doc::ApiDoc::openapi()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::EngineSet;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use sqlx::postgres::PgPoolOptions;
    use tower::ServiceExt;
    use uuid::Uuid;

    // Lazy pool: no connection is made until a query runs, so routes that
    // never touch the registry are testable without a live engine.
    fn test_state() -> Arc<AppState> {
        let config = harbor_core::Config::from_env();
        let pool = PgPoolOptions::new()
            .max_connections(1)
            .connect_lazy(&config.registry.database_url())
            .unwrap();
        let engines = EngineSet::from_config(&config);
        Arc::new(AppState {
            pool,
            engines,
            config,
            admin_user_id: Uuid::nil(),
        })
    }

    async fn send(router: Router, req: Request<Body>) -> (StatusCode, serde_json::Value) {
        let resp = router.oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null)
        };
        (status, body)
    }

    #[tokio::test]
    async fn test_health_is_ok_without_registry() {
        let router = build_router(test_state());
        let req = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(router, req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_missing_bearer_is_unauthorized() {
        let router = build_router(test_state());
        let req = Request::builder()
            .uri("/databases")
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(router, req).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn test_garbage_bearer_is_unauthorized() {
        let router = build_router(test_state());
        let req = Request::builder()
            .uri("/auth/me")
            .header("Authorization", "Bearer not-a-token")
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(router, req).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_unknown_route_is_not_found() {
        let router = build_router(test_state());
        let req = Request::builder()
            .uri("/nope")
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(router, req).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_direct_sql_without_query_is_validation_error() {
        let router = build_router(test_state());
        let req = Request::builder()
            .method("POST")
            .uri("/direct-sql")
            .header("Content-Type", "application/json")
            .body(Body::from("{}"))
            .unwrap();
        let (status, body) = send(router, req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"]
            .as_str()
            .unwrap_or_default()
            .contains("query"));
    }

    #[tokio::test]
    async fn test_docs_is_served() {
        let router = build_router(test_state());
        let req = Request::builder().uri("/docs").body(Body::empty()).unwrap();
        let resp = router.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }
}
