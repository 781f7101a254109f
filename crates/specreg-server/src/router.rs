use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::get;
use axum::Router;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use specreg_registry::Registry;

use crate::auth::AuthProvider;
use crate::handler;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<Registry>,
    pub auth: Arc<dyn AuthProvider>,
}

impl AppState {
    pub fn new(registry: Arc<Registry>, auth: Arc<dyn AuthProvider>) -> Self {
        Self { registry, auth }
    }
}

/// Build the axum router with all registry endpoints.
pub fn build_router(state: AppState, max_body_bytes: usize) -> Router {
    Router::new()
        .route("/v1/health", get(handler::health_handler))
        .route(
            "/v1/specs",
            get(handler::list_specs).delete(handler::delete_all_specs),
        )
        .route(
            "/v1/specs/:spec_id",
            get(handler::get_latest).delete(handler::delete_spec),
        )
        .route("/v1/specs/:spec_id/versions", get(handler::list_versions))
        .route(
            "/v1/specs/:spec_id/versions/:version",
            get(handler::get_version).put(handler::put_version),
        )
        .route(
            "/v1/credentials",
            get(handler::list_credentials).delete(handler::delete_all_credentials),
        )
        .route(
            "/v1/credentials/:credential_id",
            get(handler::get_credential)
                .put(handler::put_credential)
                .delete(handler::delete_credential),
        )
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
