use std::sync::Arc;
use std::time::Instant;

use axum::extract::Request;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::{
    Router,
    routing::{get, put},
};

use super::registry;
use crate::auth::require_access;
use crate::config::ServerConfig;
use crate::manifest::ManifestMigrator;
use crate::store::Store;

pub struct AppState {
    pub store: Arc<dyn Store>,
    pub migrator: ManifestMigrator,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, config: &ServerConfig) -> Self {
        Self {
            store,
            migrator: ManifestMigrator::new(config.layer_base_path()),
        }
    }
}

async fn log_request(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = Instant::now();

    let response = next.run(request).await;

    let latency = start.elapsed();
    let status = response.status();

    tracing::info!(
        "{} {} {} {}ms",
        method,
        uri.path(),
        status.as_u16(),
        latency.as_millis()
    );

    response
}

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/_ping", get(registry::ping))
        .route("/v1/_ping", get(registry::ping))
        .route("/v2/", get(registry::version_check))
        .route(
            "/v2/{namespace}/{repository}/manifests/{reference}",
            put(registry::put_manifest),
        )
        .route(
            "/v2/{namespace}/{repository}/tags/list",
            get(registry::list_tags),
        )
        .route("/v1/images/{image_id}/json", get(registry::get_image_json))
        .route(
            "/v1/images/{image_id}/ancestry",
            get(registry::get_image_ancestry),
        )
        .layer(middleware::from_fn_with_state(state.clone(), require_access))
        .layer(middleware::from_fn(log_request))
        .with_state(state)
}
