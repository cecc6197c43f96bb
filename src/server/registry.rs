use std::sync::Arc;

use axum::{
    Json,
    body::Bytes,
    extract::{Path, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::AppState;
use super::errors::{
    BLOB_UNKNOWN, NAME_INVALID, NAME_UNKNOWN, RegistryError, TAG_INVALID,
};
use crate::manifest::{ManifestV1, storage_location};

const REGISTRY_VERSION: &str = "0.9.0";
const DISTRIBUTION_API_VERSION: &str = "registry/2.0";

#[derive(Deserialize)]
pub struct ManifestPath {
    namespace: String,
    repository: String,
    reference: String,
}

#[derive(Deserialize)]
pub struct RepositoryPath {
    namespace: String,
    repository: String,
}

#[derive(Serialize)]
struct TagList {
    name: String,
    tags: Vec<String>,
}

pub async fn ping() -> impl IntoResponse {
    ([("x-docker-registry-version", REGISTRY_VERSION)], Json(true))
}

pub async fn version_check() -> impl IntoResponse {
    (
        [("docker-distribution-api-version", DISTRIBUTION_API_VERSION)],
        Json(json!({})),
    )
}

/// Accepts a schema 1 manifest and records its images.
pub async fn put_manifest(
    State(state): State<Arc<AppState>>,
    Path(path): Path<ManifestPath>,
    body: Bytes,
) -> Result<Response, RegistryError> {
    let manifest = ManifestV1::parse(&body)?;

    let uri_name = format!("{}/{}", path.namespace, path.repository);
    if manifest.name != uri_name {
        return Err(RegistryError::bad_request(NAME_INVALID));
    }
    if manifest.tag != path.reference {
        return Err(RegistryError::bad_request(TAG_INVALID));
    }

    let migration = state
        .migrator
        .migrate_manifest(state.store.as_ref(), &manifest)?;

    tracing::info!(
        "Stored manifest {}:{} ({} images)",
        manifest.name,
        migration.tag,
        migration.images.len()
    );

    Ok((StatusCode::CREATED, Json(json!({}))).into_response())
}

pub async fn list_tags(
    State(state): State<Arc<AppState>>,
    Path(path): Path<RepositoryPath>,
) -> Result<Json<serde_json::Value>, RegistryError> {
    let name = format!("{}/{}", path.namespace, path.repository);
    let (namespace, repository) = storage_location(&name);

    let tags = state.store.list_tags(namespace, repository).map_err(|e| {
        tracing::error!("Failed to list tags for {name}: {e}");
        RegistryError::internal()
    })?;

    if tags.is_empty() {
        return Err(RegistryError::not_found(NAME_UNKNOWN));
    }

    let list = TagList {
        name,
        tags: tags.into_iter().map(|t| t.name).collect(),
    };

    Ok(Json(json!(list)))
}

fn load_image(state: &AppState, image_id: &str) -> Result<crate::types::Image, RegistryError> {
    state
        .store
        .get_image(image_id)
        .map_err(|e| {
            tracing::error!("Failed to load image {image_id}: {e}");
            RegistryError::internal()
        })?
        .ok_or(RegistryError::not_found(BLOB_UNKNOWN))
}

pub async fn get_image_json(
    State(state): State<Arc<AppState>>,
    Path(image_id): Path<String>,
) -> Result<Response, RegistryError> {
    let image = load_image(&state, &image_id)?;

    let size = image.layer.as_ref().map_or(0, |l| l.size);
    let checksum = image
        .checksum
        .as_ref()
        .map(|c| format!("{}:{}", c.algorithm, c.value))
        .unwrap_or_default();

    Ok((
        [
            (header::CONTENT_TYPE.as_str(), "application/json".to_string()),
            ("x-docker-size", size.to_string()),
            ("x-docker-checksum-payload", checksum),
        ],
        image.json,
    )
        .into_response())
}

pub async fn get_image_ancestry(
    State(state): State<Arc<AppState>>,
    Path(image_id): Path<String>,
) -> Result<Json<Vec<String>>, RegistryError> {
    let image = load_image(&state, &image_id)?;
    Ok(Json(image.ancestry))
}
