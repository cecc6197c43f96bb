use std::path::{Path, PathBuf};

use super::schema::{ManifestV1, V1Image};
use super::{Digest, MigrateError};
use crate::store::ImageStore;
use crate::types::{ApiVersion, Checksum, Layer, RepositoryImage};

/// Result of a successful migration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Migration {
    pub namespace: String,
    pub repository: String,
    pub tag: String,
    /// Image ids in the order they were recorded, root layer first.
    pub images: Vec<String>,
}

/// Records a schema 1 manifest as individual image records.
#[derive(Debug, Clone)]
pub struct ManifestMigrator {
    base_path: PathBuf,
}

impl ManifestMigrator {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Location of a layer blob, keyed by its checksum.
    #[must_use]
    pub fn layer_path(&self, checksum: &str) -> String {
        format!("{}/uuid/{}/layer", self.base_path.display(), checksum)
    }

    /// Decodes and migrates a raw manifest document.
    pub fn migrate(&self, store: &dyn ImageStore, data: &[u8]) -> Result<Migration, MigrateError> {
        let manifest = ManifestV1::parse(data)?;
        self.migrate_manifest(store, &manifest)
    }

    /// Walks history from the root layer (last entry) to the tagged image
    /// (entry 0) so every parent is recorded before its children. The first
    /// failure aborts; records already written stay in place.
    pub fn migrate_manifest(
        &self,
        store: &dyn ImageStore,
        manifest: &ManifestV1,
    ) -> Result<Migration, MigrateError> {
        let (namespace, repository) = manifest.storage_location();
        let mut images = Vec::with_capacity(manifest.history.len());

        for (index, history) in manifest.history.iter().enumerate().rev() {
            let raw = history.v1_compatibility.as_str();
            let image = V1Image::parse(raw, index)?;
            let tagged = index == 0;

            store.put_repository_image(&RepositoryImage {
                namespace: namespace.to_string(),
                repository: repository.to_string(),
                image_id: image.id.clone(),
                tag: tagged.then(|| manifest.tag.clone()),
            })?;

            if tagged {
                store.put_tag(&image.id, namespace, repository, &manifest.tag, raw)?;
            }

            store.put_metadata(&image.id, raw, ApiVersion::V2)?;

            let digest: Digest = manifest.fs_layers[index]
                .blob_sum
                .parse()
                .map_err(|source| MigrateError::DigestInvalid { index, source })?;

            store.put_layer(
                &image.id,
                &Layer {
                    path: self.layer_path(digest.hex()),
                    external: true,
                    size: image.size,
                },
            )?;

            store.put_checksum(
                &image.id,
                &Checksum {
                    algorithm: digest.algorithm().to_string(),
                    value: digest.hex().to_string(),
                    verified: true,
                    payload: None,
                },
            )?;

            store.put_ancestry(&image.id)?;

            tracing::trace!("Migrated image {} ({}) at history index {index}", image.id, digest);
            images.push(image.id);
        }

        tracing::debug!(
            "Migrated {}:{} into {namespace}/{repository} ({} images)",
            manifest.name,
            manifest.tag,
            images.len()
        );

        Ok(Migration {
            namespace: namespace.to_string(),
            repository: repository.to_string(),
            tag: manifest.tag.clone(),
            images,
        })
    }
}
