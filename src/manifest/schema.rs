//! Image manifest, schema version 1.
//!
//! `history` and `fsLayers` are parallel lists ordered newest layer first:
//! `history[i].v1Compatibility` describes the image whose layer blob is
//! `fsLayers[i].blobSum`.

use serde::{Deserialize, Serialize};

use super::MigrateError;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestV1 {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_version: Option<u32>,
    pub name: String,
    pub tag: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub architecture: Option<String>,
    pub fs_layers: Vec<FsLayer>,
    pub history: Vec<History>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FsLayer {
    pub blob_sum: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct History {
    /// Image metadata, itself a JSON document encoded as a string.
    #[serde(rename = "v1Compatibility")]
    pub v1_compatibility: String,
}

/// The fields of an embedded image descriptor that migration reads.
#[derive(Debug, Clone, Deserialize)]
pub struct V1Image {
    pub id: String,
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(rename = "Size", default)]
    pub size: i64,
}

impl ManifestV1 {
    /// Decodes a manifest and checks its structural invariants.
    pub fn parse(data: &[u8]) -> Result<Self, MigrateError> {
        let manifest: ManifestV1 =
            serde_json::from_slice(data).map_err(MigrateError::ManifestDecodeFailed)?;
        manifest.validate()?;
        Ok(manifest)
    }

    fn validate(&self) -> Result<(), MigrateError> {
        if self.name.trim_matches('/').is_empty() {
            return Err(MigrateError::ManifestInvalid("name is empty".to_string()));
        }
        if self.tag.is_empty() {
            return Err(MigrateError::ManifestInvalid("tag is empty".to_string()));
        }
        if self.history.is_empty() {
            return Err(MigrateError::ManifestInvalid(
                "history has no entries".to_string(),
            ));
        }
        if self.history.len() != self.fs_layers.len() {
            return Err(MigrateError::ManifestInvalid(format!(
                "history has {} entries but fsLayers has {}",
                self.history.len(),
                self.fs_layers.len()
            )));
        }
        Ok(())
    }

    /// Namespace and repository the manifest is recorded under.
    #[must_use]
    pub fn storage_location(&self) -> (&str, &str) {
        storage_location(&self.name)
    }
}

/// Maps a repository name to the namespace and repository its images are
/// recorded under.
///
/// Both come from the first segment of the name: `alice/app` is recorded as
/// namespace `alice`, repository `alice`. Existing v1 clients read images
/// back from that location.
#[must_use]
pub fn storage_location(name: &str) -> (&str, &str) {
    let first = name
        .trim_start_matches('/')
        .split('/')
        .next()
        .unwrap_or_default();
    (first, first)
}

impl V1Image {
    pub fn parse(raw: &str, index: usize) -> Result<Self, MigrateError> {
        serde_json::from_str(raw).map_err(|source| MigrateError::LayerDecodeFailed { index, source })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MANIFEST: &str = r#"{
        "schemaVersion": 1,
        "name": "alice/app",
        "tag": "latest",
        "architecture": "amd64",
        "fsLayers": [{"blobSum": "sha256:aa"}, {"blobSum": "sha256:bb"}],
        "history": [
            {"v1Compatibility": "{\"id\":\"img0\",\"parent\":\"img1\",\"Size\":10}"},
            {"v1Compatibility": "{\"id\":\"img1\",\"Size\":20}"}
        ],
        "signatures": []
    }"#;

    #[test]
    fn test_parse_manifest() {
        let manifest = ManifestV1::parse(MANIFEST.as_bytes()).unwrap();
        assert_eq!(manifest.tag, "latest");
        assert_eq!(manifest.fs_layers[1].blob_sum, "sha256:bb");
        assert_eq!(manifest.storage_location(), ("alice", "alice"));

        let image = V1Image::parse(&manifest.history[0].v1_compatibility, 0).unwrap();
        assert_eq!(image.id, "img0");
        assert_eq!(image.parent.as_deref(), Some("img1"));
        assert_eq!(image.size, 10);
    }

    #[test]
    fn test_size_defaults_to_zero() {
        let image = V1Image::parse(r#"{"id":"x"}"#, 3).unwrap();
        assert_eq!(image.size, 0);
    }

    #[test]
    fn test_missing_image_id_is_layer_error() {
        let err = V1Image::parse(r#"{"Size":1}"#, 2).unwrap_err();
        assert!(matches!(err, MigrateError::LayerDecodeFailed { index: 2, .. }));
    }

    #[test]
    fn test_mismatched_lengths_rejected() {
        let data = r#"{"name":"a/b","tag":"t","fsLayers":[],"history":[{"v1Compatibility":"{}"}]}"#;
        assert!(matches!(
            ManifestV1::parse(data.as_bytes()),
            Err(MigrateError::ManifestInvalid(_))
        ));
    }

    #[test]
    fn test_wrong_types_rejected_at_decode() {
        let data = r#"{"name":"a/b","tag":"t","fsLayers":{},"history":[]}"#;
        assert!(matches!(
            ManifestV1::parse(data.as_bytes()),
            Err(MigrateError::ManifestDecodeFailed(_))
        ));
    }

    #[test]
    fn test_single_segment_name() {
        let data = r#"{"name":"busybox","tag":"t","fsLayers":[{"blobSum":"sha256:00"}],"history":[{"v1Compatibility":"{\"id\":\"x\"}"}]}"#;
        let manifest = ManifestV1::parse(data.as_bytes()).unwrap();
        assert_eq!(manifest.storage_location(), ("busybox", "busybox"));
    }
}
