mod schema;
mod sqlite;

pub use sqlite::SqliteStore;

use crate::error::Result;
use crate::types::*;

/// Read side used by authorization. Every lookup returns an owned snapshot.
pub trait AccessStore: Send + Sync {
    fn get_user_by_username(&self, username: &str) -> Result<Option<User>>;
    fn get_organization_by_name(&self, name: &str) -> Result<Option<Organization>>;
    fn get_repository(&self, namespace: &str, name: &str) -> Result<Option<Repository>>;
    fn get_team(&self, id: &str) -> Result<Option<Team>>;
    fn get_privilege(&self, id: &str) -> Result<Option<Privilege>>;
}

/// Image and tag records written by manifest migration.
///
/// Writes are upserts. Errors are returned unchanged to the caller.
pub trait ImageStore: Send + Sync {
    fn put_repository_image(&self, entry: &RepositoryImage) -> Result<()>;
    fn put_tag(
        &self,
        image_id: &str,
        namespace: &str,
        repository: &str,
        tag: &str,
        payload: &str,
    ) -> Result<()>;
    fn put_metadata(&self, image_id: &str, json: &str, version: ApiVersion) -> Result<()>;
    fn put_layer(&self, image_id: &str, layer: &Layer) -> Result<()>;
    fn put_checksum(&self, image_id: &str, checksum: &Checksum) -> Result<()>;
    /// Derives and records the ancestry chain from the image's recorded parent.
    fn put_ancestry(&self, image_id: &str) -> Result<()>;

    fn get_image(&self, id: &str) -> Result<Option<Image>>;
    fn list_tags(&self, namespace: &str, repository: &str) -> Result<Vec<Tag>>;
    fn list_repository_images(
        &self,
        namespace: &str,
        repository: &str,
    ) -> Result<Vec<RepositoryImage>>;
}

/// Store defines the full database interface, including provisioning.
pub trait Store: AccessStore + ImageStore {
    fn initialize(&self) -> Result<()>;

    // User operations
    fn create_user(&self, user: &User) -> Result<()>;

    // Organization operations
    fn create_organization(&self, org: &Organization) -> Result<()>;
    fn add_organization_owner(&self, user_id: &str, organization_id: &str) -> Result<()>;

    // Team operations
    fn create_team(&self, team: &Team) -> Result<()>;
    fn add_team_member(&self, user_id: &str, team_id: &str) -> Result<()>;
    fn add_team_privilege(&self, team_id: &str, privilege_id: &str) -> Result<()>;

    // Repository operations
    fn create_repository(&self, repo: &Repository) -> Result<()>;

    // Privilege operations
    fn create_privilege(&self, privilege: &Privilege) -> Result<()>;
}
