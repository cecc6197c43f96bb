use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params};

use super::schema::SCHEMA;
use super::{AccessStore, ImageStore, Store};
use crate::error::{Error, Result};
use crate::types::*;

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = Connection::open(db_path)?;

        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.pragma_update(None, "journal_mode", "WAL")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            // Handle SQLite's default datetime format: "YYYY-MM-DD HH:MM:SS"
            chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            tracing::error!("Invalid datetime in database: '{}' - {}", s, e);
            Utc::now()
        })
}

fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

/// Maps constraint failures on insert: a dangling reference is `NotFound`,
/// a duplicate key is `AlreadyExists`.
fn map_insert_error(e: rusqlite::Error) -> Error {
    match e {
        rusqlite::Error::SqliteFailure(err, _)
            if err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY =>
        {
            Error::NotFound
        }
        rusqlite::Error::SqliteFailure(err, _)
            if err.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            Error::AlreadyExists
        }
        e => Error::from(e),
    }
}

fn ordered_ids(conn: &Connection, sql: &str, owner_id: &str) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(params![owner_id], |row| row.get(0))?;

    rows.collect::<std::result::Result<Vec<_>, _>>()
        .map_err(Error::from)
}

fn parent_of(json: &str) -> Result<Option<String>> {
    let value: serde_json::Value = serde_json::from_str(json)?;
    Ok(value
        .get("parent")
        .and_then(|p| p.as_str())
        .filter(|p| !p.is_empty())
        .map(str::to_string))
}

struct ImageRow {
    id: String,
    json: String,
    api_version: String,
    parent: Option<String>,
    ancestry: Option<String>,
    layer_path: Option<String>,
    layer_external: Option<bool>,
    layer_size: Option<i64>,
    checksum_algorithm: Option<String>,
    checksum_value: Option<String>,
    checksum_verified: Option<bool>,
    checksum_payload: Option<String>,
    created_at: String,
}

impl ImageRow {
    fn into_image(self) -> Result<Image> {
        let api_version = ApiVersion::parse(&self.api_version).ok_or_else(|| {
            Error::Config(format!(
                "image {} has unknown api version '{}'",
                self.id, self.api_version
            ))
        })?;

        let ancestry = match self.ancestry {
            Some(raw) => serde_json::from_str(&raw)?,
            None => Vec::new(),
        };

        let layer = self.layer_path.map(|path| Layer {
            path,
            external: self.layer_external.unwrap_or(false),
            size: self.layer_size.unwrap_or(0),
        });

        let checksum = self.checksum_value.map(|value| Checksum {
            algorithm: self.checksum_algorithm.unwrap_or_default(),
            value,
            verified: self.checksum_verified.unwrap_or(false),
            payload: self.checksum_payload,
        });

        Ok(Image {
            id: self.id,
            json: self.json,
            api_version,
            parent: self.parent,
            ancestry,
            layer,
            checksum,
            created_at: parse_datetime(&self.created_at),
        })
    }
}

impl AccessStore for SqliteStore {
    fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let conn = self.conn();
        let row = conn
            .query_row(
                "SELECT id, username, password_hash, created_at, updated_at
                 FROM users WHERE username = ?1",
                params![username],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, String>(4)?,
                    ))
                },
            )
            .optional()?;

        let Some((id, username, password_hash, created_at, updated_at)) = row else {
            return Ok(None);
        };

        let organizations = ordered_ids(
            &conn,
            "SELECT organization_id FROM user_organizations WHERE user_id = ?1 ORDER BY position",
            &id,
        )?;
        let teams = ordered_ids(
            &conn,
            "SELECT team_id FROM user_teams WHERE user_id = ?1 ORDER BY position",
            &id,
        )?;

        Ok(Some(User {
            id,
            username,
            password_hash,
            organizations,
            teams,
            created_at: parse_datetime(&created_at),
            updated_at: parse_datetime(&updated_at),
        }))
    }

    fn get_organization_by_name(&self, name: &str) -> Result<Option<Organization>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, name, created_at FROM organizations WHERE name = ?1",
            params![name],
            |row| {
                Ok(Organization {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    created_at: parse_datetime(&row.get::<_, String>(2)?),
                })
            },
        )
        .optional()
        .map_err(Error::from)
    }

    fn get_repository(&self, namespace: &str, name: &str) -> Result<Option<Repository>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, namespace, name, created_at
             FROM repositories WHERE namespace = ?1 AND name = ?2",
            params![namespace, name],
            |row| {
                Ok(Repository {
                    id: row.get(0)?,
                    namespace: row.get(1)?,
                    name: row.get(2)?,
                    created_at: parse_datetime(&row.get::<_, String>(3)?),
                })
            },
        )
        .optional()
        .map_err(Error::from)
    }

    fn get_team(&self, id: &str) -> Result<Option<Team>> {
        let conn = self.conn();
        let team = conn
            .query_row(
                "SELECT id, organization_id, name, created_at FROM teams WHERE id = ?1",
                params![id],
                |row| {
                    Ok(Team {
                        id: row.get(0)?,
                        organization_id: row.get(1)?,
                        name: row.get(2)?,
                        privileges: Vec::new(),
                        created_at: parse_datetime(&row.get::<_, String>(3)?),
                    })
                },
            )
            .optional()?;

        let Some(mut team) = team else {
            return Ok(None);
        };

        team.privileges = ordered_ids(
            &conn,
            "SELECT privilege_id FROM team_privileges WHERE team_id = ?1 ORDER BY position",
            &team.id,
        )?;

        Ok(Some(team))
    }

    fn get_privilege(&self, id: &str) -> Result<Option<Privilege>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, repository_id, write, created_at FROM privileges WHERE id = ?1",
            params![id],
            |row| {
                Ok(Privilege {
                    id: row.get(0)?,
                    repository_id: row.get(1)?,
                    write: row.get(2)?,
                    created_at: parse_datetime(&row.get::<_, String>(3)?),
                })
            },
        )
        .optional()
        .map_err(Error::from)
    }
}

impl ImageStore for SqliteStore {
    fn put_repository_image(&self, entry: &RepositoryImage) -> Result<()> {
        self.conn().execute(
            "INSERT INTO repository_images (namespace, repository, image_id, tag, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(namespace, repository, image_id)
             DO UPDATE SET tag = COALESCE(excluded.tag, repository_images.tag)",
            params![
                entry.namespace,
                entry.repository,
                entry.image_id,
                entry.tag,
                format_datetime(&Utc::now()),
            ],
        )?;
        Ok(())
    }

    fn put_tag(
        &self,
        image_id: &str,
        namespace: &str,
        repository: &str,
        tag: &str,
        payload: &str,
    ) -> Result<()> {
        self.conn().execute(
            "INSERT INTO tags (namespace, repository, name, image_id, payload, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(namespace, repository, name)
             DO UPDATE SET image_id = excluded.image_id, payload = excluded.payload,
                           updated_at = excluded.updated_at",
            params![
                namespace,
                repository,
                tag,
                image_id,
                payload,
                format_datetime(&Utc::now()),
            ],
        )?;
        Ok(())
    }

    fn put_metadata(&self, image_id: &str, json: &str, version: ApiVersion) -> Result<()> {
        let parent = parent_of(json)?;

        // The parent is fixed by the first write; later writes only refresh the payload.
        self.conn().execute(
            "INSERT INTO images (id, json, api_version, parent, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(id)
             DO UPDATE SET json = excluded.json, api_version = excluded.api_version",
            params![
                image_id,
                json,
                version.as_str(),
                parent,
                format_datetime(&Utc::now()),
            ],
        )?;
        Ok(())
    }

    fn put_layer(&self, image_id: &str, layer: &Layer) -> Result<()> {
        let rows = self.conn().execute(
            "UPDATE images SET layer_path = ?1, layer_external = ?2, layer_size = ?3 WHERE id = ?4",
            params![layer.path, layer.external, layer.size, image_id],
        )?;

        if rows == 0 {
            return Err(Error::ImageUnknown(image_id.to_string()));
        }
        Ok(())
    }

    fn put_checksum(&self, image_id: &str, checksum: &Checksum) -> Result<()> {
        let rows = self.conn().execute(
            "UPDATE images SET checksum_algorithm = ?1, checksum_value = ?2,
                               checksum_verified = ?3, checksum_payload = ?4
             WHERE id = ?5",
            params![
                checksum.algorithm,
                checksum.value,
                checksum.verified,
                checksum.payload,
                image_id,
            ],
        )?;

        if rows == 0 {
            return Err(Error::ImageUnknown(image_id.to_string()));
        }
        Ok(())
    }

    fn put_ancestry(&self, image_id: &str) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        let parent: Option<String> = tx
            .query_row(
                "SELECT parent FROM images WHERE id = ?1",
                params![image_id],
                |row| row.get(0),
            )
            .optional()?
            .ok_or_else(|| Error::ImageUnknown(image_id.to_string()))?;

        let mut ancestry = vec![image_id.to_string()];

        if let Some(parent) = parent {
            let parent_ancestry: Option<String> = tx
                .query_row(
                    "SELECT ancestry FROM images WHERE id = ?1",
                    params![parent],
                    |row| row.get(0),
                )
                .optional()?
                .ok_or_else(|| Error::ParentImageUnknown(parent.clone()))?;

            let chain: Vec<String> = match parent_ancestry {
                Some(raw) => serde_json::from_str(&raw)?,
                None => vec![parent],
            };

            if chain.iter().any(|id| id == image_id) {
                return Err(Error::AncestryCycle(image_id.to_string()));
            }

            ancestry.extend(chain);
        }

        tx.execute(
            "UPDATE images SET ancestry = ?1 WHERE id = ?2",
            params![serde_json::to_string(&ancestry)?, image_id],
        )?;
        tx.commit()?;
        Ok(())
    }

    fn get_image(&self, id: &str) -> Result<Option<Image>> {
        let conn = self.conn();
        let row = conn
            .query_row(
                "SELECT id, json, api_version, parent, ancestry,
                        layer_path, layer_external, layer_size,
                        checksum_algorithm, checksum_value, checksum_verified, checksum_payload,
                        created_at
                 FROM images WHERE id = ?1",
                params![id],
                |row| {
                    Ok(ImageRow {
                        id: row.get(0)?,
                        json: row.get(1)?,
                        api_version: row.get(2)?,
                        parent: row.get(3)?,
                        ancestry: row.get(4)?,
                        layer_path: row.get(5)?,
                        layer_external: row.get(6)?,
                        layer_size: row.get(7)?,
                        checksum_algorithm: row.get(8)?,
                        checksum_value: row.get(9)?,
                        checksum_verified: row.get(10)?,
                        checksum_payload: row.get(11)?,
                        created_at: row.get(12)?,
                    })
                },
            )
            .optional()?;

        row.map(ImageRow::into_image).transpose()
    }

    fn list_tags(&self, namespace: &str, repository: &str) -> Result<Vec<Tag>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT namespace, repository, name, image_id, payload, updated_at
             FROM tags WHERE namespace = ?1 AND repository = ?2 ORDER BY name",
        )?;

        let rows = stmt.query_map(params![namespace, repository], |row| {
            Ok(Tag {
                namespace: row.get(0)?,
                repository: row.get(1)?,
                name: row.get(2)?,
                image_id: row.get(3)?,
                payload: row.get(4)?,
                updated_at: parse_datetime(&row.get::<_, String>(5)?),
            })
        })?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn list_repository_images(
        &self,
        namespace: &str,
        repository: &str,
    ) -> Result<Vec<RepositoryImage>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT namespace, repository, image_id, tag
             FROM repository_images WHERE namespace = ?1 AND repository = ?2 ORDER BY rowid",
        )?;

        let rows = stmt.query_map(params![namespace, repository], |row| {
            Ok(RepositoryImage {
                namespace: row.get(0)?,
                repository: row.get(1)?,
                image_id: row.get(2)?,
                tag: row.get(3)?,
            })
        })?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }
}

impl Store for SqliteStore {
    fn initialize(&self) -> Result<()> {
        self.conn().execute_batch(SCHEMA)?;
        Ok(())
    }

    // User operations

    fn create_user(&self, user: &User) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        tx.execute(
            "INSERT INTO users (id, username, password_hash, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                user.id,
                user.username,
                user.password_hash,
                format_datetime(&user.created_at),
                format_datetime(&user.updated_at),
            ],
        )
        .map_err(map_insert_error)?;

        for (position, organization_id) in user.organizations.iter().enumerate() {
            tx.execute(
                "INSERT INTO user_organizations (user_id, organization_id, position)
                 VALUES (?1, ?2, ?3)",
                params![user.id, organization_id, position as i64],
            )
            .map_err(map_insert_error)?;
        }

        for (position, team_id) in user.teams.iter().enumerate() {
            tx.execute(
                "INSERT INTO user_teams (user_id, team_id, position) VALUES (?1, ?2, ?3)",
                params![user.id, team_id, position as i64],
            )
            .map_err(map_insert_error)?;
        }

        tx.commit()?;
        Ok(())
    }

    // Organization operations

    fn create_organization(&self, org: &Organization) -> Result<()> {
        self.conn()
            .execute(
                "INSERT INTO organizations (id, name, created_at) VALUES (?1, ?2, ?3)",
                params![org.id, org.name, format_datetime(&org.created_at)],
            )
            .map_err(map_insert_error)?;
        Ok(())
    }

    fn add_organization_owner(&self, user_id: &str, organization_id: &str) -> Result<()> {
        self.conn()
            .execute(
                "INSERT INTO user_organizations (user_id, organization_id, position)
                 VALUES (?1, ?2,
                     (SELECT COALESCE(MAX(position) + 1, 0) FROM user_organizations WHERE user_id = ?1))",
                params![user_id, organization_id],
            )
            .map_err(map_insert_error)?;
        Ok(())
    }

    // Team operations

    fn create_team(&self, team: &Team) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        tx.execute(
            "INSERT INTO teams (id, organization_id, name, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![
                team.id,
                team.organization_id,
                team.name,
                format_datetime(&team.created_at),
            ],
        )
        .map_err(map_insert_error)?;

        for (position, privilege_id) in team.privileges.iter().enumerate() {
            tx.execute(
                "INSERT INTO team_privileges (team_id, privilege_id, position) VALUES (?1, ?2, ?3)",
                params![team.id, privilege_id, position as i64],
            )
            .map_err(map_insert_error)?;
        }

        tx.commit()?;
        Ok(())
    }

    fn add_team_member(&self, user_id: &str, team_id: &str) -> Result<()> {
        self.conn()
            .execute(
                "INSERT INTO user_teams (user_id, team_id, position)
                 VALUES (?1, ?2,
                     (SELECT COALESCE(MAX(position) + 1, 0) FROM user_teams WHERE user_id = ?1))",
                params![user_id, team_id],
            )
            .map_err(map_insert_error)?;
        Ok(())
    }

    fn add_team_privilege(&self, team_id: &str, privilege_id: &str) -> Result<()> {
        self.conn()
            .execute(
                "INSERT INTO team_privileges (team_id, privilege_id, position)
                 VALUES (?1, ?2,
                     (SELECT COALESCE(MAX(position) + 1, 0) FROM team_privileges WHERE team_id = ?1))",
                params![team_id, privilege_id],
            )
            .map_err(map_insert_error)?;
        Ok(())
    }

    // Repository operations

    fn create_repository(&self, repo: &Repository) -> Result<()> {
        self.conn()
            .execute(
                "INSERT INTO repositories (id, namespace, name, created_at) VALUES (?1, ?2, ?3, ?4)",
                params![
                    repo.id,
                    repo.namespace,
                    repo.name,
                    format_datetime(&repo.created_at),
                ],
            )
            .map_err(map_insert_error)?;
        Ok(())
    }

    // Privilege operations

    fn create_privilege(&self, privilege: &Privilege) -> Result<()> {
        self.conn()
            .execute(
                "INSERT INTO privileges (id, repository_id, write, created_at) VALUES (?1, ?2, ?3, ?4)",
                params![
                    privilege.id,
                    privilege.repository_id,
                    privilege.write,
                    format_datetime(&privilege.created_at),
                ],
            )
            .map_err(map_insert_error)?;
        Ok(())
    }
}
