mod admin;
mod commands;

pub use admin::{
    run_grant, run_init, run_org_create, run_repo_create, run_team_add_member, run_team_create,
    run_user_create,
};
pub use commands::{AdminCommands, OrgCommands, RepoCommands, TeamCommands, UserCommands};

use std::path::PathBuf;

use crate::config::ServerConfig;
use crate::store::SqliteStore;

/// Database location for a data directory, as the server resolves it.
fn db_path(data_dir: &str) -> PathBuf {
    ServerConfig {
        data_dir: data_dir.into(),
        ..ServerConfig::default()
    }
    .db_path()
}

/// Initialize store from data directory, checking it exists
pub fn init_store(data_dir: &str) -> anyhow::Result<SqliteStore> {
    let db_path = db_path(data_dir);

    if !db_path.exists() {
        anyhow::bail!(
            "Database not found at {}. Run 'wharf admin init' first.",
            db_path.display()
        );
    }

    SqliteStore::new(&db_path).map_err(Into::into)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_db_path_matches_server() {
        let config = ServerConfig {
            data_dir: PathBuf::from("/var/lib/wharf"),
            ..ServerConfig::default()
        };
        assert_eq!(db_path("/var/lib/wharf"), config.db_path());
    }

    #[test]
    fn test_init_store_requires_database() {
        let temp = tempfile::TempDir::new().unwrap();
        match init_store(&temp.path().to_string_lossy()) {
            Ok(_) => panic!("store opened without a database"),
            Err(e) => assert!(e.to_string().contains("wharf admin init")),
        }
    }
}
