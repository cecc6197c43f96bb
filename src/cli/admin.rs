use std::fs;

use anyhow::{anyhow, bail};
use chrono::Utc;
use uuid::Uuid;

use crate::auth::PasswordHasher;
use crate::error::Error;
use crate::store::{AccessStore, SqliteStore, Store};
use crate::types::{Organization, Privilege, Repository, Team, User};

use super::{db_path, init_store};

pub fn run_init(data_dir: String) -> anyhow::Result<()> {
    fs::create_dir_all(&data_dir)?;

    let db_path = db_path(&data_dir);
    let existed = db_path.exists();

    let store = SqliteStore::new(&db_path)?;
    store.initialize()?;

    if existed {
        println!("Database already initialized at {}", db_path.display());
    } else {
        println!("Initialized database at {}", db_path.display());
    }

    Ok(())
}

pub fn run_user_create(data_dir: String, username: String, password: String) -> anyhow::Result<()> {
    if username.trim().is_empty() || username.contains(char::is_whitespace) {
        bail!("Username cannot be empty or contain whitespace");
    }
    if password.is_empty() {
        bail!("Password cannot be empty");
    }

    let store = init_store(&data_dir)?;
    let password_hash = PasswordHasher::new().hash(&password)?;

    let now = Utc::now();
    let user = User {
        id: Uuid::new_v4().to_string(),
        username: username.clone(),
        password_hash,
        organizations: Vec::new(),
        teams: Vec::new(),
        created_at: now,
        updated_at: now,
    };

    match store.create_user(&user) {
        Ok(()) => {}
        Err(Error::AlreadyExists) => bail!("User '{username}' already exists"),
        Err(e) => return Err(e.into()),
    }

    println!("Created user '{}' ({})", username, user.id);
    Ok(())
}

pub fn run_org_create(data_dir: String, name: String, owner: String) -> anyhow::Result<()> {
    let store = init_store(&data_dir)?;

    let user = store
        .get_user_by_username(&owner)?
        .ok_or_else(|| anyhow!("User not found: {owner}"))?;

    let org = Organization {
        id: Uuid::new_v4().to_string(),
        name: name.clone(),
        created_at: Utc::now(),
    };

    match store.create_organization(&org) {
        Ok(()) => {}
        Err(Error::AlreadyExists) => bail!("Organization '{name}' already exists"),
        Err(e) => return Err(e.into()),
    }
    store.add_organization_owner(&user.id, &org.id)?;

    println!("Created organization '{}' ({}) owned by {}", name, org.id, owner);
    Ok(())
}

pub fn run_team_create(data_dir: String, org: String, name: String) -> anyhow::Result<()> {
    let store = init_store(&data_dir)?;

    let organization = store
        .get_organization_by_name(&org)?
        .ok_or_else(|| anyhow!("Organization not found: {org}"))?;

    let team = Team {
        id: Uuid::new_v4().to_string(),
        organization_id: organization.id,
        name: name.clone(),
        privileges: Vec::new(),
        created_at: Utc::now(),
    };
    store.create_team(&team)?;

    println!("Created team '{}' in {} ({})", name, org, team.id);
    Ok(())
}

pub fn run_team_add_member(data_dir: String, team_id: String, username: String) -> anyhow::Result<()> {
    let store = init_store(&data_dir)?;

    let user = store
        .get_user_by_username(&username)?
        .ok_or_else(|| anyhow!("User not found: {username}"))?;

    match store.add_team_member(&user.id, &team_id) {
        Ok(()) => {}
        Err(Error::NotFound) => bail!("Team not found: {team_id}"),
        Err(Error::AlreadyExists) => bail!("User '{username}' is already a member of {team_id}"),
        Err(e) => return Err(e.into()),
    }

    println!("Added {username} to team {team_id}");
    Ok(())
}

pub fn run_repo_create(data_dir: String, namespace: String, name: String) -> anyhow::Result<()> {
    let store = init_store(&data_dir)?;

    let repo = Repository {
        id: Uuid::new_v4().to_string(),
        namespace: namespace.clone(),
        name: name.clone(),
        created_at: Utc::now(),
    };

    match store.create_repository(&repo) {
        Ok(()) => {}
        Err(Error::AlreadyExists) => bail!("Repository {namespace}/{name} already exists"),
        Err(e) => return Err(e.into()),
    }

    println!("Created repository {}/{} ({})", namespace, name, repo.id);
    Ok(())
}

pub fn run_grant(
    data_dir: String,
    team_id: String,
    repository: String,
    write: bool,
) -> anyhow::Result<()> {
    let Some((namespace, name)) = repository.split_once('/') else {
        bail!("Repository must be given as <namespace>/<name>");
    };

    let store = init_store(&data_dir)?;

    let team = store
        .get_team(&team_id)?
        .ok_or_else(|| anyhow!("Team not found: {team_id}"))?;
    let repo = store
        .get_repository(namespace, name)?
        .ok_or_else(|| anyhow!("Repository not found: {repository}"))?;

    let privilege = Privilege {
        id: Uuid::new_v4().to_string(),
        repository_id: repo.id,
        write,
        created_at: Utc::now(),
    };
    store.create_privilege(&privilege)?;
    store.add_team_privilege(&team.id, &privilege.id)?;

    let access = if write { "push" } else { "pull" };
    println!(
        "Granted team {} {} access to {} ({})",
        team.name, access, repository, privilege.id
    );
    Ok(())
}
