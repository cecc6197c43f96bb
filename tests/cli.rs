//! CLI integration tests for wharf admin commands.
//!
//! Each test uses an isolated temp directory for the database, ensuring tests
//! can run in parallel safely.

#![allow(deprecated)] // Command::cargo_bin deprecation only affects custom build dirs

use std::path::Path;

use assert_cmd::Command;
use assert_fs::TempDir;
use predicates::prelude::*;
use wharf::auth::{Decision, Denial, Grant, check_request, encode_basic_auth};
use wharf::store::{AccessStore, SqliteStore};

struct TestContext {
    temp_dir: TempDir,
}

impl TestContext {
    fn new() -> Self {
        Self {
            temp_dir: TempDir::new().expect("failed to create temp dir"),
        }
    }

    fn data_dir(&self) -> &Path {
        self.temp_dir.path()
    }

    fn data_dir_str(&self) -> String {
        self.data_dir().to_string_lossy().to_string()
    }

    fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("wharf").expect("failed to find binary");
        cmd.env("NO_COLOR", "1");
        cmd
    }

    fn admin(&self, args: &[&str]) -> assert_cmd::assert::Assert {
        let data_dir = self.data_dir_str();
        let mut full = vec!["admin"];
        full.extend_from_slice(args);
        full.extend_from_slice(&["--data-dir", data_dir.as_str()]);
        self.cmd().args(&full).assert()
    }

    fn init(&self) -> assert_cmd::assert::Assert {
        self.admin(&["init"])
    }

    fn store(&self) -> SqliteStore {
        SqliteStore::new(self.data_dir().join("wharf.db")).expect("open store")
    }

    /// Runs a command whose last output line ends with `(<id>)` and returns the id.
    fn created_id(&self, args: &[&str]) -> String {
        let output = self.admin(args).success().get_output().stdout.clone();
        let stdout = String::from_utf8(output).expect("utf8 output");
        let line = stdout.lines().last().expect("output line");
        let start = line.rfind('(').expect("id in output") + 1;
        line[start..line.len() - 1].to_string()
    }
}

#[test]
fn test_init_creates_database() {
    let ctx = TestContext::new();

    ctx.init()
        .success()
        .stdout(predicate::str::contains("Initialized database"));
    assert!(ctx.data_dir().join("wharf.db").exists());

    ctx.init()
        .success()
        .stdout(predicate::str::contains("already initialized"));
}

#[test]
fn test_commands_require_init() {
    let ctx = TestContext::new();

    ctx.admin(&["user", "create", "alice", "--password", "pw"])
        .failure()
        .stderr(predicate::str::contains("wharf admin init"));
}

#[test]
fn test_user_create() {
    let ctx = TestContext::new();
    ctx.init().success();

    ctx.admin(&["user", "create", "alice", "--password", "s3cret"])
        .success()
        .stdout(predicate::str::contains("Created user 'alice'"));

    let user = ctx.store().get_user_by_username("alice").unwrap().unwrap();
    assert_ne!(user.password_hash, "s3cret");
    assert!(user.password_hash.starts_with("$argon2id$"));

    ctx.admin(&["user", "create", "alice", "--password", "other"])
        .failure()
        .stderr(predicate::str::contains("already exists"));
}

#[test]
fn test_org_create_requires_owner() {
    let ctx = TestContext::new();
    ctx.init().success();

    ctx.admin(&["org", "create", "acme", "--owner", "nobody"])
        .failure()
        .stderr(predicate::str::contains("User not found"));

    ctx.admin(&["user", "create", "carol", "--password", "pw"])
        .success();
    ctx.admin(&["org", "create", "acme", "--owner", "carol"])
        .success()
        .stdout(predicate::str::contains("owned by carol"));

    let store = ctx.store();
    let org = store.get_organization_by_name("acme").unwrap().unwrap();
    let carol = store.get_user_by_username("carol").unwrap().unwrap();
    assert!(carol.owns(&org.id));
}

#[test]
fn test_grant_flow_authorizes_team_member() {
    let ctx = TestContext::new();
    ctx.init().success();

    ctx.admin(&["user", "create", "carol", "--password", "pw"])
        .success();
    ctx.admin(&["user", "create", "erin", "--password", "pw"])
        .success();
    ctx.admin(&["org", "create", "acme", "--owner", "carol"])
        .success();
    ctx.admin(&["repo", "create", "acme", "web"]).success();

    let team_id = ctx.created_id(&["team", "create", "acme", "readers"]);
    ctx.admin(&["team", "add-member", &team_id, "erin"])
        .success();
    ctx.admin(&["grant", &team_id, "acme/web"])
        .success()
        .stdout(predicate::str::contains("pull access to acme/web"));

    let store = ctx.store();
    let header = encode_basic_auth("erin", "pw");

    let pull = check_request(&store, "GET", "/v2/acme/web/tags/list", Some(&header));
    assert!(matches!(
        pull,
        Some(Decision::Allow(Grant::TeamPrivilege { .. }))
    ));

    let push = check_request(&store, "PUT", "/v2/acme/web/manifests/v1", Some(&header));
    assert_eq!(push, Some(Decision::Deny(Denial::PrivilegeMismatch)));
}

#[test]
fn test_grant_rejects_bad_repository() {
    let ctx = TestContext::new();
    ctx.init().success();

    ctx.admin(&["grant", "team-1", "no-slash"])
        .failure()
        .stderr(predicate::str::contains("<namespace>/<name>"));

    ctx.admin(&["grant", "team-1", "acme/web"])
        .failure()
        .stderr(predicate::str::contains("Team not found"));
}

#[test]
fn test_serve_requires_init() {
    let ctx = TestContext::new();

    ctx.cmd()
        .args(["serve", "--data-dir", &ctx.data_dir_str()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("wharf admin init"));
}
