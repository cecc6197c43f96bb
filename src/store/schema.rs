pub const SCHEMA: &str = r#"
-- Users authenticate with a username and an argon2id-hashed secret
CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY,
    username TEXT NOT NULL UNIQUE,
    password_hash TEXT NOT NULL,
    created_at TEXT DEFAULT (datetime('now')),
    updated_at TEXT DEFAULT (datetime('now'))
);

-- Organizations are namespaces that are not a user's own
CREATE TABLE IF NOT EXISTS organizations (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL UNIQUE,
    created_at TEXT DEFAULT (datetime('now'))
);

-- Owners of an organization, ordered per user
CREATE TABLE IF NOT EXISTS user_organizations (
    user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    organization_id TEXT NOT NULL REFERENCES organizations(id) ON DELETE CASCADE,
    position INTEGER NOT NULL,
    PRIMARY KEY (user_id, organization_id)
);

CREATE TABLE IF NOT EXISTS teams (
    id TEXT PRIMARY KEY,
    organization_id TEXT NOT NULL REFERENCES organizations(id) ON DELETE CASCADE,
    name TEXT NOT NULL,
    created_at TEXT DEFAULT (datetime('now')),

    UNIQUE(organization_id, name)
);

-- Team membership, ordered per user; this order drives privilege scans
CREATE TABLE IF NOT EXISTS user_teams (
    user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    team_id TEXT NOT NULL REFERENCES teams(id) ON DELETE CASCADE,
    position INTEGER NOT NULL,
    PRIMARY KEY (user_id, team_id)
);

-- Repositories
CREATE TABLE IF NOT EXISTS repositories (
    id TEXT PRIMARY KEY,
    namespace TEXT NOT NULL,
    name TEXT NOT NULL,
    created_at TEXT DEFAULT (datetime('now')),

    UNIQUE(namespace, name)
);

-- A privilege grants push (write = 1) or pull (write = 0) on one repository
CREATE TABLE IF NOT EXISTS privileges (
    id TEXT PRIMARY KEY,
    repository_id TEXT NOT NULL REFERENCES repositories(id) ON DELETE CASCADE,
    write INTEGER NOT NULL DEFAULT 0,
    created_at TEXT DEFAULT (datetime('now'))
);

-- Ordered privilege list of a team
CREATE TABLE IF NOT EXISTS team_privileges (
    team_id TEXT NOT NULL REFERENCES teams(id) ON DELETE CASCADE,
    privilege_id TEXT NOT NULL REFERENCES privileges(id) ON DELETE CASCADE,
    position INTEGER NOT NULL,
    PRIMARY KEY (team_id, privilege_id)
);

-- Images are content-derived and never updated in place by migration
CREATE TABLE IF NOT EXISTS images (
    id TEXT PRIMARY KEY,
    json TEXT NOT NULL,
    api_version TEXT NOT NULL,
    parent TEXT,
    ancestry TEXT,                 -- JSON array, self first
    layer_path TEXT,
    layer_external INTEGER,
    layer_size INTEGER,
    checksum_algorithm TEXT,
    checksum_value TEXT,
    checksum_verified INTEGER,
    checksum_payload TEXT,
    created_at TEXT DEFAULT (datetime('now'))
);

-- Legacy repository JSON: which images a repository references
CREATE TABLE IF NOT EXISTS repository_images (
    namespace TEXT NOT NULL,
    repository TEXT NOT NULL,
    image_id TEXT NOT NULL,
    tag TEXT,
    created_at TEXT DEFAULT (datetime('now')),
    PRIMARY KEY (namespace, repository, image_id)
);

CREATE TABLE IF NOT EXISTS tags (
    namespace TEXT NOT NULL,
    repository TEXT NOT NULL,
    name TEXT NOT NULL,
    image_id TEXT NOT NULL,
    payload TEXT NOT NULL,
    updated_at TEXT DEFAULT (datetime('now')),
    PRIMARY KEY (namespace, repository, name)
);

-- Create indexes
CREATE INDEX IF NOT EXISTS idx_user_teams_user ON user_teams(user_id, position);
CREATE INDEX IF NOT EXISTS idx_user_organizations_user ON user_organizations(user_id, position);
CREATE INDEX IF NOT EXISTS idx_team_privileges_team ON team_privileges(team_id, position);
CREATE INDEX IF NOT EXISTS idx_privileges_repository ON privileges(repository_id);
CREATE INDEX IF NOT EXISTS idx_tags_image ON tags(image_id);
"#;
