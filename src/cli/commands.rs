use clap::Subcommand;

#[derive(Subcommand)]
pub enum AdminCommands {
    /// Initialize the server database
    Init {
        /// Data directory for the database
        #[arg(long, default_value = "./data")]
        data_dir: String,
    },

    /// Manage users
    User {
        #[command(subcommand)]
        command: UserCommands,
    },

    /// Manage organizations
    Org {
        #[command(subcommand)]
        command: OrgCommands,
    },

    /// Manage teams
    Team {
        #[command(subcommand)]
        command: TeamCommands,
    },

    /// Manage repositories
    Repo {
        #[command(subcommand)]
        command: RepoCommands,
    },

    /// Give a team pull (or push, with --write) access to a repository
    Grant {
        /// Data directory for the database
        #[arg(long, default_value = "./data")]
        data_dir: String,

        /// Team receiving the privilege
        team_id: String,

        /// Repository as <namespace>/<name>
        repository: String,

        /// Grant push instead of pull
        #[arg(long)]
        write: bool,
    },
}

#[derive(Subcommand)]
pub enum UserCommands {
    /// Create a user with a password
    Create {
        /// Data directory for the database
        #[arg(long, default_value = "./data")]
        data_dir: String,

        username: String,

        #[arg(long)]
        password: String,
    },
}

#[derive(Subcommand)]
pub enum OrgCommands {
    /// Create an organization owned by an existing user
    Create {
        /// Data directory for the database
        #[arg(long, default_value = "./data")]
        data_dir: String,

        name: String,

        /// Username of the owner
        #[arg(long)]
        owner: String,
    },
}

#[derive(Subcommand)]
pub enum TeamCommands {
    /// Create a team inside an organization
    Create {
        /// Data directory for the database
        #[arg(long, default_value = "./data")]
        data_dir: String,

        /// Organization name
        org: String,

        name: String,
    },

    /// Add a user to a team
    AddMember {
        /// Data directory for the database
        #[arg(long, default_value = "./data")]
        data_dir: String,

        team_id: String,

        username: String,
    },
}

#[derive(Subcommand)]
pub enum RepoCommands {
    /// Register a repository
    Create {
        /// Data directory for the database
        #[arg(long, default_value = "./data")]
        data_dir: String,

        namespace: String,

        name: String,
    },
}
