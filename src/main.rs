use std::path::PathBuf;
use std::sync::Arc;

use anyhow::bail;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use wharf::cli::{
    AdminCommands, OrgCommands, RepoCommands, TeamCommands, UserCommands, run_grant, run_init,
    run_org_create, run_repo_create, run_team_add_member, run_team_create, run_user_create,
};
use wharf::config::ServerConfig;
use wharf::server::{AppState, create_router};
use wharf::store::SqliteStore;

#[derive(Parser)]
#[command(name = "wharf")]
#[command(about = "A container image registry", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Administrative commands
    Admin {
        #[command(subcommand)]
        command: AdminCommands,
    },

    /// Start the server
    Serve {
        /// TOML config file; flags override its values
        #[arg(long)]
        config: Option<PathBuf>,

        /// Host to bind to
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to
        #[arg(long, short)]
        port: Option<u16>,

        /// Data directory for the database
        #[arg(long)]
        data_dir: Option<PathBuf>,

        /// Base path recorded for layer blobs
        #[arg(long)]
        storage_path: Option<PathBuf>,
    },
}

fn run_admin(command: AdminCommands) -> anyhow::Result<()> {
    match command {
        AdminCommands::Init { data_dir } => run_init(data_dir),
        AdminCommands::User { command } => match command {
            UserCommands::Create {
                data_dir,
                username,
                password,
            } => run_user_create(data_dir, username, password),
        },
        AdminCommands::Org { command } => match command {
            OrgCommands::Create {
                data_dir,
                name,
                owner,
            } => run_org_create(data_dir, name, owner),
        },
        AdminCommands::Team { command } => match command {
            TeamCommands::Create {
                data_dir,
                org,
                name,
            } => run_team_create(data_dir, org, name),
            TeamCommands::AddMember {
                data_dir,
                team_id,
                username,
            } => run_team_add_member(data_dir, team_id, username),
        },
        AdminCommands::Repo { command } => match command {
            RepoCommands::Create {
                data_dir,
                namespace,
                name,
            } => run_repo_create(data_dir, namespace, name),
        },
        AdminCommands::Grant {
            data_dir,
            team_id,
            repository,
            write,
        } => run_grant(data_dir, team_id, repository, write),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("wharf=info".parse()?))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Admin { command } => run_admin(command)?,
        Commands::Serve {
            config,
            host,
            port,
            data_dir,
            storage_path,
        } => {
            let mut config = match config {
                Some(path) => ServerConfig::load(&path)?,
                None => ServerConfig::default(),
            };
            if let Some(host) = host {
                config.host = host;
            }
            if let Some(port) = port {
                config.port = port;
            }
            if let Some(data_dir) = data_dir {
                config.data_dir = data_dir;
            }
            if storage_path.is_some() {
                config.storage_path = storage_path;
            }

            let db_path = config.db_path();
            if !db_path.exists() {
                bail!(
                    "Database not found at {}. Run 'wharf admin init' first.",
                    db_path.display()
                );
            }

            let store = SqliteStore::new(&db_path)?;
            let state = Arc::new(AppState::new(Arc::new(store), &config));

            info!(
                "Recording layers under {}",
                state.migrator.base_path().display()
            );

            let app = create_router(state);
            let addr = config.socket_addr()?;

            info!("Starting server on {}", addr);

            let listener = tokio::net::TcpListener::bind(addr).await?;
            axum::serve(listener, app).await?;
        }
    }

    Ok(())
}
