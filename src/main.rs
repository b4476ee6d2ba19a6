use std::fs;
use std::sync::Arc;

use anyhow::bail;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use atelier::config::ServerConfig;
use atelier::server::{AppState, create_router};
use atelier::store::{SqliteStore, Store};
use atelier::uploads::UploadStore;

#[derive(Parser)]
#[command(name = "atelier")]
#[command(about = "A single-user CRM for freelance work", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the database and upload directory
    Init {
        /// Data directory for database and uploaded files
        #[arg(long, default_value = "./data")]
        data_dir: String,
    },

    /// Start the server
    Serve {
        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port to bind to
        #[arg(long, short, default_value = "8080")]
        port: u16,

        /// Data directory for database and uploaded files
        #[arg(long, default_value = "./data")]
        data_dir: String,
    },
}

fn run_init(data_dir: String) -> anyhow::Result<()> {
    let config = ServerConfig {
        data_dir: data_dir.into(),
        ..ServerConfig::default()
    };

    fs::create_dir_all(&config.data_dir)?;
    fs::create_dir_all(config.upload_dir())?;

    let store = SqliteStore::new(config.db_path())?;
    store.initialize()?;

    println!("Initialized database at {}", config.db_path().display());
    println!("Uploads will be stored in {}", config.upload_dir().display());
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("atelier=info".parse()?))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init { data_dir } => {
            run_init(data_dir)?;
        }
        Commands::Serve {
            host,
            port,
            data_dir,
        } => {
            let config = ServerConfig {
                host,
                port,
                data_dir: data_dir.into(),
            };

            if !config.db_path().exists() {
                bail!(
                    "Database not found at {}. Run 'atelier init' first.",
                    config.db_path().display()
                );
            }

            let store = SqliteStore::new(config.db_path())?;
            // Applies any tables added since the database was created
            store.initialize()?;

            let uploads = UploadStore::new(config.upload_dir());
            uploads.ensure_dir().await?;

            let state = Arc::new(AppState {
                store: Arc::new(store),
                uploads,
            });

            let app = create_router(state);
            let addr = config.socket_addr()?;

            info!("Starting server on {}", addr);

            let listener = tokio::net::TcpListener::bind(addr).await?;
            axum::serve(listener, app).await?;
        }
    }

    Ok(())
}
