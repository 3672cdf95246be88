// src/main.rs
// Quaestio - Catholic theological Q&A over the Magisterium API

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::FmtSubscriber;

use quaestio::{AppState, config::Config, create_router, db, llm::MagisteriumClient};

#[derive(Parser)]
#[command(name = "quaestio")]
#[command(about = "Traditional Catholic wisdom, grounded in the perennial Magisterium")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the web server (default)
    Serve {
        /// Host to bind
        #[arg(long, env = "QUAESTIO_HOST")]
        host: Option<String>,

        /// Port to listen on
        #[arg(short, long, env = "QUAESTIO_PORT")]
        port: Option<u16>,

        /// SQLite database url
        #[arg(long, env = "DATABASE_URL")]
        database: Option<String>,
    },

    /// Apply database migrations and exit
    Migrate {
        /// SQLite database url
        #[arg(long, env = "DATABASE_URL")]
        database: Option<String>,
    },
}

async fn run_server(config: Config) -> Result<()> {
    info!("Connecting to database: {}", config.database_url);
    let pool = db::create_pool(&config.database_url).await?;
    db::run_migrations(&pool).await?;

    if config.site_password.is_none() {
        warn!("SITE_PASSWORD is not set; logins will fail until it is configured");
    }
    if config.magisterium_api_key.is_none() {
        warn!("MAGISTERIUM_API_KEY is not set; chat requests will fail");
    }

    let provider = Arc::new(MagisteriumClient::from_config(&config)?);
    info!("Model: {} at {}", config.magisterium_model, config.magisterium_base_url);

    let addr = config.bind_address();
    let state = AppState::new(config, pool, provider);
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Quaestio running on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn run_migrate(config: Config) -> Result<()> {
    let pool = db::create_pool(&config.database_url).await?;
    db::run_migrations(&pool).await?;
    println!("Migrations applied to {}", config.database_url);
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> Result<()> {
    let mut config = Config::from_env();
    let cli = Cli::parse();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(config.tracing_level())
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Some(Commands::Serve { host, port, database }) => {
            if let Some(host) = host {
                config.host = host;
            }
            if let Some(port) = port {
                config.port = port;
            }
            if let Some(database) = database {
                config.database_url = database;
            }
            run_server(config).await
        }
        None => run_server(config).await,
        Some(Commands::Migrate { database }) => {
            if let Some(database) = database {
                config.database_url = database;
            }
            run_migrate(config).await
        }
    }
}
