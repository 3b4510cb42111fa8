use anyhow::Context;
use auvlog::{
    config::get_config,
    functions,
    models::NewRun,
    producer::{ApiClient, TelemetryClient},
    schema, Database, Gateway,
};
use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tracing::info;

#[derive(Parser)]
#[command(name = "auvlog")]
#[command(about = "Run-scoped telemetry store for the AUV")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the telemetry tables and indexes
    Initdb {
        /// Drop existing tables first, discarding all data
        #[arg(long)]
        drop_first: bool,
    },

    /// Check database connectivity
    Status,

    /// Serve the HTTP API
    #[command(alias = "dbonly")]
    Serve {
        /// Address to bind (overrides server.host)
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on (overrides server.port)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Create a run through a running API
    CreateRun {
        name: String,

        #[arg(long, default_value = "hardware")]
        platform: String,

        #[arg(long)]
        vehicle: Option<String>,

        #[arg(long)]
        operator: Option<String>,

        #[arg(long)]
        notes: Option<String>,

        /// Configuration blob stored verbatim with the run
        #[arg(long)]
        config_json: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive("auvlog=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    let config = get_config()?;

    match cli.command {
        Commands::Initdb { drop_first } => {
            let db = Database::connect(&config.database)
                .await
                .context("failed to connect to database")?;
            if drop_first {
                info!("dropping existing tables");
                schema::drop_all(&db).await?;
            }
            schema::apply(&db).await?;
            println!("Database initialized successfully.");
        }
        Commands::Status => {
            println!("Checking database connectivity...");
            let reachable = match Database::connect(&config.database).await {
                Ok(db) => db.ping().await,
                Err(_) => false,
            };
            if reachable {
                println!("Database connection: OK");
            } else {
                println!("Database connection: FAILED");
                std::process::exit(1);
            }
        }
        Commands::Serve { host, port } => {
            let host = host.unwrap_or(config.server.host);
            let port = port.unwrap_or(config.server.port);

            let db = Database::connect(&config.database)
                .await
                .context("failed to connect to database")?;
            schema::apply(&db).await?;

            let app = functions::router(Gateway::new(db));
            let listener = TcpListener::bind((host.as_str(), port)).await?;
            info!(addr = %listener.local_addr()?, "serving telemetry API");

            axum::serve(listener, app)
                .with_graceful_shutdown(shutdown_signal())
                .await?;
        }
        Commands::CreateRun {
            name,
            platform,
            vehicle,
            operator,
            notes,
            config_json,
        } => {
            let run = NewRun {
                name,
                platform,
                vehicle,
                operator,
                notes,
                config_json,
            };
            let client = ApiClient::new(&config.producer)?;
            let id = client.create_run(&run).await?;
            println!("Run created successfully: {id}");
        }
    }

    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("shutting down");
    }
}
