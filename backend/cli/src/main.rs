mod repl;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;

use emberchat_config::{load_and_prepare, resolve_config_path, Settings};
use emberchat_engine::{TurnController, TurnOptions};
use emberchat_gateway::{start_server, AppState};
use emberchat_provider::OllamaBackend;
use emberchat_store::SqliteStore;

#[derive(Parser)]
#[command(name = "emberchat")]
#[command(about = "EmberChat — local LLM chat over Ollama")]
#[command(version)]
struct Cli {
    /// Path to the config file (defaults to ./config.yaml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Chat with the model in an interactive terminal session
    Chat,
    /// Start the EmberChat gateway server
    Serve {
        /// Port to bind the HTTP server to
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Show gateway status
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Invalid settings are fatal; everything downstream assumes a validated
    // config.
    let config_path = resolve_config_path(cli.config);
    let settings = load_and_prepare(&config_path).await?;

    logging::init_logger(&settings.log_dir, &settings.log_level);

    match cli.command {
        Commands::Chat => repl::run(&settings).await,
        Commands::Serve { port } => {
            let settings = Settings {
                port: port.unwrap_or(settings.port),
                ..settings
            };
            run_server(settings).await
        }
        Commands::Status => status(&settings).await,
    }
}

async fn run_server(settings: Settings) -> Result<()> {
    info!(
        port = settings.port,
        bind = %settings.bind_address,
        db = %settings.db_path,
        model = %settings.model_name,
        "Starting EmberChat gateway"
    );

    let backend = Arc::new(OllamaBackend::new().with_base_url(&settings.base_url));
    let store = Arc::new(SqliteStore::open(&settings.db_path)?);
    let controller = Arc::new(TurnController::new(
        backend,
        store.clone(),
        TurnOptions::from(&settings),
    ));

    let state = AppState::new(controller, store);
    let addr: SocketAddr = format!("{}:{}", settings.bind_address, settings.port).parse()?;

    start_server(addr, state).await
}

async fn status(settings: &Settings) -> Result<()> {
    println!("EmberChat status: checking...");
    let client = reqwest::Client::new();
    match client
        .get(format!("http://localhost:{}/api/health", settings.port))
        .send()
        .await
    {
        Ok(resp) => {
            let body: serde_json::Value = resp.json().await?;
            println!("{}", serde_json::to_string_pretty(&body)?);
        }
        Err(_) => {
            println!(
                "EmberChat gateway is not running on port {}",
                settings.port
            );
        }
    }

    Ok(())
}
