use std::path::PathBuf;

use clap::Parser;
use clap::Subcommand;
use ragchat::config::AppConfig;
use ragchat::logging;
use ragchat::Result;
use tracing::info;

#[derive(Parser)]
#[command(name = "ragchat")]
#[command(about = "Retrieval-augmented chat server backed by a knowledge base")]
#[command(version)]
struct Cli {
    /// Enable verbose debug logging
    #[arg(short, long)]
    verbose: bool,

    /// Path to the configuration file (defaults to config.toml, then config.example.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the chat API server
    Serve {
        /// Host to bind to
        #[arg(long)]
        host: Option<String>,
        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,
        /// Enable CORS for all origins
        #[arg(long)]
        cors: bool,
        /// Directory of static frontend assets
        #[arg(long)]
        assets_dir: Option<String>,
    },
    /// Show the effective configuration with API tokens masked
    Config,
}

fn load_config(path: Option<&PathBuf>) -> Result<AppConfig> {
    let config = match path {
        Some(path) => AppConfig::from_file(path)?,
        None => AppConfig::load()?,
    };
    let config = config.with_env_overrides();
    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = load_config(cli.config.as_ref())?;

    match cli.command {
        Commands::Config => {
            print!("{}", config.to_masked_toml()?);
            Ok(())
        }
        Commands::Serve {
            host,
            port,
            cors,
            assets_dir,
        } => {
            let _guard = if cli.verbose {
                logging::init_logging_with_level("debug", &config.logging.directory)?
            } else {
                logging::init_logging_with_config(&config.logging)?
            };

            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            config.server.enable_cors |= cors;
            if assets_dir.is_some() {
                config.server.assets_dir = assets_dir;
            }

            info!("--- Core Configuration ---");
            info!("Knowledge Base: {}", config.rag_name());
            info!("Max Results: {}", config.retrieval.max_num_results);
            info!("Score Threshold: {}", config.retrieval.score_threshold);
            info!("Rewrite Query: {}", config.retrieval.rewrite_query);
            info!("Model: {}", config.model());
            info!("Max Tokens: {}", config.max_tokens());
            info!("-------------------------");

            ragchat::api::serve_api(&config).await
        }
    }
}
