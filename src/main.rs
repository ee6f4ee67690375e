use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(
    name = "docs-hub",
    version,
    about = "Aggregates OpenAPI/Swagger documents from backend services",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log format (text, json); defaults to the config file's `logging.format`
    #[arg(long, global = true, env = "DOCS_HUB_LOG_FORMAT")]
    log_format: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the documentation hub HTTP server
    Serve {
        /// Config file path (defaults to $CONFIG_PATH, then configs/dev.yaml)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Override the bind host
        #[arg(long)]
        host: Option<String>,

        /// Override the listen port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Validate a config file and list its services
    Check {
        /// Config file path
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Run one refresh cycle against the configured backends and print the result
    Refresh {
        /// Config file path
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Refresh only this service
        #[arg(short, long)]
        service: Option<String>,
    },
}

impl Commands {
    fn config_path(&self) -> Option<&Path> {
        match self {
            Self::Serve { config, .. } | Self::Check { config } | Self::Refresh { config, .. } => {
                config.as_deref()
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let logging = commands::logging_settings(cli.command.config_path());
    let format = cli.log_format.as_deref().unwrap_or(&logging.format);
    setup_tracing(format, &logging.level, cli.verbose)?;

    match cli.command {
        Commands::Serve { config, host, port } => {
            tracing::info!(config = ?config, host = ?host, port = ?port, "Starting serve command");
            commands::serve(config, host, port).await?;
        }

        Commands::Check { config } => {
            tracing::debug!(config = ?config, "Starting check command");
            commands::check(config)?;
        }

        Commands::Refresh { config, service } => {
            tracing::debug!(config = ?config, service = ?service, "Starting refresh command");
            commands::refresh(config, service).await?;
        }
    }

    Ok(())
}

fn setup_tracing(format: &str, level: &str, verbose: bool) -> Result<()> {
    // RUST_LOG wins over both the verbosity flag and the configured level
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            tracing_subscriber::EnvFilter::new("docs_hub=debug,tower_http=debug,info")
        } else {
            tracing_subscriber::EnvFilter::try_new(format!("docs_hub={level},tower_http={level},warn"))
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("docs_hub=info,warn"))
        }
    });

    match format {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
    }

    Ok(())
}
