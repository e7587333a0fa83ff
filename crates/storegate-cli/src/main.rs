//! Storegate CLI - run and inspect the edge authorization gateway.

mod commands;
mod ui;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use storegate_core::SurfaceKind;
use storegate_core::config::LogFormat;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser)]
#[command(name = "storegate")]
#[command(about = "Storegate - edge authorization gateway")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (defaults to ~/.storegate/storegate.json)
    #[arg(long, global = true, env = "STOREGATE_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP host behind the gateway
    Serve {
        /// Surface to protect: admin or storefront
        #[arg(long)]
        surface: Option<SurfaceKind>,

        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,

        /// Bind address (local, public, or IP)
        #[arg(long)]
        bind: Option<String>,
    },

    /// Show the policy tier for a path
    Classify {
        /// Request path, e.g. /api/reports/orders
        path: String,

        /// Surface preset to classify against
        #[arg(long)]
        surface: Option<SurfaceKind>,
    },

    /// Verify a bearer token and show the resolved identity
    Inspect {
        /// Encoded token
        token: String,

        /// Surface whose configuration applies
        #[arg(long)]
        surface: Option<SurfaceKind>,
    },

    /// Check whether a local gateway is running
    Status {
        /// Port to probe (defaults to the configured port)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Configuration inspection
    Config {
        #[command(subcommand)]
        action: Option<ConfigCommands>,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show effective configuration (secrets redacted)
    Show,

    /// Validate the configuration file
    Validate,

    /// Print the config file path
    Path,
}

fn init_logging(verbose: bool, format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        }
    });

    let json = format == LogFormat::Json;
    tracing_subscriber::registry()
        .with(filter)
        .with(json.then(|| fmt::layer().json()))
        .with((!json).then(|| fmt::layer().with_target(false)))
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(storegate_core::Config::default_path);

    // Logging comes up before any command; a broken file is reported by the command itself.
    let settings = commands::read_config(&config_path)
        .map(|c| c.settings)
        .unwrap_or_default();
    init_logging(cli.verbose || settings.debug, settings.log_format);

    match cli.command {
        Commands::Serve {
            surface,
            port,
            bind,
        } => {
            let args = commands::serve::ServeArgs {
                config_path,
                surface,
                port,
                bind,
            };
            commands::run_serve(args).await?;
        }

        Commands::Classify { path, surface } => {
            let args = commands::classify::ClassifyArgs {
                config_path,
                path,
                surface,
            };
            commands::run_classify(&args)?;
        }

        Commands::Inspect { token, surface } => {
            let args = commands::inspect::InspectArgs {
                config_path,
                token,
                surface,
            };
            commands::run_inspect(&args)?;
        }

        Commands::Status { port } => {
            let args = commands::status::StatusArgs { config_path, port };
            commands::run_status(args).await?;
        }

        Commands::Config { action } => {
            let action = match action {
                Some(ConfigCommands::Show) | None => commands::config::ConfigAction::Show,
                Some(ConfigCommands::Validate) => commands::config::ConfigAction::Validate,
                Some(ConfigCommands::Path) => commands::config::ConfigAction::Path,
            };
            let args = commands::config::ConfigArgs {
                config_path,
                action,
            };
            commands::run_config(&args)?;
        }
    }

    Ok(())
}
