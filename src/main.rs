mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use fairway::config::Config;

#[derive(Parser)]
#[command(
    name = "fairway",
    version,
    about = "Tee-time availability aggregator across golf-course booking systems",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// TOML config file; environment variables override its values
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log format (text, json); overrides the config file
    #[arg(long, global = true)]
    log_format: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API and warm-up scheduler (default)
    Serve,

    /// Resolve one course and print its tee times
    Fetch {
        /// Course id from the registry
        course_id: String,

        /// Date (YYYY-MM-DD), defaults to today
        #[arg(short, long)]
        date: Option<String>,

        /// Bypass the cache
        #[arg(long, default_value = "false")]
        refresh: bool,
    },

    /// Run one cache warm-up over every course and exit
    Warm,

    /// List registered courses
    Courses {
        /// Only courses in this city
        #[arg(long)]
        city: Option<String>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e:#}");
            return ExitCode::FAILURE;
        }
    };

    let format = cli
        .log_format
        .clone()
        .unwrap_or_else(|| config.logging.format.clone());
    setup_tracing(&format, &config.logging.level, cli.verbose);

    match run(cli.command.unwrap_or(Commands::Serve), config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fairway failed: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Commands, config: Config) -> Result<()> {
    match command {
        Commands::Serve => {
            tracing::info!(address = %config.server.bind_address(), "Starting fairway server");
            commands::serve(config).await
        }
        Commands::Fetch {
            course_id,
            date,
            refresh,
        } => commands::fetch(config, course_id, date, refresh).await,
        Commands::Warm => commands::warm(config).await,
        Commands::Courses { city } => commands::courses(config, city).await,
    }
}

fn load_config(path: Option<&std::path::Path>) -> Result<Config> {
    let config = Config::load(path)?;
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

fn setup_tracing(format: &str, level: &str, verbose: bool) {
    let env_filter = if verbose {
        tracing_subscriber::EnvFilter::new("fairway=debug,info")
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(format!("fairway={level},warn")))
    };

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
}
