use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::net::IpAddr;
use std::path::PathBuf;
use tagbox_config::AppConfig;
use tagbox_core::UserCreate;
use tagbox_web::{start_server, AppState};
use tracing::info;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

/// Log level options for CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Off => LevelFilter::OFF,
            LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Trace => LevelFilter::TRACE,
        }
    }
}

#[derive(Parser)]
#[command(name = "tagbox")]
#[command(about = "tagbox - tagged elements over a JSON API")]
#[command(version)]
struct Cli {
    /// Subcommand to execute (defaults to serve)
    #[command(subcommand)]
    command: Option<Commands>,

    /// Set log level; RUST_LOG takes precedence when set
    #[arg(short = 'l', long, global = true, value_enum)]
    log_level: Option<LogLevel>,

    /// Enable verbose logging (shortcut for --log-level=debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file path (defaults to ~/.config/tagbox/config.toml)
    #[arg(short = 'C', long, global = true)]
    config: Option<PathBuf>,

    /// SQLite database path (overrides config file)
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    /// Listen address (overrides config file)
    #[arg(long, global = true)]
    host: Option<IpAddr>,

    /// Listen port (overrides config file)
    #[arg(short, long, global = true)]
    port: Option<u16>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API
    Serve,
    /// Create a user with the admin flag set
    CreateAdmin {
        #[arg(long)]
        username: String,
        #[arg(long)]
        password: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::load(cli.config.as_deref()).context("Failed to load config")?;
    if let Some(path) = cli.database {
        config.database.path = path;
    }
    if let Some(host) = cli.host {
        config.server.host = host;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }

    init_tracing(cli_level(cli.log_level, cli.verbose), &config);

    let state = AppState::from_config(&config)?;

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => start_server(&config, state).await?,
        Commands::CreateAdmin { username, password } => {
            let user = state
                .service
                .create_admin(UserCreate { username, password })
                .await
                .context("Failed to create admin")?;
            info!(user = %user.id, "admin created");
            println!("Created admin '{}' with id {}", user.username, user.id);
        }
    }

    Ok(())
}

fn cli_level(level: Option<LogLevel>, verbose: bool) -> Option<LevelFilter> {
    match (level, verbose) {
        (Some(level), _) => Some(level.into()),
        (None, true) => Some(LevelFilter::DEBUG),
        (None, false) => None,
    }
}

/// `RUST_LOG` wins, then the CLI flags, then `[logging] level`
fn init_tracing(cli: Option<LevelFilter>, config: &AppConfig) {
    let filter = match (std::env::var("RUST_LOG"), cli) {
        (Ok(directives), _) => EnvFilter::new(directives),
        (Err(_), Some(level)) => EnvFilter::new(level.to_string()),
        (Err(_), None) => EnvFilter::new(&config.logging.level),
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
