use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use secrecy::SecretString;
use sked_engine::TaskService;
use sked_server::ServerConfig;
use sked_store::{Database, TaskRepo};
use sked_telemetry::{LogFormat, TelemetryConfig};

/// Task scheduler HTTP server.
#[derive(Debug, Parser)]
#[command(name = "sked", version)]
struct Cli {
    /// SQLite database file, created on first start.
    #[arg(long, env = "TODO_DBFILE", default_value = "scheduler.db")]
    db_file: PathBuf,

    #[arg(long, env = "TODO_PORT", default_value_t = 7540)]
    port: u16,

    /// Sign-in password. Leave unset to disable authentication.
    #[arg(long, env = "TODO_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Directory with the static front-end.
    #[arg(long, env = "TODO_WEBDIR", default_value = "web")]
    web_dir: PathBuf,

    #[arg(long, env = "TODO_LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Per-module level override, `target=level`. Repeatable.
    #[arg(long = "log-module", env = "TODO_LOG_MODULES", value_delimiter = ',')]
    log_modules: Vec<String>,

    /// Emit logs as JSON lines.
    #[arg(long)]
    log_json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let module_levels = cli
        .log_modules
        .iter()
        .map(|raw| sked_telemetry::parse_module_level(raw))
        .collect::<Result<Vec<_>, _>>()?;
    let telemetry = TelemetryConfig {
        log_level: sked_telemetry::parse_level(&cli.log_level)?,
        module_levels,
        format: if cli.log_json { LogFormat::Json } else { LogFormat::Pretty },
    };
    sked_telemetry::init_telemetry(&telemetry)?;

    let db = Database::open(&cli.db_file)
        .with_context(|| format!("failed to open database {}", cli.db_file.display()))?;

    let service = Arc::new(TaskService::new(Arc::new(TaskRepo::new(db.clone()))));
    let config = ServerConfig {
        port: cli.port,
        web_dir: cli.web_dir,
        password: cli.password.map(SecretString::from),
        ..Default::default()
    };
    let handle = sked_server::start(config, service)
        .await
        .with_context(|| format!("failed to bind port {}", cli.port))?;

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for ctrl+c")?;
    tracing::info!("shutting down");

    handle.shutdown().await;
    db.close()?;
    Ok(())
}
