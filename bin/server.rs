// Audit Reports - Web Server
// REST API with Axum over the aggregation engine

use anyhow::{Context, Result};
use audit_reports::api::{router, AppState};
use audit_reports::config::DEFAULT_CONFIG_FILE;
use audit_reports::ReportsConfig;
use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Serve audit reports over HTTP
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct ServerArgs {
    /// Path to configuration file (defaults to ./audit-reports.toml if present)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// SQLite database file, overrides the config file
    #[arg(long, env = "AUDIT_REPORTS_DB", value_name = "FILE")]
    db: Option<PathBuf>,

    /// Listen address, overrides the config file
    #[arg(long, env = "AUDIT_REPORTS_BIND", value_name = "ADDR")]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = ServerArgs::parse();

    let mut config = match &args.config {
        Some(path) => ReportsConfig::load(path)?,
        None => ReportsConfig::load_or_default(std::path::Path::new(DEFAULT_CONFIG_FILE))?,
    };
    if let Some(db) = args.db {
        config.database.path = db;
    }
    if let Some(bind) = args.bind {
        config.server.bind_addr = bind;
    }

    if !config.database.path.exists() {
        anyhow::bail!(
            "Database not found at {} (run `audit-reports init` and import records first)",
            config.database.path.display()
        );
    }
    info!(path = %config.database.path.display(), "using database");

    let app = router(AppState::new(&config));

    let listener = tokio::net::TcpListener::bind(&config.server.bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.server.bind_addr))?;

    info!(
        addr = %config.server.bind_addr,
        timeout_secs = config.server.request_timeout_secs,
        "🚀 server running, API under /api"
    );

    axum::serve(listener, app)
        .await
        .context("Server terminated unexpectedly")?;

    Ok(())
}
