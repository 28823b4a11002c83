//! # keyward
//!
//! License validation server binary — opens the record store, runs
//! migrations, and serves the WebSocket protocol plus the control plane.

#![deny(unsafe_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use keyward_server::config::ServerConfig;
use keyward_server::server::KeywardServer;
use keyward_store::{ConnectionConfig, LicenseStore, new_file, run_migrations};
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

/// License validation server.
#[derive(Parser, Debug)]
#[command(name = "keyward", about = "License validation server")]
struct Cli {
    /// Host to bind.
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// Port to bind (0 for auto-assign).
    #[arg(long, default_value = "8080")]
    port: u16,

    /// Path to the `SQLite` database.
    #[arg(long)]
    db_path: Option<PathBuf>,

    /// Interval between liveness probes, in milliseconds.
    #[arg(long)]
    heartbeat_interval_ms: Option<u64>,

    /// Enable verbose debug logging.
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn default_db_path() -> PathBuf {
        let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
        PathBuf::from(home).join(".keyward").join("keyward.db")
    }
}

fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory: {}", parent.display()))?;
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let log_level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .compact()
        .init();

    let db_path = cli.db_path.unwrap_or_else(Cli::default_db_path);
    ensure_parent_dir(&db_path)?;
    let pool = new_file(
        db_path.to_str().context("database path is not valid UTF-8")?,
        &ConnectionConfig::default(),
    )?;
    {
        let conn = pool.get()?;
        let applied = run_migrations(&conn)?;
        info!(applied, db = %db_path.display(), "record store ready");
    }
    let store = Arc::new(LicenseStore::new(pool));

    let mut config = ServerConfig {
        host: cli.host,
        port: cli.port,
        ..ServerConfig::default()
    };
    if let Some(interval) = cli.heartbeat_interval_ms {
        config.heartbeat_interval_ms = interval;
    }

    let server = KeywardServer::new(config.clone(), store);
    let router = server.router();
    let shutdown = server.shutdown().clone();

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(addr = %listener.local_addr()?, "keyward listening");

    let signal_shutdown = shutdown.clone();
    let _ = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown signal received");
            signal_shutdown.shutdown();
        }
    });

    let token = shutdown.token();
    axum::serve(listener, router)
        .with_graceful_shutdown(async move { token.cancelled().await })
        .await
        .context("server failed")?;

    info!("keyward stopped");
    Ok(())
}
