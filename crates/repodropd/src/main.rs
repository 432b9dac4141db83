//! `repodropd` entry point.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, Level};

use repodrop_core::{init_tracing, FilterPolicy, IntakeConfig, LogFormat, RepoIntake};
use repodrop_state::{MongoConfig, MongoHandle, DEFAULT_MONGODB_URI};
use repodropd::{build_router, spawn_reaper, AppState, ServiceSettings};

#[derive(Parser)]
#[command(name = "repodropd")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Repository archive intake service", long_about = None)]
struct Cli {
    /// Address to bind
    #[arg(long, env = "REPODROP_HOST", default_value = "0.0.0.0")]
    host: String,

    /// Port to bind
    #[arg(long, env = "REPODROP_PORT", default_value_t = 5000)]
    port: u16,

    /// Root directory for per-user uploads
    #[arg(long, env = "REPODROP_UPLOAD_DIR", default_value = "uploads")]
    upload_dir: PathBuf,

    /// Directory served under /static
    #[arg(long, env = "REPODROP_STATIC_DIR", default_value = "static")]
    static_dir: PathBuf,

    /// Directory holding the HTML pages
    #[arg(long, env = "REPODROP_TEMPLATE_DIR", default_value = "templates")]
    template_dir: PathBuf,

    /// MongoDB connection string
    #[arg(long, env = "MONGODB_URI", default_value = DEFAULT_MONGODB_URI)]
    mongodb_uri: String,

    /// Seconds between reaper passes
    #[arg(long, env = "REPODROP_REAPER_INTERVAL_SECS", default_value_t = 600)]
    reaper_interval_secs: u64,

    /// Version-control executable used for submodule updates
    #[arg(long, env = "REPODROP_GIT", default_value = "git")]
    git: PathBuf,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let format = if cli.json {
        LogFormat::Json
    } else {
        LogFormat::from_env()
    };
    init_tracing(format, level);

    let handle = MongoHandle::connect(&MongoConfig::new(&cli.mongodb_uri))
        .await
        .context("Failed to connect to MongoDB")?;
    let handle = Arc::new(handle);
    info!(database = %handle.database_name(), "connected to MongoDB");

    tokio::fs::create_dir_all(&cli.upload_dir)
        .await
        .with_context(|| format!("Failed to create {}", cli.upload_dir.display()))?;

    let mut intake_config = IntakeConfig::default();
    intake_config.submodule.program = cli.git.clone();

    let settings = ServiceSettings {
        upload_dir: cli.upload_dir.clone(),
        static_dir: cli.static_dir.clone(),
        template_dir: cli.template_dir.clone(),
        reaper_interval: Duration::from_secs(cli.reaper_interval_secs),
        ..ServiceSettings::default()
    };

    let state = AppState::new(
        handle.clone(),
        handle.clone(),
        RepoIntake::new(intake_config),
        FilterPolicy::default(),
        settings,
    );

    spawn_reaper(
        handle.clone(),
        state.sessions.clone(),
        cli.upload_dir.clone(),
        state.settings.reaper_interval,
    );

    let addr: SocketAddr = format!("{}:{}", cli.host, cli.port)
        .parse()
        .with_context(|| format!("Invalid bind address {}:{}", cli.host, cli.port))?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!(%addr, "repodropd listening");

    axum::serve(
        listener,
        build_router(state).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .context("Server error")?;

    Ok(())
}
