//! MCP server binary for macOS Reminders.
//!
//! Speaks MCP over stdin/stdout. All tracing output goes to stderr (and an
//! optional log file) so that stdout remains a clean protocol channel.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;

use reminders_mcp::backend::connector_for;
use reminders_mcp::{BackendKind, RemindersServer, ServerConfig, StoreAccess, ToolMode};

#[derive(Parser)]
#[command(name = "reminders-mcp")]
#[command(about = "An MCP server for macOS Reminders", version)]
struct Cli {
    /// Project path the client launched us for (logged only)
    project_path: Option<PathBuf>,

    /// Config file (default: <config dir>/reminders-mcp/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Reminder store: "eventkit" or "memory"
    #[arg(long)]
    backend: Option<BackendKind>,

    /// Only expose tools that never modify reminders
    #[arg(long)]
    read_only: bool,

    /// Log filter directive, e.g. "debug" or "reminders_mcp=trace"
    #[arg(long)]
    log_level: Option<String>,
}

impl Cli {
    fn apply(&self, config: &mut ServerConfig) {
        if let Some(backend) = self.backend {
            config.backend = backend;
        }
        if self.read_only {
            config.read_only = true;
        }
        if let Some(level) = &self.log_level {
            config.log_level = level.clone();
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = ServerConfig::load(cli.config.as_deref()).context("loading configuration")?;
    config.apply_env().context("reading environment overrides")?;
    cli.apply(&mut config);
    config.validate()?;

    let _log_guard = reminders_mcp::logging::init(&config.log_level, config.log_file.as_deref())?;

    match &cli.project_path {
        Some(path) => tracing::info!(project_path = %path.display(), "starting reminders-mcp"),
        None => tracing::info!("starting reminders-mcp in current directory"),
    }
    tracing::debug!(?config, "effective configuration");

    let store = Arc::new(StoreAccess::new(
        connector_for(config.backend),
        config.request_timeout(),
    ));

    // Prompt for access now rather than on the first tool call.
    if let Err(e) = store.get_handle().await {
        tracing::error!(code = e.code(), error = %e, "failed to initialize Reminders access");
        tracing::error!(
            "grant Reminders access in System Settings > Privacy & Security > Reminders"
        );
        return Err(anyhow::anyhow!("reminders access unavailable: {e}"));
    }
    tracing::info!("reminders access granted");

    let mode = if config.read_only {
        ToolMode::ReadOnly
    } else {
        ToolMode::Full
    };
    let registry = reminders_mcp::build_registry(store, mode, config.default_limit);
    let server = RemindersServer::new(registry);

    server
        .serve_stdio(shutdown_signal())
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "reminders-mcp exited with error");
            anyhow::anyhow!("reminders-mcp failed: {e}")
        })?;

    tracing::info!("reminders-mcp shut down cleanly");
    Ok(())
}

/// Resolves on Ctrl-C, or SIGTERM on unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}
