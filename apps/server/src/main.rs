//! # Strand Server
//!
//! ## Usage
//! ```bash
//! strand-server                          # config from STRAND_CONFIG or platform dir
//! strand-server --config ./server.toml
//! RUST_LOG=debug strand-server
//! ```

use std::path::PathBuf;

use anyhow::Context;
use strand_db::Database;
use strand_server::{router, AppState, Notifier, ServerConfig, TracingSink};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,strand=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();

    info!("Starting Strand server...");

    let config = ServerConfig::load(config_path_arg()).context("loading configuration")?;
    let addr = config.server.socket_addr()?;
    info!(
        %addr,
        database = %config.database.path.display(),
        notifications = config.notifications.enabled,
        "Configuration loaded"
    );

    if let Some(parent) = config.database.path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating data directory {}", parent.display()))?;
        }
    }

    let db = Database::new(config.database.db_config())
        .await
        .context("opening database")?;
    info!("Database ready, migrations applied");

    let (notifier, worker) = if config.notifications.enabled {
        let (notifier, worker) = Notifier::spawn(TracingSink, config.notifications.queue_capacity);
        (notifier, Some(worker))
    } else {
        (Notifier::disabled(), None)
    };

    let state = AppState::new(db.clone(), &config, notifier);
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {}", addr))?;
    info!(%addr, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving HTTP")?;

    // The router (and every Notifier clone) is gone; let queued confirmations drain
    if let Some(worker) = worker {
        worker.await.ok();
    }
    db.close().await;

    info!("Server shutdown complete");
    Ok(())
}

/// `--config <path>` / `-c <path>` from the command line.
fn config_path_arg() -> Option<PathBuf> {
    let args: Vec<String> = std::env::args().collect();
    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" | "-c" => return args.get(i + 1).map(PathBuf::from),
            _ => {}
        }
        i += 1;
    }
    None
}

/// Graceful shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
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
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, starting graceful shutdown...");
}
