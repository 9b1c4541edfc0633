use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Result;
use audit_service::AuditServiceBuilder;
use clap::Parser;
use tracing::info;

mod openapi;
mod routes;

use crate::routes::{AppState, router};

#[derive(Debug, Parser)]
#[command(name = "audit-api")]
#[command(about = "Audit trail ingestion and analytics API")]
struct Cli {
    #[arg(long, env = "AUDIT_LISTEN", default_value = "127.0.0.1:3000")]
    listen: SocketAddr,
    /// Maximum number of events retained; older events are evicted first.
    #[arg(long, env = "AUDIT_CAPACITY", default_value_t = 1000)]
    capacity: usize,
    /// Persist events to this JSON file. In-memory only when unset.
    #[arg(long, env = "AUDIT_LOG_FILE")]
    log_file: Option<PathBuf>,
    #[arg(long = "top-pages", env = "AUDIT_TOP_PAGES", default_value_t = 10)]
    top_pages: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .json()
        .init();

    let cli = Cli::parse();
    let service = AuditServiceBuilder::new()
        .capacity(cli.capacity)
        .maybe_log_file(cli.log_file.clone())
        .top_pages_limit(cli.top_pages)
        .build()
        .await?;

    let app = router(AppState { service });

    let listener = tokio::net::TcpListener::bind(cli.listen).await?;
    info!(
        listen = %cli.listen,
        capacity = cli.capacity,
        log_file = ?cli.log_file,
        "audit-api listening"
    );

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(error) = tokio::signal::ctrl_c().await {
            tracing::error!(%error, "failed to install Ctrl+C handler");
        }
    };

    #[cfg(unix)]
    {
        let terminate = async {
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(mut signal) => {
                    signal.recv().await;
                }
                Err(error) => {
                    tracing::error!(%error, "failed to install SIGTERM handler");
                }
            }
        };

        tokio::select! {
            _ = ctrl_c => {},
            _ = terminate => {},
        }
    }

    #[cfg(not(unix))]
    {
        ctrl_c.await;
    }
}
