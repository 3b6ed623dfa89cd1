//! home-server: personal backend
//!
//! Provides:
//! - Access-controlled file storage (`/file`)
//! - Note lookup by display name through root notes (`/find`)
//! - Live status record with WebSocket push (`/status`)
//! - Authorized self-update trigger (`/upgrade`)

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use home_server::config::{DEFAULT_ACCESS_FILE, DEFAULT_MAX_UPLOAD_MB};
use home_server::{AppState, Config, router};

#[derive(Parser, Debug)]
#[command(name = "home-server")]
#[command(about = "Personal backend: files, notes and live status")]
struct Cli {
    /// Port to listen on
    #[arg(long, default_value_t = 4242, env = "HOME_SERVER_PORT")]
    port: u16,

    /// Address to bind to (IPv4 or IPv6, e.g. "::")
    #[arg(long, default_value = "0.0.0.0", env = "HOME_SERVER_BIND")]
    bind: IpAddr,

    /// Storage root for files, notes and the access document
    #[arg(long, default_value = "data", env = "HOME_SERVER_DATA_DIR")]
    data_dir: PathBuf,

    /// Name of the access document inside the data directory
    #[arg(long, default_value = DEFAULT_ACCESS_FILE, env = "HOME_SERVER_ACCESS_FILE")]
    access_file: String,

    /// Shell command run by GET /upgrade
    #[arg(long, env = "HOME_SERVER_UPGRADE_COMMAND")]
    upgrade_command: Option<String>,

    /// Largest accepted upload in megabytes
    #[arg(long, default_value_t = DEFAULT_MAX_UPLOAD_MB, env = "HOME_SERVER_MAX_UPLOAD_MB")]
    max_upload_mb: usize,

    /// Enable verbose logging
    #[arg(long)]
    verbose: bool,
}

impl Cli {
    fn config(&self) -> Config {
        Config {
            data_dir: self.data_dir.clone(),
            access_file: self.access_file.clone(),
            upgrade_command: self.upgrade_command.clone(),
            max_upload_bytes: self.max_upload_mb.saturating_mul(1024 * 1024),
        }
    }

    fn addr(&self) -> SocketAddr {
        SocketAddr::from((self.bind, self.port))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Respects RUST_LOG, defaults to info (or debug with --verbose)
    let default_filter = if cli.verbose {
        "home_server=debug,tower_http=debug"
    } else {
        "home_server=info,tower_http=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = cli.config();
    config.prepare()?;

    let state = Arc::new(AppState::new(config));
    tracing::info!("Generated a key: {}", state.secret);
    tracing::info!("Data directory: {:?}", state.config.data_dir);

    let app = router(state);

    let addr = cli.addr();
    tracing::info!("Starting home-server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("home-server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
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

    tracing::info!("Shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bind_accepts_ipv6() {
        let cli = Cli::try_parse_from(["home-server", "--bind", "::", "--port", "8080"]).unwrap();
        assert_eq!(cli.addr(), "[::]:8080".parse::<SocketAddr>().unwrap());

        let cli = Cli::try_parse_from(["home-server"]).unwrap();
        assert_eq!(cli.addr(), "0.0.0.0:4242".parse::<SocketAddr>().unwrap());
    }

    #[test]
    fn test_bind_rejects_hostnames() {
        assert!(Cli::try_parse_from(["home-server", "--bind", "localhost:80"]).is_err());
    }

    #[test]
    fn test_upload_limit_saturates() {
        let max = usize::MAX.to_string();
        let cli = Cli::try_parse_from(["home-server", "--max-upload-mb", max.as_str()]).unwrap();
        assert_eq!(cli.config().max_upload_bytes, usize::MAX);

        let cli = Cli::try_parse_from(["home-server", "--max-upload-mb", "2"]).unwrap();
        assert_eq!(cli.config().max_upload_bytes, 2 * 1024 * 1024);
    }
}
