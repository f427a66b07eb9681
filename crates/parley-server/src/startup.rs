//! Process bootstrap shared by the `parley-server` and `parley-agent` binaries.

use crate::config::LoggingConfig;
use tracing_subscriber::EnvFilter;

/// Picks the config file path: first CLI argument, then `PARLEY_CONFIG_PATH`,
/// then `config.toml`. Also returns where the path came from.
pub fn resolve_config_path() -> (String, &'static str) {
    if let Some(path) = std::env::args()
        .nth(1)
        .filter(|value| !value.trim().is_empty())
    {
        return (path, "cli-arg");
    }

    if let Ok(path) = std::env::var("PARLEY_CONFIG_PATH") {
        if !path.trim().is_empty() {
            return (path, "env-var");
        }
    }

    ("config.toml".to_string(), "default")
}

/// Installs the global tracing subscriber.
pub fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_new(&logging.level).unwrap_or_else(|_| EnvFilter::new("info"));

    if logging.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

/// Waits for a SIGINT (Ctrl+C) or SIGTERM signal for graceful shutdown.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to install Ctrl+C handler: {}", e);
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
                tracing::error!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => { tracing::info!("received SIGINT, initiating graceful shutdown"); }
        () = terminate => { tracing::info!("received SIGTERM, initiating graceful shutdown"); }
    }
}
