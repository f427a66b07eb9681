//! Parley agent: registers as a LiveKit agent worker, joins each room it is
//! dispatched into, binds the avatar, and speaks text arriving over the
//! room's data channel or the local `/speak` fallback.

use parley_server::agent::{agent_app, SpeakTarget};
use parley_server::config::load_config;
use parley_server::rtc::run_worker;
use parley_server::startup::{init_tracing, resolve_config_path, shutdown_signal};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;

#[tokio::main]
async fn main() {
    let (config_path, config_source) = resolve_config_path();

    let config = load_config(Some(&config_path))
        .expect("failed to load configuration: the agent cannot start without valid config");

    init_tracing(&config.logging);

    tracing::info!(
        source = config_source,
        path = %config_path,
        "resolved startup configuration path"
    );

    if let Err(e) = config.validate_for_agent() {
        tracing::error!("{}", e);
        std::process::exit(1);
    }

    let config = Arc::new(config);
    let target = SpeakTarget::new();

    let addr = SocketAddr::new(config.agent.http_host, config.agent.http_port);
    tracing::info!(%addr, "starting agent speak fallback");

    let listener = TcpListener::bind(addr)
        .await
        .expect("failed to bind to address: is another process using this port?");

    let (stop_tx, mut stop_rx) = watch::channel(false);
    let server = tokio::spawn(
        axum::serve(listener, agent_app(target.clone())).with_graceful_shutdown(async move {
            let _ = stop_rx.wait_for(|stopped| *stopped).await;
        }),
    );

    let outcome = run_worker(Arc::clone(&config), target, shutdown_signal()).await;

    let _ = stop_tx.send(true);
    match server.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::error!("speak fallback error: {}", e),
        Err(e) => tracing::error!("speak fallback task failed: {}", e),
    }

    if let Err(e) = outcome {
        tracing::error!("agent worker stopped: {}", e);
        std::process::exit(1);
    }
    tracing::info!("parley agent shut down");
}
