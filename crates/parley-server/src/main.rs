//! Parley control-plane server: session creation, agent dispatch, and the
//! send-text-to-room endpoint.

use parley_server::config::load_config;
use parley_server::startup::{init_tracing, resolve_config_path, shutdown_signal};
use parley_server::{app, AppState};
use parley_voice::VoiceService;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() {
    let (config_path, config_source) = resolve_config_path();

    let config = load_config(Some(&config_path))
        .expect("failed to load configuration: the server cannot start without valid config");

    init_tracing(&config.logging);

    tracing::info!(
        source = config_source,
        path = %config_path,
        "resolved startup configuration path"
    );

    if let Err(e) = config.validate_for_api() {
        tracing::error!("{}", e);
        std::process::exit(1);
    }

    let voice_service = VoiceService::new(config.livekit.clone(), config.agent.name.clone());
    tracing::info!(
        agent = voice_service.agent_name(),
        livekit = %config.livekit.url,
        "livekit control plane configured"
    );

    let state = AppState {
        gateway: Arc::new(voice_service),
        presence: config.presence(),
        max_text_length: config.speech.max_text_length,
    };

    let addr = SocketAddr::new(config.server.host, config.server.port);
    tracing::info!(%addr, "starting parley server");

    let listener = TcpListener::bind(addr)
        .await
        .expect("failed to bind to address: is another process using this port?");

    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");

    tracing::info!("parley server shut down");
}
