//! Server entry point

use std::net::SocketAddr;
use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

use omniline_config::{load_settings, ObservabilityConfig};
use omniline_dialogue::ScriptedEngine;
use omniline_persistence::MemoryStore;
use omniline_pipeline::{NoopStt, SpeechSynthesizer, UnavailableTts};
use omniline_server::{create_router, AppState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let env = std::env::var("OMNILINE_ENV").ok();
    let settings = load_settings(env.as_deref())?;

    init_tracing(&settings.observability);
    tracing::info!("starting omniline server v{}", env!("CARGO_PKG_VERSION"));

    // Development wiring: an in-memory store and inert speech providers.
    // Real STT, TTS and dialogue engines plug in behind the same traits.
    let store = MemoryStore::new();
    let engine = Arc::new(ScriptedEngine::new(
        settings.agent.fallback_phrase.clone(),
    ));
    let state = AppState::new(
        settings.clone(),
        store.stores(),
        Arc::new(NoopStt),
        Arc::new(SpeechSynthesizer::new(Box::new(UnavailableTts))),
        engine,
    );

    let app = create_router(state);
    let addr: SocketAddr = format!("{}:{}", settings.server.host, settings.server.port).parse()?;
    tracing::info!(%addr, ws_path = %settings.server.ws_path, "listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server shutdown complete");
    Ok(())
}

/// Wait for Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Ctrl+C handler should install");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("SIGTERM handler should install")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("received Ctrl+C, shutting down");
        }
        _ = terminate => {
            tracing::info!("received SIGTERM, shutting down");
        }
    }
}

fn init_tracing(config: &ObservabilityConfig) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("omniline={},tower_http=info", config.log_level).into()
    });

    let fmt_layer = if config.log_json {
        tracing_subscriber::fmt::layer().json().boxed()
    } else {
        tracing_subscriber::fmt::layer().boxed()
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}
