use std::net::SocketAddr;
use std::sync::Arc;

use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use huddle_api::{AppState, AppStateInner};

const PLACEHOLDER_SECRET: &str = "dev-secret-change-me";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "huddle=debug,huddle_api=info,huddle_store=info,tower_http=debug".into()),
        )
        .init();

    // Config
    let token_secret =
        std::env::var("HUDDLE_TOKEN_SECRET").unwrap_or_else(|_| PLACEHOLDER_SECRET.into());
    if token_secret == PLACEHOLDER_SECRET {
        warn!("HUDDLE_TOKEN_SECRET is unset or still the placeholder; do not run this in production");
    }
    let host = std::env::var("HUDDLE_HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port: u16 = std::env::var("HUDDLE_PORT")
        .unwrap_or_else(|_| "3200".into())
        .parse()?;
    let public_url =
        std::env::var("HUDDLE_PUBLIC_URL").unwrap_or_else(|_| format!("http://localhost:{port}"));

    let state: AppState = Arc::new(AppStateInner::new(token_secret, &public_url));

    let app = huddle_api::router(state.clone())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Huddle server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let cancelled = state.scheduler.cancel_all();
    info!(cancelled_jobs = cancelled, "Huddle server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        let mut sigterm =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .expect("failed to install SIGTERM handler");
        tokio::select! {
            _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
            _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}
