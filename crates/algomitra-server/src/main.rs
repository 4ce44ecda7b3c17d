mod config;

use std::sync::Arc;

use tracing::{info, warn};

use algomitra_ai::GeminiClient;
use algomitra_api::{AppStateInner, AuthConfig};
use algomitra_db::Database;

use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "algomitra=debug,tower_http=debug".into()),
        )
        .init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("FATAL: {:#}", e);
            eprintln!("       Set it in your .env file and restart.");
            std::process::exit(1);
        }
    };

    let db = match Database::open(&config.db_path) {
        Ok(db) => db,
        Err(e) => {
            eprintln!("FATAL: could not open database {}: {}", config.db_path.display(), e);
            std::process::exit(1);
        }
    };

    let gemini = GeminiClient::new(config.gemini.clone());
    if !gemini.is_configured() {
        warn!("GEMINI_API_KEY is not set; AI generation routes will fail");
    }

    let state = Arc::new(AppStateInner {
        db,
        auth: AuthConfig::new(config.jwt_secret, &config.allowed_email_domain)
            .with_token_ttl(config.jwt_ttl),
        gemini,
    });

    let app = algomitra_api::router(state);

    info!("algoMITra API listening on {}", config.addr);
    let listener = tokio::net::TcpListener::bind(config.addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

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
