mod config;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::http::HeaderValue;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use cofound_api::middleware::TokenVerifier;
use cofound_api::{AppState, AppStateInner};
use cofound_db::Database;
use cofound_matching::Matchmaker;

use config::{Config, TokenKeys};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cofound=debug,tower_http=debug".into()),
        )
        .init();

    let config = Config::from_env()?;

    let verifier = match &config.token_keys {
        TokenKeys::Secret(secret) => TokenVerifier::from_secret(secret, config.cors_origins.clone()),
        TokenKeys::JwksUrl(url) => {
            let jwks = TokenVerifier::fetch_jwks(url)
                .await
                .with_context(|| format!("fetching signing keys from {url}"))?;
            info!("Loaded {} signing keys", jwks.keys.len());
            TokenVerifier::from_jwks(jwks, config.cors_origins.clone())
        }
    };

    let db = Database::open(&config.db_path)?;
    let state: AppState = Arc::new(AppStateInner {
        matchmaker: Matchmaker::new(Arc::new(db), config.limits),
        verifier,
        environment: config.environment.clone(),
    });

    let app = cofound_api::router(state)
        .layer(cors_layer(&config.cors_origins))
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("Cofound server listening on {} ({})", addr, config.environment);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match o.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin {}", o);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
