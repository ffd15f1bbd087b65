//! # skillchain-api: Binary Entry Point
//!
//! Starts the Axum HTTP server for the SkillChain share API.

use std::sync::Arc;

use skillchain_api::state::{AppConfig, AppState};
use skillchain_api::store::{MemoryShareStore, PgShareStore, ShareStore};
use skillchain_core::SystemClock;
use skillchain_resolver::{
    CredentialResolver, HttpCredentialResolver, ResolverConfig, StaticCredentialResolver,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let config = AppConfig::from_env().map_err(|e| {
        tracing::error!("Invalid configuration: {e}");
        e
    })?;
    tracing::info!(?config, "configuration loaded");
    if config.auth_token.is_none() {
        tracing::warn!("AUTH_TOKEN not set: bearer wallets are trusted without a secret");
    }

    // Absent DATABASE_URL means in-memory only.
    let db_pool = skillchain_api::db::init_pool().await.map_err(|e| {
        tracing::error!("Database initialization failed: {e}");
        e
    })?;
    let store: Arc<dyn ShareStore> = match &db_pool {
        Some(pool) => Arc::new(PgShareStore::new(pool.clone())),
        None => Arc::new(MemoryShareStore::new()),
    };

    let resolver_config = ResolverConfig::from_env_if_configured().map_err(|e| {
        tracing::error!("Invalid credential service configuration: {e}");
        e
    })?;
    let resolver: Arc<dyn CredentialResolver> = match resolver_config {
        Some(resolver_config) => {
            tracing::info!(base_url = %resolver_config.base_url, "credential service configured");
            Arc::new(HttpCredentialResolver::new(resolver_config).map_err(|e| {
                tracing::error!("Failed to create credential service client: {e}");
                e
            })?)
        }
        None => {
            tracing::warn!(
                "CREDENTIALS_API_URL not set. Owners will appear to hold no credentials."
            );
            Arc::new(StaticCredentialResolver::new())
        }
    };

    let port = config.port;
    let state = AppState::from_parts(config, store, resolver, Arc::new(SystemClock), db_pool);
    let app = skillchain_api::app(state);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("SkillChain share API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Structured logging. `LOG_FORMAT=json` switches to one JSON object per line.
fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    if std::env::var("LOG_FORMAT").as_deref() == Ok("json") {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
