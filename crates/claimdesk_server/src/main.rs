//! claimdesk_server: admin back-office REST server.
//!
//! Configuration comes from `CLAIMDESK_*` environment variables (see
//! `config`); a `.env` file is loaded first when present. Without
//! `CLAIMDESK_DATABASE_URL` the server runs on the in-memory backend.

use std::sync::Arc;

use anyhow::Context;
use claimdesk_core::ports::{CacheInvalidator, Ports};
use claimdesk_core::{AdminService, AdminServiceImpl, MemoryStore};
use claimdesk_postgres::PgStores;
use claimdesk_server::config::ServerConfig;
use claimdesk_server::middleware::jwt::JwtConfig;
use claimdesk_server::router::build_router;
use claimdesk_server::side_effects::{LogInvalidator, RevalidateWebhook};
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,claimdesk_server=debug,claimdesk_core=debug".into()),
        )
        .init();

    let config = ServerConfig::from_env()?;

    let cache: Arc<dyn CacheInvalidator> = match &config.revalidate_url {
        Some(url) => {
            tracing::info!(url = %url, "cache revalidation webhook enabled");
            Arc::new(RevalidateWebhook::new(url.clone())?)
        }
        None => Arc::new(LogInvalidator),
    };

    let ports: Ports = match &config.database_url {
        Some(url) => {
            let pool = claimdesk_postgres::connect(url, config.max_connections).await?;
            tracing::info!("Connected to database");
            PgStores::new(pool).into_ports(cache)
        }
        None => {
            tracing::warn!("CLAIMDESK_DATABASE_URL not set; using the in-memory backend");
            Arc::new(MemoryStore::new()).ports().with_cache(cache)
        }
    };

    let service: Arc<dyn AdminService> =
        Arc::new(AdminServiceImpl::new(ports, config.engine.clone()));
    let jwt_config = JwtConfig::from_secret(config.jwt_secret.as_bytes());
    let app = build_router(service, jwt_config);

    let listener = TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("failed to bind to {}", config.bind_addr))?;
    tracing::info!("claimdesk_server listening on {}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
