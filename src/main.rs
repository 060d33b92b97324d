//! Catalog API server
//!
//! Wires the document store and cache backends chosen by configuration and
//! serves the REST API until SIGINT/SIGTERM.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::signal;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use catalog_api::cache::{MemoryCache, RedisCache, RedisCacheConfig, SharedCache};
use catalog_api::store::{PostgresConfig, PostgresStore, Stores};
use catalog_api::{create_router, spawn_cleanup_task, AppState, Config};

/// Main entry point for the catalog API server.
///
/// # Startup Sequence
/// 1. Load `.env` and initialize tracing
/// 2. Load configuration from environment variables
/// 3. Connect the document stores (PostgreSQL or in-memory)
/// 4. Connect the cache (Redis or in-process, with its cleanup task)
/// 5. Serve the router with graceful shutdown
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine; the environment may already be set.
    let _ = dotenvy::dotenv();

    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "catalog_api=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Catalog API");

    let config = Config::from_env();
    info!(
        "Configuration loaded: port={}, product_ttl={}s, cart_ttl={}s, timeout={}s",
        config.server_port, config.product_cache_ttl, config.cart_ttl, config.operation_timeout
    );

    let stores = connect_stores(&config).await?;
    let (cache, memory_cache) = connect_cache(&config).await?;

    let mut state = AppState::new(stores, cache, &config);
    state.memory_cache = memory_cache;

    let cleanup_handle = state
        .memory_cache
        .clone()
        .map(|memory| spawn_cleanup_task(memory, config.cleanup_interval));

    let app = create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(cleanup_handle))
        .await
        .context("server error")?;

    info!("Server shutdown complete");
    Ok(())
}

async fn connect_stores(config: &Config) -> anyhow::Result<Stores> {
    match &config.database_url {
        Some(url) => {
            let pg_config = PostgresConfig::new(url.clone())
                .with_max_connections(config.database_max_connections)
                .with_acquire_timeout(config.operation_timeout());
            let store = PostgresStore::connect(&pg_config)
                .await
                .context("failed to connect to PostgreSQL")?;
            store.ensure_schema().await.context("failed to prepare schema")?;
            info!("Document store: PostgreSQL");
            Ok(Stores::postgres(store))
        }
        None => {
            warn!("DATABASE_URL not set; documents are kept in memory and lost on restart");
            Ok(Stores::in_memory())
        }
    }
}

async fn connect_cache(config: &Config) -> anyhow::Result<(SharedCache, Option<Arc<MemoryCache>>)> {
    match &config.redis_url {
        Some(url) => {
            let mut redis_config =
                RedisCacheConfig::new(url.clone()).with_connection_timeout(config.operation_timeout());
            if let Some(prefix) = &config.redis_key_prefix {
                redis_config = redis_config.with_key_prefix(prefix.clone());
            }
            let cache = RedisCache::connect(redis_config)
                .await
                .context("failed to connect to Redis")?;
            info!("Cache backend: Redis");
            let cache: SharedCache = Arc::new(cache);
            Ok((cache, None))
        }
        None => {
            let memory = Arc::new(MemoryCache::new(config.max_entries));
            info!(max_entries = config.max_entries, "Cache backend: in-process memory");
            let cache: SharedCache = memory.clone();
            Ok((cache, Some(memory)))
        }
    }
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
///
/// On shutdown signal, aborts the cleanup task and allows graceful shutdown.
async fn shutdown_signal(cleanup_handle: Option<JoinHandle<()>>) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
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
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }

    if let Some(handle) = cleanup_handle {
        handle.abort();
        warn!("Cleanup task aborted");
    }
}
