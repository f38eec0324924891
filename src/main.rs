//! skin_store - points wallet and support backend
//!
//! Serves the storefront's wallet, redemption, admin and support APIs.
//! Persists to Postgres when DATABASE_URL is set, otherwise to memory.

use std::net::SocketAddr;
use std::sync::Arc;

use sqlx::PgPool;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use skin_store::api::build_router;
use skin_store::auth::{AdminPolicy, TokenVerifier};
use skin_store::catalog::CatalogClient;
use skin_store::jobs::JobScheduler;
use skin_store::store::{MemoryStore, PgStore, Store};
use skin_store::{db, AppState, Config};

/// Initialize tracing/logging
fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "skin_store=debug,tower_http=debug".into());

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

/// Pick the storage backend
async fn open_store(config: &Config) -> anyhow::Result<(Arc<dyn Store>, Option<PgPool>)> {
    let Some(database_url) = config.database_url.as_deref() else {
        tracing::warn!("DATABASE_URL not set, using in-memory store; data is lost on restart");
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        return Ok((store, None));
    };

    tracing::info!("Connecting to database...");
    let pool = db::connect(database_url, config.database_max_connections).await?;

    if config.apply_schema {
        db::apply_schema(&pool).await?;
    }

    if !db::check_schema(&pool).await? {
        tracing::error!("Database schema is not complete. Set APPLY_SCHEMA=true or run migrations.");
        return Err(anyhow::anyhow!("Database schema incomplete"));
    }

    tracing::info!("Database connected successfully");
    let store: Arc<dyn Store> = Arc::new(PgStore::new(pool.clone()));
    Ok((store, Some(pool)))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let config = Config::from_env()?;
    init_tracing(config.log_json);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;

    tracing::info!(environment = %config.environment, "Starting skin_store server");

    let (store, pool) = open_store(&config).await?;

    let policy = AdminPolicy::new(&config.admin_emails);
    let verifier = TokenVerifier::new(&config.jwt_secret, &config.jwt_audience);
    let catalog = CatalogClient::new(
        config.catalog_url.clone(),
        config.catalog_api_key.clone(),
        config.catalog_ttl,
    )?;

    let state = AppState::new(store, policy, verifier, catalog);

    // Keep the shop cache warm
    let scheduler = JobScheduler::new(state.catalog.clone()).start();

    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Cleanup
    tracing::info!("Server shutting down...");
    scheduler.abort();
    if let Some(pool) = pool {
        pool.close().await;
        tracing::info!("Database connections closed");
    }

    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
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
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown...");
        },
    }
}
