use crate::config::{Config, DatabaseConfig};
use crate::database::postgres_repository::{PostgresRepository, SessionPolicy};
use crate::error::app_error::AppError;
use crate::legacy::client::{HttpTransport, LegacyApiClient};
use crate::service::registry::PortalServices;
use crate::storage::{KeyValueStore, MemoryStore, RedisStore};
use rocket::fairing::AdHoc;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use std::time::Duration;

async fn init_pool(db_config: &DatabaseConfig) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(db_config.max_connections)
        .min_connections(db_config.min_connections)
        .acquire_timeout(Duration::from_secs(db_config.acquire_timeout))
        .idle_timeout(Duration::from_secs(30))
        .max_lifetime(Duration::from_secs(1800))
        .connect(&db_config.url)
        .await
}

async fn init_store(config: &Config) -> Result<Arc<dyn KeyValueStore>, AppError> {
    match &config.storage.redis_url {
        Some(url) => {
            let store = RedisStore::connect(url, config.platform.refresh_token_ttl()).await?;
            tracing::info!("Session storage backed by redis");
            Ok(Arc::new(store))
        }
        None => {
            tracing::warn!("No redis_url configured; sessions will not survive a restart");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

async fn init_services(config: &Config) -> Result<Arc<PortalServices>, AppError> {
    let pool = init_pool(&config.database).await?;
    tracing::info!("Database pool initialized successfully");

    let platform = Arc::new(PostgresRepository {
        pool,
        policy: SessionPolicy::from(&config.platform),
    });
    let legacy = LegacyApiClient::new(Arc::new(HttpTransport::new(&config.legacy)?));
    let store = init_store(config).await?;

    Ok(Arc::new(PortalServices::new(config, platform, legacy, store)))
}

/// Connects the platform database, session storage and legacy client, then
/// manages the resulting [`PortalServices`].
pub fn stage_portal(config: Config) -> AdHoc {
    AdHoc::try_on_ignite("Portal services", |rocket| async move {
        match init_services(&config).await {
            Ok(services) => {
                services.clone().spawn_cleanup_task();
                Ok(rocket.manage(services))
            }
            Err(e) => {
                tracing::error!("Failed to initialize portal services: {}", e);
                Err(rocket)
            }
        }
    })
}
