//! Persistent key-value storage for client-side session state.
//!
//! The two session adapters write here under different keys with no
//! transactional grouping across them: the legacy adapter owns
//! [`LEGACY_TOKEN_KEY`] and [`LEGACY_USER_KEY`], the platform adapter owns
//! [`PLATFORM_SESSION_KEY`]. Every visitor gets its own key namespace.

use crate::error::app_error::AppError;
use redis::AsyncCommands;
use redis::aio::{ConnectionManager, ConnectionManagerConfig};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use uuid::Uuid;

pub const LEGACY_TOKEN_KEY: &str = "auth_token";
pub const LEGACY_USER_KEY: &str = "auth_user";
pub const PLATFORM_SESSION_KEY: &str = "platform.session";

#[async_trait::async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, AppError>;
    async fn set(&self, key: &str, value: &str) -> Result<(), AppError>;
    async fn remove(&self, key: &str) -> Result<(), AppError>;
}

#[derive(Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub async fn contains(&self, key: &str) -> bool {
        self.entries.read().await.contains_key(key)
    }
}

#[async_trait::async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, AppError> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), AppError> {
        self.entries.write().await.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), AppError> {
        self.entries.write().await.remove(key);
        Ok(())
    }
}

/// Seconds for `SET .. EX`. Redis rejects a zero expiry, so the floor is one second.
fn expiry_seconds(ttl: Duration) -> u64 {
    ttl.as_secs().max(1)
}

/// Entries expire `ttl` after their last write, so abandoned visitor
/// namespaces do not outlive the sessions they hold.
#[derive(Clone)]
pub struct RedisStore {
    connection: ConnectionManager,
    ttl_seconds: u64,
}

impl RedisStore {
    pub async fn connect(redis_url: &str, ttl: Duration) -> Result<Self, AppError> {
        let config = ConnectionManagerConfig::new()
            .set_number_of_retries(1)
            .set_connection_timeout(Some(Duration::from_millis(500)));

        let client = redis::Client::open(redis_url)?;
        let connection = client.get_connection_manager_with_config(config).await?;

        Ok(Self {
            connection,
            ttl_seconds: expiry_seconds(ttl),
        })
    }
}

#[async_trait::async_trait]
impl KeyValueStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<String>, AppError> {
        let mut connection = self.connection.clone();
        let value: Option<String> = connection.get(key).await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), AppError> {
        let mut connection = self.connection.clone();
        let _: () = connection.set_ex(key, value, self.ttl_seconds).await?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), AppError> {
        let mut connection = self.connection.clone();
        let _: () = connection.del(key).await?;
        Ok(())
    }
}

/// A visitor's view of the shared store: `<prefix>:<visitor>:<key>`.
#[derive(Clone)]
pub struct NamespacedStore {
    inner: Arc<dyn KeyValueStore>,
    namespace: String,
}

impl NamespacedStore {
    pub fn new(inner: Arc<dyn KeyValueStore>, prefix: &str, visitor: &Uuid) -> Self {
        Self {
            inner,
            namespace: format!("{}:{}", prefix, visitor),
        }
    }

    fn key(&self, key: &str) -> String {
        format!("{}:{}", self.namespace, key)
    }

    pub async fn get(&self, key: &str) -> Result<Option<String>, AppError> {
        self.inner.get(&self.key(key)).await
    }

    pub async fn set(&self, key: &str, value: &str) -> Result<(), AppError> {
        self.inner.set(&self.key(key), value).await
    }

    pub async fn remove(&self, key: &str) -> Result<(), AppError> {
        self.inner.remove(&self.key(key)).await
    }

    pub async fn get_json<T: serde::de::DeserializeOwned>(&self, key: &str) -> Result<Option<T>, AppError> {
        match self.get(key).await? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    pub async fn set_json<T: serde::Serialize>(&self, key: &str, value: &T) -> Result<(), AppError> {
        let raw = serde_json::to_string(value)?;
        self.set(key, &raw).await
    }
}
