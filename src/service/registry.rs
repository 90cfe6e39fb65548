use crate::config::Config;
use crate::legacy::adapter::LegacySessionAdapter;
use crate::legacy::client::LegacyApiClient;
use crate::platform::adapter::PlatformSessionAdapter;
use crate::platform::backend::PlatformBackend;
use crate::service::portal::PortalSession;
use crate::storage::{KeyValueStore, NamespacedStore};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;
use uuid::Uuid;

const CLEANUP_INTERVAL: Duration = Duration::from_secs(60);

struct Entry {
    portal: Arc<PortalSession>,
    last_seen: Instant,
}

/// Shared collaborators plus the live [`PortalSession`] of every visitor.
pub struct PortalServices {
    platform: Arc<dyn PlatformBackend>,
    legacy: LegacyApiClient,
    store: Arc<dyn KeyValueStore>,
    key_prefix: String,
    request_timeout: Duration,
    refresh_leeway: chrono::Duration,
    idle_timeout: Duration,
    sessions: Mutex<HashMap<Uuid, Entry>>,
}

impl PortalServices {
    pub fn new(config: &Config, platform: Arc<dyn PlatformBackend>, legacy: LegacyApiClient, store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            platform,
            legacy,
            store,
            key_prefix: config.storage.key_prefix.clone(),
            request_timeout: config.auth.request_timeout(),
            refresh_leeway: chrono::Duration::seconds(config.platform.refresh_leeway_seconds),
            idle_timeout: config.storage.idle_visitor_timeout(),
            sessions: Mutex::new(HashMap::new()),
        }
    }

    pub fn legacy(&self) -> &LegacyApiClient {
        &self.legacy
    }

    /// The visitor's portal, created and restored from storage on first use.
    pub async fn portal(&self, visitor: &Uuid) -> Arc<PortalSession> {
        let portal = {
            let mut sessions = self.sessions.lock().await;
            let entry = sessions.entry(*visitor).or_insert_with(|| {
                debug!(visitor = %visitor, "creating portal session");
                Entry {
                    portal: Arc::new(self.build(visitor)),
                    last_seen: Instant::now(),
                }
            });
            entry.last_seen = Instant::now();
            entry.portal.clone()
        };

        portal.ensure_restored().await;
        portal
    }

    fn build(&self, visitor: &Uuid) -> PortalSession {
        let store = NamespacedStore::new(self.store.clone(), &self.key_prefix, visitor);
        let platform = Arc::new(PlatformSessionAdapter::new(self.platform.clone(), store.clone(), self.refresh_leeway));
        let legacy = Arc::new(LegacySessionAdapter::new(self.legacy.clone(), store));
        PortalSession::new(*visitor, platform, legacy, self.request_timeout)
    }

    pub async fn active_visitors(&self) -> usize {
        self.sessions.lock().await.len()
    }

    /// Drops in-process state for idle visitors. Their persisted sessions stay
    /// in the store and are restored on the next request.
    pub async fn evict_idle(&self) -> usize {
        let now = Instant::now();
        let mut sessions = self.sessions.lock().await;
        let before = sessions.len();
        sessions.retain(|_, entry| now.duration_since(entry.last_seen) < self.idle_timeout);
        before - sessions.len()
    }

    pub fn spawn_cleanup_task(self: Arc<Self>) {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(CLEANUP_INTERVAL);
            loop {
                ticker.tick().await;
                let evicted = self.evict_idle().await;
                if evicted > 0 {
                    debug!(evicted, "evicted idle visitors");
                }
            }
        });
    }
}
