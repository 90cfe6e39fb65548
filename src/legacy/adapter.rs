use crate::compatibility_adapter::{LegacyUser, adapt_auth_payload};
use crate::error::app_error::AppError;
use crate::legacy::client::LegacyApiClient;
use crate::models::session::{Session, SessionCredential};
use crate::models::user::{Credentials, Registration};
use crate::service::facade::SessionAdapter;
use crate::storage::{LEGACY_TOKEN_KEY, LEGACY_USER_KEY, NamespacedStore};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Bearer-token session against the legacy REST API. The token and a user
/// snapshot are persisted under two storage keys.
pub struct LegacySessionAdapter {
    client: LegacyApiClient,
    store: NamespacedStore,
    current: RwLock<Option<Session>>,
}

fn legacy_session(token: String, user: LegacyUser) -> Session {
    Session {
        subject_id: user.id,
        email: user.email,
        display_name: user.name,
        credential: SessionCredential::Legacy { token },
    }
}

impl LegacySessionAdapter {
    pub fn new(client: LegacyApiClient, store: NamespacedStore) -> Self {
        Self {
            client,
            store,
            current: RwLock::new(None),
        }
    }

    pub fn client(&self) -> &LegacyApiClient {
        &self.client
    }

    pub async fn current(&self) -> Option<Session> {
        self.current.read().await.clone()
    }

    pub async fn token(&self) -> Option<String> {
        self.current.read().await.as_ref().map(|s| s.bearer_token().to_string())
    }

    /// Rehydrates from storage and re-validates the token with `me`. A
    /// rejected token clears storage; an unreachable API keeps the snapshot.
    pub async fn restore(&self) -> Result<Option<Session>, AppError> {
        let Some(token) = self.store.get(LEGACY_TOKEN_KEY).await? else {
            return Ok(None);
        };
        let snapshot: Option<LegacyUser> = self.store.get_json(LEGACY_USER_KEY).await?;

        let user = match self.client.me(&token).await {
            Ok(payload) => adapt_auth_payload(&payload).1.or(snapshot),
            Err(err) if err.is_unauthorized() => {
                info!("stored legacy token was rejected, clearing it");
                self.forget().await?;
                return Ok(None);
            }
            Err(err) => {
                warn!(error = %err, "could not re-validate legacy token, keeping stored snapshot");
                snapshot
            }
        };

        let Some(user) = user else {
            self.forget().await?;
            return Ok(None);
        };

        let session = legacy_session(token, user);
        self.persist(&session).await?;
        Ok(Some(session))
    }

    /// Restore keys on the token, so the user snapshot is written first and
    /// an interrupted write never leaves a token without its user.
    async fn persist(&self, session: &Session) -> Result<(), AppError> {
        let user = LegacyUser {
            id: session.subject_id.clone(),
            email: session.email.clone(),
            name: session.display_name.clone(),
        };
        self.store.set_json(LEGACY_USER_KEY, &user).await?;
        self.store.set(LEGACY_TOKEN_KEY, session.bearer_token()).await?;
        *self.current.write().await = Some(session.clone());
        Ok(())
    }

    async fn forget(&self) -> Result<(), AppError> {
        *self.current.write().await = None;
        self.store.remove(LEGACY_TOKEN_KEY).await?;
        self.store.remove(LEGACY_USER_KEY).await
    }

    /// Turns an auth response into a session, asking `me` when the response
    /// carried a token but no usable user. Nothing is stored here.
    async fn resolve(&self, payload: &serde_json::Value) -> Result<Option<Session>, AppError> {
        let (token, user) = adapt_auth_payload(payload);
        let Some(token) = token else {
            return Ok(None);
        };

        let user = match user {
            Some(user) => user,
            None => adapt_auth_payload(&self.client.me(&token).await?).1.ok_or_else(|| AppError::Api {
                status: 502,
                message: "Legacy API returned no user profile".to_string(),
            })?,
        };

        Ok(Some(legacy_session(token, user)))
    }
}

#[async_trait::async_trait]
impl SessionAdapter for LegacySessionAdapter {
    fn name(&self) -> &'static str {
        "legacy"
    }

    async fn sign_in(&self, credentials: &Credentials) -> Result<Session, AppError> {
        let payload = self.client.login(credentials).await?;
        self.resolve(&payload).await?.ok_or_else(|| AppError::Api {
            status: 502,
            message: "Legacy login response did not include a token".to_string(),
        })
    }

    async fn sign_up(&self, registration: &Registration) -> Result<Option<Session>, AppError> {
        let payload = self.client.register(registration).await?;
        let session = self.resolve(&payload).await?;
        if session.is_none() {
            debug!("legacy registration returned no token; user must log in");
        }
        Ok(session)
    }

    async fn revoke(&self, session: &Session) -> Result<(), AppError> {
        self.client.logout(session.bearer_token()).await
    }

    async fn commit(&self, session: &Session) -> Result<(), AppError> {
        self.persist(session).await
    }

    async fn clear(&self) -> Result<(), AppError> {
        self.forget().await
    }

    async fn current(&self) -> Option<Session> {
        LegacySessionAdapter::current(self).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{KeyValueStore, MemoryStore};
    use crate::test_utils::MockTransport;
    use serde_json::json;
    use std::sync::Arc;
    use uuid::Uuid;

    fn adapter(transport: Arc<MockTransport>) -> (LegacySessionAdapter, NamespacedStore) {
        let store = NamespacedStore::new(Arc::new(MemoryStore::new()) as Arc<dyn KeyValueStore>, "portal", &Uuid::nil());
        (LegacySessionAdapter::new(LegacyApiClient::new(transport), store.clone()), store)
    }

    fn credentials() -> Credentials {
        Credentials {
            email: "ada@example.com".to_string(),
            password: "secret".to_string(),
        }
    }

    #[tokio::test]
    async fn login_persists_token_and_snapshot() {
        let transport = Arc::new(MockTransport::ok(json!({"token": "t-1", "user": {"id": 9, "email": "ada@example.com", "name": "Ada"}})));
        let (adapter, store) = adapter(transport);

        let session = adapter.login(&credentials()).await.unwrap();

        assert_eq!(session.bearer_token(), "t-1");
        assert_eq!(session.subject_id, "9");
        assert_eq!(store.get(LEGACY_TOKEN_KEY).await.unwrap().as_deref(), Some("t-1"));
        let snapshot: LegacyUser = store.get_json(LEGACY_USER_KEY).await.unwrap().unwrap();
        assert_eq!(snapshot.email, "ada@example.com");
    }

    #[tokio::test]
    async fn rejected_login_leaves_storage_untouched() {
        let transport = Arc::new(MockTransport::failing(401, "Unauthenticated."));
        let (adapter, store) = adapter(transport);

        let err = adapter.login(&credentials()).await.unwrap_err();

        assert!(err.is_unauthorized());
        assert!(store.get(LEGACY_TOKEN_KEY).await.unwrap().is_none());
        assert!(adapter.current().await.is_none());
    }

    #[tokio::test]
    async fn logout_clears_keys_even_if_api_fails() {
        let transport = Arc::new(MockTransport::ok(json!({"token": "t-1", "user": {"id": 9, "email": "ada@example.com", "name": "Ada"}})));
        let (adapter, store) = adapter(transport.clone());
        adapter.login(&credentials()).await.unwrap();

        transport.fail_with(500, "down").await;
        adapter.logout().await.unwrap();

        assert!(store.get(LEGACY_TOKEN_KEY).await.unwrap().is_none());
        assert!(store.get(LEGACY_USER_KEY).await.unwrap().is_none());
        assert!(adapter.current().await.is_none());
    }

    #[tokio::test]
    async fn restore_drops_rejected_token() {
        let transport = Arc::new(MockTransport::failing(401, "expired"));
        let (adapter, store) = adapter(transport);
        store.set(LEGACY_TOKEN_KEY, "stale").await.unwrap();

        assert!(adapter.restore().await.unwrap().is_none());
        assert!(store.get(LEGACY_TOKEN_KEY).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn restore_keeps_snapshot_when_api_unreachable() {
        let transport = Arc::new(MockTransport::failing(503, "maintenance"));
        let (adapter, store) = adapter(transport);
        store.set(LEGACY_TOKEN_KEY, "kept").await.unwrap();
        store
            .set_json(
                LEGACY_USER_KEY,
                &LegacyUser {
                    id: "9".to_string(),
                    email: "ada@example.com".to_string(),
                    name: "Ada".to_string(),
                },
            )
            .await
            .unwrap();

        let session = adapter.restore().await.unwrap().unwrap();
        assert_eq!(session.bearer_token(), "kept");
    }
}
