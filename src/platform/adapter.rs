use crate::error::app_error::AppError;
use crate::models::session::{Session, SessionCredential, SessionEvent, SessionEventKind};
use crate::models::user::{Credentials, Registration};
use crate::platform::backend::PlatformBackend;
use crate::service::facade::SessionAdapter;
use crate::storage::{NamespacedStore, PLATFORM_SESSION_KEY};
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::{RwLock, broadcast};
use tracing::{debug, info};

const EVENT_CAPACITY: usize = 16;

/// Session managed by the platform backend. Changes are published to
/// subscribers as [`SessionEvent`]s, the way the platform client's
/// auth-state listener delivers them.
pub struct PlatformSessionAdapter {
    backend: Arc<dyn PlatformBackend>,
    store: NamespacedStore,
    current: RwLock<Option<Session>>,
    events: broadcast::Sender<SessionEvent>,
    refresh_leeway: chrono::Duration,
}

impl PlatformSessionAdapter {
    pub fn new(backend: Arc<dyn PlatformBackend>, store: NamespacedStore, refresh_leeway: chrono::Duration) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            backend,
            store,
            current: RwLock::new(None),
            events,
            refresh_leeway,
        }
    }

    pub fn backend(&self) -> &Arc<dyn PlatformBackend> {
        &self.backend
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// The last delivered session, without touching the backend.
    pub async fn current(&self) -> Option<Session> {
        self.current.read().await.clone()
    }

    /// The current session, refreshed first if its access token is about to expire.
    pub async fn session(&self) -> Result<Option<Session>, AppError> {
        let Some(session) = self.current().await else {
            return Ok(None);
        };

        if session.needs_refresh(Utc::now(), self.refresh_leeway) {
            return self.refresh(&session).await;
        }
        Ok(Some(session))
    }

    pub async fn access_token(&self) -> Result<String, AppError> {
        self.session()
            .await?
            .map(|s| s.bearer_token().to_string())
            .ok_or(AppError::Unauthorized)
    }

    pub async fn restore(&self) -> Result<Option<Session>, AppError> {
        let Some(stored) = self.store.get_json::<Session>(PLATFORM_SESSION_KEY).await? else {
            return Ok(None);
        };

        if stored.needs_refresh(Utc::now(), self.refresh_leeway) {
            return self.refresh(&stored).await;
        }

        match self.backend.authenticate(stored.bearer_token()).await? {
            Some(user) => {
                let session = Session {
                    subject_id: user.id.to_string(),
                    email: user.email,
                    display_name: user.name,
                    credential: stored.credential,
                };
                self.publish(session.clone(), SessionEventKind::SignedIn).await?;
                Ok(Some(session))
            }
            None => self.refresh(&stored).await,
        }
    }

    async fn refresh(&self, session: &Session) -> Result<Option<Session>, AppError> {
        let SessionCredential::Platform { refresh_token, .. } = &session.credential else {
            return Ok(None);
        };

        match self.backend.refresh(refresh_token).await {
            Ok(grant) => {
                let refreshed = Session::from(grant);
                debug!(subject = %refreshed.subject_id, "platform session refreshed");
                self.publish(refreshed.clone(), SessionEventKind::TokenRefreshed).await?;
                Ok(Some(refreshed))
            }
            Err(err) if err.is_unauthorized() => {
                info!("platform refresh token rejected, signing out");
                self.forget().await?;
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    async fn publish(&self, session: Session, kind: SessionEventKind) -> Result<(), AppError> {
        self.store.set_json(PLATFORM_SESSION_KEY, &session).await?;
        *self.current.write().await = Some(session.clone());
        // No subscribers is fine; the aggregate may not be listening yet.
        let _ = self.events.send(SessionEvent {
            kind,
            session: Some(session),
        });
        Ok(())
    }

    async fn forget(&self) -> Result<(), AppError> {
        *self.current.write().await = None;
        self.store.remove(PLATFORM_SESSION_KEY).await?;
        let _ = self.events.send(SessionEvent {
            kind: SessionEventKind::SignedOut,
            session: None,
        });
        Ok(())
    }
}

#[async_trait::async_trait]
impl SessionAdapter for PlatformSessionAdapter {
    fn name(&self) -> &'static str {
        "platform"
    }

    async fn sign_in(&self, credentials: &Credentials) -> Result<Session, AppError> {
        Ok(Session::from(self.backend.sign_in(credentials).await?))
    }

    async fn sign_up(&self, registration: &Registration) -> Result<Option<Session>, AppError> {
        Ok(Some(Session::from(self.backend.sign_up(registration).await?)))
    }

    async fn revoke(&self, session: &Session) -> Result<(), AppError> {
        self.backend.sign_out(session.bearer_token()).await
    }

    async fn commit(&self, session: &Session) -> Result<(), AppError> {
        self.publish(session.clone(), SessionEventKind::SignedIn).await
    }

    async fn clear(&self) -> Result<(), AppError> {
        self.forget().await
    }

    async fn current(&self) -> Option<Session> {
        PlatformSessionAdapter::current(self).await
    }
}
