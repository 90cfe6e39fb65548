use crate::auth::{GuardDecision, decide};
use crate::error::app_error::AppError;
use crate::legacy::adapter::LegacySessionAdapter;
use crate::models::session::{DualAuthResponse, Session, SessionEvent, SessionView, SessionViewResponse};
use crate::models::user::{Credentials, Registration};
use crate::platform::adapter::PlatformSessionAdapter;
use crate::service::consent::ConsentSynchronizer;
use crate::service::facade::AuthFacade;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{OnceCell, broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Outcome of an operation that ran against both session systems.
#[derive(Debug)]
pub struct DualOutcome<T> {
    pub platform: Result<T, AppError>,
    pub legacy: Result<T, AppError>,
}

/// Everything one visitor's browser holds: both auth facades, the consent
/// list and the reconciled [`SessionView`].
///
/// The view is recomputed once per platform session event by a background
/// task, and directly after every operation this type performs.
pub struct PortalSession {
    visitor: Uuid,
    platform: AuthFacade<PlatformSessionAdapter>,
    legacy: AuthFacade<LegacySessionAdapter>,
    consent: ConsentSynchronizer,
    view: Arc<watch::Sender<SessionView>>,
    restored: OnceCell<()>,
    reconciler: JoinHandle<()>,
}

impl PortalSession {
    pub fn new(visitor: Uuid, platform: Arc<PlatformSessionAdapter>, legacy: Arc<LegacySessionAdapter>, timeout: Duration) -> Self {
        let (view, _) = watch::channel(SessionView::default());
        let view = Arc::new(view);
        let events = platform.subscribe();
        let reconciler = tokio::spawn(reconcile_on_events(visitor, events, platform.clone(), legacy.clone(), view.clone()));

        Self {
            visitor,
            consent: ConsentSynchronizer::new(platform.clone(), legacy.clone()),
            platform: AuthFacade::new(platform, timeout),
            legacy: AuthFacade::new(legacy, timeout),
            view,
            restored: OnceCell::new(),
            reconciler,
        }
    }

    pub fn visitor(&self) -> Uuid {
        self.visitor
    }

    pub fn platform(&self) -> &AuthFacade<PlatformSessionAdapter> {
        &self.platform
    }

    pub fn legacy(&self) -> &AuthFacade<LegacySessionAdapter> {
        &self.legacy
    }

    pub fn consent(&self) -> &ConsentSynchronizer {
        &self.consent
    }

    pub fn view(&self) -> SessionView {
        self.view.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionView> {
        self.view.subscribe()
    }

    pub fn any_loading(&self) -> bool {
        self.platform.loading() || self.legacy.loading()
    }

    /// The platform adapter's most recently delivered session.
    pub async fn platform_session(&self) -> Option<Session> {
        self.platform.adapter().current().await
    }

    pub async fn guard(&self) -> GuardDecision {
        decide(self.platform_session().await.as_ref(), self.any_loading())
    }

    /// The platform access token for row operations, refreshed when close to expiry.
    pub async fn access_token(&self) -> Result<String, AppError> {
        let token = self.platform.adapter().access_token().await;
        self.reconcile().await;
        token
    }

    pub async fn legacy_token(&self) -> Option<String> {
        self.legacy.adapter().token().await
    }

    /// Rehydrates both sessions from storage the first time a visitor is seen.
    pub async fn ensure_restored(&self) {
        self.restored.get_or_init(|| self.restore()).await;
    }

    async fn restore(&self) {
        let (platform, legacy) = tokio::join!(self.platform.adapter().restore(), self.legacy.adapter().restore());
        if let Err(err) = platform {
            warn!(visitor = %self.visitor, error = %err, "could not restore platform session");
        }
        if let Err(err) = legacy {
            warn!(visitor = %self.visitor, error = %err, "could not restore legacy session");
        }
        self.reconcile().await;
    }

    pub async fn login(&self, credentials: &Credentials) -> DualOutcome<Session> {
        let (platform, legacy) = tokio::join!(self.platform.login(credentials), self.legacy.login(credentials));
        self.reconcile().await;
        DualOutcome { platform, legacy }
    }

    pub async fn register(&self, registration: &Registration) -> DualOutcome<Option<Session>> {
        let (platform, legacy) = tokio::join!(self.platform.register(registration), self.legacy.register(registration));
        self.reconcile().await;
        DualOutcome { platform, legacy }
    }

    /// Signs out of both systems. Local state is cleared even when a remote call fails or
    /// outlives the timeout.
    pub async fn logout(&self) -> Result<(), AppError> {
        let (platform, legacy) = tokio::join!(self.platform.logout(), self.legacy.logout());
        self.reconcile().await;
        info!(visitor = %self.visitor, "visitor signed out");
        platform.and(legacy)
    }

    pub async fn reconcile(&self) {
        reconcile(self.platform.adapter(), self.legacy.adapter(), &self.view).await;
    }

    pub fn view_response(&self) -> SessionViewResponse {
        let view = self.view();
        SessionViewResponse {
            authority: view.authority,
            session: view.session.as_ref().map(Into::into),
            platform_active: view.platform_active,
            legacy_active: view.legacy_active,
            diverged: view.diverged,
            platform: (&self.platform.state()).into(),
            legacy: (&self.legacy.state()).into(),
        }
    }

    pub fn dual_response<T>(&self, outcome: &DualOutcome<T>) -> DualAuthResponse {
        DualAuthResponse {
            session: self.view_response(),
            platform_error: outcome.platform.as_ref().err().map(AppError::user_message),
            legacy_error: outcome.legacy.as_ref().err().map(AppError::user_message),
        }
    }
}

impl Drop for PortalSession {
    fn drop(&mut self) {
        self.reconciler.abort();
    }
}

async fn reconcile(platform: &PlatformSessionAdapter, legacy: &LegacySessionAdapter, view: &watch::Sender<SessionView>) {
    let next = SessionView::reconcile(platform.current().await.as_ref(), legacy.current().await.as_ref());
    if next.diverged {
        warn!("platform and legacy sessions belong to different accounts");
    }
    view.send_if_modified(|current| {
        if *current == next {
            return false;
        }
        *current = next;
        true
    });
}

async fn reconcile_on_events(
    visitor: Uuid,
    mut events: broadcast::Receiver<SessionEvent>,
    platform: Arc<PlatformSessionAdapter>,
    legacy: Arc<LegacySessionAdapter>,
    view: Arc<watch::Sender<SessionView>>,
) {
    loop {
        match events.recv().await {
            Ok(event) => debug!(visitor = %visitor, kind = ?event.kind, "platform session changed"),
            Err(RecvError::Lagged(skipped)) => debug!(visitor = %visitor, skipped, "session events lagged"),
            Err(RecvError::Closed) => break,
        }
        reconcile(&platform, &legacy, &view).await;
    }
}
