use crate::error::app_error::AppError;
use crate::models::session::{FacadeStateResponse, Session};
use crate::models::user::{Credentials, Registration};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{info, warn};
use validator::Validate;

/// One backend's way of establishing and tearing down a session.
///
/// Each operation has a remote half (`sign_in`, `sign_up`, `revoke`) that
/// only talks to the backend, and a local half (`commit`, `clear`) that only
/// touches memory and storage.
#[async_trait::async_trait]
pub trait SessionAdapter: Send + Sync {
    fn name(&self) -> &'static str;
    async fn sign_in(&self, credentials: &Credentials) -> Result<Session, AppError>;
    /// Some backends sign the user in on registration, others do not.
    async fn sign_up(&self, registration: &Registration) -> Result<Option<Session>, AppError>;
    async fn revoke(&self, session: &Session) -> Result<(), AppError>;
    async fn commit(&self, session: &Session) -> Result<(), AppError>;
    async fn clear(&self) -> Result<(), AppError>;
    async fn current(&self) -> Option<Session>;

    async fn login(&self, credentials: &Credentials) -> Result<Session, AppError> {
        let session = self.sign_in(credentials).await?;
        self.commit(&session).await?;
        Ok(session)
    }

    async fn register(&self, registration: &Registration) -> Result<Option<Session>, AppError> {
        let session = self.sign_up(registration).await?;
        if let Some(session) = &session {
            self.commit(session).await?;
        }
        Ok(session)
    }

    async fn logout(&self) -> Result<(), AppError> {
        if let Some(session) = self.current().await
            && let Err(err) = self.revoke(&session).await
        {
            warn!(adapter = self.name(), error = %err, "remote sign-out failed, clearing local session anyway");
        }
        self.clear().await
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    Pending,
}

/// What the UI binds to: `loading` and `error` for one facade.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FacadeState {
    pub phase: Phase,
    pub error: Option<String>,
}

impl FacadeState {
    pub fn loading(&self) -> bool {
        self.phase == Phase::Pending
    }
}

impl From<&FacadeState> for FacadeStateResponse {
    fn from(state: &FacadeState) -> Self {
        Self {
            loading: state.loading(),
            error: state.error.clone(),
        }
    }
}

/// Uniform login/register/logout surface over a [`SessionAdapter`].
///
/// Each call moves `idle -> pending -> idle`, recording the outcome in
/// `error`. Only the remote half races `timeout`; when the timeout wins that
/// future is dropped, which cancels the in-flight request before anything
/// local has changed. The local half runs on its own task and always
/// finishes once started.
pub struct AuthFacade<A> {
    adapter: Arc<A>,
    state: watch::Sender<FacadeState>,
    timeout: Duration,
}

impl<A: SessionAdapter + 'static> AuthFacade<A> {
    pub fn new(adapter: Arc<A>, timeout: Duration) -> Self {
        let (state, _) = watch::channel(FacadeState::default());
        Self { adapter, state, timeout }
    }

    pub fn adapter(&self) -> &Arc<A> {
        &self.adapter
    }

    pub fn state(&self) -> FacadeState {
        self.state.borrow().clone()
    }

    pub fn loading(&self) -> bool {
        self.state.borrow().loading()
    }

    #[cfg(test)]
    pub fn error(&self) -> Option<String> {
        self.state.borrow().error.clone()
    }

    #[cfg(test)]
    pub fn subscribe(&self) -> watch::Receiver<FacadeState> {
        self.state.subscribe()
    }

    pub async fn login(&self, credentials: &Credentials) -> Result<Session, AppError> {
        if let Err(errors) = credentials.validate() {
            return Err(self.reject(errors.into()));
        }
        self.run("login", async {
            let session = self.remote(self.adapter.sign_in(credentials)).await?;
            self.commit(session.clone()).await?;
            Ok(session)
        })
        .await
    }

    pub async fn register(&self, registration: &Registration) -> Result<Option<Session>, AppError> {
        if let Err(errors) = registration.validate() {
            return Err(self.reject(errors.into()));
        }
        self.run("register", async {
            let session = self.remote(self.adapter.sign_up(registration)).await?;
            if let Some(session) = &session {
                self.commit(session.clone()).await?;
            }
            Ok(session)
        })
        .await
    }

    /// Local state is cleared even when the remote sign-out fails or times out.
    pub async fn logout(&self) -> Result<(), AppError> {
        self.run("logout", async {
            if let Some(session) = self.adapter.current().await
                && let Err(err) = self.remote(self.adapter.revoke(&session)).await
            {
                warn!(facade = self.adapter.name(), error = %err, "remote sign-out failed, clearing local session anyway");
            }
            self.detached(|adapter| async move { adapter.clear().await }).await
        })
        .await
    }

    /// Client-side validation failures never reach the network or enter `pending`.
    fn reject(&self, err: AppError) -> AppError {
        let message = err.user_message();
        self.state.send_modify(|state| state.error = Some(message));
        err
    }

    async fn remote<T, F>(&self, future: F) -> Result<T, AppError>
    where
        F: Future<Output = Result<T, AppError>>,
    {
        tokio::time::timeout(self.timeout, future)
            .await
            .unwrap_or_else(|_| Err(AppError::Timeout(self.timeout)))
    }

    async fn commit(&self, session: Session) -> Result<(), AppError> {
        self.detached(move |adapter| async move { adapter.commit(&session).await }).await
    }

    /// Runs a local state change on its own task, so dropping the caller
    /// cannot leave storage half written.
    async fn detached<F, Fut>(&self, change: F) -> Result<(), AppError>
    where
        F: FnOnce(Arc<A>) -> Fut,
        Fut: Future<Output = Result<(), AppError>> + Send + 'static,
    {
        tokio::spawn(change(self.adapter.clone()))
            .await
            .map_err(|e| AppError::Internal(format!("{} session update failed: {}", self.adapter.name(), e)))?
    }

    async fn run<T, F>(&self, operation: &'static str, future: F) -> Result<T, AppError>
    where
        F: Future<Output = Result<T, AppError>>,
    {
        self.state.send_modify(|state| {
            state.phase = Phase::Pending;
            state.error = None;
        });

        let result = future.await;

        match &result {
            Ok(_) => info!(facade = self.adapter.name(), operation, "auth operation succeeded"),
            Err(err) => warn!(facade = self.adapter.name(), operation, error = %err, "auth operation failed"),
        }

        let error = result.as_ref().err().map(AppError::user_message);
        self.state.send_modify(|state| {
            state.phase = Phase::Idle;
            state.error = error;
        });

        result
    }
}
