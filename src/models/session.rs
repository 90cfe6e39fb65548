use crate::models::user::PlatformUser;
use chrono::{DateTime, Utc};
use rocket::serde::{Deserialize, Serialize};
use schemars::JsonSchema;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum SessionSource {
    Legacy,
    Platform,
}

/// How a session proves itself to its backend.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SessionCredential {
    Legacy {
        token: String,
    },
    Platform {
        access_token: String,
        refresh_token: String,
        expires_at: DateTime<Utc>,
    },
}

/// One authenticated identity. A visitor may hold a legacy and a platform
/// session at the same time; nothing links the two beyond the e-mail.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub subject_id: String,
    pub email: String,
    pub display_name: String,
    pub credential: SessionCredential,
}

impl Session {
    pub fn source(&self) -> SessionSource {
        match self.credential {
            SessionCredential::Legacy { .. } => SessionSource::Legacy,
            SessionCredential::Platform { .. } => SessionSource::Platform,
        }
    }

    pub fn bearer_token(&self) -> &str {
        match &self.credential {
            SessionCredential::Legacy { token } => token,
            SessionCredential::Platform { access_token, .. } => access_token,
        }
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        match self.credential {
            SessionCredential::Platform { expires_at, .. } => Some(expires_at),
            SessionCredential::Legacy { .. } => None,
        }
    }

    /// Legacy tokens carry no expiry; only the legacy API can reject them.
    pub fn needs_refresh(&self, now: DateTime<Utc>, leeway: chrono::Duration) -> bool {
        self.expires_at().is_some_and(|expires_at| expires_at - leeway <= now)
    }
}

/// Tokens handed out by the platform on sign-in, sign-up and refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformGrant {
    pub user: PlatformUser,
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
}

impl From<PlatformGrant> for Session {
    fn from(grant: PlatformGrant) -> Self {
        Self {
            subject_id: grant.user.id.to_string(),
            email: grant.user.email,
            display_name: grant.user.name,
            credential: SessionCredential::Platform {
                access_token: grant.access_token,
                refresh_token: grant.refresh_token,
                expires_at: grant.expires_at,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEventKind {
    SignedIn,
    SignedOut,
    TokenRefreshed,
}

/// Notification published by the platform adapter whenever its session changes.
#[derive(Debug, Clone)]
pub struct SessionEvent {
    pub kind: SessionEventKind,
    pub session: Option<Session>,
}

/// The reconciled state of both session systems for one visitor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionView {
    pub authority: Option<SessionSource>,
    pub session: Option<Session>,
    pub platform_active: bool,
    pub legacy_active: bool,
    pub diverged: bool,
}

impl SessionView {
    /// Platform wins over legacy; legacy is only authoritative on its own.
    pub fn reconcile(platform: Option<&Session>, legacy: Option<&Session>) -> Self {
        let diverged = matches!((platform, legacy), (Some(p), Some(l)) if !p.email.eq_ignore_ascii_case(&l.email));
        let session = platform.or(legacy).cloned();

        Self {
            authority: session.as_ref().map(Session::source),
            session,
            platform_active: platform.is_some(),
            legacy_active: legacy.is_some(),
            diverged,
        }
    }
}

#[derive(Serialize, Debug, JsonSchema)]
pub struct SessionResponse {
    pub subject_id: String,
    pub email: String,
    pub display_name: String,
    pub source: SessionSource,
    pub expires_at: Option<DateTime<Utc>>,
}

impl From<&Session> for SessionResponse {
    fn from(session: &Session) -> Self {
        Self {
            subject_id: session.subject_id.clone(),
            email: session.email.clone(),
            display_name: session.display_name.clone(),
            source: session.source(),
            expires_at: session.expires_at(),
        }
    }
}

#[derive(Serialize, Debug, JsonSchema)]
pub struct FacadeStateResponse {
    pub loading: bool,
    pub error: Option<String>,
}

#[derive(Serialize, Debug, JsonSchema)]
pub struct SessionViewResponse {
    pub authority: Option<SessionSource>,
    pub session: Option<SessionResponse>,
    pub platform_active: bool,
    pub legacy_active: bool,
    pub diverged: bool,
    pub platform: FacadeStateResponse,
    pub legacy: FacadeStateResponse,
}

/// Per-backend outcome of a login or registration that ran on both systems.
#[derive(Serialize, Debug, JsonSchema)]
pub struct DualAuthResponse {
    pub session: SessionViewResponse,
    pub platform_error: Option<String>,
    pub legacy_error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn legacy(email: &str) -> Session {
        Session {
            subject_id: "42".to_string(),
            email: email.to_string(),
            display_name: "Legacy".to_string(),
            credential: SessionCredential::Legacy { token: "tok".to_string() },
        }
    }

    fn platform(email: &str, expires_at: DateTime<Utc>) -> Session {
        Session {
            subject_id: Uuid::new_v4().to_string(),
            email: email.to_string(),
            display_name: "Platform".to_string(),
            credential: SessionCredential::Platform {
                access_token: "access".to_string(),
                refresh_token: "refresh".to_string(),
                expires_at,
            },
        }
    }

    #[test]
    fn platform_takes_priority() {
        let p = platform("a@example.com", Utc::now());
        let l = legacy("a@example.com");
        let view = SessionView::reconcile(Some(&p), Some(&l));
        assert_eq!(view.authority, Some(SessionSource::Platform));
        assert!(view.platform_active && view.legacy_active);
        assert!(!view.diverged);
    }

    #[test]
    fn legacy_is_authoritative_alone() {
        let l = legacy("a@example.com");
        let view = SessionView::reconcile(None, Some(&l));
        assert_eq!(view.authority, Some(SessionSource::Legacy));
        assert_eq!(view.session.unwrap().bearer_token(), "tok");
    }

    #[test]
    fn different_people_are_flagged() {
        let p = platform("a@example.com", Utc::now());
        let l = legacy("b@example.com");
        assert!(SessionView::reconcile(Some(&p), Some(&l)).diverged);
    }

    #[test]
    fn refresh_window_respects_leeway() {
        let now = Utc::now();
        let session = platform("a@example.com", now + chrono::Duration::seconds(30));
        assert!(session.needs_refresh(now, chrono::Duration::seconds(60)));
        assert!(!session.needs_refresh(now, chrono::Duration::seconds(10)));
        assert!(!legacy("a@example.com").needs_refresh(now, chrono::Duration::seconds(60)));
    }
}
