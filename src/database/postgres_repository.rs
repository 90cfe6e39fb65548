use crate::config::PlatformConfig;
use crate::error::app_error::AppError;
use sqlx::PgPool;
use uuid::Uuid;

/// Token lifetimes the platform hands out.
#[derive(Debug, Clone, Copy)]
pub struct SessionPolicy {
    pub access_ttl: chrono::Duration,
    pub refresh_ttl: chrono::Duration,
}

impl From<&PlatformConfig> for SessionPolicy {
    fn from(config: &PlatformConfig) -> Self {
        Self {
            access_ttl: chrono::Duration::seconds(config.access_token_ttl_seconds),
            refresh_ttl: chrono::Duration::days(config.refresh_token_ttl_days),
        }
    }
}

#[derive(Clone)]
pub struct PostgresRepository {
    pub pool: PgPool,
    pub policy: SessionPolicy,
}

impl PostgresRepository {
    /// Row-level policy entry point: every table access starts by turning
    /// the caller's access token into the subject its rows are keyed on.
    pub async fn subject(&self, access_token: &str) -> Result<Uuid, AppError> {
        let subject: Option<Uuid> = sqlx::query_scalar(
            r#"
            SELECT user_id
            FROM platform_session
            WHERE access_token_hash = $1
              AND expires_at > now()
            "#,
        )
        .bind(crate::database::session::token_digest(access_token))
        .fetch_optional(&self.pool)
        .await?;

        subject.ok_or(AppError::Unauthorized)
    }
}
