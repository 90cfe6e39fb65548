use crate::database::postgres_repository::PostgresRepository;
use crate::error::app_error::AppError;
use crate::models::session::PlatformGrant;
use crate::models::user::PlatformUser;
use chrono::{DateTime, Utc};
use password_hash::rand_core::{OsRng, RngCore};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Opaque random token; only its digest is ever stored.
pub(crate) fn generate_token() -> String {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

pub(crate) fn token_digest(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

impl PostgresRepository {
    pub async fn create_platform_session(&self, user: PlatformUser) -> Result<PlatformGrant, AppError> {
        self.delete_expired_sessions_for_user(&user.id).await?;

        let access_token = generate_token();
        let refresh_token = generate_token();
        let now = Utc::now();

        let expires_at: DateTime<Utc> = sqlx::query_scalar(
            r#"
            INSERT INTO platform_session (user_id, access_token_hash, refresh_token_hash, expires_at, refresh_expires_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING expires_at
            "#,
        )
        .bind(user.id)
        .bind(token_digest(&access_token))
        .bind(token_digest(&refresh_token))
        .bind(now + self.policy.access_ttl)
        .bind(now + self.policy.refresh_ttl)
        .fetch_one(&self.pool)
        .await?;

        Ok(PlatformGrant {
            user,
            access_token,
            refresh_token,
            expires_at,
        })
    }

    pub async fn get_session_user(&self, access_token: &str) -> Result<Option<PlatformUser>, AppError> {
        let user = sqlx::query_as::<_, PlatformUser>(
            r#"
            SELECT u.id, u.name, u.email
            FROM platform_session s
            JOIN users u ON u.id = s.user_id
            WHERE s.access_token_hash = $1
              AND s.expires_at > now()
            "#,
        )
        .bind(token_digest(access_token))
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    /// Swaps a refresh token for a fresh token pair. The old pair stops working.
    pub async fn rotate_session(&self, refresh_token: &str) -> Result<PlatformGrant, AppError> {
        let mut transaction = self.pool.begin().await?;

        let user = sqlx::query_as::<_, PlatformUser>(
            r#"
            DELETE FROM platform_session s
            USING users u
            WHERE u.id = s.user_id
              AND s.refresh_token_hash = $1
              AND s.refresh_expires_at > now()
            RETURNING u.id, u.name, u.email
            "#,
        )
        .bind(token_digest(refresh_token))
        .fetch_optional(&mut *transaction)
        .await?
        .ok_or(AppError::Unauthorized)?;

        let access_token = generate_token();
        let new_refresh_token = generate_token();
        let now = Utc::now();
        let expires_at = now + self.policy.access_ttl;

        sqlx::query(
            r#"
            INSERT INTO platform_session (user_id, access_token_hash, refresh_token_hash, expires_at, refresh_expires_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(user.id)
        .bind(token_digest(&access_token))
        .bind(token_digest(&new_refresh_token))
        .bind(expires_at)
        .bind(now + self.policy.refresh_ttl)
        .execute(&mut *transaction)
        .await?;

        transaction.commit().await?;

        Ok(PlatformGrant {
            user,
            access_token,
            refresh_token: new_refresh_token,
            expires_at,
        })
    }

    pub async fn delete_session_by_access_token(&self, access_token: &str) -> Result<(), AppError> {
        sqlx::query("DELETE FROM platform_session WHERE access_token_hash = $1")
            .bind(token_digest(access_token))
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    pub async fn delete_expired_sessions_for_user(&self, user_id: &Uuid) -> Result<(), AppError> {
        sqlx::query("DELETE FROM platform_session WHERE user_id = $1 AND refresh_expires_at <= now()")
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_are_unique_hex() {
        let a = generate_token();
        let b = generate_token();
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }

    #[test]
    fn digest_is_stable_and_hides_token() {
        let token = generate_token();
        assert_eq!(token_digest(&token), token_digest(&token));
        assert_ne!(token_digest(&token), token);
    }
}
