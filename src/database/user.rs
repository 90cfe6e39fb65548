use crate::database::postgres_repository::PostgresRepository;
use crate::error::app_error::AppError;
use crate::models::user::User;
use argon2::Argon2;
use password_hash::rand_core::OsRng;
use password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, Salt, SaltString};
use std::sync::LazyLock;

/// A real Argon2 hash generated once at startup, used as a timing decoy
/// so that sign-in attempts for unknown e-mails take as long as real ones.
static DUMMY_HASH: LazyLock<Option<String>> = LazyLock::new(|| {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(b"dummy-never-matches", Salt::from(&salt))
        .ok()
        .map(|hash| hash.to_string())
});

impl PostgresRepository {
    pub async fn create_user(&self, name: &str, email: &str, password: &str) -> Result<User, AppError> {
        if self.get_user_by_email(email).await?.is_some() {
            return Err(AppError::UserAlreadyExists(email.to_string()));
        }

        let (salt, password_hash) = password_hash(password)?;

        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (name, email, salt, password_hash)
            VALUES ($1, lower($2), $3, $4)
            RETURNING id, name, email, password_hash, created_at
            "#,
        )
        .bind(name)
        .bind(email)
        .bind(&salt)
        .bind(&password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            // Lost a race with a concurrent registration of the same address.
            sqlx::Error::Database(ref db) if db.is_unique_violation() => AppError::UserAlreadyExists(email.to_string()),
            other => AppError::from(other),
        })?;

        Ok(user)
    }

    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, password_hash, created_at
            FROM users
            WHERE email = lower($1)
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    pub fn verify_password(&self, user: &User, password: &str) -> Result<(), AppError> {
        let password_hash = PasswordHash::new(&user.password_hash).map_err(|e| AppError::password_hash("Failed to parse stored password hash", e))?;
        Argon2::default()
            .verify_password(password.as_bytes(), &password_hash)
            .map_err(|_| AppError::InvalidCredentials)?;

        Ok(())
    }

    /// Burn the same Argon2 work as a real verification for unknown accounts.
    pub fn dummy_verify(password: &str) {
        if let Some(hash) = DUMMY_HASH.as_deref()
            && let Ok(hash) = PasswordHash::new(hash)
        {
            let _ = Argon2::default().verify_password(password.as_bytes(), &hash);
        }
    }
}

pub(crate) fn password_hash(password: &str) -> Result<(String, String), AppError> {
    let salt_string = SaltString::generate(&mut OsRng);
    let salt = Salt::from(&salt_string);
    let password_hash = PasswordHash::generate(Argon2::default(), password.as_bytes(), salt)?;

    Ok((salt.to_string(), password_hash.to_string()))
}
