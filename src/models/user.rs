use chrono::{DateTime, Utc};
use rocket::serde::{Deserialize, Serialize};
use schemars::JsonSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

const MIN_PASSWORD_SCORE: u8 = 3;

/// Account row owned by the platform backend.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// Identity the platform reports for an access token.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, sqlx::FromRow, JsonSchema)]
pub struct PlatformUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

impl From<&User> for PlatformUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
        }
    }
}

#[derive(Deserialize, Debug, Clone, Validate, JsonSchema)]
pub struct Credentials {
    #[validate(email(message = "Please enter a valid email address"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Deserialize, Debug, Clone, Validate, JsonSchema)]
pub struct Registration {
    #[validate(length(min = 1, max = 120, message = "Name is required"))]
    pub name: String,
    #[validate(email(message = "Please enter a valid email address"))]
    pub email: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    #[validate(custom(function = "validate_password_strength"))]
    pub password: String,
}

impl Registration {
    pub fn credentials(&self) -> Credentials {
        Credentials {
            email: self.email.clone(),
            password: self.password.clone(),
        }
    }
}

pub fn validate_password_strength(password: &str) -> Result<(), ValidationError> {
    let estimate = zxcvbn::zxcvbn(password, &[]);
    if (estimate.score() as u8) < MIN_PASSWORD_SCORE {
        let mut error = ValidationError::new("weak_password");
        error.message = Some("Password is too weak".into());
        return Err(error);
    }
    Ok(())
}
