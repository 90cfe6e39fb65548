use chrono::{DateTime, Utc};
use rocket::serde::{Deserialize, Serialize};
use schemars::JsonSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

#[derive(Serialize, Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct UserSettings {
    pub user_id: Uuid,
    pub email_notifications: bool,
    pub sms_notifications: bool,
    pub data_sharing_alerts: bool,
    pub theme: String,
    pub language: String,
    pub updated_at: DateTime<Utc>,
}

impl UserSettings {
    /// What the settings screen shows before the user has saved anything.
    pub fn defaults_for(user_id: Uuid) -> Self {
        Self {
            user_id,
            email_notifications: true,
            sms_notifications: false,
            data_sharing_alerts: true,
            theme: "light".to_string(),
            language: "en".to_string(),
            updated_at: Utc::now(),
        }
    }
}

#[derive(Serialize, Debug, JsonSchema)]
pub struct SettingsResponse {
    pub email_notifications: bool,
    pub sms_notifications: bool,
    pub data_sharing_alerts: bool,
    pub theme: String,
    pub language: String,
    pub updated_at: DateTime<Utc>,
}

impl From<&UserSettings> for SettingsResponse {
    fn from(value: &UserSettings) -> Self {
        Self {
            email_notifications: value.email_notifications,
            sms_notifications: value.sms_notifications,
            data_sharing_alerts: value.data_sharing_alerts,
            theme: value.theme.clone(),
            language: value.language.clone(),
            updated_at: value.updated_at,
        }
    }
}

#[derive(Deserialize, Debug, Clone, Validate, JsonSchema)]
pub struct SettingsRequest {
    pub email_notifications: bool,
    pub sms_notifications: bool,
    pub data_sharing_alerts: bool,
    #[validate(custom(function = "validate_theme"))]
    #[schemars(regex(pattern = r"^(light|dark|auto)$"))]
    pub theme: String,
    #[validate(length(equal = 2))]
    pub language: String,
}

fn validate_theme(theme: &str) -> Result<(), ValidationError> {
    if matches!(theme, "light" | "dark" | "auto") {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_theme"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_unknown_theme() {
        let request = SettingsRequest {
            email_notifications: true,
            sms_notifications: false,
            data_sharing_alerts: true,
            theme: "neon".to_string(),
            language: "en".to_string(),
        };
        assert!(request.validate().is_err());
    }
}
