use rocket::serde::{Deserialize, Serialize};
use schemars::JsonSchema;
use validator::Validate;

// Account recovery and verification requests forwarded to the legacy API.

#[derive(Serialize, Deserialize, Debug, Clone, Validate, JsonSchema)]
pub struct ForgotPasswordRequest {
    #[validate(email)]
    pub email: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, Validate, JsonSchema)]
pub struct ForgotPasswordVerifyRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 4, max = 12))]
    pub code: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, Validate, JsonSchema)]
pub struct ResetPasswordRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub token: String,
    #[validate(length(min = 8))]
    #[validate(custom(function = "crate::models::user::validate_password_strength"))]
    pub password: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, Validate, JsonSchema)]
pub struct UpdatePasswordRequest {
    #[validate(length(min = 1))]
    pub current_password: String,
    #[validate(length(min = 8))]
    #[validate(custom(function = "crate::models::user::validate_password_strength"))]
    pub new_password: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, Validate, JsonSchema)]
pub struct TwoFactorCodeRequest {
    #[validate(length(equal = 6))]
    pub code: String,
}

/// Generic acknowledgement from pass-through endpoints.
#[derive(Serialize, Debug, JsonSchema)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn from_legacy(value: &serde_json::Value, fallback: &str) -> Self {
        let message = value.get("message").and_then(|m| m.as_str()).unwrap_or(fallback);
        Self { message: message.to_string() }
    }
}
