use chrono::{DateTime, Utc};
use rocket::serde::{Deserialize, Serialize};
use schemars::JsonSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, sqlx::FromRow, JsonSchema)]
pub struct Appointment {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub provider_name: Option<String>,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub location: Option<String>,
    pub notes: Option<String>,
}

#[derive(Deserialize, Debug, Clone, Validate, JsonSchema)]
#[validate(schema(function = "validate_time_range"))]
pub struct AppointmentRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    pub provider_name: Option<String>,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub location: Option<String>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

fn validate_time_range(request: &AppointmentRequest) -> Result<(), ValidationError> {
    if request.ends_at > request.starts_at {
        Ok(())
    } else {
        Err(ValidationError::new("ends_before_start"))
    }
}
