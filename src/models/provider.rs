use crate::models::consent::Permissions;
use chrono::{DateTime, Utc};
use rocket::serde::{Deserialize, Serialize};
use schemars::JsonSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, sqlx::FromRow, JsonSchema)]
pub struct Provider {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub category: String,
    pub status: String,
    pub logo: Option<String>,
    pub data_types: Vec<String>,
    pub last_sync: Option<DateTime<Utc>>,
}

#[derive(Deserialize, Debug, Clone, Validate, JsonSchema)]
pub struct ProviderRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(length(min = 1, max = 100))]
    pub category: String,
    #[validate(length(min = 1, max = 50))]
    pub status: String,
    #[validate(url)]
    pub logo: Option<String>,
    #[serde(default)]
    pub data_types: Vec<String>,
}

/// A provider as the consent screen shows it: the catalogue entry joined with
/// this user's flags.
#[derive(Serialize, Debug, Clone, PartialEq, Eq, JsonSchema)]
pub struct ProviderView {
    pub provider: Provider,
    pub permissions: Permissions,
    pub approved: bool,
}

impl ProviderView {
    pub fn new(provider: Provider, permissions: Permissions) -> Self {
        Self {
            approved: permissions.approved(),
            provider,
            permissions,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, sqlx::FromRow, JsonSchema)]
pub struct DataType {
    pub id: Uuid,
    pub name: String,
}
