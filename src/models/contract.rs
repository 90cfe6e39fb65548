use chrono::{DateTime, Utc};
use rocket::serde::{Deserialize, Serialize};
use schemars::JsonSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, sqlx::FromRow, JsonSchema)]
pub struct Contract {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub counterparty: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

impl Contract {
    pub fn is_active(&self) -> bool {
        matches!(self.status.as_str(), "active" | "accepted")
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Validate, JsonSchema)]
pub struct ContractProposalRequest {
    #[validate(length(min = 1))]
    pub company_id: String,
    #[validate(length(min = 1))]
    pub data_elements: Vec<String>,
    #[validate(length(max = 2000))]
    pub message: Option<String>,
}
