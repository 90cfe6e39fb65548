use chrono::{DateTime, Utc};
use rocket::serde::{Deserialize, Serialize};
use schemars::JsonSchema;
use uuid::Uuid;

/// A data-sharing permission a user can grant to a provider.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum PermissionKey {
    #[serde(alias = "lab_results")]
    LabResults,
    Medications,
    #[serde(alias = "fitness_data")]
    FitnessData,
}

impl PermissionKey {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "labResults" | "lab_results" => Some(PermissionKey::LabResults),
            "medications" => Some(PermissionKey::Medications),
            "fitnessData" | "fitness_data" => Some(PermissionKey::FitnessData),
            _ => None,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq, JsonSchema)]
pub struct Permissions {
    pub lab_results: bool,
    pub medications: bool,
    pub fitness_data: bool,
}

impl Permissions {
    pub fn get(&self, key: PermissionKey) -> bool {
        match key {
            PermissionKey::LabResults => self.lab_results,
            PermissionKey::Medications => self.medications,
            PermissionKey::FitnessData => self.fitness_data,
        }
    }

    pub fn with(mut self, key: PermissionKey, value: bool) -> Self {
        match key {
            PermissionKey::LabResults => self.lab_results = value,
            PermissionKey::Medications => self.medications = value,
            PermissionKey::FitnessData => self.fitness_data = value,
        }
        self
    }

    pub fn approved(&self) -> bool {
        self.lab_results || self.medications || self.fitness_data
    }
}

/// Row of `user_provider_consents`, unique per (user, provider).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, sqlx::FromRow, JsonSchema)]
pub struct ConsentRecord {
    pub user_id: String,
    pub provider_id: Uuid,
    pub lab_results: bool,
    pub medications: bool,
    pub fitness_data: bool,
    pub approved: bool,
    pub updated_at: DateTime<Utc>,
}

impl ConsentRecord {
    pub fn new(user_id: impl Into<String>, provider_id: Uuid, permissions: Permissions) -> Self {
        Self {
            user_id: user_id.into(),
            provider_id,
            lab_results: permissions.lab_results,
            medications: permissions.medications,
            fitness_data: permissions.fitness_data,
            approved: permissions.approved(),
            updated_at: Utc::now(),
        }
    }

    pub fn permissions(&self) -> Permissions {
        Permissions {
            lab_results: self.lab_results,
            medications: self.medications,
            fitness_data: self.fitness_data,
        }
    }

    /// Sets one flag and recomputes `approved`; every write goes through here.
    pub fn with_permission(&self, key: PermissionKey, value: bool) -> Self {
        let permissions = self.permissions().with(key, value);
        Self {
            updated_at: Utc::now(),
            ..Self::new(self.user_id.clone(), self.provider_id, permissions)
        }
    }
}

#[derive(Deserialize, Debug, JsonSchema)]
pub struct PermissionRequest {
    pub permission: PermissionKey,
    pub value: bool,
}

/// Shape the legacy `settings` endpoint accepts for the consent fallback.
#[derive(Serialize, Debug)]
pub struct LegacyConsentPayload {
    pub provider_id: Uuid,
    pub permissions: Permissions,
    pub approved: bool,
}

impl From<&ConsentRecord> for LegacyConsentPayload {
    fn from(record: &ConsentRecord) -> Self {
        Self {
            provider_id: record.provider_id,
            permissions: record.permissions(),
            approved: record.approved,
        }
    }
}
