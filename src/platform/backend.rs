use crate::error::app_error::AppError;
use crate::models::appointment::{Appointment, AppointmentRequest};
use crate::models::consent::ConsentRecord;
use crate::models::contract::Contract;
use crate::models::health::{HealthMetric, HealthRecord};
use crate::models::provider::{DataType, Provider, ProviderRequest};
use crate::models::session::PlatformGrant;
use crate::models::settings::{SettingsRequest, UserSettings};
use crate::models::user::{Credentials, PlatformUser, Registration};
use uuid::Uuid;

/// The backend-as-a-service the portal is migrating to.
///
/// Every row operation takes the caller's access token; the backend resolves
/// the subject from it and applies its row-level policies. Callers never
/// pass a user id for rows they do not own.
#[async_trait::async_trait]
pub trait PlatformBackend: Send + Sync {
    async fn sign_up(&self, registration: &Registration) -> Result<PlatformGrant, AppError>;
    async fn sign_in(&self, credentials: &Credentials) -> Result<PlatformGrant, AppError>;
    async fn refresh(&self, refresh_token: &str) -> Result<PlatformGrant, AppError>;
    async fn sign_out(&self, access_token: &str) -> Result<(), AppError>;
    /// The user behind a still-valid access token.
    async fn authenticate(&self, access_token: &str) -> Result<Option<PlatformUser>, AppError>;

    /// Readable by every authenticated subject.
    async fn list_providers(&self, access_token: &str) -> Result<Vec<Provider>, AppError>;
    async fn insert_provider(&self, access_token: &str, request: &ProviderRequest) -> Result<Provider, AppError>;
    async fn list_data_types(&self, access_token: &str) -> Result<Vec<DataType>, AppError>;

    async fn list_consents(&self, access_token: &str) -> Result<Vec<ConsentRecord>, AppError>;
    async fn find_consent(&self, access_token: &str, provider_id: &Uuid) -> Result<Option<ConsentRecord>, AppError>;
    async fn insert_consent(&self, access_token: &str, record: &ConsentRecord) -> Result<ConsentRecord, AppError>;
    async fn update_consent(&self, access_token: &str, record: &ConsentRecord) -> Result<ConsentRecord, AppError>;
    async fn delete_consent(&self, access_token: &str, provider_id: &Uuid) -> Result<(), AppError>;

    async fn get_settings(&self, access_token: &str) -> Result<Option<UserSettings>, AppError>;
    async fn upsert_settings(&self, access_token: &str, request: &SettingsRequest) -> Result<UserSettings, AppError>;

    async fn list_appointments(&self, access_token: &str) -> Result<Vec<Appointment>, AppError>;
    async fn insert_appointment(&self, access_token: &str, request: &AppointmentRequest) -> Result<Appointment, AppError>;
    async fn delete_appointment(&self, access_token: &str, appointment_id: &Uuid) -> Result<(), AppError>;

    async fn list_health_metrics(&self, access_token: &str) -> Result<Vec<HealthMetric>, AppError>;
    async fn list_health_records(&self, access_token: &str) -> Result<Vec<HealthRecord>, AppError>;
    async fn list_contracts(&self, access_token: &str) -> Result<Vec<Contract>, AppError>;
}
