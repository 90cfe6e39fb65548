use crate::database::postgres_repository::PostgresRepository;
use crate::error::app_error::AppError;
use crate::models::appointment::{Appointment, AppointmentRequest};
use crate::models::consent::ConsentRecord;
use crate::models::contract::Contract;
use crate::models::health::{HealthMetric, HealthRecord};
use crate::models::provider::{DataType, Provider, ProviderRequest};
use crate::models::session::PlatformGrant;
use crate::models::settings::{SettingsRequest, UserSettings};
use crate::models::user::{Credentials, PlatformUser, Registration};
use crate::platform::backend::PlatformBackend;
use tracing::debug;
use uuid::Uuid;

#[async_trait::async_trait]
impl PlatformBackend for PostgresRepository {
    async fn sign_up(&self, registration: &Registration) -> Result<PlatformGrant, AppError> {
        let user = self.create_user(&registration.name, &registration.email, &registration.password).await?;
        debug!(user_id = %user.id, "platform account created");
        self.create_platform_session(PlatformUser::from(&user)).await
    }

    async fn sign_in(&self, credentials: &Credentials) -> Result<PlatformGrant, AppError> {
        let Some(user) = self.get_user_by_email(&credentials.email).await? else {
            PostgresRepository::dummy_verify(&credentials.password);
            return Err(AppError::InvalidCredentials);
        };
        self.verify_password(&user, &credentials.password)?;
        self.create_platform_session(PlatformUser::from(&user)).await
    }

    async fn refresh(&self, refresh_token: &str) -> Result<PlatformGrant, AppError> {
        self.rotate_session(refresh_token).await
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), AppError> {
        self.delete_session_by_access_token(access_token).await
    }

    async fn authenticate(&self, access_token: &str) -> Result<Option<PlatformUser>, AppError> {
        self.get_session_user(access_token).await
    }

    async fn list_providers(&self, access_token: &str) -> Result<Vec<Provider>, AppError> {
        self.subject(access_token).await?;
        PostgresRepository::list_providers(self).await
    }

    async fn insert_provider(&self, access_token: &str, request: &ProviderRequest) -> Result<Provider, AppError> {
        let subject = self.subject(access_token).await?;
        self.create_provider(&subject, request).await
    }

    async fn list_data_types(&self, access_token: &str) -> Result<Vec<DataType>, AppError> {
        self.subject(access_token).await?;
        PostgresRepository::list_data_types(self).await
    }

    async fn list_consents(&self, access_token: &str) -> Result<Vec<ConsentRecord>, AppError> {
        let subject = self.subject(access_token).await?;
        PostgresRepository::list_consents(self, &subject).await
    }

    async fn find_consent(&self, access_token: &str, provider_id: &Uuid) -> Result<Option<ConsentRecord>, AppError> {
        let subject = self.subject(access_token).await?;
        PostgresRepository::find_consent(self, &subject, provider_id).await
    }

    async fn insert_consent(&self, access_token: &str, record: &ConsentRecord) -> Result<ConsentRecord, AppError> {
        let subject = self.subject(access_token).await?;
        PostgresRepository::insert_consent(self, &subject, record).await
    }

    async fn update_consent(&self, access_token: &str, record: &ConsentRecord) -> Result<ConsentRecord, AppError> {
        let subject = self.subject(access_token).await?;
        PostgresRepository::update_consent(self, &subject, record).await
    }

    async fn delete_consent(&self, access_token: &str, provider_id: &Uuid) -> Result<(), AppError> {
        let subject = self.subject(access_token).await?;
        PostgresRepository::delete_consent(self, &subject, provider_id).await
    }

    async fn get_settings(&self, access_token: &str) -> Result<Option<UserSettings>, AppError> {
        let subject = self.subject(access_token).await?;
        PostgresRepository::get_settings(self, &subject).await
    }

    async fn upsert_settings(&self, access_token: &str, request: &SettingsRequest) -> Result<UserSettings, AppError> {
        let subject = self.subject(access_token).await?;
        PostgresRepository::upsert_settings(self, &subject, request).await
    }

    async fn list_appointments(&self, access_token: &str) -> Result<Vec<Appointment>, AppError> {
        let subject = self.subject(access_token).await?;
        PostgresRepository::list_appointments(self, &subject).await
    }

    async fn insert_appointment(&self, access_token: &str, request: &AppointmentRequest) -> Result<Appointment, AppError> {
        let subject = self.subject(access_token).await?;
        self.create_appointment(&subject, request).await
    }

    async fn delete_appointment(&self, access_token: &str, appointment_id: &Uuid) -> Result<(), AppError> {
        let subject = self.subject(access_token).await?;
        PostgresRepository::delete_appointment(self, &subject, appointment_id).await
    }

    async fn list_health_metrics(&self, access_token: &str) -> Result<Vec<HealthMetric>, AppError> {
        let subject = self.subject(access_token).await?;
        PostgresRepository::list_health_metrics(self, &subject).await
    }

    async fn list_health_records(&self, access_token: &str) -> Result<Vec<HealthRecord>, AppError> {
        let subject = self.subject(access_token).await?;
        PostgresRepository::list_health_records(self, &subject).await
    }

    async fn list_contracts(&self, access_token: &str) -> Result<Vec<Contract>, AppError> {
        let subject = self.subject(access_token).await?;
        PostgresRepository::list_contracts(self, &subject).await
    }
}
