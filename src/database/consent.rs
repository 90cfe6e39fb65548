use crate::database::postgres_repository::PostgresRepository;
use crate::error::app_error::AppError;
use crate::models::consent::ConsentRecord;
use uuid::Uuid;

const CONSENT_COLUMNS: &str = "user_id::text AS user_id, provider_id, lab_results, medications, fitness_data, approved, updated_at";

impl PostgresRepository {
    pub async fn list_consents(&self, user_id: &Uuid) -> Result<Vec<ConsentRecord>, AppError> {
        let records = sqlx::query_as::<_, ConsentRecord>(&format!(
            "SELECT {} FROM user_provider_consents WHERE user_id = $1 ORDER BY updated_at DESC",
            CONSENT_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    pub async fn find_consent(&self, user_id: &Uuid, provider_id: &Uuid) -> Result<Option<ConsentRecord>, AppError> {
        let record = sqlx::query_as::<_, ConsentRecord>(&format!(
            "SELECT {} FROM user_provider_consents WHERE user_id = $1 AND provider_id = $2",
            CONSENT_COLUMNS
        ))
        .bind(user_id)
        .bind(provider_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    /// `approved` is derived from the flags here, whatever the caller sent.
    pub async fn insert_consent(&self, user_id: &Uuid, record: &ConsentRecord) -> Result<ConsentRecord, AppError> {
        let permissions = record.permissions();
        let inserted = sqlx::query_as::<_, ConsentRecord>(&format!(
            r#"
            INSERT INTO user_provider_consents (user_id, provider_id, lab_results, medications, fitness_data, approved, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, now())
            RETURNING {}
            "#,
            CONSENT_COLUMNS
        ))
        .bind(user_id)
        .bind(record.provider_id)
        .bind(permissions.lab_results)
        .bind(permissions.medications)
        .bind(permissions.fitness_data)
        .bind(permissions.approved())
        .fetch_one(&self.pool)
        .await?;

        Ok(inserted)
    }

    pub async fn update_consent(&self, user_id: &Uuid, record: &ConsentRecord) -> Result<ConsentRecord, AppError> {
        let permissions = record.permissions();
        let updated = sqlx::query_as::<_, ConsentRecord>(&format!(
            r#"
            UPDATE user_provider_consents
            SET lab_results = $3, medications = $4, fitness_data = $5, approved = $6, updated_at = now()
            WHERE user_id = $1 AND provider_id = $2
            RETURNING {}
            "#,
            CONSENT_COLUMNS
        ))
        .bind(user_id)
        .bind(record.provider_id)
        .bind(permissions.lab_results)
        .bind(permissions.medications)
        .bind(permissions.fitness_data)
        .bind(permissions.approved())
        .fetch_optional(&self.pool)
        .await?;

        updated.ok_or_else(|| AppError::NotFound("Consent record not found".to_string()))
    }

    pub async fn delete_consent(&self, user_id: &Uuid, provider_id: &Uuid) -> Result<(), AppError> {
        sqlx::query("DELETE FROM user_provider_consents WHERE user_id = $1 AND provider_id = $2")
            .bind(user_id)
            .bind(provider_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
