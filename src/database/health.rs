use crate::database::postgres_repository::PostgresRepository;
use crate::error::app_error::AppError;
use crate::models::contract::Contract;
use crate::models::health::{HealthMetric, HealthRecord};
use uuid::Uuid;

impl PostgresRepository {
    pub async fn list_health_metrics(&self, user_id: &Uuid) -> Result<Vec<HealthMetric>, AppError> {
        let metrics = sqlx::query_as::<_, HealthMetric>(
            r#"
            SELECT id, user_id, metric_type, value, unit, recorded_at
            FROM health_metrics
            WHERE user_id = $1
            ORDER BY recorded_at DESC
            LIMIT 500
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(metrics)
    }

    pub async fn list_health_records(&self, user_id: &Uuid) -> Result<Vec<HealthRecord>, AppError> {
        let records = sqlx::query_as::<_, HealthRecord>(
            r#"
            SELECT id, user_id, record_type, title, summary, recorded_at
            FROM health_records
            WHERE user_id = $1
            ORDER BY recorded_at DESC
            LIMIT 50
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    pub async fn list_contracts(&self, user_id: &Uuid) -> Result<Vec<Contract>, AppError> {
        let contracts = sqlx::query_as::<_, Contract>(
            r#"
            SELECT id, user_id, title, counterparty, status, created_at
            FROM contracts
            WHERE user_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(contracts)
    }
}
