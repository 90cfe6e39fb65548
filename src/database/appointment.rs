use crate::database::postgres_repository::PostgresRepository;
use crate::error::app_error::AppError;
use crate::models::appointment::{Appointment, AppointmentRequest};
use uuid::Uuid;

impl PostgresRepository {
    pub async fn list_appointments(&self, user_id: &Uuid) -> Result<Vec<Appointment>, AppError> {
        let appointments = sqlx::query_as::<_, Appointment>(
            r#"
            SELECT id, user_id, title, provider_name, starts_at, ends_at, location, notes
            FROM appointments
            WHERE user_id = $1
            ORDER BY starts_at
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(appointments)
    }

    pub async fn create_appointment(&self, user_id: &Uuid, request: &AppointmentRequest) -> Result<Appointment, AppError> {
        let appointment = sqlx::query_as::<_, Appointment>(
            r#"
            INSERT INTO appointments (user_id, title, provider_name, starts_at, ends_at, location, notes)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, user_id, title, provider_name, starts_at, ends_at, location, notes
            "#,
        )
        .bind(user_id)
        .bind(&request.title)
        .bind(&request.provider_name)
        .bind(request.starts_at)
        .bind(request.ends_at)
        .bind(&request.location)
        .bind(&request.notes)
        .fetch_one(&self.pool)
        .await?;

        Ok(appointment)
    }

    pub async fn delete_appointment(&self, user_id: &Uuid, id: &Uuid) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM appointments WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Appointment not found".to_string()));
        }

        Ok(())
    }
}
