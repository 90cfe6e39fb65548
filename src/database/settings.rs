use crate::database::postgres_repository::PostgresRepository;
use crate::error::app_error::AppError;
use crate::models::settings::{SettingsRequest, UserSettings};
use uuid::Uuid;

impl PostgresRepository {
    pub async fn get_settings(&self, user_id: &Uuid) -> Result<Option<UserSettings>, AppError> {
        let settings = sqlx::query_as::<_, UserSettings>(
            r#"
            SELECT user_id, email_notifications, sms_notifications, data_sharing_alerts,
                   theme, language, updated_at
            FROM user_settings
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(settings)
    }

    pub async fn upsert_settings(&self, user_id: &Uuid, request: &SettingsRequest) -> Result<UserSettings, AppError> {
        let settings = sqlx::query_as::<_, UserSettings>(
            r#"
            INSERT INTO user_settings (
                user_id,
                email_notifications,
                sms_notifications,
                data_sharing_alerts,
                theme,
                language,
                updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, now())
            ON CONFLICT (user_id) DO UPDATE SET
                email_notifications = EXCLUDED.email_notifications,
                sms_notifications = EXCLUDED.sms_notifications,
                data_sharing_alerts = EXCLUDED.data_sharing_alerts,
                theme = EXCLUDED.theme,
                language = EXCLUDED.language,
                updated_at = now()
            RETURNING user_id, email_notifications, sms_notifications, data_sharing_alerts,
                      theme, language, updated_at
            "#,
        )
        .bind(user_id)
        .bind(request.email_notifications)
        .bind(request.sms_notifications)
        .bind(request.data_sharing_alerts)
        .bind(&request.theme)
        .bind(&request.language)
        .fetch_one(&self.pool)
        .await?;

        Ok(settings)
    }
}
