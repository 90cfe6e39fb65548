use crate::database::postgres_repository::PostgresRepository;
use crate::error::app_error::AppError;
use crate::models::provider::{DataType, Provider, ProviderRequest};
use uuid::Uuid;

const PROVIDER_SELECT: &str = r#"
    SELECT p.id, p.owner_id, p.name, p.category, p.status, p.logo, p.last_sync,
           COALESCE(array_agg(dt.name ORDER BY dt.name) FILTER (WHERE dt.name IS NOT NULL), '{}') AS data_types
    FROM providers p
    LEFT JOIN provider_data_types pdt ON pdt.provider_id = p.id
    LEFT JOIN data_types dt ON dt.id = pdt.data_type_id
"#;

impl PostgresRepository {
    pub async fn list_providers(&self) -> Result<Vec<Provider>, AppError> {
        let providers = sqlx::query_as::<_, Provider>(&format!("{} GROUP BY p.id ORDER BY p.name", PROVIDER_SELECT))
            .fetch_all(&self.pool)
            .await?;

        Ok(providers)
    }

    pub async fn get_provider(&self, id: &Uuid) -> Result<Option<Provider>, AppError> {
        let provider = sqlx::query_as::<_, Provider>(&format!("{} WHERE p.id = $1 GROUP BY p.id", PROVIDER_SELECT))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(provider)
    }

    pub async fn create_provider(&self, owner_id: &Uuid, request: &ProviderRequest) -> Result<Provider, AppError> {
        let mut transaction = self.pool.begin().await?;

        let provider_id: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO providers (owner_id, name, category, status, logo)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(owner_id)
        .bind(&request.name)
        .bind(&request.category)
        .bind(&request.status)
        .bind(&request.logo)
        .fetch_one(&mut *transaction)
        .await?;

        for name in normalized_data_types(&request.data_types) {
            let data_type_id: Uuid = sqlx::query_scalar(
                r#"
                INSERT INTO data_types (name)
                VALUES ($1)
                ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name
                RETURNING id
                "#,
            )
            .bind(&name)
            .fetch_one(&mut *transaction)
            .await?;

            sqlx::query("INSERT INTO provider_data_types (provider_id, data_type_id) VALUES ($1, $2)")
                .bind(provider_id)
                .bind(data_type_id)
                .execute(&mut *transaction)
                .await?;
        }

        transaction.commit().await?;

        self.get_provider(&provider_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Provider not found".to_string()))
    }

    pub async fn list_data_types(&self) -> Result<Vec<DataType>, AppError> {
        let data_types = sqlx::query_as::<_, DataType>("SELECT id, name FROM data_types ORDER BY name")
            .fetch_all(&self.pool)
            .await?;

        Ok(data_types)
    }
}

/// Trimmed, lower-cased, de-duplicated data type names in sorted order.
pub(crate) fn normalized_data_types(names: &[String]) -> Vec<String> {
    let mut normalized: Vec<String> = names.iter().map(|n| n.trim().to_lowercase()).filter(|n| !n.is_empty()).collect();
    normalized.sort();
    normalized.dedup();
    normalized
}
