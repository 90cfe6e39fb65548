use crate::auth::PortalUser;
use crate::error::app_error::AppError;
use crate::error::json::JsonBody;
use crate::models::consent::{ConsentRecord, PermissionKey, PermissionRequest};
use crate::models::provider::{DataType, ProviderRequest, ProviderView};
use rocket::http::Status;
use rocket::serde::json::Json;
use rocket::{delete, get, post, put};
use rocket_okapi::openapi;
use uuid::Uuid;

#[allow(clippy::result_large_err)]
fn parse_provider_id(id: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(id).map_err(|e| AppError::uuid("Invalid provider id", e))
}

/// Providers with this user's permission flags.
#[openapi(tag = "Consent")]
#[get("/")]
pub async fn list_providers(user: PortalUser) -> Result<Json<Vec<ProviderView>>, AppError> {
    Ok(Json(user.portal.consent().load().await?))
}

#[openapi(tag = "Consent")]
#[post("/", data = "<payload>")]
pub async fn create_provider(user: PortalUser, payload: JsonBody<ProviderRequest>) -> Result<(Status, Json<ProviderView>), AppError> {
    let view = user.portal.consent().add_provider(&payload).await?;
    Ok((Status::Created, Json(view)))
}

/// Removes the provider from this user's consent list and deletes the consent record.
#[openapi(tag = "Consent")]
#[delete("/<id>")]
pub async fn remove_provider(user: PortalUser, id: &str) -> Result<Status, AppError> {
    let provider_id = parse_provider_id(id)?;
    user.portal.consent().remove_provider(&provider_id).await?;
    Ok(Status::NoContent)
}

/// Set one permission flag. Falls back to the legacy API when the platform write fails.
#[openapi(tag = "Consent")]
#[put("/<id>/permissions", data = "<payload>")]
pub async fn set_permission(user: PortalUser, id: &str, payload: JsonBody<PermissionRequest>) -> Result<Json<ConsentRecord>, AppError> {
    let provider_id = parse_provider_id(id)?;
    let record = user.portal.consent().set_permission(&provider_id, payload.permission, payload.value).await?;
    Ok(Json(record))
}

/// Flip one permission flag (`labResults`, `medications` or `fitnessData`).
#[openapi(tag = "Consent")]
#[post("/<id>/permissions/<permission>/toggle")]
pub async fn toggle_permission(user: PortalUser, id: &str, permission: &str) -> Result<Json<ConsentRecord>, AppError> {
    let provider_id = parse_provider_id(id)?;
    let key = PermissionKey::parse(permission).ok_or_else(|| AppError::BadRequest(format!("Unknown permission: {}", permission)))?;
    let record = user.portal.consent().toggle_permission(&provider_id, key).await?;
    Ok(Json(record))
}

#[openapi(tag = "Consent")]
#[get("/data-types")]
pub async fn list_data_types(user: PortalUser) -> Result<Json<Vec<DataType>>, AppError> {
    let data_types = user.portal.platform().adapter().backend().list_data_types(&user.access_token).await?;
    Ok(Json(data_types))
}

pub fn routes() -> (Vec<rocket::Route>, okapi::openapi3::OpenApi) {
    rocket_okapi::openapi_get_routes_spec![list_providers, create_provider, remove_provider, set_permission, toggle_permission, list_data_types]
}
