use crate::auth::PortalUser;
use crate::error::app_error::AppError;
use crate::error::json::JsonBody;
use crate::models::settings::{SettingsRequest, SettingsResponse, UserSettings};
use rocket::serde::json::Json;
use rocket::{get, put};
use rocket_okapi::openapi;
use uuid::Uuid;
use validator::Validate;

/// Current user's settings; defaults until the first save.
#[openapi(tag = "Settings")]
#[get("/")]
pub async fn get_settings(user: PortalUser) -> Result<Json<SettingsResponse>, AppError> {
    let backend = user.portal.platform().adapter().backend().clone();
    let settings = match backend.get_settings(&user.access_token).await? {
        Some(settings) => settings,
        None => UserSettings::defaults_for(Uuid::parse_str(&user.session.subject_id)?),
    };
    Ok(Json(SettingsResponse::from(&settings)))
}

/// Update current user's settings (creates if not exists)
#[openapi(tag = "Settings")]
#[put("/", data = "<payload>")]
pub async fn put_settings(user: PortalUser, payload: JsonBody<SettingsRequest>) -> Result<Json<SettingsResponse>, AppError> {
    payload.validate()?;

    let backend = user.portal.platform().adapter().backend().clone();
    let settings = backend.upsert_settings(&user.access_token, &payload).await?;
    Ok(Json(SettingsResponse::from(&settings)))
}

pub fn routes() -> (Vec<rocket::Route>, okapi::openapi3::OpenApi) {
    rocket_okapi::openapi_get_routes_spec![get_settings, put_settings]
}
