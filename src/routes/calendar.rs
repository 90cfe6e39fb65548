use crate::auth::PortalUser;
use crate::error::app_error::AppError;
use crate::error::json::JsonBody;
use crate::models::appointment::{Appointment, AppointmentRequest};
use rocket::http::Status;
use rocket::serde::json::Json;
use rocket::{delete, get, post};
use rocket_okapi::openapi;
use uuid::Uuid;
use validator::Validate;

#[openapi(tag = "Calendar")]
#[get("/appointments")]
pub async fn list_appointments(user: PortalUser) -> Result<Json<Vec<Appointment>>, AppError> {
    let backend = user.portal.platform().adapter().backend().clone();
    Ok(Json(backend.list_appointments(&user.access_token).await?))
}

/// Book an appointment. `ends_at` must be after `starts_at`.
#[openapi(tag = "Calendar")]
#[post("/appointments", data = "<payload>")]
pub async fn create_appointment(user: PortalUser, payload: JsonBody<AppointmentRequest>) -> Result<(Status, Json<Appointment>), AppError> {
    payload.validate()?;

    let backend = user.portal.platform().adapter().backend().clone();
    let appointment = backend.insert_appointment(&user.access_token, &payload).await?;
    Ok((Status::Created, Json(appointment)))
}

#[openapi(tag = "Calendar")]
#[delete("/appointments/<id>")]
pub async fn delete_appointment(user: PortalUser, id: &str) -> Result<Status, AppError> {
    let appointment_id = Uuid::parse_str(id).map_err(|e| AppError::uuid("Invalid appointment id", e))?;
    let backend = user.portal.platform().adapter().backend().clone();
    backend.delete_appointment(&user.access_token, &appointment_id).await?;
    Ok(Status::NoContent)
}

pub fn routes() -> (Vec<rocket::Route>, okapi::openapi3::OpenApi) {
    rocket_okapi::openapi_get_routes_spec![list_appointments, create_appointment, delete_appointment]
}
