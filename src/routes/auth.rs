use crate::auth::{PortalUser, VisitorPortal};
use crate::error::app_error::AppError;
use crate::error::json::JsonBody;
use crate::models::session::{DualAuthResponse, SessionResponse, SessionViewResponse};
use crate::models::user::{Credentials, Registration};
use rocket::http::Status;
use rocket::serde::json::Json;
use rocket::{get, post};
use rocket_okapi::openapi;

/// Sign in on both the platform and the legacy API.
/// The status follows the platform outcome; the legacy outcome is reported in the body.
#[openapi(tag = "Auth")]
#[post("/login", data = "<payload>")]
pub async fn login(portal: VisitorPortal, payload: JsonBody<Credentials>) -> Result<Json<DualAuthResponse>, AppError> {
    let VisitorPortal(portal) = portal;
    let outcome = portal.login(&payload).await;
    let response = portal.dual_response(&outcome);
    outcome.platform?;
    Ok(Json(response))
}

/// Create the account on both systems. Returns 409 when the platform already knows the email.
#[openapi(tag = "Auth")]
#[post("/register", data = "<payload>")]
pub async fn register(portal: VisitorPortal, payload: JsonBody<Registration>) -> Result<(Status, Json<DualAuthResponse>), AppError> {
    let VisitorPortal(portal) = portal;
    let outcome = portal.register(&payload).await;
    let response = portal.dual_response(&outcome);
    outcome.platform?;
    Ok((Status::Created, Json(response)))
}

#[openapi(tag = "Auth")]
#[post("/logout")]
pub async fn logout(portal: VisitorPortal) -> Result<Status, AppError> {
    portal.0.logout().await?;
    Ok(Status::NoContent)
}

/// The reconciled session state plus each facade's `loading`/`error`.
#[openapi(tag = "Auth")]
#[get("/session")]
pub async fn session(portal: VisitorPortal) -> Json<SessionViewResponse> {
    Json(portal.0.view_response())
}

#[openapi(tag = "Auth")]
#[get("/me")]
pub async fn me(user: PortalUser) -> Json<SessionResponse> {
    Json(SessionResponse::from(&user.session))
}

pub fn routes() -> (Vec<rocket::Route>, okapi::openapi3::OpenApi) {
    rocket_okapi::openapi_get_routes_spec![login, register, logout, session, me]
}
