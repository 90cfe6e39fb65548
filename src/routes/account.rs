use crate::auth::VisitorPortal;
use crate::error::app_error::AppError;
use crate::error::json::JsonBody;
use crate::models::account::{
    ForgotPasswordRequest, ForgotPasswordVerifyRequest, MessageResponse, ResetPasswordRequest, TwoFactorCodeRequest, UpdatePasswordRequest,
};
use rocket::serde::json::Json;
use rocket::{get, post};
use rocket_okapi::openapi;
use serde_json::Value;
use validator::Validate;

// Recovery, verification and profile endpoints still served by the legacy API.

#[openapi(tag = "Account")]
#[post("/forgot-password", data = "<payload>")]
pub async fn forgot_password(portal: VisitorPortal, payload: JsonBody<ForgotPasswordRequest>) -> Result<Json<MessageResponse>, AppError> {
    payload.validate()?;
    let reply = portal.0.legacy().adapter().client().forgot_password(&payload).await?;
    Ok(Json(MessageResponse::from_legacy(&reply, "If the account exists, a reset code has been sent.")))
}

#[openapi(tag = "Account")]
#[post("/forgot-password/verify", data = "<payload>")]
pub async fn forgot_password_verify(portal: VisitorPortal, payload: JsonBody<ForgotPasswordVerifyRequest>) -> Result<Json<Value>, AppError> {
    payload.validate()?;
    Ok(Json(portal.0.legacy().adapter().client().forgot_password_verify(&payload).await?))
}

#[openapi(tag = "Account")]
#[post("/reset-password", data = "<payload>")]
pub async fn reset_password(portal: VisitorPortal, payload: JsonBody<ResetPasswordRequest>) -> Result<Json<MessageResponse>, AppError> {
    payload.validate()?;
    let reply = portal.0.legacy().adapter().client().reset_password(&payload).await?;
    Ok(Json(MessageResponse::from_legacy(&reply, "Password has been reset.")))
}

#[openapi(tag = "Account")]
#[post("/two-factor/send")]
pub async fn send_two_factor_code(portal: VisitorPortal) -> Result<Json<MessageResponse>, AppError> {
    let token = portal.0.legacy_token().await;
    let reply = portal.0.legacy().adapter().client().send_two_factor_code(token.as_deref()).await?;
    Ok(Json(MessageResponse::from_legacy(&reply, "Verification code sent.")))
}

#[openapi(tag = "Account")]
#[post("/two-factor/verify", data = "<payload>")]
pub async fn verify_two_factor_code(portal: VisitorPortal, payload: JsonBody<TwoFactorCodeRequest>) -> Result<Json<Value>, AppError> {
    payload.validate()?;
    let token = portal.0.legacy_token().await;
    Ok(Json(portal.0.legacy().adapter().client().two_factor_verify_code(token.as_deref(), &payload.code).await?))
}

#[openapi(tag = "Account")]
#[post("/verify-email/send")]
pub async fn send_verify_email(portal: VisitorPortal) -> Result<Json<MessageResponse>, AppError> {
    let token = portal.0.legacy_token().await;
    let reply = portal.0.legacy().adapter().client().send_verify_email(token.as_deref()).await?;
    Ok(Json(MessageResponse::from_legacy(&reply, "Verification email sent.")))
}

#[openapi(tag = "Account")]
#[get("/profile")]
pub async fn profile(portal: VisitorPortal) -> Result<Json<Value>, AppError> {
    let token = portal.0.legacy_token().await;
    Ok(Json(portal.0.legacy().adapter().client().profile(token.as_deref()).await?))
}

#[openapi(tag = "Account")]
#[post("/password", data = "<payload>")]
pub async fn update_password(portal: VisitorPortal, payload: JsonBody<UpdatePasswordRequest>) -> Result<Json<MessageResponse>, AppError> {
    payload.validate()?;
    let token = portal.0.legacy_token().await;
    let reply = portal.0.legacy().adapter().client().update_password(token.as_deref(), &payload).await?;
    Ok(Json(MessageResponse::from_legacy(&reply, "Password updated.")))
}

#[openapi(tag = "Account")]
#[get("/notifications")]
pub async fn notification_settings(portal: VisitorPortal) -> Result<Json<Value>, AppError> {
    let token = portal.0.legacy_token().await;
    Ok(Json(portal.0.legacy().adapter().client().notification_settings(token.as_deref()).await?))
}

#[openapi(tag = "Account")]
#[post("/notifications", data = "<payload>")]
pub async fn update_notification_settings(portal: VisitorPortal, payload: JsonBody<Value>) -> Result<Json<Value>, AppError> {
    if !payload.is_object() {
        return Err(AppError::BadRequest("Notification settings must be a JSON object".to_string()));
    }
    let token = portal.0.legacy_token().await;
    Ok(Json(
        portal
            .0
            .legacy()
            .adapter()
            .client()
            .update_notification_settings(token.as_deref(), payload.into_inner())
            .await?,
    ))
}

pub fn routes() -> (Vec<rocket::Route>, okapi::openapi3::OpenApi) {
    rocket_okapi::openapi_get_routes_spec![
        forgot_password,
        forgot_password_verify,
        reset_password,
        send_two_factor_code,
        verify_two_factor_code,
        send_verify_email,
        profile,
        update_password,
        notification_settings,
        update_notification_settings
    ]
}
