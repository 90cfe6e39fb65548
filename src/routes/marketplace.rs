use crate::auth::VisitorPortal;
use crate::error::app_error::AppError;
use crate::error::json::JsonBody;
use crate::models::contract::ContractProposalRequest;
use rocket::serde::json::Json;
use rocket::serde::{Deserialize, Serialize};
use rocket::{get, post};
use rocket_okapi::openapi;
use schemars::JsonSchema;
use serde_json::Value;
use validator::Validate;

// Marketplace screens are thin pass-throughs to the legacy API.

#[derive(Serialize, Deserialize, Debug, Validate, JsonSchema)]
pub struct AcceptContractRequest {
    #[validate(length(min = 1))]
    pub contract_id: String,
}

/// Companies offering data-sharing contracts.
#[openapi(tag = "Marketplace")]
#[get("/companies")]
pub async fn companies(portal: VisitorPortal) -> Result<Json<Value>, AppError> {
    let token = portal.0.legacy_token().await;
    Ok(Json(portal.0.legacy().adapter().client().companies(token.as_deref()).await?))
}

#[openapi(tag = "Marketplace")]
#[get("/listings")]
pub async fn listings(portal: VisitorPortal) -> Result<Json<Value>, AppError> {
    let token = portal.0.legacy_token().await;
    Ok(Json(portal.0.legacy().adapter().client().listings(token.as_deref()).await?))
}

#[openapi(tag = "Marketplace")]
#[get("/elements")]
pub async fn elements(portal: VisitorPortal) -> Result<Json<Value>, AppError> {
    let token = portal.0.legacy_token().await;
    Ok(Json(portal.0.legacy().adapter().client().elements(token.as_deref()).await?))
}

/// Names of personal-information categories.
#[openapi(tag = "Marketplace")]
#[get("/pi-names")]
pub async fn pi_names(portal: VisitorPortal) -> Result<Json<Value>, AppError> {
    let token = portal.0.legacy_token().await;
    Ok(Json(portal.0.legacy().adapter().client().pi_names(token.as_deref()).await?))
}

/// Data elements the user has made available.
#[openapi(tag = "Marketplace")]
#[get("/data-elements")]
pub async fn user_data_elements(portal: VisitorPortal) -> Result<Json<Value>, AppError> {
    let token = portal.0.legacy_token().await;
    Ok(Json(portal.0.legacy().adapter().client().user_data_elements(token.as_deref()).await?))
}

#[openapi(tag = "Marketplace")]
#[get("/contracts")]
pub async fn contracts(portal: VisitorPortal) -> Result<Json<Value>, AppError> {
    let token = portal.0.legacy_token().await;
    Ok(Json(portal.0.legacy().adapter().client().contracts(token.as_deref()).await?))
}

#[openapi(tag = "Marketplace")]
#[post("/contracts/accept", data = "<payload>")]
pub async fn accept_contract(portal: VisitorPortal, payload: JsonBody<AcceptContractRequest>) -> Result<Json<Value>, AppError> {
    payload.validate()?;
    let token = portal.0.legacy_token().await;
    Ok(Json(portal.0.legacy().adapter().client().accept_contract(token.as_deref(), &payload.contract_id).await?))
}

#[openapi(tag = "Marketplace")]
#[post("/contracts/proposals", data = "<payload>")]
pub async fn dispatch_contract_proposal(portal: VisitorPortal, payload: JsonBody<ContractProposalRequest>) -> Result<Json<Value>, AppError> {
    payload.validate()?;
    let token = portal.0.legacy_token().await;
    Ok(Json(
        portal
            .0
            .legacy()
            .adapter()
            .client()
            .dispatch_contract_proposal(token.as_deref(), &payload)
            .await?,
    ))
}

pub fn routes() -> (Vec<rocket::Route>, okapi::openapi3::OpenApi) {
    rocket_okapi::openapi_get_routes_spec![
        companies,
        listings,
        elements,
        pi_names,
        user_data_elements,
        contracts,
        accept_contract,
        dispatch_contract_proposal
    ]
}
