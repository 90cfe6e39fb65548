use crate::config::LegacyApiConfig;
use crate::error::app_error::AppError;
use crate::models::account::{ForgotPasswordRequest, ForgotPasswordVerifyRequest, ResetPasswordRequest, UpdatePasswordRequest};
use crate::models::consent::LegacyConsentPayload;
use crate::models::contract::ContractProposalRequest;
use crate::models::user::{Credentials, Registration};
use reqwest::header::{AUTHORIZATION, HeaderName, HeaderValue};
use reqwest::{StatusCode, Url};
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LegacyMethod {
    Get,
    Post,
}

/// One call against the legacy REST API, before tenant and transport concerns.
#[derive(Debug, Clone, PartialEq)]
pub struct LegacyRequest {
    pub method: LegacyMethod,
    pub path: &'static str,
    pub bearer: Option<String>,
    pub body: Option<Value>,
}

impl LegacyRequest {
    fn get(path: &'static str, bearer: Option<&str>) -> Self {
        Self {
            method: LegacyMethod::Get,
            path,
            bearer: bearer.map(str::to_string),
            body: None,
        }
    }

    fn post(path: &'static str, bearer: Option<&str>, body: Value) -> Self {
        Self {
            method: LegacyMethod::Post,
            path,
            bearer: bearer.map(str::to_string),
            body: Some(body),
        }
    }
}

#[async_trait::async_trait]
pub trait LegacyTransport: Send + Sync {
    async fn execute(&self, request: LegacyRequest) -> Result<Value, AppError>;
}

pub struct HttpTransport {
    client: reqwest::Client,
    base_url: Url,
    tenant_header: HeaderName,
    tenant: HeaderValue,
}

impl HttpTransport {
    pub fn new(config: &LegacyApiConfig) -> Result<Self, AppError> {
        let mut base = config.base_url.clone();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base_url = Url::parse(&base).map_err(|e| AppError::BadRequest(format!("Invalid legacy base URL: {}", e)))?;
        let tenant_header = HeaderName::from_bytes(config.tenant_header.as_bytes())
            .map_err(|e| AppError::BadRequest(format!("Invalid tenant header name: {}", e)))?;
        let tenant = HeaderValue::from_str(&config.tenant).map_err(|e| AppError::BadRequest(format!("Invalid tenant: {}", e)))?;

        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_millis(config.connect_timeout_ms))
            .build()?;

        Ok(Self {
            client,
            base_url,
            tenant_header,
            tenant,
        })
    }
}

#[async_trait::async_trait]
impl LegacyTransport for HttpTransport {
    async fn execute(&self, request: LegacyRequest) -> Result<Value, AppError> {
        let url = self
            .base_url
            .join(request.path)
            .map_err(|e| AppError::BadRequest(format!("Invalid legacy path {}: {}", request.path, e)))?;

        let mut builder = match request.method {
            LegacyMethod::Get => self.client.get(url),
            LegacyMethod::Post => self.client.post(url),
        };
        builder = builder.header(self.tenant_header.clone(), self.tenant.clone());
        if let Some(token) = &request.bearer {
            builder = builder.header(AUTHORIZATION, format!("Bearer {}", token));
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        let bytes = response.bytes().await?;
        let body: Value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };

        debug!(path = request.path, status = status.as_u16(), "legacy API responded");

        if status.is_success() {
            Ok(body)
        } else {
            Err(api_error(status, &body))
        }
    }
}

/// Maps a non-2xx legacy response to a typed error carrying status and message.
pub(crate) fn api_error(status: StatusCode, body: &Value) -> AppError {
    let message = ["message", "error", "detail"]
        .iter()
        .find_map(|field| body.get(field).and_then(Value::as_str))
        .or_else(|| body.as_str().filter(|s| !s.is_empty()))
        .map(str::to_string)
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("Unknown error").to_string());

    AppError::Api {
        status: status.as_u16(),
        message,
    }
}

/// Typed surface over the legacy endpoints the portal still consumes.
#[derive(Clone)]
pub struct LegacyApiClient {
    transport: Arc<dyn LegacyTransport>,
}

impl LegacyApiClient {
    pub fn new(transport: Arc<dyn LegacyTransport>) -> Self {
        Self { transport }
    }

    async fn send(&self, request: LegacyRequest) -> Result<Value, AppError> {
        self.transport.execute(request).await
    }

    pub async fn login(&self, credentials: &Credentials) -> Result<Value, AppError> {
        self.send(LegacyRequest::post(
            "login",
            None,
            json!({"email": credentials.email, "password": credentials.password}),
        ))
        .await
    }

    pub async fn register(&self, registration: &Registration) -> Result<Value, AppError> {
        self.send(LegacyRequest::post(
            "register",
            None,
            json!({
                "name": registration.name,
                "email": registration.email,
                "password": registration.password,
                "password_confirmation": registration.password,
            }),
        ))
        .await
    }

    pub async fn logout(&self, token: &str) -> Result<(), AppError> {
        self.send(LegacyRequest::post("logout", Some(token), json!({}))).await?;
        Ok(())
    }

    pub async fn me(&self, token: &str) -> Result<Value, AppError> {
        self.send(LegacyRequest::get("me", Some(token))).await
    }

    pub async fn profile(&self, token: Option<&str>) -> Result<Value, AppError> {
        self.send(LegacyRequest::get("profile", token)).await
    }

    pub async fn update_password(&self, token: Option<&str>, request: &UpdatePasswordRequest) -> Result<Value, AppError> {
        self.send(LegacyRequest::post(
            "update-password",
            token,
            json!({
                "current_password": request.current_password,
                "password": request.new_password,
                "password_confirmation": request.new_password,
            }),
        ))
        .await
    }

    pub async fn forgot_password(&self, request: &ForgotPasswordRequest) -> Result<Value, AppError> {
        self.send(LegacyRequest::post("forgot-password", None, serde_json::to_value(request)?)).await
    }

    pub async fn forgot_password_verify(&self, request: &ForgotPasswordVerifyRequest) -> Result<Value, AppError> {
        self.send(LegacyRequest::post("forgot-password-verify", None, serde_json::to_value(request)?))
            .await
    }

    pub async fn reset_password(&self, request: &ResetPasswordRequest) -> Result<Value, AppError> {
        self.send(LegacyRequest::post(
            "reset-password",
            None,
            json!({
                "email": request.email,
                "token": request.token,
                "password": request.password,
                "password_confirmation": request.password,
            }),
        ))
        .await
    }

    pub async fn two_factor_verify_code(&self, token: Option<&str>, code: &str) -> Result<Value, AppError> {
        self.send(LegacyRequest::post("two-factor-verify-code", token, json!({"code": code}))).await
    }

    pub async fn send_two_factor_code(&self, token: Option<&str>) -> Result<Value, AppError> {
        self.send(LegacyRequest::post("send-2facode", token, json!({}))).await
    }

    pub async fn send_verify_email(&self, token: Option<&str>) -> Result<Value, AppError> {
        self.send(LegacyRequest::post("send-Verify-email", token, json!({}))).await
    }

    pub async fn notification_settings(&self, token: Option<&str>) -> Result<Value, AppError> {
        self.send(LegacyRequest::get("user-notification-settings", token)).await
    }

    pub async fn update_notification_settings(&self, token: Option<&str>, settings: Value) -> Result<Value, AppError> {
        self.send(LegacyRequest::post("user-notification-settings", token, settings)).await
    }

    /// The generic settings write the consent fallback goes through.
    pub async fn update_settings(&self, token: Option<&str>, payload: &LegacyConsentPayload) -> Result<Value, AppError> {
        self.send(LegacyRequest::post("settings", token, serde_json::to_value(payload)?)).await
    }

    pub async fn contracts(&self, token: Option<&str>) -> Result<Value, AppError> {
        self.send(LegacyRequest::get("contracts", token)).await
    }

    pub async fn accept_contract(&self, token: Option<&str>, contract_id: &str) -> Result<Value, AppError> {
        self.send(LegacyRequest::post("accept-contract", token, json!({"contract_id": contract_id}))).await
    }

    pub async fn dispatch_contract_proposal(&self, token: Option<&str>, proposal: &ContractProposalRequest) -> Result<Value, AppError> {
        self.send(LegacyRequest::post("dispatch-contract-proposal", token, serde_json::to_value(proposal)?))
            .await
    }

    pub async fn companies(&self, token: Option<&str>) -> Result<Value, AppError> {
        self.send(LegacyRequest::get("company/list", token)).await
    }

    pub async fn listings(&self, token: Option<&str>) -> Result<Value, AppError> {
        self.send(LegacyRequest::get("list", token)).await
    }

    pub async fn elements(&self, token: Option<&str>) -> Result<Value, AppError> {
        self.send(LegacyRequest::get("elements", token)).await
    }

    pub async fn pi_names(&self, token: Option<&str>) -> Result<Value, AppError> {
        self.send(LegacyRequest::get("get-pinamelist", token)).await
    }

    pub async fn user_data_elements(&self, token: Option<&str>) -> Result<Value, AppError> {
        self.send(LegacyRequest::get("user-dataelement-list", token)).await
    }
}
