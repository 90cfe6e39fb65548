use rocket::http::{Header, Status};
use rocket::response::Responder;
use rocket::{Request, Response};
use rocket_okapi::OpenApiError;
use rocket_okapi::r#gen::OpenApiGenerator;
use rocket_okapi::okapi::openapi3::Responses;
use rocket_okapi::response::OpenApiResponderInner;
use std::io::Cursor;
use std::time::Duration;
use thiserror::Error;
use tracing::error;
use validator::ValidationErrors;

pub const NETWORK_ERROR_MESSAGE: &str = "Network error. Please check your connection and try again.";
pub const INVALID_CREDENTIALS_MESSAGE: &str = "Invalid credentials";

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Internal server error")]
    Db {
        message: String,
        #[source]
        source: sqlx::error::Error,
    },
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Internal server error")]
    PasswordHash { message: String },
    #[error("User {0} already exists")]
    UserAlreadyExists(String),
    #[error("Bad request: {0}")]
    BadRequest(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Validation error: {0}")]
    ValidationError(#[from] ValidationErrors),
    #[error("Invalid UUID: {message}")]
    UuidError {
        message: String,
        #[source]
        source: uuid::Error,
    },
    #[error("Internal server error")]
    ConfigurationError {
        message: String,
        #[source]
        source: figment::Error,
    },
    #[error("Request timed out after {} ms", .0.as_millis())]
    Timeout(Duration),
    #[error("Upstream request failed: {message}")]
    Network {
        message: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("Legacy API error ({status}): {message}")]
    Api { status: u16, message: String },
    #[error("Row-level policy rejected the operation: {0}")]
    PolicyViolation(String),
    #[error("Internal server error")]
    Storage {
        message: String,
        #[source]
        source: redis::RedisError,
    },
    #[error("Internal server error")]
    Serialization {
        message: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("Session is still being established")]
    SessionPending,
    #[error("Internal server error")]
    Internal(String),
}

impl AppError {
    pub fn db(message: impl Into<String>, source: sqlx::error::Error) -> Self {
        Self::Db {
            message: message.into(),
            source,
        }
    }

    pub fn password_hash(message: impl Into<String>, source: password_hash::Error) -> Self {
        Self::PasswordHash {
            message: format!("{}: {}", message.into(), source),
        }
    }

    pub fn uuid(message: impl Into<String>, source: uuid::Error) -> Self {
        Self::UuidError {
            message: message.into(),
            source,
        }
    }

    pub fn network(message: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Network {
            message: message.into(),
            source,
        }
    }

    pub fn storage(message: impl Into<String>, source: redis::RedisError) -> Self {
        Self::Storage {
            message: message.into(),
            source,
        }
    }

    pub fn serialization(message: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Serialization {
            message: message.into(),
            source,
        }
    }

    /// True for 401-class failures, whichever backend reported them.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, AppError::Unauthorized | AppError::InvalidCredentials | AppError::Api { status: 401, .. })
    }

    /// The string a facade exposes for UI binding.
    pub fn user_message(&self) -> String {
        match self {
            AppError::Timeout(_) | AppError::Network { .. } => NETWORK_ERROR_MESSAGE.to_string(),
            _ if self.is_unauthorized() => INVALID_CREDENTIALS_MESSAGE.to_string(),
            AppError::Api { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

impl From<uuid::Error> for AppError {
    fn from(e: uuid::Error) -> Self {
        AppError::uuid("Invalid UUID", e)
    }
}

impl From<password_hash::Error> for AppError {
    fn from(e: password_hash::Error) -> Self {
        AppError::password_hash("Password hashing failed", e)
    }
}

impl From<&AppError> for Status {
    fn from(e: &AppError) -> Self {
        match e {
            AppError::InvalidCredentials => Status::Unauthorized,
            AppError::PasswordHash { .. } => Status::InternalServerError,
            AppError::Db { .. } => Status::InternalServerError,
            AppError::Unauthorized => Status::Unauthorized,
            AppError::UserAlreadyExists(_) => Status::Conflict,
            AppError::BadRequest(_) => Status::BadRequest,
            AppError::NotFound(_) => Status::NotFound,
            AppError::ValidationError(_) => Status::BadRequest,
            AppError::UuidError { .. } => Status::BadRequest,
            AppError::ConfigurationError { .. } => Status::InternalServerError,
            AppError::Timeout(_) => Status::GatewayTimeout,
            AppError::Network { .. } => Status::BadGateway,
            AppError::Api { status, .. } => match status {
                400 | 422 => Status::BadRequest,
                401 => Status::Unauthorized,
                403 => Status::Forbidden,
                404 => Status::NotFound,
                409 => Status::Conflict,
                _ => Status::BadGateway,
            },
            AppError::PolicyViolation(_) => Status::Forbidden,
            AppError::Storage { .. } => Status::InternalServerError,
            AppError::Serialization { .. } => Status::InternalServerError,
            AppError::SessionPending => Status::ServiceUnavailable,
            AppError::Internal(_) => Status::InternalServerError,
        }
    }
}

impl<'r> Responder<'r, 'static> for AppError {
    fn respond_to(self, req: &Request<'_>) -> rocket::response::Result<'static> {
        let method = req.method();
        let uri = req.uri();

        let request_id = req
            .local_cache(|| None::<crate::middleware::RequestId>)
            .as_ref()
            .map(|r| r.0.as_str())
            .unwrap_or("unknown");

        let visitor = req
            .local_cache(|| None::<crate::auth::Visitor>)
            .as_ref()
            .map(|v| v.id.to_string())
            .unwrap_or_else(|| "anonymous".to_string());

        error!(
            error = ?self,
            request_id = %request_id,
            visitor = %visitor,
            method = %method,
            uri = %uri,
            "request failed"
        );

        let status = Status::from(&self);
        let body = self.to_string();

        let mut response = Response::build();
        response.status(status).sized_body(body.len(), Cursor::new(body));
        if matches!(self, AppError::SessionPending) {
            response.header(Header::new("Retry-After", "1"));
        }
        response.ok()
    }
}

impl OpenApiResponderInner for AppError {
    fn responses(_gen: &mut OpenApiGenerator) -> Result<Responses, OpenApiError> {
        use rocket_okapi::okapi::openapi3::{RefOr, Response as OpenApiResponse};
        let mut responses = Responses::default();
        for (code, description) in [
            ("400", "Bad Request"),
            ("401", "Unauthorized - platform session required"),
            ("404", "Not Found"),
            ("502", "Legacy API unavailable"),
            ("503", "Session is still being established"),
            ("504", "Upstream request timed out"),
        ] {
            responses.responses.insert(
                code.to_string(),
                RefOr::Object(OpenApiResponse {
                    description: description.to_string(),
                    ..Default::default()
                }),
            );
        }
        Ok(responses)
    }
}

impl From<figment::Error> for AppError {
    fn from(e: figment::Error) -> Self {
        AppError::ConfigurationError {
            message: "Failed to read configuration".to_string(),
            source: e,
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::RowNotFound => AppError::NotFound("Resource not found".to_string()),
            sqlx::Error::Database(ref db) if db.is_unique_violation() => AppError::PolicyViolation(db.message().to_string()),
            sqlx::Error::Database(ref db) if db.is_foreign_key_violation() => AppError::PolicyViolation(db.message().to_string()),
            _ => AppError::db("Database error", e),
        }
    }
}

impl From<reqwest::Error> for AppError {
    fn from(e: reqwest::Error) -> Self {
        AppError::network("Legacy API request failed", e)
    }
}

impl From<redis::RedisError> for AppError {
    fn from(e: redis::RedisError) -> Self {
        AppError::storage("Session store error", e)
    }
}

impl From<serde_json::Error> for AppError {
    fn from(e: serde_json::Error) -> Self {
        AppError::serialization("Invalid JSON payload", e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_maps_to_retry_prompt() {
        let err = AppError::Timeout(Duration::from_millis(15_000));
        assert_eq!(err.user_message(), NETWORK_ERROR_MESSAGE);
        assert_eq!(Status::from(&err), Status::GatewayTimeout);
        assert_eq!(err.to_string(), "Request timed out after 15000 ms");
    }

    #[test]
    fn legacy_401_is_invalid_credentials() {
        let err = AppError::Api {
            status: 401,
            message: "token mismatch".to_string(),
        };
        assert!(err.is_unauthorized());
        assert_eq!(err.user_message(), INVALID_CREDENTIALS_MESSAGE);
        assert_eq!(Status::from(&err), Status::Unauthorized);
    }

    #[test]
    fn legacy_server_error_is_bad_gateway() {
        let err = AppError::Api {
            status: 500,
            message: "boom".to_string(),
        };
        assert_eq!(Status::from(&err), Status::BadGateway);
        assert_eq!(err.user_message(), "boom");
    }

    #[test]
    fn pending_session_is_unavailable() {
        assert_eq!(Status::from(&AppError::SessionPending), Status::ServiceUnavailable);
    }
}
