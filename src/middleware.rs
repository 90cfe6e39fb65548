use crate::auth::Visitor;
use rocket::fairing::{Fairing, Info, Kind};
use rocket::http::Header;
use rocket::request::{FromRequest, Outcome, Request};
use rocket::{Data, Response};
use rocket_okapi::r#gen::OpenApiGenerator;
use rocket_okapi::request::{OpenApiFromRequest, RequestHeaderInput};
use tracing::{info, warn};
use uuid::Uuid;

pub const REQUEST_ID_HEADER: &str = "X-Request-Id";

/// Correlates the log lines of one request. An inbound `X-Request-Id` is kept
/// when it is a UUID, so traces line up with the calling frontend.
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

impl RequestId {
    pub fn new() -> Self {
        RequestId(Uuid::new_v4().to_string())
    }

    fn from_header(value: Option<&str>) -> Self {
        value
            .and_then(|v| Uuid::parse_str(v.trim()).ok())
            .map(|id| RequestId(id.to_string()))
            .unwrap_or_default()
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for RequestId {
    type Error = ();

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        if let Some(request_id) = request.local_cache(|| None::<RequestId>).as_ref() {
            return Outcome::Success(request_id.clone());
        }
        Outcome::Success(RequestId::new())
    }
}

impl<'a> OpenApiFromRequest<'a> for RequestId {
    fn from_request_input(_gen: &mut OpenApiGenerator, _name: String, _required: bool) -> rocket_okapi::Result<RequestHeaderInput> {
        Ok(RequestHeaderInput::None)
    }
}

/// Assigns request ids and logs every request with the visitor it belonged to.
pub struct RequestLogger;

#[rocket::async_trait]
impl Fairing for RequestLogger {
    fn info(&self) -> Info {
        Info {
            name: "Request Logger",
            kind: Kind::Request | Kind::Response,
        }
    }

    async fn on_request(&self, request: &mut Request<'_>, _: &mut Data<'_>) {
        let request_id = RequestId::from_header(request.headers().get_one(REQUEST_ID_HEADER));
        request.local_cache(|| Some(request_id.clone()));

        info!(
            request_id = %request_id.0,
            method = %request.method(),
            uri = %request.uri(),
            "incoming request"
        );
    }

    async fn on_response<'r>(&self, request: &'r Request<'_>, response: &mut Response<'r>) {
        let request_id = request
            .local_cache(|| None::<RequestId>)
            .as_ref()
            .map(|r| r.0.clone())
            .unwrap_or_else(|| "unknown".to_string());
        // Only set when a route asked for the visitor guard.
        let visitor = request
            .local_cache(|| None::<Visitor>)
            .as_ref()
            .map(|v| v.id.to_string())
            .unwrap_or_else(|| "none".to_string());

        let status = response.status();

        response.set_header(Header::new(REQUEST_ID_HEADER, request_id.clone()));
        response.set_header(Header::new("X-Content-Type-Options", "nosniff"));
        response.set_header(Header::new("X-Frame-Options", "DENY"));
        // Responses carry health data.
        response.set_header(Header::new("Cache-Control", "no-store"));

        if status.class().is_server_error() || status.class().is_client_error() {
            warn!(
                request_id = %request_id,
                visitor = %visitor,
                method = %request.method(),
                uri = %request.uri(),
                status = %status.code,
                "request completed with error"
            );
        } else {
            info!(
                request_id = %request_id,
                visitor = %visitor,
                method = %request.method(),
                uri = %request.uri(),
                status = %status.code,
                "request completed"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_ids_are_unique_uuids() {
        let first = RequestId::new();
        let second = RequestId::default();
        assert!(Uuid::parse_str(&first.0).is_ok());
        assert_ne!(first.0, second.0);
    }

    #[test]
    fn inbound_uuid_is_kept() {
        let inbound = Uuid::new_v4().to_string();
        assert_eq!(RequestId::from_header(Some(&inbound)).0, inbound);
    }

    #[test]
    fn inbound_garbage_is_replaced() {
        let id = RequestId::from_header(Some("<script>"));
        assert_ne!(id.0, "<script>");
        assert!(Uuid::parse_str(&id.0).is_ok());
    }
}
