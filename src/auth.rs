use crate::error::app_error::AppError;
use crate::models::session::Session;
use crate::service::portal::PortalSession;
use crate::service::registry::PortalServices;
use rocket::http::{Cookie, SameSite, Status};
use rocket::outcome::Outcome;
use rocket::request::{FromRequest, Outcome as RequestOutcome, Request};
use rocket_okapi::r#gen::OpenApiGenerator;
use rocket_okapi::okapi::openapi3::{Object, Responses, SecurityRequirement, SecurityScheme, SecuritySchemeData};
use rocket_okapi::request::{OpenApiFromRequest, RequestHeaderInput};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

pub const VISITOR_COOKIE: &str = "portal_visitor";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    Allow,
    Redirect,
    Wait,
}

/// Only the platform session gates protected screens. While either facade is
/// mid-operation the answer is not known yet.
pub fn decide(platform_session: Option<&Session>, pending: bool) -> GuardDecision {
    if pending {
        GuardDecision::Wait
    } else if platform_session.is_some() {
        GuardDecision::Allow
    } else {
        GuardDecision::Redirect
    }
}

/// The browser behind a request, identified by a private cookie issued on first contact.
#[derive(Debug, Clone)]
pub struct Visitor {
    pub id: Uuid,
}

pub(crate) fn parse_visitor_cookie_value(value: &str) -> Option<Uuid> {
    Uuid::parse_str(value.trim()).ok()
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for Visitor {
    type Error = AppError;

    async fn from_request(req: &'r Request<'_>) -> RequestOutcome<Self, Self::Error> {
        let visitor = req.local_cache(|| {
            let cookies = req.cookies();
            let id = match cookies.get_private(VISITOR_COOKIE).and_then(|c| parse_visitor_cookie_value(c.value())) {
                Some(id) => id,
                None => {
                    let id = Uuid::new_v4();
                    debug!(visitor = %id, "issuing visitor cookie");
                    cookies.add_private(
                        Cookie::build((VISITOR_COOKIE, id.to_string()))
                            .path("/")
                            .http_only(true)
                            .same_site(SameSite::Lax),
                    );
                    id
                }
            };
            Some(Visitor { id })
        });

        match visitor {
            Some(visitor) => Outcome::Success(visitor.clone()),
            None => Outcome::Error((Status::InternalServerError, AppError::Unauthorized)),
        }
    }
}

/// The visitor's portal, whether or not anyone is signed in.
pub struct VisitorPortal(pub Arc<PortalSession>);

#[rocket::async_trait]
impl<'r> FromRequest<'r> for VisitorPortal {
    type Error = AppError;

    async fn from_request(req: &'r Request<'_>) -> RequestOutcome<Self, Self::Error> {
        let visitor = match req.guard::<Visitor>().await {
            Outcome::Success(visitor) => visitor,
            Outcome::Error(e) => return Outcome::Error(e),
            Outcome::Forward(status) => return Outcome::Forward(status),
        };

        let Some(services) = req.rocket().state::<Arc<PortalServices>>() else {
            return Outcome::Error((Status::InternalServerError, AppError::Unauthorized));
        };

        Outcome::Success(VisitorPortal(services.portal(&visitor.id).await))
    }
}

/// A visitor with a live platform session; what protected API routes require.
pub struct PortalUser {
    pub portal: Arc<PortalSession>,
    pub session: Session,
    pub access_token: String,
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for PortalUser {
    type Error = AppError;

    async fn from_request(req: &'r Request<'_>) -> RequestOutcome<Self, Self::Error> {
        let portal = match req.guard::<VisitorPortal>().await {
            Outcome::Success(VisitorPortal(portal)) => portal,
            Outcome::Error(e) => return Outcome::Error(e),
            Outcome::Forward(status) => return Outcome::Forward(status),
        };

        match portal.guard().await {
            GuardDecision::Wait => Outcome::Error((Status::ServiceUnavailable, AppError::SessionPending)),
            GuardDecision::Redirect => Outcome::Error((Status::Unauthorized, AppError::Unauthorized)),
            GuardDecision::Allow => {
                let access_token = match portal.access_token().await {
                    Ok(token) => token,
                    Err(err) if err.is_unauthorized() => return Outcome::Error((Status::Unauthorized, err)),
                    Err(err) => return Outcome::Error((Status::from(&err), err)),
                };
                match portal.platform_session().await {
                    Some(session) => Outcome::Success(PortalUser {
                        portal,
                        session,
                        access_token,
                    }),
                    None => Outcome::Error((Status::Unauthorized, AppError::Unauthorized)),
                }
            }
        }
    }
}

impl<'a> OpenApiFromRequest<'a> for Visitor {
    fn from_request_input(_gen: &mut OpenApiGenerator, _name: String, _required: bool) -> rocket_okapi::Result<RequestHeaderInput> {
        Ok(RequestHeaderInput::None)
    }
}

impl<'a> OpenApiFromRequest<'a> for VisitorPortal {
    fn from_request_input(_gen: &mut OpenApiGenerator, _name: String, _required: bool) -> rocket_okapi::Result<RequestHeaderInput> {
        Ok(RequestHeaderInput::None)
    }
}

impl<'a> OpenApiFromRequest<'a> for PortalUser {
    fn from_request_input(_gen: &mut OpenApiGenerator, _name: String, _required: bool) -> rocket_okapi::Result<RequestHeaderInput> {
        let security_scheme = SecurityScheme {
            description: Some("Visitor cookie with a signed-in platform session. Sign in via POST /auth/login.".to_string()),
            data: SecuritySchemeData::ApiKey {
                name: VISITOR_COOKIE.to_string(),
                location: "cookie".to_string(),
            },
            extensions: Object::default(),
        };

        let mut security_req = SecurityRequirement::new();
        security_req.insert("visitorCookie".to_string(), Vec::new());

        Ok(RequestHeaderInput::Security("visitorCookie".to_string(), security_scheme, security_req))
    }

    fn get_responses(_gen: &mut OpenApiGenerator) -> rocket_okapi::Result<Responses> {
        use rocket_okapi::okapi::openapi3::{RefOr, Response};
        let mut responses = Responses::default();
        responses.responses.insert(
            "401".to_string(),
            RefOr::Object(Response {
                description: "Unauthorized - platform session required".to_string(),
                ..Default::default()
            }),
        );
        responses.responses.insert(
            "503".to_string(),
            RefOr::Object(Response {
                description: "Session still being established - retry after the Retry-After delay".to_string(),
                ..Default::default()
            }),
        );
        Ok(responses)
    }
}
