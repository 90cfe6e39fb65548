use crate::auth::{GuardDecision, VisitorPortal};
use crate::config::Config;
use crate::error::app_error::AppError;
use rocket::http::{Header, Status};
use rocket::response::{Redirect, Responder};
use rocket::serde::Serialize;
use rocket::serde::json::Json;
use rocket::{Request, State, get};
use rocket_okapi::OpenApiError;
use rocket_okapi::r#gen::OpenApiGenerator;
use rocket_okapi::okapi::openapi3::{RefOr, Response as OpenApiResponse, Responses};
use rocket_okapi::openapi;
use rocket_okapi::response::OpenApiResponderInner;
use schemars::JsonSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Login,
    Register,
    ForgotPassword,
    Dashboard,
    Calendar,
    Consent,
    Marketplace,
    Settings,
}

impl Screen {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "login" => Some(Screen::Login),
            "register" => Some(Screen::Register),
            "forgot-password" => Some(Screen::ForgotPassword),
            "dashboard" => Some(Screen::Dashboard),
            "calendar" => Some(Screen::Calendar),
            "consent" => Some(Screen::Consent),
            "marketplace" => Some(Screen::Marketplace),
            "settings" => Some(Screen::Settings),
            _ => None,
        }
    }

    pub fn is_protected(self) -> bool {
        !matches!(self, Screen::Login | Screen::Register | Screen::ForgotPassword)
    }

    fn title(self) -> &'static str {
        match self {
            Screen::Login => "Sign in",
            Screen::Register => "Create account",
            Screen::ForgotPassword => "Reset password",
            Screen::Dashboard => "Dashboard",
            Screen::Calendar => "Appointments",
            Screen::Consent => "Data sharing",
            Screen::Marketplace => "Marketplace",
            Screen::Settings => "Settings",
        }
    }
}

#[derive(Serialize, Debug, JsonSchema)]
pub struct ScreenDescriptor {
    pub screen: String,
    pub title: String,
    pub protected: bool,
}

/// The route guard's answer for a screen navigation.
pub enum Navigation {
    Render(Json<ScreenDescriptor>),
    Login(Redirect),
    Wait,
}

impl<'r> Responder<'r, 'static> for Navigation {
    fn respond_to(self, req: &'r Request<'_>) -> rocket::response::Result<'static> {
        match self {
            Navigation::Render(json) => json.respond_to(req),
            Navigation::Login(redirect) => redirect.respond_to(req),
            Navigation::Wait => rocket::Response::build()
                .status(Status::Accepted)
                .header(Header::new("Retry-After", "1"))
                .ok(),
        }
    }
}

impl OpenApiResponderInner for Navigation {
    fn responses(generator: &mut OpenApiGenerator) -> Result<Responses, OpenApiError> {
        let mut responses = Json::<ScreenDescriptor>::responses(generator)?;
        for (code, description) in [
            ("202", "Session still being established; retry after the Retry-After delay"),
            ("303", "No platform session; redirect to the login screen"),
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

/// Ask the route guard whether a screen may be shown.
#[openapi(tag = "Navigation")]
#[get("/<screen>")]
pub async fn navigate(portal: VisitorPortal, config: &State<Config>, screen: &str) -> Result<Navigation, AppError> {
    let target = Screen::parse(screen).ok_or_else(|| AppError::NotFound(format!("Unknown screen: {}", screen)))?;

    let descriptor = || {
        Navigation::Render(Json(ScreenDescriptor {
            screen: screen.to_string(),
            title: target.title().to_string(),
            protected: target.is_protected(),
        }))
    };

    if !target.is_protected() {
        return Ok(descriptor());
    }

    Ok(match portal.0.guard().await {
        GuardDecision::Allow => descriptor(),
        GuardDecision::Redirect => Navigation::Login(Redirect::to(config.auth.login_path.clone())),
        GuardDecision::Wait => Navigation::Wait,
    })
}

pub fn routes() -> (Vec<rocket::Route>, okapi::openapi3::OpenApi) {
    rocket_okapi::openapi_get_routes_spec![navigate]
}

#[cfg(test)]
mod tests {
    use super::Screen;
    use crate::test_utils::test_portal;
    use rocket::http::Status;

    #[test]
    fn only_auth_screens_are_public() {
        assert!(!Screen::Login.is_protected());
        assert!(Screen::Consent.is_protected());
        assert_eq!(Screen::parse("marketplace"), Some(Screen::Marketplace));
        assert_eq!(Screen::parse("admin"), None);
    }

    #[rocket::async_test]
    async fn protected_screen_redirects_then_renders() {
        let portal = test_portal().await;

        let response = portal.client.get("/api/v1/navigate/dashboard").dispatch().await;
        assert_eq!(response.status(), Status::SeeOther);
        assert_eq!(response.headers().get_one("Location"), Some("/login"));

        portal.sign_up("ada@example.com").await;
        let response = portal.client.get("/api/v1/navigate/dashboard").dispatch().await;
        assert_eq!(response.status(), Status::Ok);
    }

    #[rocket::async_test]
    async fn login_screen_is_always_shown() {
        let portal = test_portal().await;
        let response = portal.client.get("/api/v1/navigate/login").dispatch().await;
        assert_eq!(response.status(), Status::Ok);
    }

    #[rocket::async_test]
    async fn logout_sends_the_visitor_back_to_login() {
        let portal = test_portal().await;
        portal.sign_up("ada@example.com").await;
        portal.client.post("/api/v1/auth/logout").dispatch().await;

        let response = portal.client.get("/api/v1/navigate/settings").dispatch().await;
        assert_eq!(response.status(), Status::SeeOther);
    }

    #[rocket::async_test]
    async fn unknown_screen_is_not_found() {
        let portal = test_portal().await;
        let response = portal.client.get("/api/v1/navigate/admin").dispatch().await;
        assert_eq!(response.status(), Status::NotFound);
    }
}
