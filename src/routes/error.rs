use rocket::http::{Header, Status};
use rocket::response::Responder;
use rocket::serde::Serialize;
use rocket::serde::json::Json;
use rocket::{Request, Response, catch};

#[derive(Serialize)]
#[serde(crate = "rocket::serde")]
pub struct Error {
    pub message: String,
}

fn error(message: &str) -> Json<Error> {
    Json(Error {
        message: message.to_string(),
    })
}

#[catch(400)]
pub fn bad_request(_: &Request) -> Json<Error> {
    error("Bad request")
}

#[catch(401)]
pub fn unauthorized(_: &Request) -> Json<Error> {
    error("Sign in required")
}

#[catch(404)]
pub fn not_found(_: &Request) -> Json<Error> {
    error("Not found")
}

#[catch(409)]
pub fn conflict(_: &Request) -> Json<Error> {
    error("Conflict")
}

#[catch(422)]
pub fn unprocessable_entity(_: &Request) -> Json<Error> {
    error("Malformed request body")
}

/// Guard rejections while a sign-in is still in flight.
pub struct SessionPending(Json<Error>);

impl<'r> Responder<'r, 'static> for SessionPending {
    fn respond_to(self, req: &'r Request<'_>) -> rocket::response::Result<'static> {
        Response::build_from(self.0.respond_to(req)?)
            .status(Status::ServiceUnavailable)
            .header(Header::new("Retry-After", "1"))
            .ok()
    }
}

#[catch(503)]
pub fn service_unavailable(_: &Request) -> SessionPending {
    SessionPending(error("Session is still being established"))
}
