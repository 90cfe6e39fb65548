use rocket::data::{ByteUnit, Data, FromData, Outcome};
use rocket::http::Status;
use rocket::request::Request;
use rocket::serde::json::{Json, serde_json};
use rocket_okapi::r#gen::OpenApiGenerator;
use rocket_okapi::okapi::openapi3::RequestBody;
use rocket_okapi::request::OpenApiFromData;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use std::ops::Deref;
use tracing::warn;

const BODY_PREVIEW_LIMIT: usize = 500;

/// JSON data guard that logs why a portal payload was rejected.
///
/// Rocket's `Json` only reports a status; this wrapper records the parse
/// location and a truncated body so malformed consent toggles or login forms
/// from the UI can be diagnosed from the logs.
#[derive(Debug)]
pub struct JsonBody<T>(pub T);

impl<T> JsonBody<T> {
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> Deref for JsonBody<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[rocket::async_trait]
impl<'r, T: DeserializeOwned> FromData<'r> for JsonBody<T> {
    type Error = serde_json::Error;

    async fn from_data(req: &'r Request<'_>, data: Data<'r>) -> Outcome<'r, Self> {
        let limit = req.limits().get("json").unwrap_or(ByteUnit::Mebibyte(1));

        let bytes = match data.open(limit).into_bytes().await {
            Ok(bytes) if bytes.is_complete() => bytes.into_inner(),
            Ok(_) => {
                warn!(method = %req.method(), uri = %req.uri(), "JSON payload exceeded size limit");
                return Outcome::Error((Status::PayloadTooLarge, serde_json::Error::io(std::io::Error::other("payload too large"))));
            }
            Err(e) => {
                warn!(method = %req.method(), uri = %req.uri(), error = %e, "Failed to read request body");
                return Outcome::Error((Status::BadRequest, serde_json::Error::io(e)));
            }
        };

        match serde_json::from_slice::<T>(&bytes) {
            Ok(value) => Outcome::Success(JsonBody(value)),
            Err(e) => {
                warn!(
                    method = %req.method(),
                    uri = %req.uri(),
                    error_message = %e,
                    error_line = e.line(),
                    error_column = e.column(),
                    error_category = ?e.classify(),
                    request_body = %body_preview(&bytes),
                    "Failed to parse JSON request body"
                );

                Outcome::Error((Status::UnprocessableEntity, e))
            }
        }
    }
}

impl<'r, T: DeserializeOwned + JsonSchema> OpenApiFromData<'r> for JsonBody<T> {
    fn request_body(generator: &mut OpenApiGenerator) -> rocket_okapi::Result<RequestBody> {
        Json::<T>::request_body(generator)
    }
}

fn body_preview(bytes: &[u8]) -> String {
    let text = String::from_utf8_lossy(bytes);
    if text.chars().count() > BODY_PREVIEW_LIMIT {
        format!("{}...", text.chars().take(BODY_PREVIEW_LIMIT).collect::<String>())
    } else {
        text.into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::body_preview;

    #[test]
    fn preview_truncates_on_char_boundary() {
        let body = "é".repeat(600);
        let preview = body_preview(body.as_bytes());
        assert!(preview.ends_with("..."));
        assert_eq!(preview.chars().count(), 503);
    }

    #[test]
    fn short_bodies_are_kept_whole() {
        assert_eq!(body_preview(br#"{"permission":"labResults"}"#), r#"{"permission":"labResults"}"#);
    }
}
