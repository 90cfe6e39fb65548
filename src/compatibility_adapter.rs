use serde::{Deserialize, Serialize};
use serde_json::Value;

/// User snapshot the legacy adapter persists next to its token.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct LegacyUser {
    pub id: String,
    pub email: String,
    pub name: String,
}

/// The legacy API has answered auth calls in several shapes over time
/// (`{token, user}`, `{data: {access_token, user}}`, bare user objects with
/// `first_name`/`last_name`). Lift whatever arrived into the current shape.
pub fn adapt_auth_payload(v: &Value) -> (Option<String>, Option<LegacyUser>) {
    let data = v.get("data").filter(|d| d.is_object()).unwrap_or(v);
    (extract_token(data).or_else(|| extract_token(v)), extract_user(data).or_else(|| extract_user(v)))
}

fn extract_token(v: &Value) -> Option<String> {
    ["token", "access_token", "accessToken"]
        .iter()
        .find_map(|field| v.get(field).and_then(Value::as_str))
        .filter(|token| !token.is_empty())
        .map(str::to_string)
}

fn extract_user(v: &Value) -> Option<LegacyUser> {
    let user = v.get("user").filter(|u| u.is_object()).unwrap_or(v);
    let email = user.get("email").and_then(Value::as_str)?.to_string();

    let id = match user.get("id").or_else(|| user.get("user_id")) {
        Some(Value::String(id)) => id.clone(),
        Some(Value::Number(id)) => id.to_string(),
        _ => return None,
    };

    let name = match user.get("name").and_then(Value::as_str) {
        Some(name) => name.to_string(),
        None => {
            let first = user.get("first_name").and_then(Value::as_str).unwrap_or_default();
            let last = user.get("last_name").and_then(Value::as_str).unwrap_or_default();
            format!("{} {}", first, last).trim().to_string()
        }
    };

    Some(LegacyUser { id, email, name })
}
