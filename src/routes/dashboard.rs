use crate::auth::PortalUser;
use crate::error::app_error::AppError;
use crate::models::health::{DashboardResponse, latest_metrics};
use chrono::Utc;
use rocket::get;
use rocket::serde::json::Json;
use rocket_okapi::openapi;

const RECENT_RECORDS: usize = 5;

/// Latest reading per metric, recent records, active contracts and counts for the home screen.
#[openapi(tag = "Dashboard")]
#[get("/")]
pub async fn get_dashboard(user: PortalUser) -> Result<Json<DashboardResponse>, AppError> {
    let backend = user.portal.platform().adapter().backend().clone();
    let token = user.access_token.as_str();

    let (metrics, mut records, contracts, consents, appointments) = tokio::try_join!(
        backend.list_health_metrics(token),
        backend.list_health_records(token),
        backend.list_contracts(token),
        backend.list_consents(token),
        backend.list_appointments(token),
    )?;

    records.sort_by(|a, b| b.recorded_at.cmp(&a.recorded_at));
    records.truncate(RECENT_RECORDS);
    let now = Utc::now();

    Ok(Json(DashboardResponse {
        display_name: user.session.display_name.clone(),
        latest_metrics: latest_metrics(&metrics),
        recent_records: records,
        active_contracts: contracts.into_iter().filter(|c| c.is_active()).collect(),
        connected_providers: consents.iter().filter(|c| c.approved).count(),
        upcoming_appointments: appointments.iter().filter(|a| a.starts_at > now).count(),
    }))
}

pub fn routes() -> (Vec<rocket::Route>, okapi::openapi3::OpenApi) {
    rocket_okapi::openapi_get_routes_spec![get_dashboard]
}
