mod auth;
mod compatibility_adapter;
mod config;
mod database;
mod db;
mod error;
mod legacy;
mod middleware;
mod models;
mod platform;
mod routes;
mod service;
mod storage;

#[cfg(test)]
pub mod test_utils;

pub use config::Config;

use crate::db::stage_portal;
use crate::middleware::RequestLogger;
use crate::routes as app_routes;
#[cfg(test)]
use crate::service::registry::PortalServices;
use rocket::{Build, Rocket, catchers, http::Method};
use rocket_cors::{AllowedOrigins, CorsOptions};
use rocket_okapi::swagger_ui::{SwaggerUIConfig, make_swagger_ui};
use rocket_okapi::{get_openapi_route, okapi::merge::marge_spec_list};
#[cfg(test)]
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

fn init_tracing(log_level: &str, json_format: bool) {
    // Configure logging with environment variable support
    // RUST_LOG environment variable can be used for fine-grained control per module:
    // Examples:
    //   RUST_LOG=debug                              - Set all to debug
    //   RUST_LOG=health_portal=debug                - Set this crate to debug
    //   RUST_LOG=health_portal::service=trace       - Set specific module to trace
    //   RUST_LOG=info,health_portal::routes=debug   - Global info, routes at debug
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let subscriber = tracing_subscriber::fmt().with_env_filter(filter).with_target(true).with_line_number(true);

    // try_init: a second rocket in the same process keeps the first subscriber.
    let result = if json_format { subscriber.json().try_init() } else { subscriber.try_init() };
    if result.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}

fn ensure_rocket_secret_key() {
    let profile = std::env::var("ROCKET_PROFILE").unwrap_or_else(|_| "debug".to_string());

    // Only enforce ROCKET_SECRET_KEY requirement for non-debug profiles
    if profile != "debug" && std::env::var("ROCKET_SECRET_KEY").is_err() {
        panic!(
            "ROCKET_SECRET_KEY is required for profile '{}'. Generate one with: openssl rand -base64 32",
            profile
        );
    }
}

fn build_cors(cors_config: &config::CorsConfig) -> CorsOptions {
    let is_wildcard = cors_config.allowed_origins.len() == 1 && cors_config.allowed_origins[0] == "*";

    // Validate that wildcard origins are not combined with credentials
    if is_wildcard && cors_config.allow_credentials {
        panic!(
            "Invalid CORS configuration: Cannot use wildcard origins (*) with credentials enabled. \
            Either set specific origins or disable credentials."
        );
    }

    let allowed_origins = if cors_config.allowed_origins.is_empty() {
        AllowedOrigins::some_exact::<&str>(&[])
    } else if is_wildcard {
        AllowedOrigins::all()
    } else {
        AllowedOrigins::some_exact(&cors_config.allowed_origins.iter().map(String::as_str).collect::<Vec<_>>())
    };

    CorsOptions {
        allowed_origins,
        allowed_methods: vec![
            Method::Get,
            Method::Post,
            Method::Put,
            Method::Delete,
            Method::Options,
            Method::Head,
        ]
        .into_iter()
        .map(From::from)
        .collect(),
        // The visitor cookie carries the session; no Authorization header crosses this boundary.
        allowed_headers: rocket_cors::AllowedHeaders::some(&["Content-Type", "Accept", middleware::REQUEST_ID_HEADER]),
        expose_headers: [middleware::REQUEST_ID_HEADER, "Retry-After"].iter().map(|h| h.to_string()).collect(),
        allow_credentials: cors_config.allow_credentials,
        ..Default::default()
    }
}

fn get_swagger_config(openapi_url: &str) -> SwaggerUIConfig {
    SwaggerUIConfig {
        url: openapi_url.to_string(),
        ..Default::default()
    }
}

fn normalize_base_path(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return config::DEFAULT_API_BASE_PATH.to_string();
    }

    let mut normalized = if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{}", trimmed)
    };

    while normalized.ends_with('/') && normalized.len() > 1 {
        normalized.pop();
    }

    normalized
}

fn join_base_path(base_path: &str, path: &str) -> String {
    let base = base_path.trim_end_matches('/');
    let suffix = path.trim_start_matches('/');

    if base.is_empty() {
        format!("/{}", suffix)
    } else {
        format!("{}/{}", base, suffix)
    }
}

fn collect_base_paths(api_config: &config::ApiConfig) -> Vec<String> {
    let mut normalized: Vec<String> = Vec::new();
    let mut push_unique = |path: String| {
        if !normalized.contains(&path) {
            normalized.push(path);
        }
    };

    push_unique(normalize_base_path(&api_config.base_path));

    for extra in &api_config.additional_base_paths {
        let normalized_extra = normalize_base_path(extra);
        if !normalized_extra.is_empty() {
            push_unique(normalized_extra);
        }
    }

    normalized
}

struct RouteSpec {
    path: &'static str,
    routes: Vec<rocket::Route>,
    openapi: rocket_okapi::okapi::openapi3::OpenApi,
}

fn collect_route_specs() -> Vec<RouteSpec> {
    let (auth_routes, auth_openapi) = app_routes::auth::routes();
    let (account_routes, account_openapi) = app_routes::account::routes();
    let (providers_routes, providers_openapi) = app_routes::providers::routes();
    let (settings_routes, settings_openapi) = app_routes::settings::routes();
    let (calendar_routes, calendar_openapi) = app_routes::calendar::routes();
    let (dashboard_routes, dashboard_openapi) = app_routes::dashboard::routes();
    let (marketplace_routes, marketplace_openapi) = app_routes::marketplace::routes();
    let (navigation_routes, navigation_openapi) = app_routes::navigation::routes();
    let (health_routes, health_openapi) = app_routes::health::routes();

    vec![
        RouteSpec {
            path: "/auth",
            routes: auth_routes,
            openapi: auth_openapi,
        },
        RouteSpec {
            path: "/account",
            routes: account_routes,
            openapi: account_openapi,
        },
        RouteSpec {
            path: "/providers",
            routes: providers_routes,
            openapi: providers_openapi,
        },
        RouteSpec {
            path: "/settings",
            routes: settings_routes,
            openapi: settings_openapi,
        },
        RouteSpec {
            path: "/calendar",
            routes: calendar_routes,
            openapi: calendar_openapi,
        },
        RouteSpec {
            path: "/dashboard",
            routes: dashboard_routes,
            openapi: dashboard_openapi,
        },
        RouteSpec {
            path: "/marketplace",
            routes: marketplace_routes,
            openapi: marketplace_openapi,
        },
        RouteSpec {
            path: "/navigate",
            routes: navigation_routes,
            openapi: navigation_openapi,
        },
        RouteSpec {
            path: "/health",
            routes: health_routes,
            openapi: health_openapi,
        },
    ]
}

fn mount_api_routes(mut rocket: Rocket<Build>, base_path: &str, enable_swagger: bool) -> Rocket<Build> {
    let route_specs = collect_route_specs();

    if enable_swagger {
        let mut openapi_list = Vec::new();
        for spec in route_specs {
            rocket = rocket.mount(format!("{}{}", base_path, spec.path), spec.routes);
            openapi_list.push((spec.path, spec.openapi));
        }

        let openapi_docs = match marge_spec_list(&openapi_list) {
            Ok(docs) => docs,
            Err(err) => panic!("Could not merge OpenAPI spec: {}", err),
        };

        let settings = rocket_okapi::settings::OpenApiSettings::default();
        rocket = rocket.mount(base_path, vec![get_openapi_route(openapi_docs, &settings)]);

        let docs_path = join_base_path(base_path, "docs");
        let openapi_url = join_base_path(base_path, "openapi.json");
        rocket = rocket.mount(docs_path, make_swagger_ui(&get_swagger_config(&openapi_url)));
    } else {
        for spec in route_specs {
            rocket = rocket.mount(format!("{}{}", base_path, spec.path), spec.routes);
        }
    }

    rocket
}

fn register_catchers(rocket: Rocket<Build>, base_path: &str) -> Rocket<Build> {
    rocket.register(
        base_path,
        catchers![
            app_routes::error::bad_request,
            app_routes::error::unauthorized,
            app_routes::error::not_found,
            app_routes::error::conflict,
            app_routes::error::unprocessable_entity,
            app_routes::error::service_unavailable
        ],
    )
}

/// Everything but the portal services, which production stages from config
/// and tests hand in directly.
fn build_base(rocket: Rocket<Build>, config: &Config) -> Rocket<Build> {
    let cors = match build_cors(&config.cors).to_cors() {
        Ok(cors) => cors,
        Err(err) => panic!("Failed to create CORS fairing: {}", err),
    };

    let base_paths = collect_base_paths(&config.api);
    let enable_swagger = config.api.enable_swagger;

    let mut rocket = rocket.attach(cors).attach(RequestLogger).manage(config.clone());

    for base_path in &base_paths {
        rocket = mount_api_routes(rocket, base_path, enable_swagger);
        rocket = register_catchers(rocket, base_path);
    }

    rocket
}

pub fn build_rocket(config: Config) -> Rocket<Build> {
    init_tracing(&config.logging.level, config.logging.json_format);
    ensure_rocket_secret_key();

    let figment = rocket::Config::figment()
        .merge(("address", config.server.address.clone()))
        .merge(("port", config.server.port));

    build_base(rocket::custom(figment), &config).attach(stage_portal(config))
}

#[cfg(test)]
pub(crate) fn build_rocket_with(config: Config, services: Arc<PortalServices>) -> Rocket<Build> {
    build_base(rocket::build(), &config).manage(services)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_paths_are_normalized_and_deduplicated() {
        let api = config::ApiConfig {
            base_path: "api/v1/".to_string(),
            additional_base_paths: vec!["/api/v1".to_string(), " /api/legacy ".to_string()],
            enable_swagger: false,
        };
        assert_eq!(collect_base_paths(&api), vec!["/api/v1".to_string(), "/api/legacy".to_string()]);
    }

    #[test]
    fn empty_base_path_falls_back_to_default() {
        assert_eq!(normalize_base_path("  "), config::DEFAULT_API_BASE_PATH);
        assert_eq!(join_base_path("/api/v1/", "/docs"), "/api/v1/docs");
    }

    #[test]
    #[should_panic(expected = "wildcard origins")]
    fn wildcard_origins_with_credentials_are_rejected() {
        let cors = config::CorsConfig {
            allowed_origins: vec!["*".to_string()],
            allow_credentials: true,
        };
        let _ = build_cors(&cors);
    }
}
