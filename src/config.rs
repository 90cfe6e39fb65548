use rocket::figment::{
    Figment,
    providers::{Env, Format, Toml},
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_API_BASE_PATH: &str = "/api/v1";

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct Config {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub cors: CorsConfig,
    pub api: ApiConfig,
    pub legacy: LegacyApiConfig,
    pub platform: PlatformConfig,
    pub auth: AuthConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connection_timeout: u64,
    pub acquire_timeout: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub address: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub json_format: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
    pub allow_credentials: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ApiConfig {
    pub base_path: String,
    pub additional_base_paths: Vec<String>,
    pub enable_swagger: bool,
}

/// Connection details for the legacy REST API kept alive during the
/// platform migration.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LegacyApiConfig {
    pub base_url: String,
    pub tenant: String,
    pub tenant_header: String,
    /// Transport-level timeout; the facade timeout in [`AuthConfig`] is the one users see.
    pub connect_timeout_ms: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct PlatformConfig {
    pub access_token_ttl_seconds: i64,
    pub refresh_token_ttl_days: i64,
    /// Refresh the access token this many seconds before it expires.
    pub refresh_leeway_seconds: i64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AuthConfig {
    pub request_timeout_ms: u64,
    pub login_path: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct StorageConfig {
    /// When unset, sessions are kept in process memory and lost on restart.
    pub redis_url: Option<String>,
    pub key_prefix: String,
    /// In-process portal state for a visitor is dropped after this much inactivity.
    pub idle_visitor_minutes: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "postgres://localhost/health_portal".to_string(),
            max_connections: 16,
            min_connections: 4,
            connection_timeout: 5,
            acquire_timeout: 5,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8000,
            address: "127.0.0.1".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec!["http://localhost:5173".to_string()],
            allow_credentials: true,
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_path: DEFAULT_API_BASE_PATH.to_string(),
            additional_base_paths: Vec::new(),
            enable_swagger: true,
        }
    }
}

impl Default for LegacyApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080/api/".to_string(),
            tenant: "default".to_string(),
            tenant_header: "X-Tenant".to_string(),
            connect_timeout_ms: 5_000,
        }
    }
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            access_token_ttl_seconds: 3_600,
            refresh_token_ttl_days: 30,
            refresh_leeway_seconds: 60,
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            request_timeout_ms: 15_000,
            login_path: "/login".to_string(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            redis_url: None,
            key_prefix: "portal".to_string(),
            idle_visitor_minutes: 60,
        }
    }
}

impl AuthConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl PlatformConfig {
    /// Lifetime of a refresh token, which also bounds how long stored session state is kept.
    pub fn refresh_token_ttl(&self) -> Duration {
        Duration::from_secs(self.refresh_token_ttl_days.max(0) as u64 * 86_400)
    }
}

impl StorageConfig {
    pub fn idle_visitor_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_visitor_minutes * 60)
    }
}

impl Config {
    /// Load configuration from multiple sources in priority order:
    /// 1. Portal.toml (base configuration file)
    /// 2. Environment variables (prefixed with PORTAL_)
    /// 3. DATABASE_URL / REDIS_URL environment variables
    pub fn load() -> Result<Self, figment::Error> {
        let defaults = toml::to_string(&Config::default()).map_err(|e| figment::Error::from(e.to_string()))?;

        let figment = Figment::new()
            .merge(Toml::string(&defaults))
            .merge(Toml::file("Portal.toml"))
            // e.g. PORTAL_LEGACY_BASE_URL is not splittable, so nested keys use a double underscore:
            // PORTAL_LEGACY__BASE_URL=https://legacy.example.com/api/
            .merge(Env::prefixed("PORTAL_").split("__"))
            .merge(Env::raw().only(&["DATABASE_URL"]).map(|_| "database.url".into()))
            .merge(Env::raw().only(&["REDIS_URL"]).map(|_| "storage.redis_url".into()));

        figment.extract()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_timeout_is_fifteen_seconds() {
        let config = Config::default();
        assert_eq!(config.auth.request_timeout(), Duration::from_millis(15_000));
    }

    #[test]
    fn stored_sessions_expire_with_the_refresh_token() {
        let mut config = Config::default();
        assert_eq!(config.platform.refresh_token_ttl(), Duration::from_secs(30 * 86_400));
        config.platform.refresh_token_ttl_days = -1;
        assert_eq!(config.platform.refresh_token_ttl(), Duration::ZERO);
    }

    #[test]
    fn defaults_round_trip_through_figment() {
        let defaults = toml::to_string(&Config::default()).unwrap();
        let config: Config = Figment::new().merge(Toml::string(&defaults)).extract().unwrap();
        assert_eq!(config.api.base_path, DEFAULT_API_BASE_PATH);
        assert_eq!(config.legacy.tenant_header, "X-Tenant");
        assert!(config.storage.redis_url.is_none());
    }

    #[test]
    fn env_overrides_nested_keys() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("PORTAL_LEGACY__TENANT", "clinic-7");
            jail.set_env("PORTAL_AUTH__REQUEST_TIMEOUT_MS", "2500");
            let config = Config::load()?;
            assert_eq!(config.legacy.tenant, "clinic-7");
            assert_eq!(config.auth.request_timeout_ms, 2500);
            Ok(())
        });
    }
}
