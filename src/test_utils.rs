use crate::config::Config;
use crate::error::app_error::AppError;
use crate::legacy::client::{LegacyApiClient, LegacyRequest, LegacyTransport};
use crate::models::appointment::{Appointment, AppointmentRequest};
use crate::models::consent::ConsentRecord;
use crate::models::contract::Contract;
use crate::models::health::{HealthMetric, HealthRecord};
use crate::models::provider::{DataType, Provider, ProviderRequest};
use crate::models::session::PlatformGrant;
use crate::models::settings::{SettingsRequest, UserSettings};
use crate::models::user::{Credentials, PlatformUser, Registration};
use crate::platform::backend::PlatformBackend;
use crate::service::registry::PortalServices;
use crate::storage::{KeyValueStore, MemoryStore};
use chrono::{DateTime, Utc};
use rocket::http::{ContentType, Status};
use rocket::local::asynchronous::Client;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;
use uuid::Uuid;

pub const STRONG_PASSWORD: &str = "Cobalt-Harbor-Lantern-42";

pub fn strong_registration(email: &str) -> Registration {
    Registration {
        name: "Ada".to_string(),
        email: email.to_string(),
        password: STRONG_PASSWORD.to_string(),
    }
}

type Reply = Result<Value, (u16, String)>;

/// Legacy transport that records every request and answers from canned replies.
pub struct MockTransport {
    default_reply: Mutex<Reply>,
    path_replies: Mutex<HashMap<&'static str, Reply>>,
    requests: Mutex<Vec<LegacyRequest>>,
    delay: Duration,
}

impl MockTransport {
    fn with_reply(reply: Reply) -> Self {
        Self {
            default_reply: Mutex::new(reply),
            path_replies: Mutex::new(HashMap::new()),
            requests: Mutex::new(Vec::new()),
            delay: Duration::ZERO,
        }
    }

    pub fn ok(body: Value) -> Self {
        Self::with_reply(Ok(body))
    }

    pub fn failing(status: u16, message: &str) -> Self {
        Self::with_reply(Err((status, message.to_string())))
    }

    pub fn with_delay(self, delay: Duration) -> Self {
        Self { delay, ..self }
    }

    pub async fn fail_with(&self, status: u16, message: &str) {
        *self.default_reply.lock().await = Err((status, message.to_string()));
    }

    pub async fn reply_to(&self, path: &'static str, body: Value) {
        self.path_replies.lock().await.insert(path, Ok(body));
    }

    pub async fn fail_path(&self, path: &'static str, status: u16, message: &str) {
        self.path_replies.lock().await.insert(path, Err((status, message.to_string())));
    }

    pub async fn requests(&self) -> Vec<LegacyRequest> {
        self.requests.lock().await.clone()
    }

    pub async fn requests_to(&self, path: &str) -> Vec<LegacyRequest> {
        self.requests.lock().await.iter().filter(|r| r.path == path).cloned().collect()
    }
}

#[async_trait::async_trait]
impl LegacyTransport for MockTransport {
    async fn execute(&self, request: LegacyRequest) -> Result<Value, AppError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let path = request.path;
        self.requests.lock().await.push(request);

        let reply = match self.path_replies.lock().await.get(path) {
            Some(reply) => reply.clone(),
            None => self.default_reply.lock().await.clone(),
        };

        reply.map_err(|(status, message)| AppError::Api { status, message })
    }
}

/// Store whose writes each take `delay`, so interrupted write sequences can be observed.
pub struct DelayedStore {
    inner: MemoryStore,
    delay: Duration,
}

impl DelayedStore {
    pub fn new(delay: Duration) -> Self {
        Self {
            inner: MemoryStore::new(),
            delay,
        }
    }
}

#[async_trait::async_trait]
impl KeyValueStore for DelayedStore {
    async fn get(&self, key: &str) -> Result<Option<String>, AppError> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), AppError> {
        tokio::time::sleep(self.delay).await;
        self.inner.set(key, value).await
    }

    async fn remove(&self, key: &str) -> Result<(), AppError> {
        tokio::time::sleep(self.delay).await;
        self.inner.remove(key).await
    }
}

struct Account {
    user: PlatformUser,
    password: String,
}

struct IssuedSession {
    user_id: Uuid,
    expires_at: DateTime<Utc>,
}

#[derive(Default)]
struct PlatformState {
    accounts: HashMap<String, Account>,
    access_tokens: HashMap<String, IssuedSession>,
    refresh_tokens: HashMap<String, (Uuid, String)>,
    providers: Vec<Provider>,
    data_types: Vec<DataType>,
    consents: Vec<(Uuid, ConsentRecord)>,
    settings: HashMap<Uuid, UserSettings>,
    appointments: Vec<Appointment>,
    metrics: Vec<HealthMetric>,
    records: Vec<HealthRecord>,
    contracts: Vec<Contract>,
}

/// In-memory platform backend with the same per-subject row policies as Postgres.
pub struct MemoryPlatform {
    state: Mutex<PlatformState>,
    access_ttl: chrono::Duration,
    fail_consent_writes: AtomicBool,
    unavailable: AtomicBool,
}

impl Default for MemoryPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryPlatform {
    pub fn new() -> Self {
        Self::with_access_ttl(chrono::Duration::hours(1))
    }

    pub fn with_access_ttl(access_ttl: chrono::Duration) -> Self {
        Self {
            state: Mutex::new(PlatformState::default()),
            access_ttl,
            fail_consent_writes: AtomicBool::new(false),
            unavailable: AtomicBool::new(false),
        }
    }

    pub fn fail_consent_writes(&self, fail: bool) {
        self.fail_consent_writes.store(fail, Ordering::SeqCst);
    }

    /// Every call fails as if the backend could not be reached.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub async fn seed_provider(&self, name: &str) -> Provider {
        let provider = Provider {
            id: Uuid::new_v4(),
            owner_id: Uuid::nil(),
            name: name.to_string(),
            category: "Clinic".to_string(),
            status: "connected".to_string(),
            logo: None,
            data_types: vec!["lab results".to_string()],
            last_sync: None,
        };
        self.state.lock().await.providers.push(provider.clone());
        provider
    }

    pub async fn stored_consent(&self, user_id: &Uuid, provider_id: &Uuid) -> Option<ConsentRecord> {
        self.state
            .lock()
            .await
            .consents
            .iter()
            .find(|(owner, record)| owner == user_id && record.provider_id == *provider_id)
            .map(|(_, record)| record.clone())
    }

    pub async fn add_metric(&self, user_id: Uuid, metric_type: &str, value: f64) {
        self.state.lock().await.metrics.push(HealthMetric {
            id: Uuid::new_v4(),
            user_id,
            metric_type: metric_type.to_string(),
            value,
            unit: "bpm".to_string(),
            recorded_at: Utc::now(),
        });
    }

    pub async fn add_contract(&self, user_id: Uuid, title: &str, status: &str) {
        self.state.lock().await.contracts.push(Contract {
            id: Uuid::new_v4(),
            user_id,
            title: title.to_string(),
            counterparty: "Acme Research".to_string(),
            status: status.to_string(),
            created_at: Utc::now(),
        });
    }

    fn check_available(&self) -> Result<(), AppError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(AppError::Api {
                status: 503,
                message: "platform unavailable".to_string(),
            });
        }
        Ok(())
    }

    fn check_consent_write(&self) -> Result<(), AppError> {
        self.check_available()?;
        if self.fail_consent_writes.load(Ordering::SeqCst) {
            return Err(AppError::PolicyViolation("consent write rejected".to_string()));
        }
        Ok(())
    }

    async fn subject(&self, access_token: &str) -> Result<Uuid, AppError> {
        self.check_available()?;
        let state = self.state.lock().await;
        state
            .access_tokens
            .get(access_token)
            .filter(|s| s.expires_at > Utc::now())
            .map(|s| s.user_id)
            .ok_or(AppError::Unauthorized)
    }

    fn issue(&self, state: &mut PlatformState, user: PlatformUser) -> PlatformGrant {
        let access_token = Uuid::new_v4().simple().to_string();
        let refresh_token = Uuid::new_v4().simple().to_string();
        let expires_at = Utc::now() + self.access_ttl;
        state.access_tokens.insert(
            access_token.clone(),
            IssuedSession {
                user_id: user.id,
                expires_at,
            },
        );
        state.refresh_tokens.insert(refresh_token.clone(), (user.id, access_token.clone()));
        PlatformGrant {
            user,
            access_token,
            refresh_token,
            expires_at,
        }
    }
}

fn find_user(state: &PlatformState, user_id: &Uuid) -> Option<PlatformUser> {
    state.accounts.values().find(|a| a.user.id == *user_id).map(|a| a.user.clone())
}

#[async_trait::async_trait]
impl PlatformBackend for MemoryPlatform {
    async fn sign_up(&self, registration: &Registration) -> Result<PlatformGrant, AppError> {
        self.check_available()?;
        let mut state = self.state.lock().await;
        let email = registration.email.to_lowercase();
        if state.accounts.contains_key(&email) {
            return Err(AppError::UserAlreadyExists(email));
        }
        let user = PlatformUser {
            id: Uuid::new_v4(),
            name: registration.name.clone(),
            email: email.clone(),
        };
        state.accounts.insert(
            email,
            Account {
                user: user.clone(),
                password: registration.password.clone(),
            },
        );
        Ok(self.issue(&mut state, user))
    }

    async fn sign_in(&self, credentials: &Credentials) -> Result<PlatformGrant, AppError> {
        self.check_available()?;
        let mut state = self.state.lock().await;
        let user = match state.accounts.get(&credentials.email.to_lowercase()) {
            Some(account) if account.password == credentials.password => account.user.clone(),
            _ => return Err(AppError::InvalidCredentials),
        };
        Ok(self.issue(&mut state, user))
    }

    async fn refresh(&self, refresh_token: &str) -> Result<PlatformGrant, AppError> {
        self.check_available()?;
        let mut state = self.state.lock().await;
        let (user_id, access_token) = state.refresh_tokens.remove(refresh_token).ok_or(AppError::Unauthorized)?;
        state.access_tokens.remove(&access_token);
        let user = find_user(&state, &user_id).ok_or(AppError::Unauthorized)?;
        Ok(self.issue(&mut state, user))
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), AppError> {
        self.check_available()?;
        let mut state = self.state.lock().await;
        state.access_tokens.remove(access_token);
        state.refresh_tokens.retain(|_, (_, access)| access != access_token);
        Ok(())
    }

    async fn authenticate(&self, access_token: &str) -> Result<Option<PlatformUser>, AppError> {
        let Ok(user_id) = self.subject(access_token).await else {
            self.check_available()?;
            return Ok(None);
        };
        Ok(find_user(&*self.state.lock().await, &user_id))
    }

    async fn list_providers(&self, access_token: &str) -> Result<Vec<Provider>, AppError> {
        self.subject(access_token).await?;
        let mut providers = self.state.lock().await.providers.clone();
        providers.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(providers)
    }

    async fn insert_provider(&self, access_token: &str, request: &ProviderRequest) -> Result<Provider, AppError> {
        let owner_id = self.subject(access_token).await?;
        let mut state = self.state.lock().await;
        let provider = Provider {
            id: Uuid::new_v4(),
            owner_id,
            name: request.name.clone(),
            category: request.category.clone(),
            status: request.status.clone(),
            logo: request.logo.clone(),
            data_types: crate::database::provider::normalized_data_types(&request.data_types),
            last_sync: None,
        };
        for name in &provider.data_types {
            if !state.data_types.iter().any(|d| &d.name == name) {
                state.data_types.push(DataType {
                    id: Uuid::new_v4(),
                    name: name.clone(),
                });
            }
        }
        state.providers.push(provider.clone());
        Ok(provider)
    }

    async fn list_data_types(&self, access_token: &str) -> Result<Vec<DataType>, AppError> {
        self.subject(access_token).await?;
        Ok(self.state.lock().await.data_types.clone())
    }

    async fn list_consents(&self, access_token: &str) -> Result<Vec<ConsentRecord>, AppError> {
        let subject = self.subject(access_token).await?;
        let state = self.state.lock().await;
        Ok(state.consents.iter().filter(|(owner, _)| *owner == subject).map(|(_, r)| r.clone()).collect())
    }

    async fn find_consent(&self, access_token: &str, provider_id: &Uuid) -> Result<Option<ConsentRecord>, AppError> {
        let subject = self.subject(access_token).await?;
        Ok(self.stored_consent(&subject, provider_id).await)
    }

    async fn insert_consent(&self, access_token: &str, record: &ConsentRecord) -> Result<ConsentRecord, AppError> {
        let subject = self.subject(access_token).await?;
        self.check_consent_write()?;
        let mut state = self.state.lock().await;
        if state.consents.iter().any(|(owner, r)| *owner == subject && r.provider_id == record.provider_id) {
            return Err(AppError::PolicyViolation("duplicate consent record".to_string()));
        }
        let stored = ConsentRecord::new(subject.to_string(), record.provider_id, record.permissions());
        state.consents.push((subject, stored.clone()));
        Ok(stored)
    }

    async fn update_consent(&self, access_token: &str, record: &ConsentRecord) -> Result<ConsentRecord, AppError> {
        let subject = self.subject(access_token).await?;
        self.check_consent_write()?;
        let mut state = self.state.lock().await;
        let Some((_, existing)) = state
            .consents
            .iter_mut()
            .find(|(owner, r)| *owner == subject && r.provider_id == record.provider_id)
        else {
            return Err(AppError::NotFound("Consent record not found".to_string()));
        };
        *existing = ConsentRecord::new(subject.to_string(), record.provider_id, record.permissions());
        Ok(existing.clone())
    }

    async fn delete_consent(&self, access_token: &str, provider_id: &Uuid) -> Result<(), AppError> {
        let subject = self.subject(access_token).await?;
        self.check_consent_write()?;
        self.state
            .lock()
            .await
            .consents
            .retain(|(owner, r)| !(*owner == subject && r.provider_id == *provider_id));
        Ok(())
    }

    async fn get_settings(&self, access_token: &str) -> Result<Option<UserSettings>, AppError> {
        let subject = self.subject(access_token).await?;
        Ok(self.state.lock().await.settings.get(&subject).cloned())
    }

    async fn upsert_settings(&self, access_token: &str, request: &SettingsRequest) -> Result<UserSettings, AppError> {
        let subject = self.subject(access_token).await?;
        let settings = UserSettings {
            user_id: subject,
            email_notifications: request.email_notifications,
            sms_notifications: request.sms_notifications,
            data_sharing_alerts: request.data_sharing_alerts,
            theme: request.theme.clone(),
            language: request.language.clone(),
            updated_at: Utc::now(),
        };
        self.state.lock().await.settings.insert(subject, settings.clone());
        Ok(settings)
    }

    async fn list_appointments(&self, access_token: &str) -> Result<Vec<Appointment>, AppError> {
        let subject = self.subject(access_token).await?;
        let mut appointments: Vec<Appointment> = self
            .state
            .lock()
            .await
            .appointments
            .iter()
            .filter(|a| a.user_id == subject)
            .cloned()
            .collect();
        appointments.sort_by_key(|a| a.starts_at);
        Ok(appointments)
    }

    async fn insert_appointment(&self, access_token: &str, request: &AppointmentRequest) -> Result<Appointment, AppError> {
        let subject = self.subject(access_token).await?;
        let appointment = Appointment {
            id: Uuid::new_v4(),
            user_id: subject,
            title: request.title.clone(),
            provider_name: request.provider_name.clone(),
            starts_at: request.starts_at,
            ends_at: request.ends_at,
            location: request.location.clone(),
            notes: request.notes.clone(),
        };
        self.state.lock().await.appointments.push(appointment.clone());
        Ok(appointment)
    }

    async fn delete_appointment(&self, access_token: &str, appointment_id: &Uuid) -> Result<(), AppError> {
        let subject = self.subject(access_token).await?;
        let mut state = self.state.lock().await;
        let before = state.appointments.len();
        state.appointments.retain(|a| !(a.id == *appointment_id && a.user_id == subject));
        if state.appointments.len() == before {
            return Err(AppError::NotFound("Appointment not found".to_string()));
        }
        Ok(())
    }

    async fn list_health_metrics(&self, access_token: &str) -> Result<Vec<HealthMetric>, AppError> {
        let subject = self.subject(access_token).await?;
        Ok(self.state.lock().await.metrics.iter().filter(|m| m.user_id == subject).cloned().collect())
    }

    async fn list_health_records(&self, access_token: &str) -> Result<Vec<HealthRecord>, AppError> {
        let subject = self.subject(access_token).await?;
        Ok(self.state.lock().await.records.iter().filter(|r| r.user_id == subject).cloned().collect())
    }

    async fn list_contracts(&self, access_token: &str) -> Result<Vec<Contract>, AppError> {
        let subject = self.subject(access_token).await?;
        Ok(self.state.lock().await.contracts.iter().filter(|c| c.user_id == subject).cloned().collect())
    }
}

/// A full rocket instance wired to in-memory backends.
pub struct TestPortal {
    pub client: Client,
    pub platform: Arc<MemoryPlatform>,
    pub transport: Arc<MockTransport>,
}

impl TestPortal {
    /// Registers through the API so the client's visitor cookie is signed in; returns the platform subject id.
    pub async fn sign_up(&self, email: &str) -> Uuid {
        let response = self
            .client
            .post("/api/v1/auth/register")
            .header(ContentType::JSON)
            .body(json!({"name": "Ada", "email": email, "password": STRONG_PASSWORD}).to_string())
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Created);

        let response = self.client.get("/api/v1/auth/me").dispatch().await;
        assert_eq!(response.status(), Status::Ok);
        let body: Value = response.into_json().await.expect("me body");
        body["subject_id"].as_str().and_then(|id| Uuid::parse_str(id).ok()).expect("subject id")
    }
}

pub async fn test_portal() -> TestPortal {
    let config = Config::default();
    let platform = Arc::new(MemoryPlatform::new());
    let transport = Arc::new(MockTransport::ok(json!({
        "token": "legacy-1",
        "user": {"id": 7, "email": "ada@example.com", "name": "Ada"}
    })));

    let services = Arc::new(PortalServices::new(
        &config,
        platform.clone(),
        LegacyApiClient::new(transport.clone()),
        Arc::new(MemoryStore::new()) as Arc<dyn KeyValueStore>,
    ));

    let client = Client::tracked(crate::build_rocket_with(config, services))
        .await
        .expect("valid rocket instance");

    TestPortal { client, platform, transport }
}
