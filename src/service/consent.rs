use crate::error::app_error::AppError;
use crate::legacy::adapter::LegacySessionAdapter;
use crate::models::consent::{ConsentRecord, LegacyConsentPayload, PermissionKey, Permissions};
use crate::models::provider::{ProviderRequest, ProviderView};
use crate::platform::adapter::PlatformSessionAdapter;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;
use validator::Validate;

/// Keeps the consent screen's provider list and writes permission changes
/// through to the platform, falling back to the legacy `settings` endpoint.
///
/// Changes are applied to the in-memory list before any network call. When
/// both write paths fail only the flag that was being written is reverted,
/// so concurrent edits to the same provider survive.
pub struct ConsentSynchronizer {
    platform: Arc<PlatformSessionAdapter>,
    legacy: Arc<LegacySessionAdapter>,
    providers: RwLock<Vec<ProviderView>>,
}

impl ConsentSynchronizer {
    pub fn new(platform: Arc<PlatformSessionAdapter>, legacy: Arc<LegacySessionAdapter>) -> Self {
        Self {
            platform,
            legacy,
            providers: RwLock::new(Vec::new()),
        }
    }

    pub async fn providers(&self) -> Vec<ProviderView> {
        self.providers.read().await.clone()
    }

    /// Replaces the in-memory list with the catalogue joined to this user's consents.
    pub async fn load(&self) -> Result<Vec<ProviderView>, AppError> {
        let token = self.platform.access_token().await?;
        let backend = self.platform.backend();
        let (providers, consents) = tokio::try_join!(backend.list_providers(&token), backend.list_consents(&token))?;

        let by_provider: HashMap<Uuid, Permissions> = consents.iter().map(|c| (c.provider_id, c.permissions())).collect();
        let views: Vec<ProviderView> = providers
            .into_iter()
            .map(|provider| {
                let permissions = by_provider.get(&provider.id).copied().unwrap_or_default();
                ProviderView::new(provider, permissions)
            })
            .collect();

        debug!(providers = views.len(), "consent list loaded");
        *self.providers.write().await = views.clone();
        Ok(views)
    }

    pub async fn toggle_permission(&self, provider_id: &Uuid, key: PermissionKey) -> Result<ConsentRecord, AppError> {
        let current = self.permissions_of(provider_id).await.unwrap_or_default().get(key);
        self.set_permission(provider_id, key, !current).await
    }

    pub async fn set_permission(&self, provider_id: &Uuid, key: PermissionKey, value: bool) -> Result<ConsentRecord, AppError> {
        let previous = self.permissions_of(provider_id).await;
        let candidate = ConsentRecord::new(self.subject_id().await, *provider_id, previous.unwrap_or_default()).with_permission(key, value);

        self.apply_flag(provider_id, key, value).await;

        match self.write_platform(&candidate).await {
            Ok(stored) => return Ok(stored),
            Err(err) => warn!(provider_id = %provider_id, error = %err, "platform consent write failed, falling back to legacy"),
        }

        let token = self.legacy.token().await;
        match self
            .legacy
            .client()
            .update_settings(token.as_deref(), &LegacyConsentPayload::from(&candidate))
            .await
        {
            Ok(_) => {
                info!(provider_id = %provider_id, "consent change sent through legacy settings");
                Ok(candidate)
            }
            Err(err) => {
                if let Some(previous) = previous {
                    self.apply_flag(provider_id, key, previous.get(key)).await;
                }
                Err(err)
            }
        }
    }

    pub async fn add_provider(&self, request: &ProviderRequest) -> Result<ProviderView, AppError> {
        request.validate()?;
        let token = self.platform.access_token().await?;
        let provider = self.platform.backend().insert_provider(&token, request).await?;
        let view = ProviderView::new(provider, Permissions::default());
        self.providers.write().await.push(view.clone());
        Ok(view)
    }

    pub async fn remove_provider(&self, provider_id: &Uuid) -> Result<(), AppError> {
        let token = self.platform.access_token().await?;
        self.platform.backend().delete_consent(&token, provider_id).await?;
        self.providers.write().await.retain(|view| view.provider.id != *provider_id);
        Ok(())
    }

    async fn write_platform(&self, candidate: &ConsentRecord) -> Result<ConsentRecord, AppError> {
        let token = self.platform.access_token().await?;
        let backend = self.platform.backend();
        match backend.find_consent(&token, &candidate.provider_id).await? {
            Some(existing) => {
                let record = ConsentRecord {
                    user_id: existing.user_id,
                    ..candidate.clone()
                };
                backend.update_consent(&token, &record).await
            }
            None => backend.insert_consent(&token, candidate).await,
        }
    }

    async fn permissions_of(&self, provider_id: &Uuid) -> Option<Permissions> {
        self.providers
            .read()
            .await
            .iter()
            .find(|view| view.provider.id == *provider_id)
            .map(|view| view.permissions)
    }

    async fn apply_flag(&self, provider_id: &Uuid, key: PermissionKey, value: bool) {
        if let Some(view) = self.providers.write().await.iter_mut().find(|view| view.provider.id == *provider_id) {
            view.permissions = view.permissions.with(key, value);
            view.approved = view.permissions.approved();
        }
    }

    async fn subject_id(&self) -> String {
        match self.platform.current().await {
            Some(session) => session.subject_id,
            None => self.legacy.current().await.map(|s| s.subject_id).unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::legacy::client::LegacyApiClient;
    use crate::platform::backend::PlatformBackend;
    use crate::service::facade::SessionAdapter;
    use crate::storage::{KeyValueStore, MemoryStore, NamespacedStore};
    use crate::test_utils::{MemoryPlatform, MockTransport, strong_registration};
    use serde_json::json;
    use std::time::Duration;

    struct Fixture {
        platform: Arc<MemoryPlatform>,
        transport: Arc<MockTransport>,
        adapter: Arc<PlatformSessionAdapter>,
        synchronizer: ConsentSynchronizer,
    }

    async fn fixture() -> Fixture {
        fixture_with(MockTransport::ok(json!({"status": "ok"}))).await
    }

    async fn fixture_with(transport: MockTransport) -> Fixture {
        let store = NamespacedStore::new(Arc::new(MemoryStore::new()) as Arc<dyn KeyValueStore>, "portal", &Uuid::new_v4());
        let platform = Arc::new(MemoryPlatform::new());
        let transport = Arc::new(transport);
        let adapter = Arc::new(PlatformSessionAdapter::new(platform.clone(), store.clone(), chrono::Duration::seconds(60)));
        let legacy = Arc::new(LegacySessionAdapter::new(LegacyApiClient::new(transport.clone()), store));
        adapter.register(&strong_registration("ada@example.com")).await.unwrap();

        Fixture {
            synchronizer: ConsentSynchronizer::new(adapter.clone(), legacy),
            platform,
            transport,
            adapter,
        }
    }

    async fn user_id(fixture: &Fixture) -> Uuid {
        fixture.adapter.current().await.unwrap().subject_id.parse().unwrap()
    }

    #[tokio::test]
    async fn first_grant_inserts_an_approved_record() {
        let fixture = fixture().await;
        let provider = fixture.platform.seed_provider("Northside Clinic").await;
        fixture.synchronizer.load().await.unwrap();

        let record = fixture
            .synchronizer
            .set_permission(&provider.id, PermissionKey::LabResults, true)
            .await
            .unwrap();

        assert!(record.lab_results);
        assert!(!record.medications);
        assert!(!record.fitness_data);
        assert!(record.approved);
        let stored = fixture.platform.stored_consent(&user_id(&fixture).await, &provider.id).await.unwrap();
        assert_eq!(stored.permissions(), record.permissions());
        assert!(fixture.transport.requests().await.is_empty());
    }

    #[tokio::test]
    async fn second_change_updates_in_place() {
        let fixture = fixture().await;
        let provider = fixture.platform.seed_provider("Northside Clinic").await;
        fixture.synchronizer.load().await.unwrap();

        fixture.synchronizer.set_permission(&provider.id, PermissionKey::LabResults, true).await.unwrap();
        fixture.synchronizer.set_permission(&provider.id, PermissionKey::Medications, true).await.unwrap();

        let token = fixture.adapter.access_token().await.unwrap();
        let consents = fixture.platform.list_consents(&token).await.unwrap();
        assert_eq!(consents.len(), 1);
        assert!(consents[0].lab_results && consents[0].medications);
    }

    #[tokio::test]
    async fn platform_failure_falls_back_to_legacy() {
        let fixture = fixture().await;
        let provider = fixture.platform.seed_provider("Northside Clinic").await;
        fixture.synchronizer.load().await.unwrap();
        fixture.platform.fail_consent_writes(true);

        let record = fixture
            .synchronizer
            .set_permission(&provider.id, PermissionKey::FitnessData, true)
            .await
            .unwrap();

        assert!(record.fitness_data && record.approved);
        let sent = fixture.transport.requests_to("settings").await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].body.as_ref().unwrap()["permissions"]["fitness_data"], true);
        let view = &fixture.synchronizer.providers().await[0];
        assert!(view.permissions.fitness_data);
        assert!(view.approved);
    }

    #[tokio::test]
    async fn both_paths_failing_reverts_the_list() {
        let fixture = fixture().await;
        let provider = fixture.platform.seed_provider("Northside Clinic").await;
        fixture.synchronizer.load().await.unwrap();
        fixture.platform.fail_consent_writes(true);
        fixture.transport.fail_with(500, "legacy down").await;

        let err = fixture
            .synchronizer
            .set_permission(&provider.id, PermissionKey::Medications, true)
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Api { status: 500, .. }));
        let view = &fixture.synchronizer.providers().await[0];
        assert_eq!(view.permissions, Permissions::default());
        assert!(!view.approved);
    }

    #[tokio::test]
    async fn toggling_twice_restores_the_record() {
        let fixture = fixture().await;
        let provider = fixture.platform.seed_provider("Northside Clinic").await;
        fixture.synchronizer.load().await.unwrap();

        let once = fixture.synchronizer.toggle_permission(&provider.id, PermissionKey::LabResults).await.unwrap();
        let twice = fixture.synchronizer.toggle_permission(&provider.id, PermissionKey::LabResults).await.unwrap();

        assert!(once.approved);
        assert_eq!(twice.permissions(), Permissions::default());
        assert!(!twice.approved);
    }

    #[tokio::test]
    async fn removing_a_provider_deletes_its_consent() {
        let fixture = fixture().await;
        let provider = fixture.platform.seed_provider("Northside Clinic").await;
        fixture.synchronizer.load().await.unwrap();
        fixture.synchronizer.set_permission(&provider.id, PermissionKey::LabResults, true).await.unwrap();

        fixture.synchronizer.remove_provider(&provider.id).await.unwrap();

        assert!(fixture.synchronizer.providers().await.is_empty());
        assert!(fixture.platform.stored_consent(&user_id(&fixture).await, &provider.id).await.is_none());

        // Only the consent row goes; the catalogue entry stays for other users.
        let token = fixture.adapter.access_token().await.unwrap();
        let catalogue = fixture.platform.list_providers(&token).await.unwrap();
        assert!(catalogue.iter().any(|p| p.id == provider.id));
    }

    #[tokio::test]
    async fn added_provider_starts_without_permissions() {
        let fixture = fixture().await;
        let request = ProviderRequest {
            name: "Riverside Labs".to_string(),
            category: "Laboratory".to_string(),
            status: "pending".to_string(),
            logo: None,
            data_types: vec!["Lab Results".to_string()],
        };

        let view = fixture.synchronizer.add_provider(&request).await.unwrap();

        assert!(!view.approved);
        assert_eq!(view.provider.owner_id, user_id(&fixture).await);
        assert_eq!(fixture.synchronizer.providers().await.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_write_reverts_only_its_own_flag() {
        let fixture = fixture_with(MockTransport::failing(500, "settings unavailable").with_delay(Duration::from_millis(5_000))).await;
        let provider = fixture.platform.seed_provider("Northside Clinic").await;
        fixture.synchronizer.load().await.unwrap();
        fixture.platform.fail_consent_writes(true);

        let (failed, _) = tokio::join!(
            fixture.synchronizer.set_permission(&provider.id, PermissionKey::LabResults, true),
            async {
                tokio::time::sleep(Duration::from_millis(1_000)).await;
                fixture.synchronizer.apply_flag(&provider.id, PermissionKey::Medications, true).await;
            }
        );

        assert!(failed.is_err());
        let views = fixture.synchronizer.providers().await;
        assert!(views[0].permissions.medications);
        assert!(!views[0].permissions.lab_results);
        assert!(views[0].approved);
    }
}
