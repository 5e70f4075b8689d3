use crate::cloud_controller::models::{AppEntity, OrgEntity, Page, SpaceEntity, TokenResponse};
use crate::domain::{
    AppDetails, AppDirectory, AppIdentity, DomainError, DomainResult, InventoryEntry,
};
use anyhow::Context;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, info, instrument};

/// Refresh the token this long before UAA says it expires
const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(30);

const LIST_PAGE_SIZE: &str = "results-per-page=100";

#[derive(Debug, Clone)]
pub struct CloudControllerConfig {
    pub api_endpoint: String,
    pub uaa_endpoint: String,
    pub username: String,
    pub password: String,
    pub skip_ssl_validation: bool,
    pub request_timeout: Duration,
}

struct CachedToken {
    access_token: String,
    refresh_at: Instant,
}

/// Cloud Controller v2 API client used as the app inventory.
pub struct CloudControllerClient {
    http: reqwest::Client,
    config: CloudControllerConfig,
    token: Mutex<Option<CachedToken>>,
}

impl CloudControllerClient {
    pub fn new(config: CloudControllerConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .danger_accept_invalid_certs(config.skip_ssl_validation)
            .build()
            .context("Failed to build Cloud Controller HTTP client")?;

        info!(api = %config.api_endpoint, "Cloud Controller client configured");
        Ok(Self {
            http,
            config,
            token: Mutex::new(None),
        })
    }

    async fn access_token(&self) -> DomainResult<String> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref() {
            if Instant::now() < token.refresh_at {
                return Ok(token.access_token.clone());
            }
        }

        debug!("requesting new UAA token");
        let url = format!("{}/oauth/token", self.config.uaa_endpoint.trim_end_matches('/'));
        let response: TokenResponse = self
            .http
            .post(&url)
            .basic_auth("cf", Some(""))
            .form(&[
                ("grant_type", "password"),
                ("username", self.config.username.as_str()),
                ("password", self.config.password.as_str()),
            ])
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| DomainError::InventoryUnavailable(format!("UAA token request: {}", e)))?
            .json()
            .await
            .map_err(|e| DomainError::InventoryUnavailable(format!("UAA token decode: {}", e)))?;

        let lifetime = Duration::from_secs(response.expires_in).saturating_sub(TOKEN_REFRESH_MARGIN);
        let access_token = response.access_token;
        *cached = Some(CachedToken {
            access_token: access_token.clone(),
            refresh_at: Instant::now() + lifetime,
        });
        Ok(access_token)
    }

    /// GET a single resource. `Ok(None)` on 404.
    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> DomainResult<Option<T>> {
        let token = self.access_token().await?;
        let url = format!("{}{}", self.config.api_endpoint.trim_end_matches('/'), path);

        let response = self
            .http
            .get(&url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| DomainError::InventoryUnavailable(format!("GET {}: {}", path, e)))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let body = response
            .error_for_status()
            .map_err(|e| DomainError::InventoryUnavailable(format!("GET {}: {}", path, e)))?
            .json::<T>()
            .await
            .map_err(|e| DomainError::InventoryUnavailable(format!("decode {}: {}", path, e)))?;
        Ok(Some(body))
    }

    /// Walk every page of a list endpoint, following `next_url`.
    async fn list_all<T: DeserializeOwned>(&self, first_path: &str) -> DomainResult<Vec<(String, T)>> {
        let mut items = Vec::new();
        let mut next = Some(format!("{}?{}", first_path, LIST_PAGE_SIZE));

        while let Some(path) = next {
            let page: Page<T> = self
                .get_json(&path)
                .await?
                .ok_or_else(|| DomainError::InventoryUnavailable(format!("{} returned 404", path)))?;
            items.extend(
                page.resources
                    .into_iter()
                    .map(|resource| (resource.metadata.guid, resource.entity)),
            );
            next = page.next_url;
        }

        Ok(items)
    }

    async fn resource<T: DeserializeOwned>(&self, path: &str) -> DomainResult<Option<T>> {
        #[derive(serde::Deserialize)]
        struct Single<T> {
            entity: T,
        }
        Ok(self.get_json::<Single<T>>(path).await?.map(|s| s.entity))
    }
}

#[async_trait]
impl AppDirectory for CloudControllerClient {
    #[instrument(skip(self))]
    async fn list_apps(&self) -> DomainResult<Vec<InventoryEntry>> {
        let orgs: HashMap<String, OrgEntity> =
            self.list_all::<OrgEntity>("/v2/organizations").await?.into_iter().collect();
        let spaces: HashMap<String, SpaceEntity> =
            self.list_all::<SpaceEntity>("/v2/spaces").await?.into_iter().collect();
        let apps = self.list_all::<AppEntity>("/v2/apps").await?;

        let entries: Vec<InventoryEntry> = apps
            .into_iter()
            .map(|(guid, app)| {
                let space = spaces.get(&app.space_guid);
                let org = space.and_then(|s| orgs.get(&s.organization_guid));
                InventoryEntry {
                    guid,
                    name: app.name,
                    space_name: space.map(|s| s.name.clone()).unwrap_or_default(),
                    org_name: org.map(|o| o.name.clone()).unwrap_or_default(),
                    space_id: space.map(|_| app.space_guid.clone()).unwrap_or_default(),
                    org_id: space
                        .filter(|_| org.is_some())
                        .map(|s| s.organization_guid.clone())
                        .unwrap_or_default(),
                    state: app.state,
                }
            })
            .collect();

        debug!(
            apps = entries.len(),
            spaces = spaces.len(),
            orgs = orgs.len(),
            "listed inventory"
        );
        Ok(entries)
    }

    #[instrument(skip(self))]
    async fn app_details(&self, guid: &str) -> DomainResult<AppDetails> {
        let app: AppEntity = self
            .resource(&format!("/v2/apps/{}", guid))
            .await?
            .ok_or_else(|| DomainError::AppNotFound(guid.to_string()))?;

        let space: SpaceEntity = self
            .resource(&format!("/v2/spaces/{}", app.space_guid))
            .await?
            .ok_or_else(|| DomainError::SpaceNotFound(app.space_guid.clone()))?;

        let org: OrgEntity = self
            .resource(&format!("/v2/organizations/{}", space.organization_guid))
            .await?
            .ok_or_else(|| DomainError::OrganizationNotFound(space.organization_guid.clone()))?;

        Ok(AppDetails {
            identity: AppIdentity {
                name: app.name,
                space_id: app.space_guid,
                space_name: space.name,
                org_id: space.organization_guid,
                org_name: org.name,
            },
            state: app.state,
        })
    }
}
