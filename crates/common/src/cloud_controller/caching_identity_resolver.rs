use crate::domain::{AppDirectory, AppIdentity, IdentityResolver};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// GUID → identity cache in front of an `AppDirectory`.
///
/// Hits are served from memory. A miss goes to the directory and the
/// answer is cached if it resolved anything; failures resolve to an empty
/// identity and are retried on the next miss.
pub struct CachingIdentityResolver {
    directory: Arc<dyn AppDirectory>,
    cache: RwLock<HashMap<String, AppIdentity>>,
}

impl CachingIdentityResolver {
    pub fn new(directory: Arc<dyn AppDirectory>) -> Self {
        Self {
            directory,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Seed or overwrite the cached identity for `guid`.
    pub async fn prime(&self, guid: &str, identity: AppIdentity) {
        if guid.is_empty() || identity.is_empty() {
            return;
        }
        self.cache.write().await.insert(guid.to_string(), identity);
    }

    pub async fn invalidate(&self, guid: &str) {
        self.cache.write().await.remove(guid);
    }

    pub async fn cached_count(&self) -> usize {
        self.cache.read().await.len()
    }
}

#[async_trait]
impl IdentityResolver for CachingIdentityResolver {
    async fn resolve(&self, guid: &str) -> AppIdentity {
        if guid.is_empty() {
            return AppIdentity::default();
        }

        if let Some(identity) = self.cache.read().await.get(guid) {
            return identity.clone();
        }

        match self.directory.app_details(guid).await {
            Ok(details) => {
                let identity = details.identity;
                self.prime(guid, identity.clone()).await;
                identity
            }
            Err(e) => {
                debug!(app_guid = %guid, error = %e, "identity lookup missed");
                AppIdentity::default()
            }
        }
    }
}
