use crate::domain::result::DomainResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One app as listed by the inventory source. Listings that already joined
/// spaces and orgs also carry their ids and the app state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryEntry {
    pub guid: String,
    pub name: String,
    pub space_name: String,
    pub org_name: String,
    #[serde(default)]
    pub space_id: String,
    #[serde(default)]
    pub org_id: String,
    #[serde(default)]
    pub state: String,
}

impl InventoryEntry {
    /// Details carried by the listing itself, if it resolved both the
    /// space and the org.
    pub fn details(&self) -> Option<AppDetails> {
        if self.space_id.is_empty() || self.org_id.is_empty() {
            return None;
        }
        Some(AppDetails {
            identity: AppIdentity {
                name: self.name.clone(),
                space_id: self.space_id.clone(),
                space_name: self.space_name.clone(),
                org_id: self.org_id.clone(),
                org_name: self.org_name.clone(),
            },
            state: self.state.clone(),
        })
    }
}

/// Names and ids resolved for an app GUID. All fields empty means the GUID
/// is unknown; partially filled results are normal while the inventory
/// catches up.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppIdentity {
    pub name: String,
    pub space_id: String,
    pub space_name: String,
    pub org_id: String,
    pub org_name: String,
}

impl AppIdentity {
    pub fn is_empty(&self) -> bool {
        self.name.is_empty()
            && self.space_id.is_empty()
            && self.space_name.is_empty()
            && self.org_id.is_empty()
            && self.org_name.is_empty()
    }
}

/// Identity plus lifecycle state (`STARTED`, `STOPPED`, ...).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppDetails {
    pub identity: AppIdentity,
    pub state: String,
}

/// Inventory of deployed apps (the Cloud Controller in production)
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait AppDirectory: Send + Sync {
    /// List every app currently known to the platform
    async fn list_apps(&self) -> DomainResult<Vec<InventoryEntry>>;

    /// Fetch fresh metadata for one app
    async fn app_details(&self, guid: &str) -> DomainResult<AppDetails>;
}

/// Resolves an app GUID to names and ids. A miss is not an error: it
/// returns an empty identity.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait IdentityResolver: Send + Sync {
    async fn resolve(&self, guid: &str) -> AppIdentity;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listed(space_id: &str, org_id: &str) -> InventoryEntry {
        InventoryEntry {
            guid: "app-guid".to_string(),
            name: "app1".to_string(),
            space_name: "spaceX".to_string(),
            org_name: "orgA".to_string(),
            space_id: space_id.to_string(),
            org_id: org_id.to_string(),
            state: "STARTED".to_string(),
        }
    }

    #[test]
    fn test_joined_entry_carries_details() {
        let details = listed("space-guid", "org-guid").details().unwrap();

        assert_eq!(details.state, "STARTED");
        assert_eq!(details.identity.name, "app1");
        assert_eq!(details.identity.space_id, "space-guid");
        assert_eq!(details.identity.org_name, "orgA");
    }

    #[test]
    fn test_entry_without_ids_needs_lookup() {
        assert!(listed("", "org-guid").details().is_none());
        assert!(listed("space-guid", "").details().is_none());
    }
}
