use std::fmt;

/// Composite identity of one application: `{org}/{space}/{app}`.
///
/// Renaming an app, its space or its org produces a different key; the
/// record under the old key is left behind.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AppKey {
    pub org: String,
    pub space: String,
    pub app: String,
}

impl AppKey {
    pub fn new(org: impl Into<String>, space: impl Into<String>, app: impl Into<String>) -> Self {
        Self {
            org: org.into(),
            space: space.into(),
            app: app.into(),
        }
    }

    /// Key for an event whose identity may only be partially resolved.
    ///
    /// An empty app name falls back to the raw app GUID so that unresolved
    /// apps do not all alias onto the same `"//"` record.
    pub fn for_event(org: &str, space: &str, app: &str, app_guid: &str) -> Self {
        let app = if app.is_empty() { app_guid } else { app };
        Self::new(org, space, app)
    }

    /// Prefix matching every app in `org`.
    pub fn org_prefix(org: &str) -> String {
        format!("{}/", org)
    }

    /// Prefix matching every app in `org/space`.
    pub fn space_prefix(org: &str, space: &str) -> String {
        format!("{}/{}/", org, space)
    }
}

impl fmt::Display for AppKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.org, self.space, self.app)
    }
}
