use thiserror::Error;

pub type DomainResult<T> = Result<T, DomainError>;

#[derive(Error, Debug)]
pub enum DomainError {
    #[error("App not found: {0}")]
    AppNotFound(String),

    #[error("Space not found: {0}")]
    SpaceNotFound(String),

    #[error("Organization not found: {0}")]
    OrganizationNotFound(String),

    #[error("Inventory unavailable: {0}")]
    InventoryUnavailable(String),

    #[error("Timestamp store error: {0}")]
    TimestampStoreError(String),

    #[error("Timed out after {0:?}: {1}")]
    Timeout(std::time::Duration, String),

    #[error("Event stream terminated")]
    StreamTerminated,

    #[error("Invalid event payload: {0}")]
    InvalidEvent(String),

    #[error("Repository error: {0}")]
    RepositoryError(#[from] anyhow::Error),
}
