pub mod cloud_controller;
pub mod domain;
pub mod nats;
pub mod redis_store;
pub mod telemetry;

pub use cloud_controller::*;
pub use domain::*;
pub use nats::*;
pub use redis_store::*;
pub use telemetry::*;

// Re-export mocks when testing feature is enabled
#[cfg(any(test, feature = "testing"))]
pub use domain::MockAppDirectory;
#[cfg(any(test, feature = "testing"))]
pub use domain::MockIdentityResolver;
#[cfg(any(test, feature = "testing"))]
pub use domain::MockTimestampStore;
