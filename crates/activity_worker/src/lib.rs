pub mod activity_worker;
pub mod domain;
pub mod nats;

pub use activity_worker::*;
pub use domain::*;
pub use nats::*;
