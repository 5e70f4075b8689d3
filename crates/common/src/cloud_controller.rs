mod caching_identity_resolver;
mod client;
mod models;

pub use caching_identity_resolver::*;
pub use client::*;
pub use models::*;
