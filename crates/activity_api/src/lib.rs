pub mod activity_api;
pub mod http;

pub use activity_api::*;
pub use http::*;
