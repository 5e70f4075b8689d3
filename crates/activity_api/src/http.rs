mod router;
mod server;

pub use router::*;
pub use server::*;
