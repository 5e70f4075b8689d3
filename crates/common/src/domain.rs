mod activity_record;
mod activity_store;
mod app_key;
mod clock;
mod event;
mod inventory;
mod result;
mod timestamp_store;

pub use activity_record::*;
pub use activity_store::*;
pub use app_key::*;
pub use clock::*;
pub use event::*;
pub use inventory::*;
pub use result::*;
pub use timestamp_store::*;
