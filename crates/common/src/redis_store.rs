mod timestamp_store;

pub use timestamp_store::*;
