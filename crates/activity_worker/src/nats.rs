mod event_feed;

pub use event_feed::*;
