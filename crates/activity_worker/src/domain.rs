mod reconciler;
mod stream_processor;

pub use reconciler::*;
pub use stream_processor::*;
