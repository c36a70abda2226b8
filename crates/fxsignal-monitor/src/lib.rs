//! Logging setup and persistence sinks.

mod logging;
mod sinks;

pub use logging::setup_logging;
pub use sinks::{JsonlSink, MemorySink, MultiSink, TracingSink};
