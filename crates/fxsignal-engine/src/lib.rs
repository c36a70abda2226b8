//! Signal pipeline orchestration.
//!
//! [`Pipeline`] owns the price history, strategy gates, risk governor and
//! lifecycle tracker, and talks to the outside world only through the
//! injected [`Collaborators`]. [`Runtime`] drives it from two periodic
//! tasks: price ingestion and governance.

mod pipeline;
mod report;
mod runtime;

pub use pipeline::{Collaborators, Pipeline};
pub use report::{CycleReport, IngestReport};
pub use runtime::Runtime;
