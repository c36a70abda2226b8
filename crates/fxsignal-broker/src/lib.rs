//! Order gateway implementations.

mod paper;

pub use paper::{PaperConfig, PaperGateway};
