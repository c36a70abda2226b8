//! Core types and traits for the FX signal pipeline.
//!
//! This crate provides the foundational building blocks including:
//! - Market data samples and pip conventions
//! - Candidate/approved signals and their lifecycle states
//! - Market conditions, risk profiles and trade records
//! - Collaborator traits for market data, order routing, news and persistence

pub mod error;
pub mod traits;
pub mod types;

pub use error::{FxError, FxResult};
pub use traits::*;
pub use types::*;
