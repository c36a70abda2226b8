//! Market data providers.

mod csv_source;

pub use csv_source::{read_samples, CsvReplayProvider};
