//! Batch processing: claim unprocessed items, probe them, commit what
//! the probes decide.

mod config;
mod driver;

pub use config::WorkerConfig;
pub use driver::{BatchReport, WorkerDriver, WorkerError};
