//! Probe abstraction.
//!
//! The actual work done per item — fetching its metadata, opening the data
//! file, attempting tile generation — is opaque to the core. This module
//! defines the `Probe` trait the worker driver calls, the `Outcome` it
//! returns, and a `CommandProbe` implementation that delegates to an
//! external command.

mod command;
mod traits;
mod types;

pub use command::{CommandProbe, ProbeCommandConfig};
pub use traits::Probe;
pub use types::{Outcome, ProbeError, ReasonCode};
