//! Item lifecycle transitions over the marker key space.
//!
//! Every transition follows the same discipline: write the marker for the
//! new state first, then delete the marker for the old state. A crash
//! between the two writes leaves the item visible in both states, which
//! downstream consumers treat as committed; it never becomes invisible.

mod engine;
mod types;

pub use engine::LifecycleEngine;
pub use types::{EnrollReport, LifecycleError};
