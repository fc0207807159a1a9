//! Testing utilities and mock implementations for E2E tests.
//!
//! This module provides fake implementations of the external seams (the
//! object store and the probe), allowing full lifecycle testing without
//! a bucket or a subprocess.
//!
//! # Example
//!
//! ```rust,ignore
//! use tilescan_core::testing::{InMemoryObjectStore, MockProbe};
//!
//! let store = InMemoryObjectStore::new();
//! let probe = MockProbe::new();
//!
//! // Configure mock responses
//! probe.set_outcome(Outcome::success("C1")).await;
//! store.set_next_error(StoreError::Transport("reset".into())).await;
//!
//! // Use behind Arc<dyn ObjectStore> / Arc<dyn Probe>...
//! ```

mod memory_store;
mod mock_probe;

pub use memory_store::InMemoryObjectStore;
pub use mock_probe::MockProbe;
